use rusqlite::{params, Connection};

use super::DatabaseError;
use crate::crypto::password;

/// Fixed store schema. Never migrated: applied once, on first creation.
pub const SCHEMA_SQL: &str = include_str!("../../resources/schema/dermatrack.sql");

/// Tables created by [`SCHEMA_SQL`], in creation order.
pub const TABLES: [&str; 6] = [
    "users",
    "patients",
    "visits",
    "images",
    "progress_metrics",
    "reports",
];

pub const SEED_CLINICIAN_EMAIL: &str = "doctor@derma.app";
pub const SEED_CLINICIAN_PASSWORD: &str = "doctor123";
pub const SEED_PATIENT_EMAIL: &str = "patient@derma.app";
pub const SEED_PATIENT_PASSWORD: &str = "patient123";

/// Open an in-memory database with the schema applied and no seed rows.
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn, false)?;
    apply_schema(&conn)?;
    Ok(conn)
}

/// Foreign keys are declared in the schema but only checked when asked for.
pub fn configure_pragmas(conn: &Connection, enforce_foreign_keys: bool) -> Result<(), DatabaseError> {
    let fk = if enforce_foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys={fk};"))?;
    Ok(())
}

pub fn apply_schema(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(SCHEMA_SQL)?;
    tracing::info!("Tables created successfully");
    Ok(())
}

/// Insert the default clinician, patient user and linked patient profile.
///
/// Seed passwords are stored hashed with `password_iterations` rounds.
pub fn seed_initial_data(conn: &Connection, password_iterations: u32) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO users (email, password, role) VALUES (?1, ?2, 'clinician')",
        params![
            SEED_CLINICIAN_EMAIL,
            password::hash_password(SEED_CLINICIAN_PASSWORD, password_iterations),
        ],
    )?;
    let clinician_id = tx.last_insert_rowid();

    tx.execute(
        "INSERT INTO users (email, password, role) VALUES (?1, ?2, 'patient')",
        params![
            SEED_PATIENT_EMAIL,
            password::hash_password(SEED_PATIENT_PASSWORD, password_iterations),
        ],
    )?;
    let patient_user_id = tx.last_insert_rowid();

    tx.execute(
        "INSERT INTO patients (user_id, clinician_id, first_name, last_name, date_of_birth, gender, phone, email)
         VALUES (?1, ?2, 'John', 'Doe', '1990-05-15', 'Male', '555-0123', ?3)",
        params![patient_user_id, clinician_id, SEED_PATIENT_EMAIL],
    )?;

    tx.commit()?;
    tracing::info!("Initial data seeded");
    Ok(())
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}
