use rusqlite::params;

use super::{count, parse_date, parse_timestamp, DATE_FORMAT};
use crate::db::{DatabaseError, Store};
use crate::models::*;

fn patient_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        user_id: row.get(1)?,
        clinician_id: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        date_of_birth: row.get::<_, Option<String>>(5)?.as_deref().and_then(parse_date),
        gender: row.get(6)?,
        phone: row.get(7)?,
        email: row.get(8)?,
        medical_history: row.get(9)?,
        created_at: row.get::<_, Option<String>>(10)?.as_deref().and_then(parse_timestamp),
    })
}

/// Insert a patient record and return its id.
pub fn insert_patient(store: &mut Store, patient: &NewPatient) -> Result<i64, DatabaseError> {
    store.execute(
        "INSERT INTO patients (user_id, clinician_id, first_name, last_name, date_of_birth, gender, phone, email, medical_history)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            patient.user_id,
            patient.clinician_id,
            patient.first_name,
            patient.last_name,
            patient.date_of_birth.map(|d| d.format(DATE_FORMAT).to_string()),
            patient.gender,
            patient.phone,
            patient.email,
            patient.medical_history,
        ],
    )?;
    store.last_insert_rowid()
}

pub fn get_patient(store: &mut Store, id: i64) -> Result<Option<Patient>, DatabaseError> {
    store.query_first(
        "SELECT id, user_id, clinician_id, first_name, last_name, date_of_birth, gender, phone, email, medical_history, created_at
         FROM patients WHERE id = ?1",
        params![id],
        patient_from_row,
    )
}

/// The patient record linked to a patient-role user, if any.
pub fn get_patient_by_user(store: &mut Store, user_id: i64) -> Result<Option<Patient>, DatabaseError> {
    store.query_first(
        "SELECT id, user_id, clinician_id, first_name, last_name, date_of_birth, gender, phone, email, medical_history, created_at
         FROM patients WHERE user_id = ?1
         ORDER BY id",
        params![user_id],
        patient_from_row,
    )
}

/// Patients owned by a clinician, newest first.
pub fn list_patients_for_clinician(
    store: &mut Store,
    clinician_id: i64,
) -> Result<Vec<Patient>, DatabaseError> {
    store.query_map(
        "SELECT id, user_id, clinician_id, first_name, last_name, date_of_birth, gender, phone, email, medical_history, created_at
         FROM patients WHERE clinician_id = ?1
         ORDER BY created_at DESC, id DESC",
        params![clinician_id],
        patient_from_row,
    )
}

/// Case-insensitive substring match on "first last" or email, newest first.
/// An empty term matches every patient of the clinician.
pub fn search_patients_for_clinician(
    store: &mut Store,
    clinician_id: i64,
    term: &str,
) -> Result<Vec<Patient>, DatabaseError> {
    store.query_map(
        "SELECT id, user_id, clinician_id, first_name, last_name, date_of_birth, gender, phone, email, medical_history, created_at
         FROM patients
         WHERE clinician_id = ?1
           AND (instr(lower(first_name || ' ' || last_name), lower(?2)) > 0
                OR instr(lower(email), lower(?2)) > 0)
         ORDER BY created_at DESC, id DESC",
        params![clinician_id, term],
        patient_from_row,
    )
}

pub fn count_patients_for_clinician(store: &mut Store, clinician_id: i64) -> Result<i64, DatabaseError> {
    count(
        store,
        "SELECT COUNT(*) FROM patients WHERE clinician_id = ?1",
        params![clinician_id],
    )
}
