//! Whole-database snapshots.
//!
//! A snapshot is the standard SQLite file image of the in-memory database,
//! carried through local storage as base64 text. Export and import use
//! `sqlite3_serialize` and `sqlite3_deserialize`, so the image never touches
//! disk and the byte format is exactly what any SQLite build (including the
//! browser one) reads and writes.

use std::ptr::NonNull;

use base64::Engine as _;
use rusqlite::serialize::OwnedData;
use rusqlite::{ffi, Connection, DatabaseName};

/// Every SQLite database file starts with this header string.
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Snapshot is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("Snapshot is not a SQLite database image")]
    NotADatabase,
    #[error("Snapshot failed integrity check: {0}")]
    Corrupt(String),
    #[error("Out of memory allocating a {0}-byte snapshot")]
    OutOfMemory(usize),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Serialize the main database of `conn` to a transportable byte image.
pub fn export(conn: &Connection) -> Result<Vec<u8>, SnapshotError> {
    let image = conn.serialize(DatabaseName::Main)?;
    Ok(image.to_vec())
}

/// Load a byte image into a fresh in-memory connection.
///
/// Rejects images without the SQLite header and images that load but
/// fail `PRAGMA quick_check`.
pub fn import(bytes: &[u8]) -> Result<Connection, SnapshotError> {
    header_page_size(bytes).ok_or(SnapshotError::NotADatabase)?;

    let mut conn = Connection::open_in_memory()?;
    conn.deserialize(DatabaseName::Main, sqlite_owned_copy(bytes)?, false)
        .map_err(corrupt_or_sqlite)?;

    let status: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(corrupt_or_sqlite)?;
    if status != "ok" {
        return Err(SnapshotError::Corrupt(status));
    }
    Ok(conn)
}

/// Copy `bytes` into a buffer SQLite owns, as `sqlite3_deserialize` requires.
fn sqlite_owned_copy(bytes: &[u8]) -> Result<OwnedData, SnapshotError> {
    // SAFETY: the allocation is checked for null and sized to `bytes`, and the
    // pointer handed to `OwnedData` comes straight from `sqlite3_malloc64`.
    unsafe {
        let raw = ffi::sqlite3_malloc64(bytes.len() as u64).cast::<u8>();
        let ptr = NonNull::new(raw).ok_or(SnapshotError::OutOfMemory(bytes.len()))?;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
        Ok(OwnedData::from_raw_nonnull(ptr, bytes.len()))
    }
}

fn corrupt_or_sqlite(e: rusqlite::Error) -> SnapshotError {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::NotADatabase
                || err.code == rusqlite::ErrorCode::DatabaseCorrupt =>
        {
            SnapshotError::Corrupt(err.to_string())
        }
        other => SnapshotError::Sqlite(other),
    }
}

/// Page size from the file header, or `None` if this is not a SQLite image.
fn header_page_size(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < 100 || &bytes[..16] != SQLITE_HEADER {
        return None;
    }
    // Big-endian u16 at offset 16; the value 1 stands for 65536.
    match u16::from_be_bytes([bytes[16], bytes[17]]) {
        1 => Some(65_536),
        n if n >= 512 && n.is_power_of_two() => Some(u32::from(n)),
        _ => None,
    }
}

pub fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn decode(text: &str) -> Result<Vec<u8>, SnapshotError> {
    Ok(base64::engine::general_purpose::STANDARD.decode(text.trim())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT);
             INSERT INTO notes (body) VALUES ('first'), ('second');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn export_produces_sqlite_image() {
        let bytes = export(&sample_db()).unwrap();
        assert!(bytes.starts_with(SQLITE_HEADER));
        assert_eq!(header_page_size(&bytes), Some(4096));
    }

    #[test]
    fn import_restores_rows_and_sequence() {
        let bytes = export(&sample_db()).unwrap();
        let restored = import(&bytes).unwrap();

        let bodies: Vec<String> = restored
            .prepare("SELECT body FROM notes ORDER BY id")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(bodies, vec!["first", "second"]);

        // AUTOINCREMENT state travels with the image
        restored.execute("INSERT INTO notes (body) VALUES ('third')", []).unwrap();
        assert_eq!(restored.last_insert_rowid(), 3);
    }

    #[test]
    fn import_rejects_non_database_bytes() {
        let result = import(b"definitely not a database, just some text that is long enough to pass the length check for a header page");
        assert!(matches!(result, Err(SnapshotError::NotADatabase)));
        assert!(matches!(import(&[]), Err(SnapshotError::NotADatabase)));
    }

    #[test]
    fn import_rejects_truncated_image() {
        let bytes = export(&sample_db()).unwrap();
        let mut damaged = bytes[..100].to_vec();
        damaged.extend(std::iter::repeat(0xAB).take(4096 - 100));
        assert!(import(&damaged).is_err());
    }

    #[test]
    fn imported_image_accepts_writes_and_reexports() {
        let restored = import(&export(&sample_db()).unwrap()).unwrap();
        restored
            .execute("INSERT INTO notes (body) VALUES (?1)", ["x".repeat(64 * 1024)])
            .unwrap();

        let again = import(&export(&restored).unwrap()).unwrap();
        let count: i64 = again
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn base64_round_trip_and_bad_input() {
        let bytes = export(&sample_db()).unwrap();
        let text = encode(&bytes);
        assert_eq!(decode(&text).unwrap(), bytes);
        assert!(matches!(decode("!!not base64!!"), Err(SnapshotError::Encoding(_))));
    }
}
