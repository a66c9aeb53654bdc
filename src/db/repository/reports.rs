use rusqlite::params;

use super::{count, parse_timestamp};
use crate::db::{DatabaseError, Store};
use crate::models::*;

fn report_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        clinician_id: row.get(2)?,
        report_type: row.get(3)?,
        report_data: row.get(4)?,
        status: row.get(5)?,
        approved_at: row.get::<_, Option<String>>(6)?.as_deref().and_then(parse_timestamp),
        created_at: row.get::<_, Option<String>>(7)?.as_deref().and_then(parse_timestamp),
    })
}

/// Insert a report in the default `draft` status and return its id.
pub fn insert_report(store: &mut Store, report: &NewReport) -> Result<i64, DatabaseError> {
    store.execute(
        "INSERT INTO reports (patient_id, clinician_id, report_type, report_data)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            report.patient_id,
            report.clinician_id,
            report.report_type,
            report.report_data,
        ],
    )?;
    store.last_insert_rowid()
}

pub fn get_report(store: &mut Store, id: i64) -> Result<Option<Report>, DatabaseError> {
    store.query_first(
        "SELECT id, patient_id, clinician_id, report_type, report_data, status, approved_at, created_at
         FROM reports WHERE id = ?1",
        params![id],
        report_from_row,
    )
}

/// Reports of a patient, newest first.
pub fn list_reports_for_patient(store: &mut Store, patient_id: i64) -> Result<Vec<Report>, DatabaseError> {
    store.query_map(
        "SELECT id, patient_id, clinician_id, report_type, report_data, status, approved_at, created_at
         FROM reports WHERE patient_id = ?1
         ORDER BY created_at DESC, id DESC",
        params![patient_id],
        report_from_row,
    )
}

pub fn count_draft_reports_for_clinician(
    store: &mut Store,
    clinician_id: i64,
) -> Result<i64, DatabaseError> {
    count(
        store,
        "SELECT COUNT(*) FROM reports WHERE clinician_id = ?1 AND status = 'draft'",
        params![clinician_id],
    )
}

pub fn count_reports_for_patient(store: &mut Store, patient_id: i64) -> Result<i64, DatabaseError> {
    count(
        store,
        "SELECT COUNT(*) FROM reports WHERE patient_id = ?1",
        params![patient_id],
    )
}

/// Mark a report approved now. Fails with `NotFound` for an unknown id.
pub fn approve_report(store: &mut Store, id: i64) -> Result<(), DatabaseError> {
    if get_report(store, id)?.is_none() {
        return Err(DatabaseError::not_found("report", id));
    }
    store.execute(
        "UPDATE reports SET status = 'approved', approved_at = CURRENT_TIMESTAMP WHERE id = ?1",
        params![id],
    )?;
    Ok(())
}
