use rusqlite::params;

use super::{count, format_timestamp, parse_timestamp};
use crate::db::{DatabaseError, Store};
use crate::models::*;

fn visit_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Visit> {
    Ok(Visit {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        clinician_id: row.get(2)?,
        visit_date: row.get::<_, Option<String>>(3)?.as_deref().and_then(parse_timestamp),
        diagnosis: row.get(4)?,
        notes: row.get(5)?,
        treatment_plan: row.get(6)?,
        status: row.get(7)?,
    })
}

/// Insert a visit and return its id. An absent date or status takes the
/// column default.
pub fn insert_visit(store: &mut Store, visit: &NewVisit) -> Result<i64, DatabaseError> {
    store.execute(
        "INSERT INTO visits (patient_id, clinician_id, visit_date, diagnosis, notes, treatment_plan, status)
         VALUES (?1, ?2, COALESCE(?3, CURRENT_TIMESTAMP), ?4, ?5, ?6, COALESCE(?7, 'active'))",
        params![
            visit.patient_id,
            visit.clinician_id,
            visit.visit_date.as_ref().map(format_timestamp),
            visit.diagnosis,
            visit.notes,
            visit.treatment_plan,
            visit.status,
        ],
    )?;
    store.last_insert_rowid()
}

pub fn get_visit(store: &mut Store, id: i64) -> Result<Option<Visit>, DatabaseError> {
    store.query_first(
        "SELECT id, patient_id, clinician_id, visit_date, diagnosis, notes, treatment_plan, status
         FROM visits WHERE id = ?1",
        params![id],
        visit_from_row,
    )
}

/// All visits of a patient, newest first. Same-instant visits fall back to
/// insertion order, newest first.
pub fn list_visits_for_patient(store: &mut Store, patient_id: i64) -> Result<Vec<Visit>, DatabaseError> {
    store.query_map(
        "SELECT id, patient_id, clinician_id, visit_date, diagnosis, notes, treatment_plan, status
         FROM visits WHERE patient_id = ?1
         ORDER BY visit_date DESC, id DESC",
        params![patient_id],
        visit_from_row,
    )
}

/// The `limit` most recent visits of a patient.
pub fn recent_visits_for_patient(
    store: &mut Store,
    patient_id: i64,
    limit: u32,
) -> Result<Vec<Visit>, DatabaseError> {
    store.query_map(
        "SELECT id, patient_id, clinician_id, visit_date, diagnosis, notes, treatment_plan, status
         FROM visits WHERE patient_id = ?1
         ORDER BY visit_date DESC, id DESC
         LIMIT ?2",
        params![patient_id, limit],
        visit_from_row,
    )
}

pub fn count_visits_for_patient(store: &mut Store, patient_id: i64) -> Result<i64, DatabaseError> {
    count(
        store,
        "SELECT COUNT(*) FROM visits WHERE patient_id = ?1",
        params![patient_id],
    )
}

pub fn count_active_visits_for_patient(store: &mut Store, patient_id: i64) -> Result<i64, DatabaseError> {
    count(
        store,
        "SELECT COUNT(*) FROM visits WHERE patient_id = ?1 AND status = 'active'",
        params![patient_id],
    )
}

pub fn count_active_visits_for_clinician(
    store: &mut Store,
    clinician_id: i64,
) -> Result<i64, DatabaseError> {
    count(
        store,
        "SELECT COUNT(*) FROM visits WHERE clinician_id = ?1 AND status = 'active'",
        params![clinician_id],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_store;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn visit_with_status(status: Option<&str>) -> NewVisit {
        NewVisit {
            patient_id: 1,
            clinician_id: 1,
            status: status.map(String::from),
            ..NewVisit::default()
        }
    }

    #[test]
    fn insert_applies_defaults() {
        let mut store = test_store();
        let id = insert_visit(
            &mut store,
            &NewVisit {
                diagnosis: Some("Plaque psoriasis".into()),
                ..visit_with_status(None)
            },
        )
        .unwrap();

        let visit = get_visit(&mut store, id).unwrap().unwrap();
        assert_eq!(visit.status.as_deref(), Some(VISIT_STATUS_ACTIVE));
        assert!(visit.is_active());
        assert!(visit.visit_date.is_some());
        assert_eq!(visit.diagnosis.as_deref(), Some("Plaque psoriasis"));
        assert!(visit.notes.is_none());
    }

    #[test]
    fn explicit_date_round_trips() {
        let mut store = test_store();
        let id = insert_visit(
            &mut store,
            &NewVisit {
                visit_date: Some(at(3, 14)),
                ..visit_with_status(Some("closed"))
            },
        )
        .unwrap();
        let visit = get_visit(&mut store, id).unwrap().unwrap();
        assert_eq!(visit.visit_date, Some(at(3, 14)));
        assert!(!visit.is_active());
    }

    #[test]
    fn active_count_ignores_other_statuses() {
        let mut store = test_store();
        for status in [Some("active"), Some("active"), Some("closed")] {
            insert_visit(&mut store, &visit_with_status(status)).unwrap();
        }
        assert_eq!(count_visits_for_patient(&mut store, 1).unwrap(), 3);
        assert_eq!(count_active_visits_for_patient(&mut store, 1).unwrap(), 2);
        assert_eq!(count_active_visits_for_clinician(&mut store, 1).unwrap(), 2);
        assert_eq!(count_active_visits_for_clinician(&mut store, 2).unwrap(), 0);
    }

    #[test]
    fn list_orders_by_date_then_id() {
        let mut store = test_store();
        let old = insert_visit(&mut store, &NewVisit { visit_date: Some(at(1, 9)), ..visit_with_status(None) }).unwrap();
        let new = insert_visit(&mut store, &NewVisit { visit_date: Some(at(20, 9)), ..visit_with_status(None) }).unwrap();
        let tie_a = insert_visit(&mut store, &NewVisit { visit_date: Some(at(10, 9)), ..visit_with_status(None) }).unwrap();
        let tie_b = insert_visit(&mut store, &NewVisit { visit_date: Some(at(10, 9)), ..visit_with_status(None) }).unwrap();

        let ids: Vec<i64> = list_visits_for_patient(&mut store, 1)
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec![new, tie_b, tie_a, old]);
    }

    #[test]
    fn recent_visits_respects_limit() {
        let mut store = test_store();
        for day in 1..=7 {
            insert_visit(&mut store, &NewVisit { visit_date: Some(at(day, 8)), ..visit_with_status(None) }).unwrap();
        }
        let recent = recent_visits_for_patient(&mut store, 1, 5).unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].visit_date, Some(at(7, 8)));
        assert_eq!(recent[4].visit_date, Some(at(3, 8)));

        assert!(recent_visits_for_patient(&mut store, 2, 5).unwrap().is_empty());
    }
}
