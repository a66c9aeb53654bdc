use rusqlite::params;

use super::parse_timestamp;
use crate::db::{DatabaseError, Store};
use crate::models::*;

pub fn insert_progress_metric(store: &mut Store, metric: &NewProgressMetric) -> Result<i64, DatabaseError> {
    store.execute(
        "INSERT INTO progress_metrics (patient_id, visit_id, metric_type, metric_value, comparison_data)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            metric.patient_id,
            metric.visit_id,
            metric.metric_type,
            metric.metric_value,
            metric.comparison_data,
        ],
    )?;
    store.last_insert_rowid()
}

/// Recorded metrics of a patient, oldest first.
pub fn list_progress_for_patient(
    store: &mut Store,
    patient_id: i64,
) -> Result<Vec<ProgressMetric>, DatabaseError> {
    store.query_map(
        "SELECT id, patient_id, visit_id, metric_type, metric_value, comparison_data, recorded_at
         FROM progress_metrics WHERE patient_id = ?1
         ORDER BY recorded_at, id",
        params![patient_id],
        |row| {
            Ok(ProgressMetric {
                id: row.get(0)?,
                patient_id: row.get(1)?,
                visit_id: row.get(2)?,
                metric_type: row.get(3)?,
                metric_value: row.get(4)?,
                comparison_data: row.get(5)?,
                recorded_at: row.get::<_, Option<String>>(6)?.as_deref().and_then(parse_timestamp),
            })
        },
    )
}
