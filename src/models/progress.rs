use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Metric type recorded by the before/after image comparison.
pub const METRIC_AFFECTED_AREA: &str = "affected_area";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressMetric {
    pub id: i64,
    pub patient_id: i64,
    pub visit_id: i64,
    pub metric_type: Option<String>,
    pub metric_value: Option<f64>,
    /// JSON comparison payload.
    pub comparison_data: Option<String>,
    pub recorded_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProgressMetric {
    pub patient_id: i64,
    pub visit_id: i64,
    pub metric_type: Option<String>,
    pub metric_value: Option<f64>,
    pub comparison_data: Option<String>,
}
