use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Schema default for a new report.
pub const REPORT_STATUS_DRAFT: &str = "draft";
pub const REPORT_STATUS_APPROVED: &str = "approved";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub patient_id: i64,
    pub clinician_id: i64,
    pub report_type: Option<String>,
    pub report_data: Option<String>,
    pub status: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
}

impl Report {
    pub fn is_draft(&self) -> bool {
        self.status.as_deref() == Some(REPORT_STATUS_DRAFT)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewReport {
    pub patient_id: i64,
    pub clinician_id: i64,
    pub report_type: Option<String>,
    pub report_data: Option<String>,
}
