use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Status assigned by the schema default; any other text is a closed/custom state.
pub const VISIT_STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub id: i64,
    pub patient_id: i64,
    pub clinician_id: i64,
    pub visit_date: Option<NaiveDateTime>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub treatment_plan: Option<String>,
    pub status: Option<String>,
}

impl Visit {
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some(VISIT_STATUS_ACTIVE)
    }
}

/// Input for a new visit. `visit_date` and `status` fall back to the
/// schema defaults (`CURRENT_TIMESTAMP`, `'active'`) when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVisit {
    pub patient_id: i64,
    pub clinician_id: i64,
    pub visit_date: Option<NaiveDateTime>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub treatment_plan: Option<String>,
    pub status: Option<String>,
}
