//! Dashboard and detail views for both roles.
//!
//! Each view checks the session first, then reads through the repository
//! layer. Counts come from dedicated COUNT statements, not from list lengths.

use serde::{Deserialize, Serialize};

use crate::authorization::{check_patient_access, require_role, Access, AuthorizationError};
use crate::db::{self, Store};
use crate::models::{Patient, Role, Visit};
use crate::session::SessionRecord;

/// Visits shown on the patient dashboard.
pub const RECENT_VISIT_LIMIT: u32 = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicianStats {
    pub total_patients: i64,
    pub active_visits: i64,
    pub pending_reports: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicianDashboard {
    /// Newest first, narrowed by the search term when one was given.
    pub patients: Vec<Patient>,
    /// Totals for the clinician, independent of the search term.
    pub stats: ClinicianStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDetail {
    pub patient: Patient,
    /// Newest first.
    pub visits: Vec<Visit>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientStats {
    pub total_visits: i64,
    pub active_visits: i64,
    pub reports: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientDashboard {
    /// `None` when no patient record is linked to the signed-in user.
    pub patient: Option<Patient>,
    pub recent_visits: Vec<Visit>,
    pub stats: PatientStats,
}

// ---------------------------------------------------------------------------
// Clinician views
// ---------------------------------------------------------------------------

pub fn clinician_stats(store: &mut Store, clinician_id: i64) -> Result<ClinicianStats, db::DatabaseError> {
    Ok(ClinicianStats {
        total_patients: db::count_patients_for_clinician(store, clinician_id)?,
        active_visits: db::count_active_visits_for_clinician(store, clinician_id)?,
        pending_reports: db::count_draft_reports_for_clinician(store, clinician_id)?,
    })
}

/// Patient list and totals for the signed-in clinician.
///
/// A blank search term lists every patient.
pub fn clinician_dashboard(
    store: &mut Store,
    session: Option<&SessionRecord>,
    search: Option<&str>,
) -> Result<ClinicianDashboard, AuthorizationError> {
    let clinician = require_role(session, Role::Clinician)?;

    let patients = match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => db::search_patients_for_clinician(store, clinician.id, term)?,
        None => db::list_patients_for_clinician(store, clinician.id)?,
    };
    let stats = clinician_stats(store, clinician.id)?;

    tracing::debug!(user_id = clinician.id, shown = patients.len(), "Clinician dashboard loaded");
    Ok(ClinicianDashboard { patients, stats })
}

/// One patient with their visit history.
///
/// Owning clinicians and the linked patient user may view it.
pub fn patient_detail(
    store: &mut Store,
    session: Option<&SessionRecord>,
    patient_id: i64,
) -> Result<PatientDetail, AuthorizationError> {
    let patient = check_patient_access(store, session, patient_id, Access::Read)?;
    let visits = db::list_visits_for_patient(store, patient.id)?;
    Ok(PatientDetail { patient, visits })
}

// ---------------------------------------------------------------------------
// Patient views
// ---------------------------------------------------------------------------

pub fn patient_stats(store: &mut Store, patient_id: i64) -> Result<PatientStats, db::DatabaseError> {
    Ok(PatientStats {
        total_visits: db::count_visits_for_patient(store, patient_id)?,
        active_visits: db::count_active_visits_for_patient(store, patient_id)?,
        reports: db::count_reports_for_patient(store, patient_id)?,
    })
}

/// Linked profile, latest visits and totals for the signed-in patient.
pub fn patient_dashboard(
    store: &mut Store,
    session: Option<&SessionRecord>,
) -> Result<PatientDashboard, AuthorizationError> {
    let user = require_role(session, Role::Patient)?;

    let Some(patient) = db::get_patient_by_user(store, user.id)? else {
        tracing::info!(user_id = user.id, "No patient record linked to user");
        return Ok(PatientDashboard::default());
    };

    let recent_visits = db::recent_visits_for_patient(store, patient.id, RECENT_VISIT_LIMIT)?;
    let stats = patient_stats(store, patient.id)?;
    Ok(PatientDashboard {
        patient: Some(patient),
        recent_visits,
        stats,
    })
}
