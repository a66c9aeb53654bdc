//! Record-level access rules.
//!
//! Default-deny, evaluated per request from the session record:
//! 1. Clinician who owns the patient (`patients.clinician_id`) → READ + WRITE
//! 2. Patient user linked to the record (`patients.user_id`) → READ only
//! 3. Anything else → DENY
//!
//! Visits and images inherit the decision of the patient they belong to.

use crate::db::{self, DatabaseError, Store};
use crate::models::{Patient, Role, Visit};
use crate::session::SessionRecord;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Why access was granted or denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    /// Clinician responsible for the patient.
    OwningClinician,
    /// Patient user viewing their own record.
    LinkedPatient,
    /// No rule matched.
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    fn deny() -> Self {
        Self {
            allowed: false,
            reason: AccessReason::Denied,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Access denied")]
    Forbidden,
    #[error("Operation requires the {0} role")]
    WrongRole(Role),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// Checks
// ═══════════════════════════════════════════════════════════

/// Apply the access rules to one patient record.
pub fn decide_patient_access(session: &SessionRecord, patient: &Patient, access: Access) -> AccessDecision {
    match session.role {
        Role::Clinician if patient.clinician_id == session.id => {
            AccessDecision::allow(AccessReason::OwningClinician)
        }
        Role::Patient if access == Access::Read && patient.user_id == Some(session.id) => {
            AccessDecision::allow(AccessReason::LinkedPatient)
        }
        _ => AccessDecision::deny(),
    }
}

/// The signed-in user, if they hold `role`.
pub fn require_role(session: Option<&SessionRecord>, role: Role) -> Result<&SessionRecord, AuthorizationError> {
    let session = session.ok_or(AuthorizationError::NotAuthenticated)?;
    if session.role != role {
        tracing::warn!(user_id = session.id, required = %role, "Role check failed");
        return Err(AuthorizationError::WrongRole(role));
    }
    Ok(session)
}

/// Load a patient and check the session may access it.
///
/// An unknown id surfaces as `Database(NotFound)`.
pub fn check_patient_access(
    store: &mut Store,
    session: Option<&SessionRecord>,
    patient_id: i64,
    access: Access,
) -> Result<Patient, AuthorizationError> {
    let session = session.ok_or(AuthorizationError::NotAuthenticated)?;
    let patient = db::get_patient(store, patient_id)?
        .ok_or_else(|| DatabaseError::not_found("patient", patient_id))?;

    let decision = decide_patient_access(session, &patient, access);
    if !decision.allowed {
        tracing::warn!(user_id = session.id, patient_id, ?access, "Patient access denied");
        return Err(AuthorizationError::Forbidden);
    }
    Ok(patient)
}

/// Load a visit together with its patient, checking access through the patient.
pub fn check_visit_access(
    store: &mut Store,
    session: Option<&SessionRecord>,
    visit_id: i64,
    access: Access,
) -> Result<(Visit, Patient), AuthorizationError> {
    let session = session.ok_or(AuthorizationError::NotAuthenticated)?;
    let visit = db::get_visit(store, visit_id)?.ok_or_else(|| DatabaseError::not_found("visit", visit_id))?;
    let patient = check_patient_access(store, Some(session), visit.patient_id, access)?;
    Ok((visit, patient))
}
