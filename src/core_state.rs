//! Application state shared by every caller.
//!
//! `CoreState` owns the store, the session manager and the analysis engine.
//! Each store operation holds the store mutex for its whole duration, so
//! statements and snapshot saves never interleave. Analysis runs without the
//! store lock.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::analysis::{AnalysisEngine, MockAnalysisEngine};
use crate::authorization::AuthorizationError;
use crate::config;
use crate::dashboard::{self, ClinicianDashboard, PatientDashboard, PatientDetail};
use crate::db::{self, Store, StoreOptions};
use crate::session::{AuthError, SessionManager, SessionRecord};
use crate::storage::{FileStorage, LocalStorage, StorageError};
use crate::visit_capture::{self, AnalyzedCapture, CaptureError, RecordedProgress, SavedVisit, VisitForm};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    store: Mutex<Store>,
    session: RwLock<SessionManager>,
    engine: Arc<dyn AnalysisEngine>,
}

impl CoreState {
    /// Build state over one storage backend. Nothing is loaded until [`CoreState::start`].
    pub fn new(storage: Arc<dyn LocalStorage>, options: StoreOptions, engine: Arc<dyn AnalysisEngine>) -> Self {
        Self {
            store: Mutex::new(Store::with_options(storage.clone(), options)),
            session: RwLock::new(SessionManager::new(storage)),
            engine,
        }
    }

    /// File-backed state in the platform data directory, with the mock engine.
    pub fn open_default() -> Result<Self, CoreError> {
        let storage = FileStorage::open(config::local_storage_dir())?;
        tracing::info!(dir = %storage.dir().display(), "Using local storage");
        let state = Self::new(
            Arc::new(storage),
            StoreOptions::default(),
            Arc::new(MockAnalysisEngine::new()),
        );
        state.start()?;
        Ok(state)
    }

    /// Load or create the store, then pick up a persisted session.
    pub fn start(&self) -> Result<bool, CoreError> {
        self.lock_store()?.initialize()?;
        let restored = self.write_session()?.restore_session()?;
        Ok(restored)
    }

    // ── Lock access ─────────────────────────────────────────

    pub fn lock_store(&self) -> Result<MutexGuard<'_, Store>, CoreError> {
        self.store.lock().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn read_session(&self) -> Result<RwLockReadGuard<'_, SessionManager>, CoreError> {
        self.session.read().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn write_session(&self) -> Result<RwLockWriteGuard<'_, SessionManager>, CoreError> {
        self.session.write().map_err(|_| CoreError::LockPoisoned)
    }

    pub fn engine(&self) -> Arc<dyn AnalysisEngine> {
        self.engine.clone()
    }

    /// Owned copy of the signed-in identity.
    pub fn current_user(&self) -> Result<Option<SessionRecord>, CoreError> {
        Ok(self.read_session()?.current_user().cloned())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_session().map(|s| s.is_authenticated()).unwrap_or(false)
    }

    // ── Session ─────────────────────────────────────────────

    pub fn login(&self, email: &str, password: &str) -> Result<bool, CoreError> {
        let mut session = self.write_session()?;
        let mut store = self.lock_store()?;
        Ok(session.login(&mut store, email, password)?)
    }

    pub fn logout(&self) -> Result<(), CoreError> {
        Ok(self.write_session()?.logout()?)
    }

    // ── Views ───────────────────────────────────────────────

    pub fn clinician_dashboard(&self, search: Option<&str>) -> Result<ClinicianDashboard, CoreError> {
        let user = self.current_user()?;
        let mut store = self.lock_store()?;
        Ok(dashboard::clinician_dashboard(&mut store, user.as_ref(), search)?)
    }

    pub fn patient_detail(&self, patient_id: i64) -> Result<PatientDetail, CoreError> {
        let user = self.current_user()?;
        let mut store = self.lock_store()?;
        Ok(dashboard::patient_detail(&mut store, user.as_ref(), patient_id)?)
    }

    pub fn patient_dashboard(&self) -> Result<PatientDashboard, CoreError> {
        let user = self.current_user()?;
        let mut store = self.lock_store()?;
        Ok(dashboard::patient_dashboard(&mut store, user.as_ref())?)
    }

    // ── Visits and progress ─────────────────────────────────

    pub async fn analyze_capture(
        &self,
        payload: String,
        body_part: Option<String>,
    ) -> Result<AnalyzedCapture, CoreError> {
        Ok(visit_capture::analyze_capture(self.engine(), payload, body_part).await?)
    }

    pub fn save_visit(&self, form: &VisitForm, capture: Option<&AnalyzedCapture>) -> Result<SavedVisit, CoreError> {
        let user = self.current_user()?;
        let mut store = self.lock_store()?;
        Ok(visit_capture::save_visit(&mut store, user.as_ref(), form, capture)?)
    }

    /// Compare two stored images and record the result.
    ///
    /// The store lock is released while the analyzer runs.
    pub async fn compare_progress(
        &self,
        patient_id: i64,
        before_image_id: i64,
        after_image_id: i64,
    ) -> Result<RecordedProgress, CoreError> {
        let user = self.current_user()?;
        let input = {
            let mut store = self.lock_store()?;
            visit_capture::prepare_comparison(
                &mut store,
                user.as_ref(),
                patient_id,
                before_image_id,
                after_image_id,
            )?
        };
        let analysis = visit_capture::run_comparison(self.engine(), &input).await?;
        let mut store = self.lock_store()?;
        Ok(visit_capture::record_progress(&mut store, &input, analysis)?)
    }

    // ── Persistence ─────────────────────────────────────────

    /// Write pending changes (only relevant under a non-immediate save policy).
    pub fn flush(&self) -> Result<bool, CoreError> {
        Ok(self.lock_store()?.flush()?)
    }

    /// Remove the saved database; the next start recreates the seed data.
    pub fn clear_store(&self) -> Result<(), CoreError> {
        Ok(self.lock_store()?.clear()?)
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),
    #[error("Visit error: {0}")]
    Capture(#[from] CaptureError),
}
