//! Authentication state for the single local user.
//!
//! The signed-in identity `{id, email, role}` lives in memory and is mirrored
//! as JSON into one local storage slot, so a restart can pick it back up with
//! [`SessionManager::restore_session`] without asking for the password again.
//! A restored session is trusted as-is; it is not re-checked against the store.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::crypto::{self, CryptoError, Verification};
use crate::db::{self, DatabaseError, Store};
use crate::models::{Role, User};
use crate::storage::{LocalStorage, StorageError};

/// The identity persisted in the session slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl From<&User> for SessionRecord {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Session storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Session record is unreadable: {0}")]
    SessionParse(#[from] serde_json::Error),
    #[error("Credential error: {0}")]
    Crypto(#[from] CryptoError),
}

pub struct SessionManager {
    storage: Arc<dyn LocalStorage>,
    key: String,
    current: Option<SessionRecord>,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self::with_key(storage, config::SESSION_KEY)
    }

    pub fn with_key(storage: Arc<dyn LocalStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            current: None,
        }
    }

    /// Check credentials against the store and start a session.
    ///
    /// Returns `Ok(false)` for an unknown account or a wrong password; the
    /// current session, if any, is left untouched in that case. A row still
    /// holding a plaintext password is rehashed on success.
    pub fn login(&mut self, store: &mut Store, email: &str, password: &str) -> Result<bool, AuthError> {
        let Some(creds) = db::find_credentials_by_email(store, email)? else {
            tracing::info!("Login rejected: no such account");
            return Ok(false);
        };

        match crypto::verify_password(password, &creds.stored_password)? {
            Verification::Mismatch => {
                tracing::info!(user_id = creds.user.id, "Login rejected: bad credentials");
                return Ok(false);
            }
            Verification::LegacyMatch => {
                let upgraded = crypto::hash_password(password, store.options().password_iterations);
                match db::update_user_password_hash(store, creds.user.id, &upgraded) {
                    Ok(()) => tracing::info!(user_id = creds.user.id, "Upgraded legacy credential"),
                    Err(e) => tracing::warn!(user_id = creds.user.id, "Legacy credential upgrade failed: {e}"),
                }
            }
            Verification::Match => {}
        }

        let record = SessionRecord::from(&creds.user);
        self.storage.set_item(&self.key, &serde_json::to_string(&record)?)?;
        tracing::info!(user_id = record.id, role = %record.role, "Session started");
        self.current = Some(record);
        Ok(true)
    }

    /// End the session in memory and remove the persisted record.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        if let Some(record) = self.current.take() {
            tracing::info!(user_id = record.id, "Session ended");
        }
        self.storage.remove_item(&self.key)?;
        Ok(())
    }

    /// Pick up a session persisted by an earlier run.
    ///
    /// A slot that cannot be read or no longer parses is discarded and the
    /// manager stays signed out. Returns whether a session is now active
    /// from the slot.
    pub fn restore_session(&mut self) -> Result<bool, AuthError> {
        match self.read_stored_session() {
            Ok(Some(record)) => {
                tracing::info!(user_id = record.id, "Session restored");
                self.current = Some(record);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e @ (AuthError::SessionParse(_) | AuthError::Storage(_))) => {
                tracing::warn!("Discarding unreadable session record: {e}");
                self.current = None;
                if let Err(e) = self.storage.remove_item(&self.key) {
                    tracing::warn!("Could not remove unreadable session record: {e}");
                }
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// The record currently in the session slot, without adopting it.
    pub fn read_stored_session(&self) -> Result<Option<SessionRecord>, AuthError> {
        match self.storage.get_item(&self.key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn current_user(&self) -> Option<&SessionRecord> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.current.as_ref().is_some_and(|r| r.role == role)
    }

    pub fn is_clinician(&self) -> bool {
        self.has_role(Role::Clinician)
    }

    pub fn is_patient(&self) -> bool {
        self.has_role(Role::Patient)
    }
}
