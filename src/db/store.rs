//! Persistent store adapter.
//!
//! Owns the in-memory SQLite engine and mirrors it into one local storage
//! slot as a base64 snapshot. Every statement goes through [`Store::query`],
//! [`Store::query_map`] or [`Store::execute`], after which the configured
//! [`SavePolicy`] decides whether the whole database is re-serialized.
//!
//! The store is an owned handle: callers pass it explicitly, and several
//! independent stores can coexist (one per storage backend).

use std::sync::Arc;

use rusqlite::{Connection, Params};
use serde::{Deserialize, Serialize};

use super::row::Row;
use super::{snapshot, sqlite, DatabaseError};
use crate::config;
use crate::storage::LocalStorage;

/// When the store writes its snapshot back to local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePolicy {
    /// Save after every successful statement, reads included.
    #[default]
    Immediate,
    /// Save only after statements that changed at least one row.
    OnChange,
    /// Never save implicitly; call [`Store::save`] or [`Store::flush`].
    /// A store dropped with unsaved changes makes one last attempt.
    Manual,
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub snapshot_key: String,
    pub save_policy: SavePolicy,
    pub enforce_foreign_keys: bool,
    /// PBKDF2 rounds for passwords hashed by this store (seed and upgrades).
    pub password_iterations: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            snapshot_key: config::SNAPSHOT_KEY.to_string(),
            save_policy: SavePolicy::default(),
            enforce_foreign_keys: false,
            password_iterations: config::DEFAULT_PASSWORD_ITERATIONS,
        }
    }
}

pub struct Store {
    storage: Arc<dyn LocalStorage>,
    options: StoreOptions,
    conn: Option<Connection>,
    /// Changes applied to the engine but not yet written to storage.
    dirty: bool,
}

impl Store {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self::with_options(storage, StoreOptions::default())
    }

    pub fn with_options(storage: Arc<dyn LocalStorage>, options: StoreOptions) -> Self {
        Self {
            storage,
            options,
            conn: None,
            dirty: false,
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn storage(&self) -> &Arc<dyn LocalStorage> {
        &self.storage
    }

    pub fn is_initialized(&self) -> bool {
        self.conn.is_some()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Lifecycle ───────────────────────────────────────────

    /// Load the saved snapshot, or create and seed a new database.
    ///
    /// Idempotent: once a connection is held, further calls do nothing.
    pub fn initialize(&mut self) -> Result<(), DatabaseError> {
        if self.conn.is_some() {
            return Ok(());
        }

        let saved = self
            .storage
            .get_item(&self.options.snapshot_key)
            .map_err(|e| init_failed("reading snapshot slot", e))?;

        match saved {
            Some(encoded) => {
                let conn = snapshot::decode(&encoded)
                    .and_then(|bytes| snapshot::import(&bytes))
                    .map_err(|e| init_failed("loading snapshot", e))?;
                sqlite::configure_pragmas(&conn, self.options.enforce_foreign_keys)
                    .map_err(|e| init_failed("configuring engine", e))?;
                self.conn = Some(conn);
                self.dirty = false;
                tracing::info!("Database loaded from local storage");
            }
            None => {
                let conn = self.create_seeded()?;
                self.conn = Some(conn);
                self.dirty = true;
                if let Err(e) = self.save() {
                    self.conn = None;
                    self.dirty = false;
                    return Err(init_failed("saving new database", e));
                }
                tracing::info!("New database created");
            }
        }
        Ok(())
    }

    fn create_seeded(&self) -> Result<Connection, DatabaseError> {
        let conn = Connection::open_in_memory().map_err(|e| init_failed("starting engine", e))?;
        sqlite::configure_pragmas(&conn, self.options.enforce_foreign_keys)
            .and_then(|_| sqlite::apply_schema(&conn))
            .and_then(|_| sqlite::seed_initial_data(&conn, self.options.password_iterations))
            .map_err(|e| init_failed("creating schema", e))?;
        Ok(conn)
    }

    /// Delete the snapshot slot and drop the engine.
    ///
    /// The next [`Store::initialize`] creates a fresh seeded database.
    pub fn clear(&mut self) -> Result<(), DatabaseError> {
        self.storage.remove_item(&self.options.snapshot_key)?;
        self.conn = None;
        self.dirty = false;
        tracing::info!("Database cleared");
        Ok(())
    }

    // ── Statements ──────────────────────────────────────────

    /// Run a statement and return every result row as an ordered field map.
    pub fn query<P: Params>(&mut self, sql: &str, params: P) -> Result<Vec<Row>, DatabaseError> {
        self.run_rows(sql, params, |columns, row| Row::from_sqlite(row, columns))
    }

    /// Run a statement and map every result row with `f`.
    pub fn query_map<T, P, F>(&mut self, sql: &str, params: P, mut f: F) -> Result<Vec<T>, DatabaseError>
    where
        P: Params,
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        self.run_rows(sql, params, |_, row| f(row))
    }

    /// [`Store::query_map`] keeping only the first row.
    pub fn query_first<T, P, F>(&mut self, sql: &str, params: P, f: F) -> Result<Option<T>, DatabaseError>
    where
        P: Params,
        F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        Ok(self.query_map(sql, params, f)?.into_iter().next())
    }

    /// Run a statement without a result set (INSERT/UPDATE/DELETE).
    pub fn execute<P: Params>(&mut self, sql: &str, params: P) -> Result<bool, DatabaseError> {
        let changed = {
            let conn = self.connection()?;
            let before = self.change_counter(conn)?;
            conn.execute(sql, params).map_err(query_failed)?;
            self.change_counter(conn)? != before
        };
        self.after_statement(changed)?;
        Ok(true)
    }

    /// Row id of the most recent successful INSERT on this connection.
    pub fn last_insert_rowid(&self) -> Result<i64, DatabaseError> {
        Ok(self.connection()?.last_insert_rowid())
    }

    fn run_rows<T, P, F>(&mut self, sql: &str, params: P, mut f: F) -> Result<Vec<T>, DatabaseError>
    where
        P: Params,
        F: FnMut(&[String], &rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        let (rows, changed) = {
            let conn = self.connection()?;
            let before = self.change_counter(conn)?;
            let mut stmt = conn.prepare(sql).map_err(query_failed)?;
            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let rows = stmt
                .query_map(params, |row| f(&columns, row))
                .and_then(|mapped| mapped.collect::<Result<Vec<_>, _>>())
                .map_err(query_failed)?;
            drop(stmt);
            (rows, self.change_counter(conn)? != before)
        };
        self.after_statement(changed)?;
        Ok(rows)
    }

    // ── Persistence ─────────────────────────────────────────

    /// Serialize the whole database and overwrite the snapshot slot.
    pub fn save(&mut self) -> Result<(), DatabaseError> {
        let encoded = {
            let conn = self.connection()?;
            let bytes = snapshot::export(conn).map_err(|e| {
                tracing::error!("Error saving database: {e}");
                e
            })?;
            snapshot::encode(&bytes)
        };
        self.storage
            .set_item(&self.options.snapshot_key, &encoded)
            .map_err(|e| {
                tracing::error!("Error saving database: {e}");
                e
            })?;
        self.dirty = false;
        tracing::debug!(encoded_len = encoded.len(), "Database saved to local storage");
        Ok(())
    }

    /// Save only if there are unsaved changes. Returns whether a save happened.
    pub fn flush(&mut self) -> Result<bool, DatabaseError> {
        if !self.dirty || self.conn.is_none() {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    fn after_statement(&mut self, changed: bool) -> Result<(), DatabaseError> {
        if changed {
            self.dirty = true;
        }
        match self.options.save_policy {
            SavePolicy::Immediate => self.save(),
            SavePolicy::OnChange if self.dirty => self.save(),
            SavePolicy::OnChange | SavePolicy::Manual => Ok(()),
        }
    }

    fn connection(&self) -> Result<&Connection, DatabaseError> {
        self.conn.as_ref().ok_or(DatabaseError::NotInitialized)
    }

    /// SQLite's running count of rows changed on this connection.
    /// Only consulted when the policy needs to tell reads from writes.
    fn change_counter(&self, conn: &Connection) -> Result<i64, DatabaseError> {
        if self.options.save_policy == SavePolicy::Immediate {
            return Ok(0);
        }
        Ok(conn.query_row("SELECT total_changes()", [], |row| row.get(0))?)
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if self.options.save_policy == SavePolicy::Manual && self.dirty && self.conn.is_some() {
            if let Err(e) = self.save() {
                tracing::warn!("Unsaved changes lost on close: {e}");
            }
        }
    }
}

fn query_failed(e: rusqlite::Error) -> DatabaseError {
    tracing::error!("Query execution error: {e}");
    DatabaseError::Query(e)
}

fn init_failed(stage: &str, e: impl std::fmt::Display) -> DatabaseError {
    tracing::error!("Database initialization error while {stage}: {e}");
    DatabaseError::Initialization(format!("{stage}: {e}"))
}
