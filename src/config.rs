use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "DermaTrack";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local storage key holding the base64-encoded database snapshot.
pub const SNAPSHOT_KEY: &str = "dermaDB";

/// Local storage key holding the JSON session record.
pub const SESSION_KEY: &str = "dermaUser";

/// PBKDF2 rounds for newly hashed passwords.
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 600_000;

/// Get the application data directory.
/// Falls back to the working directory when the platform reports none.
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Directory backing the device-local key-value slots.
pub fn local_storage_dir() -> PathBuf {
    app_data_dir().join("local_storage")
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "dermatrack_lib=info,warn"
}
