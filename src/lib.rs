pub mod analysis;
pub mod authorization;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod session;
pub mod storage;
pub mod visit_capture;

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber, filtered by `RUST_LOG` or the default filter.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();
    if installed {
        tracing::info!("{} v{} starting", config::APP_NAME, config::APP_VERSION);
    }
}
