//! Shared fixtures for store-backed tests.

use std::sync::Arc;

use super::store::{SavePolicy, Store, StoreOptions};
use crate::storage::{LocalStorage, MemoryStorage};

/// Cheap hashing so seeding stays fast in unoptimized test builds.
pub const TEST_PASSWORD_ITERATIONS: u32 = 1_000;

pub fn test_options(save_policy: SavePolicy) -> StoreOptions {
    StoreOptions {
        save_policy,
        password_iterations: TEST_PASSWORD_ITERATIONS,
        ..StoreOptions::default()
    }
}

/// An initialized, seeded store over fresh in-memory storage.
pub fn test_store() -> Store {
    let storage: Arc<dyn LocalStorage> = Arc::new(MemoryStorage::new());
    let mut store = Store::with_options(storage, test_options(SavePolicy::OnChange));
    store.initialize().unwrap();
    store
}
