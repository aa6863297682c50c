//! Shared helpers for the store integration tests.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use lockbank_core::types::Timestamp;
use lockbank_db::{RetryPolicy, Store, StoreConfig};
use tempfile::TempDir;

/// A store on a fresh database file. Keep the `TempDir` alive for the
/// duration of the test.
pub async fn temp_store() -> (TempDir, Store) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let store = Store::open(&config_for(&dir)).await.expect("open store");
    (dir, store)
}

/// A second, independent handle on the same file, standing in for another
/// process.
pub async fn reopen(dir: &TempDir) -> Store {
    Store::open(&config_for(dir)).await.expect("reopen store")
}

fn config_for(dir: &TempDir) -> StoreConfig {
    let mut config = StoreConfig::new(dir.path().join("lockbank.db"));
    config.retry = RetryPolicy::new(20, 5, 100, 0.5);
    config
}

/// `2025-03-10 09:00:00 UTC` plus `secs`.
pub fn at(secs: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}
