// Common test utilities for storage integration tests

use roomdb_core::{Record, Schema};
use roomdb_storage::{RecordStore, StoreConfig};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture that creates a database file in a temporary directory
pub struct StoreTestFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
}

impl StoreTestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("rooms.db");

        Self { temp_dir, db_path }
    }

    /// Create the database file with `count` generated rooms
    pub fn create_store(&self, count: usize) -> RecordStore {
        let store = RecordStore::create(&self.db_path, &Schema::room(), &StoreConfig::default())
            .expect("Failed to create store");
        for i in 0..count {
            store.append_slot(&room(i)).expect("Failed to append");
        }
        store
    }
}

impl Default for StoreTestFixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn room(i: usize) -> Record {
    Record::room(
        &format!("Hotel {}", i),
        "Smallville",
        "4",
        "N",
        "$120.00",
        "2005/03/11",
        "",
    )
}
