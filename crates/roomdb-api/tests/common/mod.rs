// Common test utilities for facade integration tests

use roomdb::{Data, DataConfig, Record, Schema};
use std::path::PathBuf;
use tempfile::TempDir;

/// Test fixture that owns a database file in a temporary directory
pub struct DataTestFixture {
    #[allow(dead_code)]
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
}

impl DataTestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("rooms.db");

        Self { temp_dir, db_path }
    }

    /// Create the database with `count` generated rooms at positions `0..count`
    pub fn create_data(&self, count: usize) -> Data {
        self.create_data_with_config(count, DataConfig::default())
    }

    #[allow(dead_code)]
    pub fn create_data_with_config(&self, count: usize, config: DataConfig) -> Data {
        let data = Data::create_database(&self.db_path, &Schema::room(), config)
            .expect("Failed to create database");
        for i in 0..count {
            data.create(room(i)).expect("Failed to create room");
        }
        data
    }

    #[allow(dead_code)]
    pub fn reopen(&self) -> Data {
        Data::open(&self.db_path).expect("Failed to reopen database")
    }
}

impl Default for DataTestFixture {
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

#[allow(dead_code)]
pub fn named_room(name: &str, location: &str) -> Record {
    Record::room(name, location, "2", "Y", "$80.00", "2005/07/27", "")
}
