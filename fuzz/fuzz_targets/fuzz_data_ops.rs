#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use roomdb::{Data, DataConfig, Record, Schema, SyncMode};

#[derive(Arbitrary, Debug)]
enum DataOp {
    Create { name: String, location: String, owner: String },
    Read { position: u8 },
    Update { position: u8, name: String },
    Delete { position: u8 },
    Find { name: Option<String>, location: Option<String> },
    Book { position: u8, owner: String },
}

fn room(name: &str, location: &str, owner: &str) -> Record {
    Record::room(name, location, "2", "N", "$90.00", "2005/01/01", owner)
}

fuzz_target!(|ops: Vec<DataOp>| {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(_) => return,
    };
    let config = DataConfig::default().with_sync_mode(SyncMode::None);
    let data = match Data::create_database(dir.path().join("fuzz.db"), &Schema::room(), config) {
        Ok(data) => data,
        Err(_) => return,
    };

    // Limit operations to prevent timeout
    for op in ops.iter().take(64) {
        match op {
            DataOp::Create { name, location, owner } => {
                let _ = data.create(room(name, location, owner));
            }
            DataOp::Read { position } => {
                let _ = data.read(*position as u64);
            }
            DataOp::Update { position, name } => {
                let _ = data.update(*position as u64, room(name, "Fuzzville", ""));
            }
            DataOp::Delete { position } => {
                let _ = data.delete(*position as u64);
            }
            DataOp::Find { name, location } => {
                let found = data.find(name.as_deref(), location.as_deref()).unwrap();
                assert!(found.windows(2).all(|w| w[0].0 < w[1].0));
            }
            DataOp::Book { position, owner } => {
                let _ = data.book(*position as u64, owner);
            }
        }
    }

    // Every valid record is found by an unfiltered search
    let count = data.record_count().unwrap();
    assert_eq!(data.find(None, None).unwrap().len() as u64, count);
});
