// Common test utilities for remote integration tests

use roomdb_core::{Error, Position, Record, Result, RoomDatabase, RoomField};
use roomdb_remote::{RemoteClient, RemoteServer, ServerHandle};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Minimal in-memory database used as the server side of the tests
#[derive(Default)]
pub struct MemoryDatabase {
    slots: Mutex<Vec<Option<Record>>>,
}

impl MemoryDatabase {
    pub fn with_rooms(count: usize) -> Self {
        let db = Self::default();
        for i in 0..count {
            db.create(room(i)).expect("Failed to seed room");
        }
        db
    }
}

impl RoomDatabase for MemoryDatabase {
    fn create(&self, record: Record) -> Result<Position> {
        let mut slots = self.slots.lock().map_err(|_| Error::LockPoisoned)?;
        let key = record.key(&[0, 1]).join("/");
        if slots
            .iter()
            .flatten()
            .any(|existing| existing.key(&[0, 1]).join("/") == key)
        {
            return Err(Error::DuplicateKey { key });
        }
        slots.push(Some(record));
        Ok((slots.len() - 1) as Position)
    }

    fn delete(&self, position: Position) -> Result<()> {
        let mut slots = self.slots.lock().map_err(|_| Error::LockPoisoned)?;
        match slots.get_mut(position as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(Error::RecordNotFound { position }),
        }
    }

    fn update(&self, position: Position, record: Record) -> Result<()> {
        let mut slots = self.slots.lock().map_err(|_| Error::LockPoisoned)?;
        match slots.get_mut(position as usize) {
            Some(Some(existing)) => {
                *existing = record;
                Ok(())
            }
            _ => Err(Error::RecordNotFound { position }),
        }
    }

    fn read(&self, position: Position) -> Result<Record> {
        let slots = self.slots.lock().map_err(|_| Error::LockPoisoned)?;
        slots
            .get(position as usize)
            .cloned()
            .flatten()
            .ok_or(Error::RecordNotFound { position })
    }

    fn find(&self, name: Option<&str>, location: Option<&str>) -> Result<Vec<(Position, Record)>> {
        let slots = self.slots.lock().map_err(|_| Error::LockPoisoned)?;
        Ok(slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|r| (i as Position, r)))
            .filter(|(_, r)| r.matches_criteria(&[name, location]))
            .map(|(i, r)| (i, r.clone()))
            .collect())
    }

    fn book(&self, position: Position, owner: &str) -> Result<()> {
        let mut slots = self.slots.lock().map_err(|_| Error::LockPoisoned)?;
        match slots.get_mut(position as usize) {
            Some(Some(record)) if record.is_booked() => Err(Error::AlreadyBooked { position }),
            Some(Some(record)) => {
                record.set(RoomField::Owner.index(), owner);
                Ok(())
            }
            _ => Err(Error::RecordNotFound { position }),
        }
    }
}

/// A [`MemoryDatabase`] whose reads of one position answer late
#[allow(dead_code)]
pub struct SlowDatabase {
    pub inner: MemoryDatabase,
    pub slow_position: Position,
    pub delay: Duration,
}

impl RoomDatabase for SlowDatabase {
    fn create(&self, record: Record) -> Result<Position> {
        self.inner.create(record)
    }

    fn delete(&self, position: Position) -> Result<()> {
        self.inner.delete(position)
    }

    fn update(&self, position: Position, record: Record) -> Result<()> {
        self.inner.update(position, record)
    }

    fn read(&self, position: Position) -> Result<Record> {
        if position == self.slow_position {
            thread::sleep(self.delay);
        }
        self.inner.read(position)
    }

    fn find(&self, name: Option<&str>, location: Option<&str>) -> Result<Vec<(Position, Record)>> {
        self.inner.find(name, location)
    }

    fn book(&self, position: Position, owner: &str) -> Result<()> {
        self.inner.book(position, owner)
    }
}

/// A running server over a [`MemoryDatabase`] plus a connected client
pub struct RemoteTestFixture {
    pub db: Arc<MemoryDatabase>,
    pub handle: ServerHandle,
}

impl RemoteTestFixture {
    pub fn new(rooms: usize) -> Self {
        let db = Arc::new(MemoryDatabase::with_rooms(rooms));
        let handle = RemoteServer::bind("127.0.0.1:0", Arc::clone(&db))
            .expect("Failed to bind server")
            .spawn()
            .expect("Failed to start server");

        Self { db, handle }
    }

    pub fn client(&self) -> RemoteClient {
        RemoteClient::connect(self.handle.local_addr()).expect("Failed to connect")
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
