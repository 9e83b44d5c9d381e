//! The operation contract shared by local and remote database handles.

use crate::{Position, Record, Result};

/// Create/read/update/delete/find over room records.
///
/// Implemented by the local facade and by the network client, so callers can
/// be written once against either. Every failure of the contract is returned
/// as an [`Error`](crate::Error); remote implementations add transport
/// failures on top.
pub trait RoomDatabase: Send + Sync {
    /// Stores a new record and returns its position.
    ///
    /// Fails with `DuplicateKey` when a valid record with the same key fields exists.
    fn create(&self, record: Record) -> Result<Position>;

    /// Marks the record at `position` deleted.
    ///
    /// Fails with `RecordNotFound` when the position is empty or already deleted.
    fn delete(&self, position: Position) -> Result<()>;

    /// Replaces the values of the record at `position`.
    fn update(&self, position: Position, record: Record) -> Result<()>;

    /// Returns a copy of the record at `position`.
    fn read(&self, position: Position) -> Result<Record>;

    /// Returns every valid record whose name and location start with the
    /// given prefixes. `None` or an empty prefix matches anything.
    fn find(&self, name: Option<&str>, location: Option<&str>) -> Result<Vec<(Position, Record)>>;

    /// Sets the owner of an unbooked record.
    fn book(&self, position: Position, owner: &str) -> Result<()>;
}

impl<T: RoomDatabase + ?Sized> RoomDatabase for std::sync::Arc<T> {
    fn create(&self, record: Record) -> Result<Position> {
        (**self).create(record)
    }

    fn delete(&self, position: Position) -> Result<()> {
        (**self).delete(position)
    }

    fn update(&self, position: Position, record: Record) -> Result<()> {
        (**self).update(position, record)
    }

    fn read(&self, position: Position) -> Result<Record> {
        (**self).read(position)
    }

    fn find(&self, name: Option<&str>, location: Option<&str>) -> Result<Vec<(Position, Record)>> {
        (**self).find(name, location)
    }

    fn book(&self, position: Position, owner: &str) -> Result<()> {
        (**self).book(position, owner)
    }
}
