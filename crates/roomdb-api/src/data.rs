//! The database facade: record operations over one database file.
//!
//! [`Data`] combines a [`RecordStore`] with a [`LockManager`]. Every
//! operation that touches a single record holds that record's position lock
//! for the whole read-check-write sequence, so two callers can never
//! interleave on one slot. Creation is additionally serialized store-wide so
//! the duplicate-key check and the choice of slot happen atomically.
//!
//! Searches are unlocked snapshot scans; a record being rewritten while a
//! search runs is seen either before or after the write.

use crate::config::DataConfig;
use roomdb_core::{Error, Position, Record, Result, RoomDatabase, RoomField, Schema};
use roomdb_storage::{codec, LockManager, PositionGuard, RecordStore};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// A handle to an open database file.
///
/// `Data` is `Send + Sync`; share it between threads behind an `Arc`.
///
/// # Examples
///
/// ```rust,no_run
/// use roomdb::{Data, Record, RoomDatabase};
///
/// let data = Data::open("rooms.db")?;
///
/// for (position, room) in data.find(Some("Palace"), None)? {
///     println!("{}: {:?}", position, room.fields());
/// }
///
/// data.book(3, "12345678")?;
/// # Ok::<(), roomdb::Error>(())
/// ```
#[derive(Debug)]
pub struct Data {
    store: RecordStore,
    locks: LockManager,
    create_lock: Mutex<()>,
    config: DataConfig,
}

impl Data {
    /// Open an existing database file with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, DataConfig::default())
    }

    /// Open an existing database file.
    ///
    /// Fails with `Error::Format` when the header does not describe a valid
    /// schema or the record area ends in a partial slot, and with
    /// `Error::Config` when the key fields do not fit the schema.
    pub fn open_with_config(path: impl AsRef<Path>, config: DataConfig) -> Result<Self> {
        let store = RecordStore::open(path, &config.store)?;
        Self::from_store(store, config)
    }

    /// Create a new, empty database file with the given schema.
    ///
    /// Fails if the file already exists.
    pub fn create_database(
        path: impl AsRef<Path>,
        schema: &Schema,
        config: DataConfig,
    ) -> Result<Self> {
        config.validate(schema.field_count())?;
        let store = RecordStore::create(path, schema, &config.store)?;
        Self::from_store(store, config)
    }

    fn from_store(store: RecordStore, config: DataConfig) -> Result<Self> {
        config.validate(store.schema().field_count())?;

        Ok(Self {
            store,
            locks: LockManager::new(),
            create_lock: Mutex::new(()),
            config,
        })
    }

    /// Store `record` and return its position.
    ///
    /// Reuses the lowest deleted slot, or appends when there is none.
    pub fn create(&self, record: Record) -> Result<Position> {
        self.check_fits(&record)?;

        let _creating = self.create_lock.lock().map_err(|_| Error::LockPoisoned)?;

        // Stored values come back without their padding
        let key: Vec<&str> = record
            .key(&self.config.key_fields)
            .into_iter()
            .map(|v| v.trim_end_matches(' '))
            .collect();
        for slot in self.store.slots() {
            let (position, valid, existing) = slot?;
            if valid && existing.key(&self.config.key_fields) == key {
                let key = key.join("/");
                warn!(position, %key, "Rejected duplicate record");
                return Err(Error::DuplicateKey { key });
            }
        }

        let position = match self.store.deleted_positions().next().transpose()? {
            Some(position) => {
                let _guard = self.lock(position)?;
                self.store.write_slot(position, &record, true)?;
                position
            }
            None => {
                // Creates are serialized, so the end of the file cannot move
                let _guard = self.lock(self.store.slot_count())?;
                self.store.append_slot(&record)?
            }
        };

        info!(position, "Created record");
        Ok(position)
    }

    /// Mark the record at `position` deleted.
    pub fn delete(&self, position: Position) -> Result<()> {
        self.check_range(position)?;
        let _guard = self.lock(position)?;

        self.ensure_valid(position)?;
        self.store.delete_slot(position).map_err(not_found)?;

        info!(position, "Deleted record");
        Ok(())
    }

    /// Replace the values of the record at `position`.
    ///
    /// Key fields may change; the new key is not checked for duplicates.
    pub fn update(&self, position: Position, record: Record) -> Result<()> {
        self.check_fits(&record)?;
        self.check_range(position)?;
        let _guard = self.lock(position)?;

        self.ensure_valid(position)?;
        self.store
            .write_slot(position, &record, true)
            .map_err(not_found)?;

        debug!(position, "Updated record");
        Ok(())
    }

    /// Return a copy of the record at `position`.
    pub fn read(&self, position: Position) -> Result<Record> {
        self.check_range(position)?;
        let _guard = self.lock(position)?;

        match self.store.read_slot(position).map_err(not_found)? {
            (true, record) => Ok(record),
            (false, _) => Err(Error::RecordNotFound { position }),
        }
    }

    /// Valid records whose name and location start with the given prefixes.
    pub fn find(
        &self,
        name: Option<&str>,
        location: Option<&str>,
    ) -> Result<Vec<(Position, Record)>> {
        let mut criteria = vec![None; self.store.schema().field_count()];
        criteria[self.field_index(RoomField::Name)?] = name;
        criteria[self.field_index(RoomField::Location)?] = location;
        self.find_by(&criteria)
    }

    /// Valid records matching per-field prefix criteria.
    ///
    /// `criteria[i]` applies to field `i`; `None` or an empty string matches
    /// anything, and fields beyond the end of `criteria` are unconstrained.
    /// Matching is case-sensitive. Results are in ascending position order.
    pub fn find_by(&self, criteria: &[Option<&str>]) -> Result<Vec<(Position, Record)>> {
        let field_count = self.store.schema().field_count();
        if criteria.len() > field_count {
            return Err(Error::Validation(format!(
                "{} criteria given for {} fields",
                criteria.len(),
                field_count
            )));
        }

        let mut matches = Vec::new();
        for slot in self.store.slots() {
            let (position, valid, record) = slot?;
            if valid && record.matches_criteria(criteria) {
                matches.push((position, record));
            }
        }

        debug!(?criteria, found = matches.len(), "Searched records");
        Ok(matches)
    }

    /// Set the owner of the record at `position`.
    ///
    /// Fails with `Error::AlreadyBooked` when an owner is already recorded.
    pub fn book(&self, position: Position, owner: &str) -> Result<()> {
        if owner.trim().is_empty() {
            return Err(Error::Validation("owner must not be blank".to_string()));
        }

        let owner_index = self.field_index(RoomField::Owner)?;

        self.check_range(position)?;
        let _guard = self.lock(position)?;

        let mut record = match self.store.read_slot(position).map_err(not_found)? {
            (true, record) => record,
            (false, _) => return Err(Error::RecordNotFound { position }),
        };

        if record.field(owner_index).map_or(false, |v| !v.trim().is_empty()) {
            warn!(position, "Rejected booking of booked record");
            return Err(Error::AlreadyBooked { position });
        }

        record.set(owner_index, owner);
        self.check_fits(&record)?;
        self.store.write_slot(position, &record, true)?;

        info!(position, "Booked record");
        Ok(())
    }

    /// Number of valid records
    pub fn record_count(&self) -> Result<u64> {
        let mut count = 0;
        for position in self.store.occupied_positions() {
            position?;
            count += 1;
        }
        Ok(count)
    }

    /// Schema of the open file
    pub fn schema(&self) -> &Schema {
        self.store.schema()
    }

    /// Path of the open file
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Flush written records to the storage medium
    pub fn sync(&self) -> Result<()> {
        self.store.sync()
    }

    /// Options this handle was opened with
    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    fn lock(&self, position: Position) -> Result<PositionGuard<'_>> {
        self.locks.acquire(position, self.config.lock_timeout)
    }

    /// Column of a room field in this file's header
    fn field_index(&self, field: RoomField) -> Result<usize> {
        self.store
            .schema()
            .field_index(field.name())
            .ok_or_else(|| Error::Validation(format!("schema has no {} field", field.name())))
    }

    fn check_fits(&self, record: &Record) -> Result<()> {
        codec::encode_slot(record, self.store.schema(), true).map(|_| ())
    }

    fn check_range(&self, position: Position) -> Result<()> {
        if position >= self.store.slot_count() {
            return Err(Error::RecordNotFound { position });
        }
        Ok(())
    }

    fn ensure_valid(&self, position: Position) -> Result<()> {
        if self.store.read_flag(position).map_err(not_found)? {
            Ok(())
        } else {
            Err(Error::RecordNotFound { position })
        }
    }
}

fn not_found(err: Error) -> Error {
    match err {
        Error::OutOfRange { position } => Error::RecordNotFound { position },
        other => other,
    }
}

impl RoomDatabase for Data {
    fn create(&self, record: Record) -> Result<Position> {
        Data::create(self, record)
    }

    fn delete(&self, position: Position) -> Result<()> {
        Data::delete(self, position)
    }

    fn update(&self, position: Position, record: Record) -> Result<()> {
        Data::update(self, position, record)
    }

    fn read(&self, position: Position) -> Result<Record> {
        Data::read(self, position)
    }

    fn find(&self, name: Option<&str>, location: Option<&str>) -> Result<Vec<(Position, Record)>> {
        Data::find(self, name, location)
    }

    fn book(&self, position: Position, owner: &str) -> Result<()> {
        Data::book(self, position, owner)
    }
}
