//! Record Store - slot-level access to a database file
//!
//! The store owns the open file handle and maps record positions to byte
//! offsets (`header_length + position * slot_size`). It reads and writes
//! whole slots with positional I/O so the handle can be shared between
//! threads without a cursor. It does not serialize callers: a writer must
//! hold the position's lock before calling [`RecordStore::write_slot`], and
//! appends must be serialized by the caller.

use crate::codec;
use crate::{StoreConfig, SyncMode};
use roomdb_core::format_version::{DELETED_FLAG, VALID_FLAG};
use roomdb_core::{Error, Position, Record, Result, Schema};
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Slot-level access to one database file.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    file: File,
    schema: Schema,
    header_length: u64,
    slot_size: u64,
    slot_count: AtomicU64,
    sync_mode: SyncMode,
}

impl RecordStore {
    /// Open an existing database file, reading its header.
    pub fn open(path: impl AsRef<Path>, config: &StoreConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let schema = {
            let mut reader = BufReader::new(&file);
            codec::read_header(&mut reader, config.magic_cookie)?
        };

        let header_length = codec::header_length(&schema) as u64;
        let slot_size = codec::slot_size(&schema) as u64;

        let file_len = file.metadata()?.len();
        let area = file_len.saturating_sub(header_length);
        if area % slot_size != 0 {
            return Err(Error::Format(format!(
                "{}: record area of {} bytes ends with a partial slot of {} bytes",
                path.display(),
                area,
                area % slot_size
            )));
        }
        let slot_count = area / slot_size;

        info!(
            path = %path.display(),
            fields = schema.field_count(),
            slot_size,
            slot_count,
            "Opened record store"
        );

        Ok(Self {
            path,
            file,
            schema,
            header_length,
            slot_size,
            slot_count: AtomicU64::new(slot_count),
            sync_mode: config.sync_mode,
        })
    }

    /// Create a new database file holding only a header, then open it.
    ///
    /// Fails if the file already exists.
    pub fn create(path: impl AsRef<Path>, schema: &Schema, config: &StoreConfig) -> Result<Self> {
        let path = path.as_ref();
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)?;
            codec::write_header(&mut file, schema)?;
            file.sync_all()?;
        }

        info!(path = %path.display(), "Created database file");

        Self::open(path, config)
    }

    /// Read the slot at `position`.
    ///
    /// Returns the validity flag and the decoded record.
    pub fn read_slot(&self, position: Position) -> Result<(bool, Record)> {
        self.check_range(position)?;

        let mut buf = vec![0u8; self.slot_size as usize];
        read_at(&self.file, &mut buf, self.offset(position))?;

        debug!(position, "Read slot");
        codec::decode_slot(&buf, &self.schema)
    }

    /// Read only the validity flag of the slot at `position`.
    pub fn read_flag(&self, position: Position) -> Result<bool> {
        self.check_range(position)?;

        let mut flag = [0u8; 1];
        read_at(&self.file, &mut flag, self.offset(position))?;
        Ok(flag[0] == VALID_FLAG)
    }

    /// Overwrite the slot at `position`.
    ///
    /// The record is fully encoded before anything is written, so a
    /// validation failure leaves the file untouched.
    pub fn write_slot(&self, position: Position, record: &Record, valid: bool) -> Result<()> {
        self.check_range(position)?;

        let slot = codec::encode_slot(record, &self.schema, valid)?;
        self.write_bytes(position, &slot)?;

        debug!(position, valid, "Wrote slot");
        Ok(())
    }

    /// Mark the slot at `position` deleted, leaving its field bytes in place.
    pub fn delete_slot(&self, position: Position) -> Result<()> {
        self.check_range(position)?;
        self.write_bytes(position, &[DELETED_FLAG])?;

        debug!(position, "Tombstoned slot");
        Ok(())
    }

    /// Write a new valid slot at the end of the record area.
    pub fn append_slot(&self, record: &Record) -> Result<Position> {
        let slot = codec::encode_slot(record, &self.schema, true)?;

        let position = self.slot_count.load(Ordering::Acquire);
        self.write_bytes(position, &slot)?;
        self.slot_count.store(position + 1, Ordering::Release);

        debug!(position, "Appended slot");
        Ok(position)
    }

    /// Positions of tombstoned slots, ascending, read lazily.
    pub fn deleted_positions(&self) -> impl Iterator<Item = Result<Position>> + '_ {
        self.positions_where(false)
    }

    /// Positions of valid slots, ascending, read lazily.
    pub fn occupied_positions(&self) -> impl Iterator<Item = Result<Position>> + '_ {
        self.positions_where(true)
    }

    /// Every slot up to the current end, read lazily.
    ///
    /// The end is fixed when the iterator is created; slots appended later
    /// are not visited.
    pub fn slots(&self) -> Slots<'_> {
        Slots {
            store: self,
            next: 0,
            end: self.slot_count(),
        }
    }

    /// Flush file contents to the storage medium.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Number of slots in the record area, valid or deleted
    pub fn slot_count(&self) -> u64 {
        self.slot_count.load(Ordering::Acquire)
    }

    /// Schema read from the header
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Byte offset of the first slot
    pub fn header_length(&self) -> u64 {
        self.header_length
    }

    /// Bytes per slot including the flag byte
    pub fn slot_size(&self) -> u64 {
        self.slot_size
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn offset(&self, position: Position) -> u64 {
        self.header_length + position * self.slot_size
    }

    fn check_range(&self, position: Position) -> Result<()> {
        if position >= self.slot_count() {
            return Err(Error::OutOfRange { position });
        }
        Ok(())
    }

    fn write_bytes(&self, position: Position, bytes: &[u8]) -> Result<()> {
        write_at(&self.file, bytes, self.offset(position))?;
        if self.sync_mode == SyncMode::Sync {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn positions_where(&self, valid: bool) -> impl Iterator<Item = Result<Position>> + '_ {
        let end = self.slot_count();
        (0..end).filter_map(move |position| match self.read_flag(position) {
            Ok(flag) if flag == valid => Some(Ok(position)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    }
}

/// Lazy iterator over `(position, valid, record)` for every slot.
pub struct Slots<'a> {
    store: &'a RecordStore,
    next: Position,
    end: Position,
}

impl Iterator for Slots<'_> {
    type Item = Result<(Position, bool, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }

        let position = self.next;
        self.next += 1;

        Some(
            self.store
                .read_slot(position)
                .map(|(valid, record)| (position, valid, record)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next) as usize;
        (remaining, Some(remaining))
    }
}

#[cfg(unix)]
fn read_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
fn write_at(file: &File, buf: &[u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn read_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset)? {
            0 => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            n => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
        }
    }
    Ok(())
}

#[cfg(windows)]
fn write_at(file: &File, mut buf: &[u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_write(buf, offset)? {
            0 => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ))
            }
            n => {
                buf = &buf[n..];
                offset += n as u64;
            }
        }
    }
    Ok(())
}
