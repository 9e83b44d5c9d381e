//! # roomdb Core
//!
//! Core types shared by every roomdb crate: the error type, records, the
//! file schema, format constants and the [`RoomDatabase`] operation contract.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod error;
pub mod format_version;
pub mod record;
pub mod schema;

pub use database::RoomDatabase;
pub use error::{Error, ErrorKind, Result};
pub use record::Record;
pub use schema::{FieldDef, RoomField, Schema};

/// Zero-based logical index of a slot in the record area.
///
/// Stable for the lifetime of a record: deleting a record leaves a tombstone
/// and never renumbers later slots.
pub type Position = u64;
