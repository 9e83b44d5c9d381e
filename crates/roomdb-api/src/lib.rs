//! # roomdb
//!
//! A record store for hotel room bookings, kept in a single fixed-length
//! binary file, with per-record locking for concurrent clients and a TCP
//! service for remote access.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use roomdb::{Data, Record, RoomDatabase};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let data = Data::open("rooms.db")?;
//!
//!     // Add a room
//!     let position = data.create(Record::room(
//!         "Grand Palace", "Smallville", "4", "N", "$150.00", "2005/07/27", "",
//!     ))?;
//!
//!     // Search by name and location prefix
//!     for (position, room) in data.find(Some("Grand"), Some("Small"))? {
//!         println!("{}: {}", position, room.fields().join(" | "));
//!     }
//!
//!     // Book it for a customer
//!     data.book(position, "12345678")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Remote Access
//!
//! ```rust,no_run
//! use roomdb::{Data, RemoteClient, RemoteServer, RoomDatabase};
//! use std::sync::Arc;
//!
//! let data = Arc::new(Data::open("rooms.db")?);
//! let server = RemoteServer::bind("127.0.0.1:1099", data)?.spawn()?;
//!
//! let client = RemoteClient::connect(server.local_addr())?;
//! let rooms = client.find(None, None)?;
//! # Ok::<(), roomdb::Error>(())
//! ```
//!
//! ## File Format
//!
//! A header (magic cookie, record length, field names and widths, all
//! big-endian) followed by fixed-size slots. Each slot is one flag byte
//! (`0x00` valid, anything else deleted) and the space-padded fields.

pub mod config;
pub mod data;
pub mod logging;

// Core types
pub use roomdb_core::{
    Error, ErrorKind, FieldDef, Position, Record, Result, RoomDatabase, RoomField, Schema,
};

// Storage components
pub use roomdb_storage::{LockCookie, LockManager, RecordStore, StoreConfig, SyncMode};

// Remote components
pub use roomdb_remote::{RemoteClient, RemoteConfig, RemoteServer, ServerHandle};

pub use config::{DataConfig, ServerConfig};
pub use data::Data;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
