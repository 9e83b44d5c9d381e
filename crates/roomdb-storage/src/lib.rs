//! # roomdb Storage
//!
//! Fixed-length record file storage for roomdb.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of roomdb.**
//!
//! Users should depend on the main `roomdb` crate instead, which provides the
//! stable public API. This crate's API may change without notice between
//! minor versions.
//!
//! ---
//!
//! - **codec**: file header and slot encoding
//! - **store**: positional slot I/O on a shared file handle
//! - **locks**: exclusive per-position locks with FIFO waiters
//!
//! ## File Layout
//!
//! ```text
//! [header: magic | record length | field count | field descriptors...]
//! [slot 0: flag | fields...] [slot 1: flag | fields...] ...
//! ```

use roomdb_core::format_version::MAGIC_COOKIE;
use serde::{Deserialize, Serialize};

pub mod codec;
pub mod locks;
pub mod store;

pub use locks::{LockCookie, LockManager, PositionGuard};
pub use store::{RecordStore, Slots};

/// Store configuration options
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Sync mode for slot writes
    pub sync_mode: SyncMode,
    /// Magic cookie expected in the file header
    pub magic_cookie: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Sync,
            magic_cookie: MAGIC_COOKIE,
        }
    }
}

/// Sync mode for slot writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Sync file data after every slot write
    Sync,
    /// Leave flushing to the operating system
    None,
}
