//! Configuration for the database facade and the server.
//!
//! [`DataConfig`] tunes an open [`Data`](crate::Data) handle. [`ServerConfig`]
//! is what the `roomdb-server` binary reads from its YAML file:
//!
//! ```yaml
//! database_path: /srv/roomdb/rooms.db
//! host: 0.0.0.0
//! port: 1099
//! lock_timeout_ms: 5000
//! log_level: info
//! sync_mode: sync
//! ```

use roomdb_core::format_version::DATABASE_FILE_EXTENSION;
use roomdb_core::{Error, Result, RoomField};
use roomdb_storage::{StoreConfig, SyncMode};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default TCP port of the server
pub const DEFAULT_PORT: u16 = 1099;

/// Options for an open [`Data`](crate::Data) handle
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Field indices that together identify a record for duplicate detection
    pub key_fields: Vec<usize>,
    /// How long to wait for a position lock; `None` waits forever
    pub lock_timeout: Option<Duration>,
    /// Store-level options
    pub store: StoreConfig,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            key_fields: vec![RoomField::Name.index(), RoomField::Location.index()],
            lock_timeout: None,
            store: StoreConfig::default(),
        }
    }
}

impl DataConfig {
    /// Use a different set of key fields
    pub fn with_key_fields(mut self, key_fields: Vec<usize>) -> Self {
        self.key_fields = key_fields;
        self
    }

    /// Give up on a position lock after `timeout`
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Set the sync mode for slot writes
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.store.sync_mode = sync_mode;
        self
    }

    /// Expect a different magic cookie in the file header
    pub fn with_magic_cookie(mut self, magic_cookie: u32) -> Self {
        self.store.magic_cookie = magic_cookie;
        self
    }

    /// Check the key fields against a schema of `field_count` fields
    pub(crate) fn validate(&self, field_count: usize) -> Result<()> {
        if self.key_fields.is_empty() {
            return Err(Error::Config("at least one key field is required".to_string()));
        }

        if let Some(&index) = self.key_fields.iter().find(|&&i| i >= field_count) {
            return Err(Error::Config(format!(
                "key field {} is outside the schema's {} fields",
                index, field_count
            )));
        }

        Ok(())
    }
}

/// Settings of the `roomdb-server` binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Database file to serve
    pub database_path: PathBuf,
    /// Interface to listen on
    pub host: String,
    /// TCP port to listen on
    pub port: u16,
    /// Position lock timeout in milliseconds; absent waits forever
    pub lock_timeout_ms: Option<u64>,
    /// Drop idle client connections after this many milliseconds
    pub read_timeout_ms: Option<u64>,
    /// Log filter directive, e.g. `info` or `roomdb_storage=debug`
    pub log_level: String,
    /// Rolling log file; absent logs to stdout only
    pub log_file: Option<PathBuf>,
    /// Sync mode for slot writes
    pub sync_mode: SyncMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("rooms.db"),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            lock_timeout_ms: None,
            read_timeout_ms: None,
            log_level: "info".to_string(),
            log_file: None,
            sync_mode: SyncMode::Sync,
        }
    }
}

impl ServerConfig {
    /// Parse a configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("invalid YAML: {}", e)))
    }

    /// Render the configuration as YAML text
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("failed to render YAML: {}", e)))
    }

    /// Read a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml)
    }

    /// Write the configuration to a file, replacing any previous content
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Check that the database file can be served and the port is usable.
    ///
    /// The database path must name an existing, readable and writable file
    /// with the `.db` extension.
    pub fn validate(&self) -> Result<()> {
        let path = &self.database_path;

        if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
            return Err(Error::Config("database path is blank".to_string()));
        }

        if path.extension().and_then(|e| e.to_str()) != Some(DATABASE_FILE_EXTENSION) {
            return Err(Error::Config(format!(
                "{} does not have the .{} extension",
                path.display(),
                DATABASE_FILE_EXTENSION
            )));
        }

        if !path.exists() {
            return Err(Error::Config(format!("{} does not exist", path.display())));
        }

        if !path.is_file() {
            return Err(Error::Config(format!("{} is not a file", path.display())));
        }

        OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                Error::Config(format!(
                    "{} is not readable and writable: {}",
                    path.display(),
                    e
                ))
            })?;

        if self.port == 0 {
            return Err(Error::Config("port must be between 1 and 65535".to_string()));
        }

        if self.host.trim().is_empty() {
            return Err(Error::Config("host is blank".to_string()));
        }

        Ok(())
    }

    /// Resolve the listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| Error::Config(format!("cannot resolve {}: {}", self.host, e)))?
            .next()
            .ok_or_else(|| Error::Config(format!("{} resolves to no address", self.host)))
    }

    /// Facade options derived from this configuration
    pub fn data_config(&self) -> DataConfig {
        let mut config = DataConfig::default().with_sync_mode(self.sync_mode);
        config.lock_timeout = self.lock_timeout_ms.map(Duration::from_millis);
        config
    }

    /// Idle timeout for client connections
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}
