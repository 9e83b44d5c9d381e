//! Error types for roomdb.

use crate::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The main error type for roomdb operations.
#[derive(Debug)]
pub enum Error {
    /// A lock was poisoned (internal error)
    LockPoisoned,

    /// I/O error on the backing file or socket
    Io(std::io::Error),

    /// Malformed file header or truncated slot
    Format(String),

    /// A record or argument does not fit the schema
    Validation(String),

    /// Position lies beyond the current record area
    OutOfRange {
        /// Requested position
        position: Position,
    },

    /// A valid record with the same key fields already exists
    DuplicateKey {
        /// Rendered key values, joined with `/`
        key: String,
    },

    /// Position is empty, out of range or deleted
    RecordNotFound {
        /// Requested position
        position: Position,
    },

    /// The record already has an owner
    AlreadyBooked {
        /// Requested position
        position: Position,
    },

    /// Unlock by a caller that does not hold the position
    IllegalUnlock {
        /// Position passed to unlock
        position: Position,
    },

    /// The lock was not granted before the deadline
    LockTimeout {
        /// Position that could not be locked
        position: Position,
    },

    /// Serialization/deserialization error
    Serialization(String),

    /// Malformed frame or unexpected message on the wire
    Protocol(String),

    /// Invalid configuration
    Config(String),
}

/// Fieldless classification of [`Error`], carried across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`Error::LockPoisoned`]
    LockPoisoned,
    /// See [`Error::Io`]
    Io,
    /// See [`Error::Format`]
    Format,
    /// See [`Error::Validation`]
    Validation,
    /// See [`Error::OutOfRange`]
    OutOfRange,
    /// See [`Error::DuplicateKey`]
    DuplicateKey,
    /// See [`Error::RecordNotFound`]
    RecordNotFound,
    /// See [`Error::AlreadyBooked`]
    AlreadyBooked,
    /// See [`Error::IllegalUnlock`]
    IllegalUnlock,
    /// See [`Error::LockTimeout`]
    LockTimeout,
    /// See [`Error::Serialization`]
    Serialization,
    /// See [`Error::Protocol`]
    Protocol,
    /// See [`Error::Config`]
    Config,
}

impl Error {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LockPoisoned => ErrorKind::LockPoisoned,
            Error::Io(_) => ErrorKind::Io,
            Error::Format(_) => ErrorKind::Format,
            Error::Validation(_) => ErrorKind::Validation,
            Error::OutOfRange { .. } => ErrorKind::OutOfRange,
            Error::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Error::RecordNotFound { .. } => ErrorKind::RecordNotFound,
            Error::AlreadyBooked { .. } => ErrorKind::AlreadyBooked,
            Error::IllegalUnlock { .. } => ErrorKind::IllegalUnlock,
            Error::LockTimeout { .. } => ErrorKind::LockTimeout,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns the record position this error refers to, if any.
    pub fn position(&self) -> Option<Position> {
        match self {
            Error::OutOfRange { position }
            | Error::RecordNotFound { position }
            | Error::AlreadyBooked { position }
            | Error::IllegalUnlock { position }
            | Error::LockTimeout { position } => Some(*position),
            _ => None,
        }
    }

    /// Whether the error is a normal outcome of the operation contract
    /// rather than an infrastructure or programming failure.
    pub fn is_contract_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DuplicateKey
                | ErrorKind::RecordNotFound
                | ErrorKind::AlreadyBooked
                | ErrorKind::Validation
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::LockPoisoned => write!(f, "Lock poisoned"),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Format(msg) => write!(f, "Format error: {}", msg),
            Error::Validation(msg) => write!(f, "Validation error: {}", msg),
            Error::OutOfRange { position } => {
                write!(f, "Position {} is beyond the record area", position)
            }
            Error::DuplicateKey { key } => write!(f, "Duplicate key: {}", key),
            Error::RecordNotFound { position } => {
                write!(f, "Record not found at position {}", position)
            }
            Error::AlreadyBooked { position } => {
                write!(f, "Record at position {} is already booked", position)
            }
            Error::IllegalUnlock { position } => {
                write!(f, "Position {} is not locked by this holder", position)
            }
            Error::LockTimeout { position } => {
                write!(f, "Timed out waiting for lock on position {}", position)
            }
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Error::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// A specialized `Result` type for roomdb operations.
pub type Result<T> = std::result::Result<T, Error>;
