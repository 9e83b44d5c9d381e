//! Request and response messages exchanged with a remote database.
//!
//! Each request maps to exactly one [`RoomDatabase`] call. Failures travel as
//! [`RemoteError`], which keeps the error class so the client can rebuild an
//! [`Error`] of the same kind as a local caller would see.

use roomdb_core::{Error, ErrorKind, Position, Record, Result, RoomDatabase};
use serde::{Deserialize, Serialize};

/// A single operation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    Create(Record),
    Delete(Position),
    Update(Position, Record),
    Read(Position),
    Find {
        name: Option<String>,
        location: Option<String>,
    },
    Book {
        position: Position,
        owner: String,
    },
}

/// The outcome of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    Created(Position),
    Done,
    Record(Record),
    Found(Vec<(Position, Record)>),
    Failed(RemoteError),
}

/// An error as carried on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: ErrorKind,
    pub position: Option<Position>,
    pub message: String,
}

impl From<&Error> for RemoteError {
    fn from(err: &Error) -> Self {
        // Carry the inner detail so the rebuilt error displays the same way
        let message = match err {
            Error::DuplicateKey { key } => key.clone(),
            Error::Format(msg)
            | Error::Validation(msg)
            | Error::Serialization(msg)
            | Error::Protocol(msg)
            | Error::Config(msg) => msg.clone(),
            Error::Io(e) => e.to_string(),
            other => other.to_string(),
        };

        Self {
            kind: err.kind(),
            position: err.position(),
            message,
        }
    }
}

impl From<RemoteError> for Error {
    fn from(remote: RemoteError) -> Self {
        let position = remote.position.unwrap_or_default();
        match remote.kind {
            ErrorKind::DuplicateKey => Error::DuplicateKey {
                key: remote.message,
            },
            ErrorKind::RecordNotFound => Error::RecordNotFound { position },
            ErrorKind::AlreadyBooked => Error::AlreadyBooked { position },
            ErrorKind::OutOfRange => Error::OutOfRange { position },
            ErrorKind::IllegalUnlock => Error::IllegalUnlock { position },
            ErrorKind::LockTimeout => Error::LockTimeout { position },
            ErrorKind::LockPoisoned => Error::LockPoisoned,
            ErrorKind::Io => Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                remote.message,
            )),
            ErrorKind::Format => Error::Format(remote.message),
            ErrorKind::Validation => Error::Validation(remote.message),
            ErrorKind::Serialization => Error::Serialization(remote.message),
            ErrorKind::Protocol => Error::Protocol(remote.message),
            ErrorKind::Config => Error::Config(remote.message),
        }
    }
}

impl Request {
    /// Short operation name for logs
    pub fn operation(&self) -> &'static str {
        match self {
            Request::Create(_) => "create",
            Request::Delete(_) => "delete",
            Request::Update(..) => "update",
            Request::Read(_) => "read",
            Request::Find { .. } => "find",
            Request::Book { .. } => "book",
        }
    }

    /// Run this request against `db`, folding any failure into the response
    pub fn dispatch<D: RoomDatabase + ?Sized>(self, db: &D) -> Response {
        let result = match self {
            Request::Create(record) => db.create(record).map(Response::Created),
            Request::Delete(position) => db.delete(position).map(|_| Response::Done),
            Request::Update(position, record) => {
                db.update(position, record).map(|_| Response::Done)
            }
            Request::Read(position) => db.read(position).map(Response::Record),
            Request::Find { name, location } => db
                .find(name.as_deref(), location.as_deref())
                .map(Response::Found),
            Request::Book { position, owner } => {
                db.book(position, &owner).map(|_| Response::Done)
            }
        };

        result.unwrap_or_else(|e| Response::Failed(RemoteError::from(&e)))
    }
}

impl Response {
    /// Turn a failure response back into an error
    pub fn into_result(self) -> Result<Response> {
        match self {
            Response::Failed(remote) => Err(remote.into()),
            other => Ok(other),
        }
    }
}
