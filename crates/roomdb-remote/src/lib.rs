//! # roomdb Remote
//!
//! Network access to a roomdb database.
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
//! - **frame**: length-prefixed, CRC-checked frames
//! - **protocol**: request and response messages
//! - **server**: TCP listener dispatching requests to a [`RoomDatabase`]
//! - **client**: [`RoomDatabase`] implementation that talks to a server
//!
//! [`RoomDatabase`]: roomdb_core::RoomDatabase

pub mod client;
pub mod frame;
pub mod protocol;
pub mod server;

pub use client::RemoteClient;
pub use frame::{Frame, FrameKind, MAX_FRAME_LEN};
pub use protocol::{RemoteError, Request, Response};
pub use server::{RemoteConfig, RemoteServer, ServerHandle};
