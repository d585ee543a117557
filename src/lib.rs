//! Live text-suggestion client
//!
//! Streams the tail of a document to a generation service over a persistent
//! websocket and offers the returned continuations for insertion at the
//! cursor.

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod store;

pub use error::WriteupError;
