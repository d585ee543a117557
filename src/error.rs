use thiserror::Error;

use crate::config::SettingsError;
use crate::connection::ConnectionError;
use crate::session::EditError;
use crate::store::StoreError;

/// Custom error types for writeup
#[derive(Debug, Error)]
pub enum WriteupError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Edit rejected: {0}")]
    Edit(#[from] EditError),

    #[error("Invalid setting: {0}")]
    Settings(#[from] SettingsError),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
