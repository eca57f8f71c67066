//! Error types for the audit ledger

use thiserror::Error;

/// Result type for audit ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Audit ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    RecordNotFound(String),

    /// Record with the same id already exists
    #[error("Duplicate record: {0}")]
    DuplicateRecord(String),

    /// Status transition out of a terminal state
    #[error("Invalid status transition for record {id}: {from} -> {to}")]
    InvalidTransition {
        /// Record id
        id: String,
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
