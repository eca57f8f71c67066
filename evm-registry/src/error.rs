//! Error types for the registry client

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Registry errors
#[derive(Error, Debug)]
pub enum Error {
    /// Node unreachable or RPC-level failure; nothing was recorded
    #[error("EVM connection error: {0}")]
    Connection(String),

    /// Transaction mined but reverted
    #[error("EVM transaction {tx_hash} reverted: {reason}")]
    Reverted {
        /// Transaction hash
        tx_hash: String,
        /// Revert reason, if the node reported one
        reason: String,
    },

    /// No receipt within the receipt timeout; the transaction may still be mined
    #[error("Timed out waiting for receipt of {tx_hash}")]
    Timeout {
        /// Transaction hash
        tx_hash: String,
    },

    /// Nothing recorded yet (e.g. no PoR snapshot)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed argument (address, hash)
    #[error("Invalid argument: {0}")]
    Validation(String),

    /// Contract return data could not be decoded
    #[error("ABI decoding error: {0}")]
    Abi(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audit store error
    #[error("Audit store error: {0}")]
    Audit(#[from] audit_ledger::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Connection(err.to_string())
    }
}
