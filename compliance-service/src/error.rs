//! Error types for compliance sync

use thiserror::Error;

/// Result type for compliance operations
pub type Result<T> = std::result::Result<T, Error>;

/// Compliance errors
#[derive(Error, Debug)]
pub enum Error {
    /// No such member in the directory
    #[error("Member not found: {0}")]
    MemberNotFound(String),

    /// Registry write or read failed; the mirror was not touched
    #[error("Registry error: {0}")]
    Registry(#[from] evm_registry::Error),

    /// Directory update failed after the registry write
    #[error("Member directory error: {0}")]
    Directory(String),

    /// Malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
