//! Error types for reserves composition

use crate::cents::Cents;
use thiserror::Error;

/// Result type for reserves operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reserves errors
#[derive(Error, Debug)]
pub enum Error {
    /// Assets below liabilities; nothing was published
    #[error("Assets {total_assets} < liabilities {total_liabilities}, cannot publish PoR snapshot")]
    Undercollateralized {
        /// Total assets
        total_assets: Cents,
        /// Total liabilities
        total_liabilities: Cents,
    },

    /// Arithmetic overflow in a cent figure or the coverage ratio
    #[error("Overflow computing {0}")]
    Overflow(&'static str),

    /// A reserve or liability source failed
    #[error("Source error: {0}")]
    Source(String),

    /// Registry write failed; nothing was anchored
    #[error("Registry error: {0}")]
    Registry(#[from] evm_registry::Error),

    /// Registry write succeeded but anchoring failed; retry anchoring alone
    #[error("PoR registered in {evm_tx_hash} but XRPL anchor failed: {source}")]
    Anchor {
        /// Mined registry transaction
        evm_tx_hash: String,
        /// Anchoring failure
        #[source]
        source: xrpl_client::Error,
    },

    /// Canonical payload could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
