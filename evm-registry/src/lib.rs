//! FTH EVM Registry Client
//!
//! Write-through access to the two registry contracts that are the program's
//! source of truth on the EVM side:
//!
//! - PoR registry: `recordSnapshot` / `latestSnapshot`
//! - Compliance registry: `setKYCStatus` / `setSanctioned` / `getStatus`
//!
//! Every write is awaited to a mined receipt before it is reported as done, and
//! every mined (or reverted) write leaves a ledger-transaction record.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod abi;
pub mod client;
pub mod config;
pub mod error;
pub mod rpc;
pub mod simulated;
pub mod transport;
pub mod types;

// Re-exports
pub use client::RegistryClient;
pub use config::RegistryConfig;
pub use error::{Error, Result};
pub use rpc::JsonRpcRegistryTransport;
pub use simulated::SimulatedRegistry;
pub use transport::RegistryTransport;
pub use types::{ComplianceStatus, PorSnapshot, RegistryCall, TxReceipt};
