//! FTH Reserves
//!
//! Proof-of-Reserves composition:
//!
//! - [`SnapshotBuilder`] aggregates bank, gold and other assets plus circulating
//!   liabilities into a [`SnapshotInput`]
//! - [`PoRComposer`] checks coverage, hashes the canonical payload, writes it to
//!   the EVM registry and anchors the hash on XRPL
//!
//! All monetary figures are integer cents ([`Cents`]); floating point never
//! touches a reserve figure.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod canonical;
pub mod cents;
pub mod composer;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod sources;

// Re-exports
pub use canonical::{canonical_hash, canonical_json, coverage_ratio_bps, CanonicalPayload};
pub use cents::Cents;
pub use composer::{PoRComposer, PorSnapshotResult};
pub use config::TreasuryConfig;
pub use error::{Error, Result};
pub use snapshot::{SnapshotBuilder, SnapshotInput};
pub use sources::{LiabilitySource, ReserveSource, StaticReserveSource, XrplLiabilitySource};
