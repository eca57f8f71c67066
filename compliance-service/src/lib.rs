//! FTH Compliance Sync
//!
//! The EVM ComplianceRegistry is authoritative for KYC and sanction state; the
//! member directory is a local mirror. Every change is written to the registry
//! first, mirrored second and announced last, so the mirror is never ahead of
//! the registry.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod directory;
pub mod error;
pub mod sync;
pub mod types;

// Re-exports
pub use directory::{InMemoryMemberDirectory, MemberDirectory};
pub use error::{Error, Result};
pub use sync::ComplianceSync;
pub use types::{ComplianceEvent, KycRecord, KycStatus, Member};
