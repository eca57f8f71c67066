//! FTH XRPL Client
//!
//! Single point of submission for every XRPL-side state change of the program:
//! FTHUSD credits, USDF bonus issuance, gold-order and membership NFTs,
//! trustline setup and PoR anchoring.
//!
//! # Guarantees
//!
//! - Payments in program currencies never carry `tfPartialPayment` or a path list
//! - Member trustlines always carry `tfSetNoRipple`
//! - Shape violations are rejected before signing, without an audit record
//! - An audit record exists (`pending`) before the network round-trip starts
//! - At most one in-flight transaction per sending account across every client
//!   sharing a [`SubmissionQueues`] handle
//! - A transport failure after submission leaves the record `pending`

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod rpc;
pub mod signer;
pub mod simulated;
pub mod transport;
pub mod types;
pub mod validation;

// Re-exports
pub use client::{GoldBuyback, LedgerClient, OpsSigners, SubmissionQueues};
pub use config::{TrustLimits, WalletConfig, XrplConfig};
pub use error::{Error, Result};
pub use rpc::JsonRpcTransport;
pub use signer::{LocalSigner, Signer};
pub use simulated::SimulatedLedger;
pub use transport::XrplTransport;
pub use types::{
    AccountInfo, Amount, BookOffer, CurrencySpec, IssuedAmount, Memo, NFTokenBurn, NFTokenMint,
    Payment, PreparedTransaction, SignedTransaction, SubmitResponse, TransactionIntent, TrustLine,
    TrustSet, FTHUSD, USDF, XRP,
};
pub use validation::validate_intent;
