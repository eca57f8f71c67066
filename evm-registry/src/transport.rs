//! Registry transport abstraction

use crate::{
    types::{ComplianceStatus, PorSnapshot, RegistryCall, TxReceipt},
    Result,
};
use async_trait::async_trait;

/// Access to the registry contracts
#[async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Send a state-changing call and wait for its mined receipt
    ///
    /// A mined-but-reverted transaction is [`crate::Error::Reverted`].
    async fn send(&self, call: &RegistryCall) -> Result<TxReceipt>;

    /// Most recent PoR snapshot, `None` before the first one
    async fn latest_snapshot(&self) -> Result<Option<PorSnapshot>>;

    /// Current compliance state of `wallet`
    async fn compliance_status(&self, wallet: &str) -> Result<ComplianceStatus>;
}
