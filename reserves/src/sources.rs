//! Reserve and liability sources

use crate::{cents::Cents, Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use xrpl_client::LedgerClient;

/// Asset figures: bank custody, gold custody and everything else
#[async_trait]
pub trait ReserveSource: Send + Sync {
    /// Bank custody cash
    async fn bank_cash_cents(&self) -> Result<Cents>;

    /// Physical gold value
    async fn gold_value_cents(&self) -> Result<Cents>;

    /// Other assets
    async fn other_assets_cents(&self) -> Result<Cents>;
}

/// Circulating program currencies
#[async_trait]
pub trait LiabilitySource: Send + Sync {
    /// Outstanding FTHUSD
    async fn fthusd_circulating_cents(&self) -> Result<Cents>;

    /// Outstanding USDF
    async fn usdf_circulating_cents(&self) -> Result<Cents>;
}

/// Configured figures, for deployments without live custody feeds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticReserveSource {
    /// Bank custody cash
    pub bank_cash_cents: Cents,
    /// Physical gold value
    pub gold_value_cents: Cents,
    /// Other assets
    pub other_assets_cents: Cents,
    /// Outstanding FTHUSD
    #[serde(default)]
    pub fthusd_circulating_cents: Cents,
    /// Outstanding USDF
    #[serde(default)]
    pub usdf_circulating_cents: Cents,
}

#[async_trait]
impl ReserveSource for StaticReserveSource {
    async fn bank_cash_cents(&self) -> Result<Cents> {
        Ok(self.bank_cash_cents)
    }

    async fn gold_value_cents(&self) -> Result<Cents> {
        Ok(self.gold_value_cents)
    }

    async fn other_assets_cents(&self) -> Result<Cents> {
        Ok(self.other_assets_cents)
    }
}

#[async_trait]
impl LiabilitySource for StaticReserveSource {
    async fn fthusd_circulating_cents(&self) -> Result<Cents> {
        Ok(self.fthusd_circulating_cents)
    }

    async fn usdf_circulating_cents(&self) -> Result<Cents> {
        Ok(self.usdf_circulating_cents)
    }
}

/// Outstanding supply read from the issuers' trustlines
#[derive(Debug, Clone)]
pub struct XrplLiabilitySource {
    ledger: Arc<LedgerClient>,
}

impl XrplLiabilitySource {
    /// Read supply through `ledger`
    pub fn new(ledger: Arc<LedgerClient>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl LiabilitySource for XrplLiabilitySource {
    async fn fthusd_circulating_cents(&self) -> Result<Cents> {
        let supply = self
            .ledger
            .fthusd_supply()
            .await
            .map_err(|e| Error::Source(format!("FTHUSD supply: {}", e)))?;
        Cents::from_token_units(supply)
    }

    async fn usdf_circulating_cents(&self) -> Result<Cents> {
        let supply = self
            .ledger
            .usdf_supply()
            .await
            .map_err(|e| Error::Source(format!("USDF supply: {}", e)))?;
        Cents::from_token_units(supply)
    }
}
