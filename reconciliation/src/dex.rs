//! DEX monitor
//!
//! Program currencies are not meant to trade on the XRPL order books. The
//! monitor reads both directions of the FTHUSD/XRP and USDF/XRP books and
//! records a `DEX_SCAN_ALERT` (status `detected`) for every offer in a
//! program currency of a program issuer.

use crate::Result;
use audit_ledger::{
    log_ledger_event, AuditStore, Direction, Flow, LedgerEvent, LedgerKind,
    LedgerTransactionRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use xrpl_client::{Amount, BookOffer, CurrencySpec, LedgerClient, FTHUSD, USDF};

/// One offending offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DexAlert {
    /// Offer owner
    pub account: String,
    /// Offer sequence
    pub sequence: u32,
    /// What the taker receives
    pub taker_gets: Value,
    /// What the taker pays
    pub taker_pays: Value,
}

/// Outcome of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexScanReport {
    /// Offers inspected
    pub offers_scanned: usize,
    /// Offers flagged
    pub alerts: Vec<DexAlert>,
}

impl DexScanReport {
    /// Whether the books were clean
    pub fn is_clean(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// Order-book monitor
pub struct DexMonitor {
    ledger: Arc<LedgerClient>,
    store: Arc<dyn AuditStore>,
    correlation_id: Option<String>,
}

impl fmt::Debug for DexMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DexMonitor")
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

impl DexMonitor {
    /// Create a monitor
    pub fn new(ledger: Arc<LedgerClient>, store: Arc<dyn AuditStore>) -> Self {
        Self {
            ledger,
            store,
            correlation_id: None,
        }
    }

    /// Tag alert records with `correlation_id`
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Scan the books and record an alert per offending offer
    pub async fn scan(&self) -> Result<DexScanReport> {
        let config = self.ledger.config();
        let issuers = [config.fthusd_issuer.clone(), config.usdf_issuer.clone()];
        let books = [
            CurrencySpec::issued(FTHUSD, &config.fthusd_issuer),
            CurrencySpec::issued(USDF, &config.usdf_issuer),
        ];

        let mut report = DexScanReport::default();
        for book in &books {
            for (gets, pays) in [(CurrencySpec::xrp(), book.clone()), (book.clone(), CurrencySpec::xrp())] {
                let offers = self.ledger.book_offers(&gets, &pays).await?;
                report.offers_scanned += offers.len();
                for offer in offers.iter().filter(|o| involves_program(o, &issuers)) {
                    let alert = self.record_alert(offer).await?;
                    report.alerts.push(alert);
                }
            }
        }

        if report.is_clean() {
            info!(offers = report.offers_scanned, "No FTHUSD/USDF DEX offers detected");
        } else {
            warn!(
                alerts = report.alerts.len(),
                offers = report.offers_scanned,
                "Unauthorized FTHUSD/USDF DEX offers detected"
            );
        }
        Ok(report)
    }

    async fn record_alert(&self, offer: &BookOffer) -> Result<DexAlert> {
        let alert = DexAlert {
            account: offer.account.clone(),
            sequence: offer.sequence,
            taker_gets: offer.taker_gets.to_json(),
            taker_pays: offer.taker_pays.to_json(),
        };
        warn!(
            account = %alert.account,
            sequence = alert.sequence,
            taker_gets = %alert.taker_gets,
            taker_pays = %alert.taker_pays,
            "Unauthorized DEX offer"
        );

        let mut record =
            LedgerTransactionRecord::pending(LedgerKind::Xrpl, Flow::DexScanAlert, Direction::Internal)
                .with_wallet(alert.account.clone())
                .with_payload(&alert);
        if let Some(correlation_id) = &self.correlation_id {
            record = record.with_correlation_id(correlation_id.clone());
        }
        record.detect()?;
        self.store.create(&record).await?;
        log_ledger_event(&LedgerEvent::from(&record));
        Ok(alert)
    }
}

fn involves_program(offer: &BookOffer, issuers: &[String]) -> bool {
    let program = |amount: &Amount| {
        amount.is_program_currency()
            && amount
                .issuer()
                .map(|issuer| issuers.iter().any(|i| i == issuer))
                .unwrap_or(false)
    };
    program(&offer.taker_gets) || program(&offer.taker_pays)
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_ledger::{MemoryAuditStore, RecordFilter, TxStatus};
    use rust_decimal_macros::dec;
    use xrpl_client::{IssuedAmount, OpsSigners, SimulatedLedger, XrplConfig};

    fn monitor() -> (Arc<SimulatedLedger>, Arc<MemoryAuditStore>, DexMonitor) {
        let ledger = Arc::new(SimulatedLedger::new());
        let store = Arc::new(MemoryAuditStore::new());
        let config = XrplConfig {
            fthusd_issuer: "rFthusdIssuer".into(),
            usdf_issuer: "rUsdfIssuer".into(),
            ..Default::default()
        };
        let client = Arc::new(LedgerClient::new(
            config,
            ledger.clone(),
            store.clone(),
            OpsSigners::default(),
        ));
        let monitor = DexMonitor::new(client, store.clone()).with_correlation_id("dex-test");
        (ledger, store, monitor)
    }

    #[tokio::test]
    async fn test_clean_books() {
        let (_, store, monitor) = monitor();
        let report = monitor.scan().await.unwrap();
        assert!(report.is_clean());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_offer_recorded_as_detected() {
        let (ledger, store, monitor) = monitor();
        ledger.place_offer(BookOffer {
            account: "rTrader".into(),
            sequence: 7,
            taker_gets: Amount::Drops(5_000_000),
            taker_pays: Amount::Issued(IssuedAmount::new(FTHUSD, "rFthusdIssuer", dec!(10))),
        });

        let report = monitor.scan().await.unwrap();
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].account, "rTrader");

        let records = store
            .list(&RecordFilter::all().flow(Flow::DexScanAlert))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, TxStatus::Detected);
        assert_eq!(records[0].direction, Direction::Internal);
        assert_eq!(records[0].payload().unwrap()["sequence"], 7);
    }

    #[test]
    fn test_foreign_issuer_ignored() {
        let offer = BookOffer {
            account: "rTrader".into(),
            sequence: 1,
            taker_gets: Amount::Drops(1),
            taker_pays: Amount::Issued(IssuedAmount::new(USDF, "rImpostor", dec!(1))),
        };
        let issuers = ["rFthusdIssuer".to_string(), "rUsdfIssuer".to_string()];
        assert!(!involves_program(&offer, &issuers));
    }
}
