//! Explicitly constructed clients shared by every runner

use crate::{config::OpsConfig, metrics::OpsMetrics, Result};
use audit_ledger::{open_store, AuditStore};
use evm_registry::{JsonRpcRegistryTransport, RegistryClient, RegistryTransport};
use std::fmt;
use std::sync::Arc;
use tracing::info;
use xrpl_client::{JsonRpcTransport, LedgerClient, OpsSigners, SubmissionQueues, XrplTransport};

/// Transports, signers, store and metrics for one process
///
/// Clients are built per run so each run's records carry its correlation id;
/// they all share one set of per-account submission queues.
pub struct OpsContext {
    config: OpsConfig,
    store: Arc<dyn AuditStore>,
    xrpl: Arc<dyn XrplTransport>,
    signers: OpsSigners,
    queues: SubmissionQueues,
    registry: Arc<dyn RegistryTransport>,
    metrics: OpsMetrics,
}

impl fmt::Debug for OpsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpsContext")
            .field("xrpl_rpc_url", &self.config.xrpl.rpc_url)
            .field("evm_rpc_url", &self.config.registry.rpc_url)
            .field("store", &self.config.store.backend)
            .field("signers", &self.signers)
            .finish()
    }
}

impl OpsContext {
    /// Context over caller-supplied transports (simulation, tests)
    pub fn new(
        config: OpsConfig,
        store: Arc<dyn AuditStore>,
        xrpl: Arc<dyn XrplTransport>,
        signers: OpsSigners,
        registry: Arc<dyn RegistryTransport>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            store,
            xrpl,
            signers,
            queues: SubmissionQueues::new(),
            registry,
            metrics: OpsMetrics::new()?,
        })
    }

    /// Context over the configured JSON-RPC endpoints and store
    pub fn live(config: OpsConfig) -> Result<Self> {
        config.validate_live()?;

        let store = open_store(&config.store)?;
        let xrpl = Arc::new(JsonRpcTransport::new(
            config.xrpl.rpc_url.clone(),
            config.xrpl.submit_timeout(),
        )?);
        let signers = OpsSigners::from_config(&config.xrpl)?;
        let registry = Arc::new(JsonRpcRegistryTransport::new(
            config.registry.clone(),
            config.registry.receipt_timeout(),
        )?);

        info!(
            xrpl = %config.xrpl.rpc_url,
            evm = %config.registry.rpc_url,
            chain_id = config.registry.chain_id,
            "Operations context ready"
        );
        Self::new(config, store, xrpl, signers, registry)
    }

    /// Configuration
    pub fn config(&self) -> &OpsConfig {
        &self.config
    }

    /// Audit store
    pub fn store(&self) -> Arc<dyn AuditStore> {
        self.store.clone()
    }

    /// Metrics
    pub fn metrics(&self) -> &OpsMetrics {
        &self.metrics
    }

    /// Ledger client tagging its records with `correlation_id`
    pub fn ledger(&self, correlation_id: &str) -> Arc<LedgerClient> {
        Arc::new(
            LedgerClient::new(
                self.config.xrpl.clone(),
                self.xrpl.clone(),
                self.store.clone(),
                self.signers.clone(),
            )
            .with_submission_queues(self.queues.clone())
            .with_correlation_id(correlation_id),
        )
    }

    /// Registry client tagging its records with `correlation_id`
    pub fn registry(&self, correlation_id: &str) -> Arc<RegistryClient> {
        Arc::new(
            RegistryClient::new(self.registry.clone(), self.store.clone())
                .with_correlation_id(correlation_id),
        )
    }
}
