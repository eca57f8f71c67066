//! In-process simulated registry
//!
//! Keeps snapshot history and compliance state in memory and "mines" every
//! write into its own block. Reverts can be scripted and connectivity cut.

use crate::{
    transport::RegistryTransport,
    types::{normalize_address, ComplianceStatus, PorSnapshot, RegistryCall, TxReceipt},
    Error, Result,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct RegistryState {
    block_number: u64,
    snapshots: Vec<PorSnapshot>,
    compliance: HashMap<String, ComplianceStatus>,
    scripted_reverts: VecDeque<String>,
    writes: usize,
}

/// Simulated registry
#[derive(Debug, Default)]
pub struct SimulatedRegistry {
    state: Mutex<RegistryState>,
    offline: AtomicBool,
}

impl SimulatedRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Cut or restore connectivity
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make the next write revert with `reason`
    pub fn revert_next(&self, reason: &str) {
        self.state.lock().scripted_reverts.push_back(reason.to_string());
    }

    /// Mined writes so far (reverts included)
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// Every recorded snapshot, oldest first
    pub fn snapshots(&self) -> Vec<PorSnapshot> {
        self.state.lock().snapshots.clone()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Connection("simulated registry is offline".to_string()));
        }
        Ok(())
    }
}

fn tx_hash(block_number: u64, call: &RegistryCall) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(block_number.to_be_bytes());
    hasher.update(call.summary().to_string().as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

#[async_trait]
impl RegistryTransport for SimulatedRegistry {
    async fn send(&self, call: &RegistryCall) -> Result<TxReceipt> {
        self.ensure_online()?;
        if let RegistryCall::SetKycStatus { wallet, .. } | RegistryCall::SetSanctioned { wallet, .. } = call {
            normalize_address(wallet)?;
        }

        let mut state = self.state.lock();
        state.block_number += 1;
        state.writes += 1;
        let block_number = state.block_number;
        let hash = tx_hash(block_number, call);

        if let Some(reason) = state.scripted_reverts.pop_front() {
            return Err(Error::Reverted {
                tx_hash: hash,
                reason,
            });
        }

        match call {
            RegistryCall::RecordSnapshot(snapshot) => state.snapshots.push(snapshot.clone()),
            RegistryCall::SetKycStatus {
                wallet,
                approved,
                jurisdiction_code,
                flags,
            } => {
                let entry = state.compliance.entry(normalize_address(wallet)?).or_default();
                entry.kyc_approved = *approved;
                entry.jurisdiction_code = *jurisdiction_code;
                entry.flags = *flags;
            }
            RegistryCall::SetSanctioned { wallet, sanctioned } => {
                state
                    .compliance
                    .entry(normalize_address(wallet)?)
                    .or_default()
                    .sanctioned = *sanctioned;
            }
        }

        Ok(TxReceipt {
            tx_hash: hash,
            block_number,
        })
    }

    async fn latest_snapshot(&self) -> Result<Option<PorSnapshot>> {
        self.ensure_online()?;
        Ok(self.state.lock().snapshots.last().cloned())
    }

    async fn compliance_status(&self, wallet: &str) -> Result<ComplianceStatus> {
        self.ensure_online()?;
        let key = normalize_address(wallet)?;
        Ok(self
            .state
            .lock()
            .compliance
            .get(&key)
            .copied()
            .unwrap_or_default())
    }
}
