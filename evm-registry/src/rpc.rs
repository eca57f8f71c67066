//! JSON-RPC transport to an EVM node
//!
//! Writes go through `eth_sendTransaction` from the operator account and are
//! polled to a receipt; reads use `eth_call` against the latest block.

use crate::{
    abi::{encode_call, Decoder, Token},
    config::RegistryConfig,
    transport::RegistryTransport,
    types::{normalize_address, ComplianceStatus, PorSnapshot, RegistryCall, TxReceipt},
    Error, Result,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

const RECORD_SNAPSHOT: &str = "recordSnapshot(bytes32,uint64,uint32,uint256,uint256,uint256,string)";
const LATEST_SNAPSHOT: &str = "latestSnapshot()";
const SET_KYC_STATUS: &str = "setKYCStatus(address,bool,uint16,uint256)";
const SET_SANCTIONED: &str = "setSanctioned(address,bool)";
const GET_STATUS: &str = "getStatus(address)";

/// HTTP JSON-RPC registry transport
#[derive(Debug)]
pub struct JsonRpcRegistryTransport {
    config: RegistryConfig,
    client: Client,
    next_id: AtomicU64,
    chain_checked: AtomicBool,
}

impl JsonRpcRegistryTransport {
    /// New transport; `config` must already be validated
    pub fn new(config: RegistryConfig, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            client,
            next_id: AtomicU64::new(1),
            chain_checked: AtomicBool::new(false),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Connection(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(Error::Connection(format!(
                "{} failed with HTTP status {}",
                method,
                response.status()
            )));
        }

        let mut payload: Value = response
            .json()
            .await
            .map_err(|e| Error::Connection(format!("Failed to parse {} response: {}", method, e)))?;

        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            if message.contains("revert") {
                return Err(Error::Reverted {
                    tx_hash: String::new(),
                    reason: message,
                });
            }
            return Err(Error::Connection(format!("{} error: {}", method, message)));
        }
        Ok(payload.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }

    async fn ensure_chain(&self) -> Result<()> {
        if self.chain_checked.load(Ordering::SeqCst) {
            return Ok(());
        }
        let result = self.request("eth_chainId", json!([])).await?;
        let chain_id = result
            .as_str()
            .and_then(parse_quantity)
            .ok_or_else(|| Error::Connection("eth_chainId returned no quantity".to_string()))?;
        if chain_id != self.config.chain_id {
            return Err(Error::Config(format!(
                "Node is on chain {}, expected {}",
                chain_id, self.config.chain_id
            )));
        }
        self.chain_checked.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn encode(&self, call: &RegistryCall) -> Result<(String, Vec<u8>)> {
        match call {
            RegistryCall::RecordSnapshot(s) => Ok((
                self.config.por_registry.clone(),
                encode_call(
                    RECORD_SNAPSHOT,
                    &[
                        Token::bytes32(&s.hash)?,
                        Token::uint(u128::from(s.timestamp)),
                        Token::uint(s.coverage_ratio_bps),
                        Token::uint(s.total_assets),
                        Token::uint(s.total_liabilities),
                        Token::uint(s.usdf_circulating),
                        Token::string(&s.uri),
                    ],
                ),
            )),
            RegistryCall::SetKycStatus {
                wallet,
                approved,
                jurisdiction_code,
                flags,
            } => Ok((
                self.config.compliance_registry.clone(),
                encode_call(
                    SET_KYC_STATUS,
                    &[
                        Token::address(wallet)?,
                        Token::bool(*approved),
                        Token::uint(u128::from(*jurisdiction_code)),
                        Token::uint(*flags),
                    ],
                ),
            )),
            RegistryCall::SetSanctioned { wallet, sanctioned } => Ok((
                self.config.compliance_registry.clone(),
                encode_call(
                    SET_SANCTIONED,
                    &[Token::address(wallet)?, Token::bool(*sanctioned)],
                ),
            )),
        }
    }

    async fn call(&self, to: &str, data: Vec<u8>) -> Result<Vec<u8>> {
        self.ensure_chain().await?;
        let result = self
            .request(
                "eth_call",
                json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]),
            )
            .await?;
        let hex_data = result
            .as_str()
            .ok_or_else(|| Error::Connection("eth_call returned no data".to_string()))?;
        hex::decode(hex_data.trim_start_matches("0x"))
            .map_err(|e| Error::Abi(format!("eth_call returned invalid hex: {}", e)))
    }
}

fn parse_quantity(value: &str) -> Option<u64> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16).ok()
}

#[async_trait]
impl RegistryTransport for JsonRpcRegistryTransport {
    async fn send(&self, call: &RegistryCall) -> Result<TxReceipt> {
        self.ensure_chain().await?;
        let (to, data) = self.encode(call)?;

        let tx_hash = self
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": normalize_address(&self.config.operator_address)?,
                    "to": to,
                    "data": format!("0x{}", hex::encode(data)),
                }]),
            )
            .await?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Connection("eth_sendTransaction returned no hash".to_string()))?;
        debug!(tx_hash = %tx_hash, flow = %call.flow(), "Registry transaction sent");

        let deadline = Instant::now() + self.config.receipt_timeout();
        loop {
            let receipt = self
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if !receipt.is_null() {
                let block_number = receipt
                    .get("blockNumber")
                    .and_then(Value::as_str)
                    .and_then(parse_quantity)
                    .unwrap_or(0);
                return match receipt.get("status").and_then(Value::as_str) {
                    Some("0x1") => Ok(TxReceipt {
                        tx_hash,
                        block_number,
                    }),
                    status => Err(Error::Reverted {
                        tx_hash,
                        reason: format!("receipt status {}", status.unwrap_or("missing")),
                    }),
                };
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout { tx_hash });
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    async fn latest_snapshot(&self) -> Result<Option<PorSnapshot>> {
        let data = self
            .call(&self.config.por_registry, encode_call(LATEST_SNAPSHOT, &[]))
            .await?;
        let decoder = Decoder::new(&data);

        // Zero hash: nothing recorded yet
        if decoder.word(0)?.iter().all(|b| *b == 0) {
            return Ok(None);
        }
        let hash = decoder.bytes32(0)?;
        let narrow = |v: u128, what: &str| -> Result<u64> {
            u64::try_from(v).map_err(|_| Error::Abi(format!("{} out of range", what)))
        };
        Ok(Some(PorSnapshot {
            hash,
            timestamp: narrow(decoder.uint(1)?, "timestamp")?,
            coverage_ratio_bps: decoder.uint(2)?,
            total_assets: decoder.uint(3)?,
            total_liabilities: decoder.uint(4)?,
            usdf_circulating: decoder.uint(5)?,
            uri: decoder.string(6)?,
        }))
    }

    async fn compliance_status(&self, wallet: &str) -> Result<ComplianceStatus> {
        let data = self
            .call(
                &self.config.compliance_registry,
                encode_call(GET_STATUS, &[Token::address(wallet)?]),
            )
            .await?;
        let decoder = Decoder::new(&data);
        Ok(ComplianceStatus {
            kyc_approved: decoder.bool(0)?,
            sanctioned: decoder.bool(1)?,
            jurisdiction_code: u16::try_from(decoder.uint(2)?)
                .map_err(|_| Error::Abi("jurisdictionCode out of range".to_string()))?,
            flags: decoder.uint(3)?,
        })
    }
}
