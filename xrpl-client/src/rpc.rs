//! JSON-RPC transport to a rippled node

use crate::{
    codec,
    transport::XrplTransport,
    types::{
        decode_currency, AccountInfo, Amount, BookOffer, CurrencySpec, PreparedTransaction,
        SignedTransaction, SubmitResponse, TransactionIntent, TrustLine,
    },
    Error, Result,
};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Ledgers a transaction may wait before it expires
const LAST_LEDGER_OFFSET: u32 = 20;

/// Poll interval while waiting for validation
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Engine result prefixes meaning the transaction was not applied and never will be
const NOT_APPLIED_PREFIXES: [&str; 3] = ["tem", "tef", "tel"];

/// HTTP JSON-RPC transport
#[derive(Debug)]
pub struct JsonRpcTransport {
    url: String,
    client: Client,
    connected: AtomicBool,
}

impl JsonRpcTransport {
    /// New transport for `url`
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            url: url.into(),
            client,
            connected: AtomicBool::new(false),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let result = self.call(method, params).await?;
        match rpc_error(&result) {
            Some((code, message)) => Err(Error::Connection(format!(
                "{} error: {} {}",
                method, code, message
            ))),
            None => Ok(result),
        }
    }

    /// `result` object of a call, error statuses included
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({ "method": method, "params": [params] });
        let response = self
            .client
            .post(&self.url)
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
        payload
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| Error::Connection(format!("{} response has no result", method)))
    }

    async fn current_ledger_index(&self) -> Result<u32> {
        let result = self.request("ledger_current", json!({})).await?;
        result
            .get("ledger_current_index")
            .and_then(Value::as_u64)
            .map(|v| v as u32)
            .ok_or_else(|| Error::Connection("ledger_current returned no index".to_string()))
    }

    async fn open_ledger_fee(&self) -> Result<u64> {
        let result = self.request("fee", json!({})).await?;
        let drops = result.get("drops");
        drops
            .and_then(|d| d.get("open_ledger_fee").or_else(|| d.get("base_fee")))
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Connection("fee returned no drops".to_string()))
    }
}

/// Error code and message of an RPC-level failure
fn rpc_error(result: &Value) -> Option<(String, String)> {
    if result.get("status").and_then(Value::as_str) != Some("error") {
        return None;
    }
    let code = result.get("error").and_then(Value::as_str).unwrap_or("unknown");
    let message = result
        .get("error_message")
        .and_then(Value::as_str)
        .unwrap_or("");
    Some((code.to_string(), message.to_string()))
}

fn last_ledger_of(tx: &SignedTransaction) -> Result<u32> {
    let blob = hex::decode(&tx.tx_blob)
        .map_err(|e| Error::Validation(format!("Invalid blob hex: {}", e)))?;
    Ok(codec::decode_transaction(&blob)?.prepared.last_ledger_sequence)
}

fn not_validated(tx: &SignedTransaction, code: String, message: String) -> SubmitResponse {
    SubmitResponse {
        engine_result: code,
        engine_result_message: message,
        tx_hash: tx.hash.clone(),
        ledger_index: None,
        validated: false,
    }
}

fn decimal_field(value: &Value, key: &str) -> Decimal {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(Decimal::ZERO)
}

#[async_trait]
impl XrplTransport for JsonRpcTransport {
    async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.request("server_info", json!({})).await?;
        self.connected.store(true, Ordering::SeqCst);
        debug!(url = %self.url, "Connected to XRPL node");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn autofill(&self, intent: &TransactionIntent) -> Result<PreparedTransaction> {
        let info = self
            .request(
                "account_info",
                json!({ "account": intent.account(), "ledger_index": "current" }),
            )
            .await?;
        let sequence = info
            .pointer("/account_data/Sequence")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Connection("account_info returned no Sequence".to_string()))?
            as u32;

        let fee_drops = self.open_ledger_fee().await?;
        let current = self.current_ledger_index().await?;

        Ok(PreparedTransaction {
            intent: intent.clone(),
            sequence,
            fee_drops,
            last_ledger_sequence: current + LAST_LEDGER_OFFSET,
        })
    }

    async fn submit_and_wait(&self, tx: &SignedTransaction) -> Result<SubmitResponse> {
        let last_ledger = last_ledger_of(tx)?;
        let submitted = self.call("submit", json!({ "tx_blob": tx.tx_blob })).await?;
        // The node answered and refused the blob: it was never applied
        if let Some((code, message)) = rpc_error(&submitted) {
            return Ok(not_validated(tx, code, message));
        }
        let preliminary = submitted
            .get("engine_result")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let preliminary_message = submitted
            .get("engine_result_message")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        if NOT_APPLIED_PREFIXES.iter().any(|p| preliminary.starts_with(p)) {
            return Ok(not_validated(tx, preliminary, preliminary_message));
        }

        // From here on the blob may apply: transport errors are retried until
        // the transaction validates or LastLedgerSequence has passed
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            match self.call("tx", json!({ "transaction": tx.hash })).await {
                Ok(result) if result.get("validated").and_then(Value::as_bool) == Some(true) => {
                    let engine_result = result
                        .pointer("/meta/TransactionResult")
                        .and_then(Value::as_str)
                        .unwrap_or(&preliminary)
                        .to_string();
                    return Ok(SubmitResponse {
                        engine_result_message: if engine_result == preliminary {
                            preliminary_message
                        } else {
                            String::new()
                        },
                        engine_result,
                        tx_hash: tx.hash.clone(),
                        ledger_index: result
                            .get("ledger_index")
                            .and_then(Value::as_u64)
                            .map(|v| v as u32),
                        validated: true,
                    });
                }
                Ok(result) => match rpc_error(&result) {
                    Some((code, _)) if code == "txnNotFound" => {}
                    Some((code, message)) => {
                        warn!(tx_hash = %tx.hash, code = %code, message = %message, "tx lookup failed, retrying")
                    }
                    None => {}
                },
                Err(e) => warn!(tx_hash = %tx.hash, error = %e, "tx lookup failed, retrying"),
            }

            match self.current_ledger_index().await {
                Ok(current) if current > last_ledger => {
                    return Ok(not_validated(
                        tx,
                        "tefMAX_LEDGER".to_string(),
                        "Ledger sequence too high.".to_string(),
                    ));
                }
                Ok(_) => {}
                Err(e) => warn!(tx_hash = %tx.hash, error = %e, "ledger_current failed, retrying"),
            }
        }
    }

    async fn account_info(&self, account: &str) -> Result<AccountInfo> {
        let result = self
            .request(
                "account_info",
                json!({ "account": account, "ledger_index": "validated" }),
            )
            .await?;
        let data = result
            .get("account_data")
            .ok_or_else(|| Error::Connection("account_info returned no account_data".to_string()))?;
        Ok(AccountInfo {
            account: account.to_string(),
            balance_drops: data
                .get("Balance")
                .and_then(Value::as_str)
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            sequence: data.get("Sequence").and_then(Value::as_u64).unwrap_or(0) as u32,
        })
    }

    async fn account_lines(&self, account: &str) -> Result<Vec<TrustLine>> {
        let mut lines = Vec::new();
        let mut marker: Option<Value> = None;
        loop {
            let mut params = json!({ "account": account, "ledger_index": "validated" });
            if let Some(m) = marker.take() {
                params["marker"] = m;
            }
            let result = self.request("account_lines", params).await?;

            for line in result
                .get("lines")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default()
            {
                lines.push(TrustLine {
                    account: line.get("account").and_then(Value::as_str).unwrap_or("").to_string(),
                    currency: decode_currency(
                        line.get("currency").and_then(Value::as_str).unwrap_or(""),
                    ),
                    balance: decimal_field(line, "balance"),
                    limit: decimal_field(line, "limit"),
                    no_ripple: line.get("no_ripple").and_then(Value::as_bool).unwrap_or(false),
                    authorized: line.get("authorized").and_then(Value::as_bool).unwrap_or(false),
                });
            }

            match result.get("marker") {
                Some(m) if !m.is_null() => marker = Some(m.clone()),
                _ => break,
            }
        }
        Ok(lines)
    }

    async fn book_offers(
        &self,
        taker_gets: &CurrencySpec,
        taker_pays: &CurrencySpec,
    ) -> Result<Vec<BookOffer>> {
        let result = self
            .request(
                "book_offers",
                json!({
                    "taker_gets": taker_gets.to_json(),
                    "taker_pays": taker_pays.to_json(),
                    "ledger_index": "validated",
                }),
            )
            .await?;

        let offers = result
            .get("offers")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|offer| {
                Some(BookOffer {
                    account: offer.get("Account")?.as_str()?.to_string(),
                    sequence: offer.get("Sequence")?.as_u64()? as u32,
                    taker_gets: Amount::from_json(offer.get("TakerGets")?)?,
                    taker_pays: Amount::from_json(offer.get("TakerPays")?)?,
                })
            })
            .collect();
        Ok(offers)
    }
}
