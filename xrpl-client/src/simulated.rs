//! In-process simulated XRPL ledger
//!
//! Applies signed blobs against an in-memory ledger: XRP balances, account
//! sequences, trustlines (with NoRipple and issuer authorization), NFTs and
//! order-book offers. Blobs are decoded with the binary codec and must be
//! signed by the key that controls `Account`. Used by tests and the
//! `simulate-day` runner. Failures can be scripted per submission,
//! connectivity can be cut, validation can be delayed to exercise the
//! submission timeout, and a response can be lost after the transaction
//! applied.

use crate::{
    codec,
    signer::verify_signature,
    transport::XrplTransport,
    types::{
        flags, AccountInfo, Amount, BookOffer, CurrencySpec, IssuedAmount, PreparedTransaction,
        SignedTransaction, SubmitResponse, TransactionIntent, TrustLine, TES_SUCCESS,
    },
    Error, Result,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Starting balance of accounts created on first touch (1000 XRP)
const DEFAULT_FUNDING_DROPS: u64 = 1_000_000_000;

/// Fee charged per transaction
const BASE_FEE_DROPS: u64 = 12;

#[derive(Debug, Clone)]
struct AccountState {
    balance_drops: u64,
    sequence: u32,
}

impl Default for AccountState {
    fn default() -> Self {
        Self {
            balance_drops: DEFAULT_FUNDING_DROPS,
            sequence: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct LineState {
    /// Positive: the issuer owes the holder
    balance: Decimal,
    limit: Decimal,
    no_ripple: bool,
    authorized: bool,
}

/// (holder, issuer, currency)
type LineKey = (String, String, String);

#[derive(Debug, Default)]
struct LedgerState {
    ledger_index: u32,
    accounts: HashMap<String, AccountState>,
    lines: BTreeMap<LineKey, LineState>,
    require_auth: HashSet<String>,
    nfts: BTreeMap<String, String>,
    nft_counter: u64,
    offers: Vec<BookOffer>,
    scripted_failures: VecDeque<(String, String)>,
    submitted: Vec<String>,
}

type Outcome = std::result::Result<(), (&'static str, &'static str)>;

impl LedgerState {
    fn account(&mut self, address: &str) -> &mut AccountState {
        self.accounts.entry(address.to_string()).or_default()
    }

    fn line_key(holder: &str, issuer: &str, currency: &str) -> LineKey {
        (holder.to_string(), issuer.to_string(), currency.to_string())
    }

    fn apply(&mut self, intent: &TransactionIntent) -> Outcome {
        match intent {
            TransactionIntent::Payment(payment) => match &payment.amount {
                Amount::Drops(drops) => {
                    let sender = self.account(&payment.account);
                    if sender.balance_drops < *drops {
                        return Err(("tecUNFUNDED_PAYMENT", "Insufficient XRP balance to send."));
                    }
                    sender.balance_drops -= drops;
                    self.account(&payment.destination).balance_drops += drops;
                    Ok(())
                }
                Amount::Issued(issued) => {
                    self.apply_issued_payment(&payment.account, &payment.destination, issued)
                }
            },
            TransactionIntent::TrustSet(trust) => {
                if trust.is_authorization() {
                    // Issuer authorizing the holder named in `limit.issuer`
                    let key = Self::line_key(&trust.limit.issuer, &trust.account, &trust.limit.currency);
                    self.lines.entry(key).or_default().authorized = true;
                } else {
                    let key = Self::line_key(&trust.account, &trust.limit.issuer, &trust.limit.currency);
                    let line = self.lines.entry(key).or_default();
                    line.limit = trust.limit.value;
                    if trust.flags & flags::TF_SET_NO_RIPPLE != 0 {
                        line.no_ripple = true;
                    }
                    if trust.flags & flags::TF_CLEAR_NO_RIPPLE != 0 {
                        line.no_ripple = false;
                    }
                }
                Ok(())
            }
            TransactionIntent::NFTokenMint(mint) => {
                self.nft_counter += 1;
                let id = format!("{:08X}{:056X}", mint.taxon, self.nft_counter);
                let owner = mint.destination.clone().unwrap_or_else(|| mint.account.clone());
                self.nfts.insert(id, owner);
                Ok(())
            }
            TransactionIntent::NFTokenBurn(burn) => {
                match self.nfts.get(&burn.nftoken_id).cloned() {
                    Some(owner) if owner == burn.account => {
                        self.nfts.remove(&burn.nftoken_id);
                        Ok(())
                    }
                    Some(_) => Err(("tecNO_PERMISSION", "No permission to perform requested operation.")),
                    None => Err(("tecNO_ENTRY", "No matching entry found.")),
                }
            }
        }
    }

    fn apply_issued_payment(&mut self, from: &str, to: &str, amount: &IssuedAmount) -> Outcome {
        let issuer = amount.issuer.as_str();
        let currency = amount.currency.as_str();

        // Debit side
        if from != issuer {
            let key = Self::line_key(from, issuer, currency);
            match self.lines.get(&key) {
                Some(line) if line.balance >= amount.value => {}
                _ => return Err(("tecUNFUNDED_PAYMENT", "Insufficient balance to send.")),
            }
        }

        // Credit side
        if to != issuer {
            let key = Self::line_key(to, issuer, currency);
            let require_auth = self.require_auth.contains(issuer);
            match self.lines.get(&key) {
                None => return Err(("tecPATH_DRY", "Path could not send partial amount.")),
                Some(line) if line.limit.is_zero() => {
                    return Err(("tecPATH_DRY", "Path could not send partial amount."))
                }
                Some(line) if require_auth && !line.authorized => {
                    return Err(("tecNO_AUTH", "Not authorized to hold asset."))
                }
                Some(line) if line.balance + amount.value > line.limit => {
                    return Err(("tecPATH_PARTIAL", "Path could not send full amount."))
                }
                Some(_) => {}
            }
        }

        if from != issuer {
            if let Some(line) = self.lines.get_mut(&Self::line_key(from, issuer, currency)) {
                line.balance -= amount.value;
            }
        }
        if to != issuer {
            if let Some(line) = self.lines.get_mut(&Self::line_key(to, issuer, currency)) {
                line.balance += amount.value;
            }
        }
        Ok(())
    }
}

/// Simulated ledger
#[derive(Debug, Default)]
pub struct SimulatedLedger {
    state: Mutex<LedgerState>,
    connected: AtomicBool,
    offline: AtomicBool,
    drop_next_response: AtomicBool,
    submit_delay: Mutex<Option<Duration>>,
}

impl SimulatedLedger {
    /// Empty ledger at index 1
    pub fn new() -> Self {
        let ledger = Self::default();
        ledger.state.lock().ledger_index = 1;
        ledger
    }

    /// Set an account's XRP balance
    pub fn fund(&self, address: &str, drops: u64) {
        self.state.lock().account(address).balance_drops = drops;
    }

    /// Require issuer authorization for holders of `issuer`'s currencies
    pub fn require_auth(&self, issuer: &str) {
        self.state.lock().require_auth.insert(issuer.to_string());
    }

    /// Cut or restore connectivity
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        if offline {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    /// Make the next submission fail with `engine_result`
    pub fn fail_next(&self, engine_result: &str, message: &str) {
        self.state
            .lock()
            .scripted_failures
            .push_back((engine_result.to_string(), message.to_string()));
    }

    /// Apply the next submission, then fail with a connection error instead
    /// of returning its result
    pub fn drop_next_response(&self) {
        self.drop_next_response.store(true, Ordering::SeqCst);
    }

    /// Delay validation of every submission
    pub fn set_submit_delay(&self, delay: Option<Duration>) {
        *self.submit_delay.lock() = delay;
    }

    /// Add an offer to the order book
    pub fn place_offer(&self, offer: BookOffer) {
        self.state.lock().offers.push(offer);
    }

    /// Trustline as seen by the holder
    pub fn trustline(&self, holder: &str, issuer: &str, currency: &str) -> Option<TrustLine> {
        let state = self.state.lock();
        state
            .lines
            .get(&LedgerState::line_key(holder, issuer, currency))
            .map(|line| TrustLine {
                account: issuer.to_string(),
                currency: currency.to_string(),
                balance: line.balance,
                limit: line.limit,
                no_ripple: line.no_ripple,
                authorized: line.authorized,
            })
    }

    /// NFT IDs owned by `owner`
    pub fn nfts_owned_by(&self, owner: &str) -> Vec<String> {
        self.state
            .lock()
            .nfts
            .iter()
            .filter(|(_, o)| o.as_str() == owner)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Hashes of every blob that reached the ledger, in order
    pub fn submitted(&self) -> Vec<String> {
        self.state.lock().submitted.clone()
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Connection("simulated ledger is offline".to_string()));
        }
        Ok(())
    }

    fn ensure_connected(&self) -> Result<()> {
        self.ensure_online()?;
        if !self.is_connected() {
            return Err(Error::Connection("not connected".to_string()));
        }
        Ok(())
    }

    fn respond(tx: &SignedTransaction, code: &str, message: &str, ledger_index: Option<u32>) -> SubmitResponse {
        SubmitResponse {
            engine_result: code.to_string(),
            engine_result_message: message.to_string(),
            tx_hash: tx.hash.clone(),
            ledger_index,
            validated: ledger_index.is_some(),
        }
    }
}

#[async_trait]
impl XrplTransport for SimulatedLedger {
    async fn connect(&self) -> Result<()> {
        self.ensure_online()?;
        self.connected.store(true, Ordering::SeqCst);
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
        self.ensure_connected()?;
        let mut state = self.state.lock();
        let ledger_index = state.ledger_index;
        let sequence = state.account(intent.account()).sequence;
        Ok(PreparedTransaction {
            intent: intent.clone(),
            sequence,
            fee_drops: BASE_FEE_DROPS,
            last_ledger_sequence: ledger_index + 20,
        })
    }

    async fn submit_and_wait(&self, tx: &SignedTransaction) -> Result<SubmitResponse> {
        self.ensure_connected()?;

        let delay = *self.submit_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let decoded = match hex::decode(&tx.tx_blob)
            .map_err(|e| Error::Validation(e.to_string()))
            .and_then(|blob| codec::decode_transaction(&blob))
        {
            Ok(decoded) => decoded,
            Err(_) => return Ok(Self::respond(tx, "temMALFORMED", "Malformed transaction.", None)),
        };
        if verify_signature(&decoded).is_err() {
            return Ok(Self::respond(tx, "temBAD_SIGNATURE", "Malformed: Bad signature.", None));
        }
        let intent = decoded.prepared.intent;
        if codec::address_of(&decoded.signing_pub_key) != intent.account() {
            return Ok(Self::respond(tx, "tefBAD_AUTH", "Transaction's public key is not authorized.", None));
        }
        let sequence = decoded.prepared.sequence;
        let fee = decoded.prepared.fee_drops;

        let mut state = self.state.lock();
        let expected = state.account(intent.account()).sequence;
        if sequence < expected {
            return Ok(Self::respond(tx, "tefPAST_SEQ", "This sequence number has already passed.", None));
        }
        if sequence > expected {
            return Ok(Self::respond(tx, "terPRE_SEQ", "Missing/inapplicable prior transaction.", None));
        }

        // Claimed: sequence and fee are consumed whatever the tec outcome
        {
            let account = state.account(intent.account());
            account.sequence += 1;
            account.balance_drops = account.balance_drops.saturating_sub(fee);
        }
        state.ledger_index += 1;
        let ledger_index = state.ledger_index;
        state.submitted.push(tx.hash.clone());

        let response = match state.scripted_failures.pop_front() {
            Some((code, message)) => Self::respond(tx, &code, &message, Some(ledger_index)),
            None => match state.apply(&intent) {
                Ok(()) => Self::respond(tx, TES_SUCCESS, "The transaction was applied. Only final in a validated ledger.", Some(ledger_index)),
                Err((code, message)) => Self::respond(tx, code, message, Some(ledger_index)),
            },
        };

        if self.drop_next_response.swap(false, Ordering::SeqCst) {
            return Err(Error::Connection(format!(
                "connection reset while waiting for {}",
                tx.hash
            )));
        }
        Ok(response)
    }

    async fn account_info(&self, account: &str) -> Result<AccountInfo> {
        self.ensure_connected()?;
        let state = self.state.lock();
        match state.accounts.get(account) {
            Some(acct) => Ok(AccountInfo {
                account: account.to_string(),
                balance_drops: acct.balance_drops,
                sequence: acct.sequence,
            }),
            None => Err(Error::Connection(format!("account_info error: actNotFound {}", account))),
        }
    }

    async fn account_lines(&self, account: &str) -> Result<Vec<TrustLine>> {
        self.ensure_connected()?;
        let state = self.state.lock();
        let mut lines = Vec::new();
        for ((holder, issuer, currency), line) in &state.lines {
            if holder == account {
                lines.push(TrustLine {
                    account: issuer.clone(),
                    currency: currency.clone(),
                    balance: line.balance,
                    limit: line.limit,
                    no_ripple: line.no_ripple,
                    authorized: false,
                });
            } else if issuer == account {
                lines.push(TrustLine {
                    account: holder.clone(),
                    currency: currency.clone(),
                    balance: -line.balance,
                    limit: Decimal::ZERO,
                    no_ripple: false,
                    authorized: line.authorized,
                });
            }
        }
        Ok(lines)
    }

    async fn book_offers(
        &self,
        taker_gets: &CurrencySpec,
        taker_pays: &CurrencySpec,
    ) -> Result<Vec<BookOffer>> {
        self.ensure_connected()?;
        let state = self.state.lock();
        Ok(state
            .offers
            .iter()
            .filter(|o| taker_gets.matches(&o.taker_gets) && taker_pays.matches(&o.taker_pays))
            .cloned()
            .collect())
    }
}
