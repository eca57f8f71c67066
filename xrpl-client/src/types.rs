//! Typed XRPL transaction intents and responses
//!
//! Only the small closed set of shapes the program uses is modelled: Payment,
//! TrustSet, NFTokenMint and NFTokenBurn on the way in; account_info,
//! account_lines and book_offers on the way out.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// FTHUSD currency code
pub const FTHUSD: &str = "FTHUSD";
/// USDF currency code
pub const USDF: &str = "USDF";
/// Native currency
pub const XRP: &str = "XRP";

/// Currencies issued by the program
pub const PROGRAM_CURRENCIES: [&str; 2] = [FTHUSD, USDF];

/// Drops per XRP
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Taxon of gold-order NFTs
pub const GOLD_ORDER_NFT_TAXON: u32 = 1;
/// Taxon of membership NFTs
pub const MEMBERSHIP_NFT_TAXON: u32 = 2;

/// Successful engine result
pub const TES_SUCCESS: &str = "tesSUCCESS";

/// Transaction flags
pub mod flags {
    /// Payment: deliver whatever arrives (forbidden for program currencies)
    pub const TF_PARTIAL_PAYMENT: u32 = 0x0002_0000;
    /// Payment: do not use the default path
    pub const TF_NO_DIRECT_RIPPLE: u32 = 0x0001_0000;
    /// TrustSet: authorize the counterparty to hold the issuer's currency
    pub const TF_SET_F_AUTH: u32 = 0x0001_0000;
    /// TrustSet: block rippling through this trustline
    pub const TF_SET_NO_RIPPLE: u32 = 0x0002_0000;
    /// TrustSet: re-enable rippling
    pub const TF_CLEAR_NO_RIPPLE: u32 = 0x0004_0000;
    /// NFTokenMint: token may be transferred to third parties
    pub const TF_TRANSFERABLE: u32 = 0x0000_0008;
}

/// Whether `currency` is FTHUSD or USDF
pub fn is_program_currency(currency: &str) -> bool {
    PROGRAM_CURRENCIES.contains(&currency)
}

/// Encode a currency code for the wire
///
/// Three-letter codes go as-is; longer codes (FTHUSD, USDF) use the 160-bit
/// hex form, ASCII left-aligned and zero padded.
pub fn encode_currency(code: &str) -> String {
    if code.len() == 3 {
        return code.to_string();
    }
    let mut bytes = [0u8; 20];
    for (slot, b) in bytes.iter_mut().zip(code.bytes()) {
        *slot = b;
    }
    hex::encode_upper(bytes)
}

/// Decode a wire currency code back to its ASCII form
pub fn decode_currency(code: &str) -> String {
    if code.len() != 40 {
        return code.to_string();
    }
    match hex::decode(code) {
        Ok(bytes) => {
            let trimmed: Vec<u8> = bytes.into_iter().take_while(|b| *b != 0).collect();
            String::from_utf8(trimmed).unwrap_or_else(|_| code.to_string())
        }
        Err(_) => code.to_string(),
    }
}

/// Issued-currency amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedAmount {
    /// Currency code (ASCII form)
    pub currency: String,
    /// Issuing account
    pub issuer: String,
    /// Amount in token units
    pub value: Decimal,
}

impl IssuedAmount {
    /// New issued amount
    pub fn new(currency: &str, issuer: &str, value: Decimal) -> Self {
        Self {
            currency: currency.to_string(),
            issuer: issuer.to_string(),
            value,
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "currency": encode_currency(&self.currency),
            "issuer": self.issuer,
            "value": self.value.normalize().to_string(),
        })
    }
}

/// XRP (in drops) or issued-currency amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Amount {
    /// Native XRP in drops
    Drops(u64),
    /// Issued currency
    Issued(IssuedAmount),
}

impl Amount {
    /// Currency code (`XRP` for drops)
    pub fn currency(&self) -> &str {
        match self {
            Amount::Drops(_) => XRP,
            Amount::Issued(a) => a.currency.as_str(),
        }
    }

    /// Issuer, if issued
    pub fn issuer(&self) -> Option<&str> {
        match self {
            Amount::Drops(_) => None,
            Amount::Issued(a) => Some(a.issuer.as_str()),
        }
    }

    /// Value in whole units (XRP for drops)
    pub fn value(&self) -> Decimal {
        match self {
            Amount::Drops(drops) => Decimal::from(*drops) / Decimal::from(DROPS_PER_XRP),
            Amount::Issued(a) => a.value,
        }
    }

    /// Whether the amount moves FTHUSD or USDF
    pub fn is_program_currency(&self) -> bool {
        matches!(self, Amount::Issued(a) if is_program_currency(&a.currency))
    }

    /// Wire representation
    pub fn to_json(&self) -> Value {
        match self {
            Amount::Drops(drops) => Value::String(drops.to_string()),
            Amount::Issued(a) => a.to_json(),
        }
    }

    /// Parse the wire representation
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(drops) => drops.parse().ok().map(Amount::Drops),
            Value::Object(obj) => {
                let currency = decode_currency(obj.get("currency")?.as_str()?);
                let issuer = obj.get("issuer")?.as_str()?.to_string();
                let value = obj.get("value")?.as_str()?.parse().ok()?;
                Some(Amount::Issued(IssuedAmount {
                    currency,
                    issuer,
                    value,
                }))
            }
            _ => None,
        }
    }
}

/// Memo carried by a transaction (plain text; hex-encoded on the wire)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    /// Memo type, e.g. `deposit_id`
    #[serde(rename = "type")]
    pub memo_type: String,
    /// Memo payload
    pub data: String,
}

impl Memo {
    /// New memo
    pub fn new(memo_type: &str, data: impl Into<String>) -> Self {
        Self {
            memo_type: memo_type.to_string(),
            data: data.into(),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "Memo": {
                "MemoType": hex::encode(self.memo_type.as_bytes()),
                "MemoData": hex::encode(self.data.as_bytes()),
            }
        })
    }

    fn from_json(value: &Value) -> Option<Self> {
        let memo = value.get("Memo")?;
        let decode = |field: &str| -> Option<String> {
            let raw = hex::decode(memo.get(field)?.as_str()?).ok()?;
            String::from_utf8(raw).ok()
        };
        Some(Self {
            memo_type: decode("MemoType")?,
            data: decode("MemoData").unwrap_or_default(),
        })
    }
}

/// One step of a payment path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Rippling-through account
    pub account: Option<String>,
    /// Currency to convert into
    pub currency: Option<String>,
    /// Issuer of that currency
    pub issuer: Option<String>,
}

/// Payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Sending account
    pub account: String,
    /// Receiving account
    pub destination: String,
    /// Amount delivered
    pub amount: Amount,
    /// Transaction flags
    pub flags: u32,
    /// Explicit path list (forbidden for program currencies)
    pub paths: Option<Vec<Vec<PathStep>>>,
    /// Memos
    pub memos: Vec<Memo>,
}

impl Payment {
    /// Direct payment with no flags and no paths
    pub fn direct(account: &str, destination: &str, amount: Amount) -> Self {
        Self {
            account: account.to_string(),
            destination: destination.to_string(),
            amount,
            flags: 0,
            paths: None,
            memos: Vec::new(),
        }
    }

    /// Attach a memo
    pub fn with_memo(mut self, memo_type: &str, data: impl Into<String>) -> Self {
        self.memos.push(Memo::new(memo_type, data));
        self
    }
}

/// TrustSet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSet {
    /// Account setting the line
    pub account: String,
    /// Limit (`issuer` is the counterparty)
    pub limit: IssuedAmount,
    /// Transaction flags
    pub flags: u32,
}

impl TrustSet {
    /// Holder-side trustline; always carries `tfSetNoRipple`
    pub fn member_line(holder: &str, currency: &str, issuer: &str, limit: Decimal) -> Self {
        Self {
            account: holder.to_string(),
            limit: IssuedAmount::new(currency, issuer, limit),
            flags: flags::TF_SET_NO_RIPPLE,
        }
    }

    /// Issuer-side authorization of a holder's trustline
    pub fn authorization(issuer: &str, currency: &str, holder: &str) -> Self {
        Self {
            account: issuer.to_string(),
            limit: IssuedAmount::new(currency, holder, Decimal::ZERO),
            flags: flags::TF_SET_F_AUTH,
        }
    }

    /// Whether this is an issuer authorization rather than a holder line
    pub fn is_authorization(&self) -> bool {
        self.flags & flags::TF_SET_F_AUTH != 0
    }

    /// Whether `tfSetNoRipple` is set
    pub fn has_no_ripple(&self) -> bool {
        self.flags & flags::TF_SET_NO_RIPPLE != 0
    }
}

/// NFTokenMint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NFTokenMint {
    /// Minting account
    pub account: String,
    /// Token taxon
    pub taxon: u32,
    /// Transaction flags
    pub flags: u32,
    /// Metadata URI (plain text; hex-encoded on the wire)
    pub uri: String,
    /// Mint directly to this account
    pub destination: Option<String>,
    /// Memos
    pub memos: Vec<Memo>,
}

/// NFTokenBurn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NFTokenBurn {
    /// Account owning the token
    pub account: String,
    /// Token ID
    pub nftoken_id: String,
    /// Memos
    pub memos: Vec<Memo>,
}

/// Unsigned transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionIntent {
    /// Payment
    Payment(Payment),
    /// TrustSet
    TrustSet(TrustSet),
    /// NFTokenMint
    NFTokenMint(NFTokenMint),
    /// NFTokenBurn
    NFTokenBurn(NFTokenBurn),
}

/// Payload summary persisted with every submission record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSummary {
    /// Transaction type
    #[serde(rename = "type")]
    pub tx_type: String,
    /// Destination (falls back to the sending account)
    pub destination: String,
    /// Amount as a decimal string, empty when none
    pub amount: String,
    /// Currency code, empty when none
    pub currency: String,
    /// Memos in plain text
    pub memos: Vec<Memo>,
}

impl TransactionIntent {
    /// `TransactionType` field
    pub fn transaction_type(&self) -> &'static str {
        match self {
            TransactionIntent::Payment(_) => "Payment",
            TransactionIntent::TrustSet(_) => "TrustSet",
            TransactionIntent::NFTokenMint(_) => "NFTokenMint",
            TransactionIntent::NFTokenBurn(_) => "NFTokenBurn",
        }
    }

    /// Sending account (owner of the sequence number)
    pub fn account(&self) -> &str {
        match self {
            TransactionIntent::Payment(tx) => &tx.account,
            TransactionIntent::TrustSet(tx) => &tx.account,
            TransactionIntent::NFTokenMint(tx) => &tx.account,
            TransactionIntent::NFTokenBurn(tx) => &tx.account,
        }
    }

    /// Destination, or the sending account when the type has none
    pub fn destination(&self) -> &str {
        match self {
            TransactionIntent::Payment(tx) => tx.destination.as_str(),
            TransactionIntent::NFTokenMint(NFTokenMint {
                destination: Some(dest),
                ..
            }) => dest.as_str(),
            other => other.account(),
        }
    }

    /// Amount moved, if any
    pub fn amount(&self) -> Option<&Amount> {
        match self {
            TransactionIntent::Payment(tx) => Some(&tx.amount),
            _ => None,
        }
    }

    /// Memos
    pub fn memos(&self) -> &[Memo] {
        match self {
            TransactionIntent::Payment(tx) => &tx.memos,
            TransactionIntent::NFTokenMint(tx) => &tx.memos,
            TransactionIntent::NFTokenBurn(tx) => &tx.memos,
            TransactionIntent::TrustSet(_) => &[],
        }
    }

    /// Audit payload summary
    pub fn summary(&self) -> PayloadSummary {
        let (amount, currency) = match self {
            TransactionIntent::TrustSet(tx) => (
                tx.limit.value.normalize().to_string(),
                tx.limit.currency.clone(),
            ),
            other => match other.amount() {
                Some(amount) => (
                    amount.value().normalize().to_string(),
                    amount.currency().to_string(),
                ),
                None => (String::new(), String::new()),
            },
        };
        PayloadSummary {
            tx_type: self.transaction_type().to_string(),
            destination: self.destination().to_string(),
            amount,
            currency,
            memos: self.memos().to_vec(),
        }
    }

    /// Unsigned `tx_json` without network fields
    pub fn to_json(&self) -> Value {
        let mut tx = Map::new();
        tx.insert("TransactionType".into(), json!(self.transaction_type()));
        tx.insert("Account".into(), json!(self.account()));

        match self {
            TransactionIntent::Payment(p) => {
                tx.insert("Destination".into(), json!(p.destination));
                tx.insert("Amount".into(), p.amount.to_json());
                tx.insert("Flags".into(), json!(p.flags));
                if let Some(paths) = &p.paths {
                    tx.insert("Paths".into(), paths_to_json(paths));
                }
            }
            TransactionIntent::TrustSet(t) => {
                tx.insert("LimitAmount".into(), t.limit.to_json());
                tx.insert("Flags".into(), json!(t.flags));
            }
            TransactionIntent::NFTokenMint(m) => {
                tx.insert("NFTokenTaxon".into(), json!(m.taxon));
                tx.insert("Flags".into(), json!(m.flags));
                tx.insert("URI".into(), json!(hex::encode_upper(m.uri.as_bytes())));
                if let Some(dest) = &m.destination {
                    // Minting to a destination creates a zero-priced sell offer
                    tx.insert("Destination".into(), json!(dest));
                    tx.insert("Amount".into(), Amount::Drops(0).to_json());
                }
            }
            TransactionIntent::NFTokenBurn(b) => {
                tx.insert("NFTokenID".into(), json!(b.nftoken_id));
            }
        }

        let memos = self.memos();
        if !memos.is_empty() {
            tx.insert(
                "Memos".into(),
                Value::Array(memos.iter().map(Memo::to_json).collect()),
            );
        }
        Value::Object(tx)
    }

    /// Rebuild an intent from `tx_json`
    pub fn from_json(tx: &Value) -> Option<Self> {
        let account = tx.get("Account")?.as_str()?.to_string();
        let flags = tx.get("Flags").and_then(Value::as_u64).unwrap_or(0) as u32;
        let memos: Vec<Memo> = tx
            .get("Memos")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Memo::from_json).collect())
            .unwrap_or_default();

        match tx.get("TransactionType")?.as_str()? {
            "Payment" => Some(TransactionIntent::Payment(Payment {
                account,
                destination: tx.get("Destination")?.as_str()?.to_string(),
                amount: Amount::from_json(tx.get("Amount")?)?,
                flags,
                paths: tx.get("Paths").map(paths_from_json),
                memos,
            })),
            "TrustSet" => {
                let limit = match Amount::from_json(tx.get("LimitAmount")?)? {
                    Amount::Issued(limit) => limit,
                    Amount::Drops(_) => return None,
                };
                Some(TransactionIntent::TrustSet(TrustSet {
                    account,
                    limit,
                    flags,
                }))
            }
            "NFTokenMint" => {
                let uri = tx
                    .get("URI")
                    .and_then(Value::as_str)
                    .and_then(|h| hex::decode(h).ok())
                    .and_then(|b| String::from_utf8(b).ok())
                    .unwrap_or_default();
                Some(TransactionIntent::NFTokenMint(NFTokenMint {
                    account,
                    taxon: tx.get("NFTokenTaxon")?.as_u64()? as u32,
                    flags,
                    uri,
                    destination: tx
                        .get("Destination")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    memos,
                }))
            }
            "NFTokenBurn" => Some(TransactionIntent::NFTokenBurn(NFTokenBurn {
                account,
                nftoken_id: tx.get("NFTokenID")?.as_str()?.to_string(),
                memos,
            })),
            _ => None,
        }
    }
}

fn paths_to_json(paths: &[Vec<PathStep>]) -> Value {
    Value::Array(
        paths
            .iter()
            .map(|path| {
                Value::Array(
                    path.iter()
                        .map(|step| {
                            let mut obj = Map::new();
                            if let Some(a) = &step.account {
                                obj.insert("account".into(), json!(a));
                            }
                            if let Some(c) = &step.currency {
                                obj.insert("currency".into(), json!(encode_currency(c)));
                            }
                            if let Some(i) = &step.issuer {
                                obj.insert("issuer".into(), json!(i));
                            }
                            Value::Object(obj)
                        })
                        .collect(),
                )
            })
            .collect(),
    )
}

fn paths_from_json(value: &Value) -> Vec<Vec<PathStep>> {
    let field = |step: &Value, key: &str| step.get(key).and_then(Value::as_str).map(str::to_string);
    value
        .as_array()
        .map(|paths| {
            paths
                .iter()
                .map(|path| {
                    path.as_array()
                        .map(|steps| {
                            steps
                                .iter()
                                .map(|step| PathStep {
                                    account: field(step, "account"),
                                    currency: field(step, "currency").map(|c| decode_currency(&c)),
                                    issuer: field(step, "issuer"),
                                })
                                .collect()
                        })
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Intent with network-dependent fields filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransaction {
    /// The intent
    pub intent: TransactionIntent,
    /// Account sequence
    pub sequence: u32,
    /// Fee in drops
    pub fee_drops: u64,
    /// Last ledger in which the transaction may validate
    pub last_ledger_sequence: u32,
}

impl PreparedTransaction {
    /// `tx_json` including network fields, ready for signing
    pub fn to_json(&self) -> Value {
        let mut tx = self.intent.to_json();
        if let Value::Object(obj) = &mut tx {
            obj.insert("Sequence".into(), json!(self.sequence));
            obj.insert("Fee".into(), json!(self.fee_drops.to_string()));
            obj.insert("LastLedgerSequence".into(), json!(self.last_ledger_sequence));
        }
        tx
    }
}

/// Signed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Hex-encoded signed blob
    pub tx_blob: String,
    /// Transaction hash (known before submission)
    pub hash: String,
}

/// Outcome of submit-and-wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Engine result code
    pub engine_result: String,
    /// Engine result message
    pub engine_result_message: String,
    /// Transaction hash
    pub tx_hash: String,
    /// Ledger the transaction validated in
    pub ledger_index: Option<u32>,
    /// Whether the result comes from a validated ledger
    pub validated: bool,
}

impl SubmitResponse {
    /// Whether the engine result is `tesSUCCESS`
    pub fn is_success(&self) -> bool {
        self.engine_result == TES_SUCCESS
    }
}

/// `account_info` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Account address
    pub account: String,
    /// XRP balance in drops
    pub balance_drops: u64,
    /// Next sequence number
    pub sequence: u32,
}

impl AccountInfo {
    /// XRP balance in whole XRP
    pub fn xrp_balance(&self) -> Decimal {
        Amount::Drops(self.balance_drops).value()
    }
}

/// One `account_lines` entry, from the queried account's perspective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustLine {
    /// Counterparty
    pub account: String,
    /// Currency code (ASCII form)
    pub currency: String,
    /// Balance; negative when the queried account owes (issuer side)
    pub balance: Decimal,
    /// Limit set by the queried account
    pub limit: Decimal,
    /// Whether rippling is disabled on the queried account's side
    pub no_ripple: bool,
    /// Whether the queried account has authorized the counterparty
    pub authorized: bool,
}

/// Currency selector for `book_offers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencySpec {
    /// Currency code (ASCII form)
    pub currency: String,
    /// Issuer; `None` for XRP
    pub issuer: Option<String>,
}

impl CurrencySpec {
    /// Native XRP
    pub fn xrp() -> Self {
        Self {
            currency: XRP.to_string(),
            issuer: None,
        }
    }

    /// Issued currency
    pub fn issued(currency: &str, issuer: &str) -> Self {
        Self {
            currency: currency.to_string(),
            issuer: Some(issuer.to_string()),
        }
    }

    /// Whether `amount` is denominated in this currency
    pub fn matches(&self, amount: &Amount) -> bool {
        amount.currency() == self.currency && amount.issuer() == self.issuer.as_deref()
    }

    /// Wire representation
    pub fn to_json(&self) -> Value {
        match &self.issuer {
            Some(issuer) => json!({ "currency": encode_currency(&self.currency), "issuer": issuer }),
            None => json!({ "currency": XRP }),
        }
    }
}

/// Order-book offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookOffer {
    /// Offer owner
    pub account: String,
    /// Offer sequence
    pub sequence: u32,
    /// What the taker receives
    pub taker_gets: Amount,
    /// What the taker pays
    pub taker_pays: Amount,
}
