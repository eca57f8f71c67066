//! XRPL binary serialization
//!
//! Canonical binary encoding of the transaction shapes in [`crate::types`]:
//! field headers sorted by (type code, field code), variable-length prefixes,
//! the 64-bit amount formats and 20-byte AccountIDs. Signing data and
//! transaction IDs are computed over this encoding, so blobs built here are
//! accepted by rippled as-is.
//!
//! Classic addresses are base58check over version byte `0x00` and the
//! AccountID, which is RIPEMD-160 of SHA-256 of the 33-byte public key.

use crate::{
    types::{
        Amount, IssuedAmount, Memo, NFTokenBurn, NFTokenMint, PathStep, Payment,
        PreparedTransaction, TransactionIntent, TrustSet, XRP,
    },
    Error, Result,
};
use ripemd::Ripemd160;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256, Sha512};

/// Prefix for single-signing data
pub const SIGNING_PREFIX: &[u8] = b"STX\0";

/// Prefix for transaction IDs
pub const TX_ID_PREFIX: &[u8] = b"TXN\0";

const ACCOUNT_ID_VERSION: u8 = 0x00;

const ST_UINT16: u8 = 1;
const ST_UINT32: u8 = 2;
const ST_HASH256: u8 = 5;
const ST_AMOUNT: u8 = 6;
const ST_BLOB: u8 = 7;
const ST_ACCOUNT: u8 = 8;
const ST_OBJECT: u8 = 14;
const ST_ARRAY: u8 = 15;
const ST_PATHSET: u8 = 18;

const OBJECT_END: u8 = 0xE1;
const ARRAY_END: u8 = 0xF1;

const PATH_SEPARATOR: u8 = 0xFF;
const PATHSET_END: u8 = 0x00;
const PATH_STEP_ACCOUNT: u8 = 0x01;
const PATH_STEP_CURRENCY: u8 = 0x10;
const PATH_STEP_ISSUER: u8 = 0x20;

const AMOUNT_NOT_XRP: u64 = 0x8000_0000_0000_0000;
const AMOUNT_POSITIVE: u64 = 0x4000_0000_0000_0000;
const MAX_DROPS: u64 = 100_000_000_000_000_000;
const MANTISSA_MASK: u64 = (1 << 54) - 1;
const MIN_MANTISSA: u128 = 1_000_000_000_000_000;
const MAX_MANTISSA: u128 = 9_999_999_999_999_999;
const MIN_EXPONENT: i32 = -96;
const MAX_EXPONENT: i32 = 80;
const EXPONENT_BIAS: i32 = 97;

/// Field identifier: (type code, field code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct FieldId(u8, u8);

const TRANSACTION_TYPE: FieldId = FieldId(ST_UINT16, 2);
const FLAGS: FieldId = FieldId(ST_UINT32, 2);
const SEQUENCE: FieldId = FieldId(ST_UINT32, 4);
const LAST_LEDGER_SEQUENCE: FieldId = FieldId(ST_UINT32, 27);
const NFTOKEN_TAXON: FieldId = FieldId(ST_UINT32, 42);
const NFTOKEN_ID: FieldId = FieldId(ST_HASH256, 10);
const AMOUNT: FieldId = FieldId(ST_AMOUNT, 1);
const LIMIT_AMOUNT: FieldId = FieldId(ST_AMOUNT, 3);
const FEE: FieldId = FieldId(ST_AMOUNT, 8);
const SIGNING_PUB_KEY: FieldId = FieldId(ST_BLOB, 3);
const TXN_SIGNATURE: FieldId = FieldId(ST_BLOB, 4);
const URI: FieldId = FieldId(ST_BLOB, 5);
const MEMO_TYPE: FieldId = FieldId(ST_BLOB, 12);
const MEMO_DATA: FieldId = FieldId(ST_BLOB, 13);
const ACCOUNT: FieldId = FieldId(ST_ACCOUNT, 1);
const DESTINATION: FieldId = FieldId(ST_ACCOUNT, 3);
const MEMO: FieldId = FieldId(ST_OBJECT, 10);
const MEMOS: FieldId = FieldId(ST_ARRAY, 9);
const PATHS: FieldId = FieldId(ST_PATHSET, 1);

const TT_PAYMENT: u16 = 0;
const TT_TRUST_SET: u16 = 20;
const TT_NFTOKEN_MINT: u16 = 25;
const TT_NFTOKEN_BURN: u16 = 26;

fn malformed(message: impl Into<String>) -> Error {
    Error::Validation(format!("Malformed transaction blob: {}", message.into()))
}

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// AccountID of a 33-byte public key
pub fn account_id_of(public_key: &[u8]) -> [u8; 20] {
    let digest = Ripemd160::digest(Sha256::digest(public_key));
    let mut id = [0u8; 20];
    id.copy_from_slice(&digest);
    id
}

/// Classic address of an AccountID
pub fn encode_address(account_id: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(ACCOUNT_ID_VERSION);
    payload.extend_from_slice(account_id);
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check()
        .into_string()
}

/// AccountID of a classic address
pub fn decode_address(address: &str) -> Result<[u8; 20]> {
    let bytes = bs58::decode(address)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(None)
        .into_vec()
        .map_err(|e| Error::Validation(format!("Invalid XRPL address {}: {}", address, e)))?;
    if bytes.len() != 21 || bytes[0] != ACCOUNT_ID_VERSION {
        return Err(Error::Validation(format!("Invalid XRPL address {}", address)));
    }
    let mut id = [0u8; 20];
    id.copy_from_slice(&bytes[1..]);
    Ok(id)
}

/// Classic address controlled by a 33-byte public key
pub fn address_of(public_key: &[u8]) -> String {
    encode_address(&account_id_of(public_key))
}

/// Whether `address` is a well-formed classic address
pub fn is_valid_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn field_header(field: FieldId) -> Vec<u8> {
    let FieldId(type_code, nth) = field;
    match (type_code < 16, nth < 16) {
        (true, true) => vec![(type_code << 4) | nth],
        (true, false) => vec![type_code << 4, nth],
        (false, true) => vec![nth, type_code],
        (false, false) => vec![0, type_code, nth],
    }
}

fn vl_prefix(len: usize) -> Result<Vec<u8>> {
    if len <= 192 {
        Ok(vec![len as u8])
    } else if len <= 12_480 {
        let len = len - 193;
        Ok(vec![193 + (len >> 8) as u8, (len & 0xFF) as u8])
    } else if len <= 918_744 {
        let len = len - 12_481;
        Ok(vec![
            241 + (len >> 16) as u8,
            ((len >> 8) & 0xFF) as u8,
            (len & 0xFF) as u8,
        ])
    } else {
        Err(Error::Validation(format!("Field of {} bytes is too long", len)))
    }
}

fn with_vl(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = vl_prefix(bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(out)
}

fn currency_bytes(code: &str) -> Result<[u8; 20]> {
    let mut bytes = [0u8; 20];
    if code == XRP {
        return Ok(bytes);
    }
    if !code.is_ascii() || code.len() < 3 || code.len() > 20 {
        return Err(Error::Validation(format!("Unsupported currency code {}", code)));
    }
    if code.len() == 3 {
        bytes[12..15].copy_from_slice(code.as_bytes());
    } else {
        bytes[..code.len()].copy_from_slice(code.as_bytes());
    }
    Ok(bytes)
}

fn issued_value_bits(value: Decimal) -> Result<u64> {
    if value.is_zero() {
        return Ok(AMOUNT_NOT_XRP);
    }
    let positive = value.is_sign_positive();
    let mut mantissa = value.mantissa().unsigned_abs();
    let mut exponent = -(value.scale() as i32);

    while mantissa < MIN_MANTISSA {
        mantissa *= 10;
        exponent -= 1;
    }
    while mantissa > MAX_MANTISSA {
        if mantissa % 10 != 0 {
            return Err(Error::Validation(format!(
                "Amount {} exceeds 16 significant digits",
                value
            )));
        }
        mantissa /= 10;
        exponent += 1;
    }
    if !(MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
        return Err(Error::Validation(format!("Amount {} is out of range", value)));
    }

    let mut bits =
        AMOUNT_NOT_XRP | (((exponent + EXPONENT_BIAS) as u64) << 54) | (mantissa as u64);
    if positive {
        bits |= AMOUNT_POSITIVE;
    }
    Ok(bits)
}

fn encode_issued(amount: &IssuedAmount) -> Result<Vec<u8>> {
    if amount.currency == XRP {
        return Err(Error::Validation("XRP cannot be an issued currency".to_string()));
    }
    let mut out = issued_value_bits(amount.value)?.to_be_bytes().to_vec();
    out.extend_from_slice(&currency_bytes(&amount.currency)?);
    out.extend_from_slice(&decode_address(&amount.issuer)?);
    Ok(out)
}

fn encode_amount(amount: &Amount) -> Result<Vec<u8>> {
    match amount {
        Amount::Drops(drops) if *drops > MAX_DROPS => {
            Err(Error::Validation(format!("{} drops is out of range", drops)))
        }
        Amount::Drops(drops) => Ok((drops | AMOUNT_POSITIVE).to_be_bytes().to_vec()),
        Amount::Issued(issued) => encode_issued(issued),
    }
}

fn encode_account(address: &str) -> Result<Vec<u8>> {
    with_vl(&decode_address(address)?)
}

fn encode_memos(memos: &[Memo]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for memo in memos {
        out.extend(field_header(MEMO));
        out.extend(field_header(MEMO_TYPE));
        out.extend(with_vl(memo.memo_type.as_bytes())?);
        out.extend(field_header(MEMO_DATA));
        out.extend(with_vl(memo.data.as_bytes())?);
        out.push(OBJECT_END);
    }
    out.push(ARRAY_END);
    Ok(out)
}

fn encode_paths(paths: &[Vec<PathStep>]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for (index, path) in paths.iter().enumerate() {
        if index > 0 {
            out.push(PATH_SEPARATOR);
        }
        for step in path {
            let mut kind = 0u8;
            let mut body = Vec::new();
            if let Some(account) = &step.account {
                kind |= PATH_STEP_ACCOUNT;
                body.extend_from_slice(&decode_address(account)?);
            }
            if let Some(currency) = &step.currency {
                kind |= PATH_STEP_CURRENCY;
                body.extend_from_slice(&currency_bytes(currency)?);
            }
            if let Some(issuer) = &step.issuer {
                kind |= PATH_STEP_ISSUER;
                body.extend_from_slice(&decode_address(issuer)?);
            }
            out.push(kind);
            out.extend(body);
        }
    }
    out.push(PATHSET_END);
    Ok(out)
}

fn hash256(hex_id: &str) -> Result<[u8; 32]> {
    hex::decode(hex_id)
        .ok()
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| Error::Validation(format!("Invalid 256-bit identifier {}", hex_id)))
}

fn intent_fields(intent: &TransactionIntent) -> Result<Vec<(FieldId, Vec<u8>)>> {
    let mut fields = vec![(ACCOUNT, encode_account(intent.account())?)];
    let (tx_type, flags) = match intent {
        TransactionIntent::Payment(p) => {
            fields.push((DESTINATION, encode_account(&p.destination)?));
            fields.push((AMOUNT, encode_amount(&p.amount)?));
            if let Some(paths) = &p.paths {
                fields.push((PATHS, encode_paths(paths)?));
            }
            (TT_PAYMENT, p.flags)
        }
        TransactionIntent::TrustSet(t) => {
            fields.push((LIMIT_AMOUNT, encode_issued(&t.limit)?));
            (TT_TRUST_SET, t.flags)
        }
        TransactionIntent::NFTokenMint(m) => {
            fields.push((NFTOKEN_TAXON, m.taxon.to_be_bytes().to_vec()));
            if !m.uri.is_empty() {
                fields.push((URI, with_vl(m.uri.as_bytes())?));
            }
            if let Some(destination) = &m.destination {
                fields.push((DESTINATION, encode_account(destination)?));
                fields.push((AMOUNT, encode_amount(&Amount::Drops(0))?));
            }
            (TT_NFTOKEN_MINT, m.flags)
        }
        TransactionIntent::NFTokenBurn(b) => {
            fields.push((NFTOKEN_ID, hash256(&b.nftoken_id)?.to_vec()));
            (TT_NFTOKEN_BURN, 0)
        }
    };
    fields.push((TRANSACTION_TYPE, tx_type.to_be_bytes().to_vec()));
    fields.push((FLAGS, flags.to_be_bytes().to_vec()));

    let memos = intent.memos();
    if !memos.is_empty() {
        fields.push((MEMOS, encode_memos(memos)?));
    }
    Ok(fields)
}

/// Canonical encoding of a prepared transaction
///
/// `signature` is omitted when building signing data.
pub fn encode_transaction(
    tx: &PreparedTransaction,
    signing_pub_key: &[u8],
    signature: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut fields = intent_fields(&tx.intent)?;
    fields.push((SEQUENCE, tx.sequence.to_be_bytes().to_vec()));
    fields.push((LAST_LEDGER_SEQUENCE, tx.last_ledger_sequence.to_be_bytes().to_vec()));
    fields.push((FEE, encode_amount(&Amount::Drops(tx.fee_drops))?));
    fields.push((SIGNING_PUB_KEY, with_vl(signing_pub_key)?));
    if let Some(signature) = signature {
        fields.push((TXN_SIGNATURE, with_vl(signature)?));
    }
    fields.sort_by_key(|(field, _)| *field);

    let mut out = Vec::new();
    for (field, value) in fields {
        out.extend(field_header(field));
        out.extend(value);
    }
    Ok(out)
}

/// Bytes a single signer signs: `STX\0` followed by the unsigned encoding
pub fn signing_data(tx: &PreparedTransaction, signing_pub_key: &[u8]) -> Result<Vec<u8>> {
    let mut data = SIGNING_PREFIX.to_vec();
    data.extend(encode_transaction(tx, signing_pub_key, None)?);
    Ok(data)
}

/// Transaction ID of a signed blob (uppercase hex)
pub fn transaction_id(blob: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(TX_ID_PREFIX);
    hasher.update(blob);
    let digest = hasher.finalize();
    hex::encode_upper(&digest[..32])
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Signed transaction decoded back into its typed form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    /// Transaction content
    pub prepared: PreparedTransaction,
    /// `SigningPubKey`
    pub signing_pub_key: Vec<u8>,
    /// `TxnSignature`, absent in signing data
    pub txn_signature: Option<Vec<u8>>,
    /// `STX\0` followed by the blob without its `TxnSignature` field
    pub signing_data: Vec<u8>,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| malformed("unexpected end of data"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn field_id(&mut self) -> Result<FieldId> {
        let first = self.byte()?;
        let mut type_code = first >> 4;
        let mut nth = first & 0x0F;
        if type_code == 0 {
            type_code = self.byte()?;
        }
        if nth == 0 {
            nth = self.byte()?;
        }
        Ok(FieldId(type_code, nth))
    }

    fn vl(&mut self) -> Result<&'a [u8]> {
        let b1 = self.byte()? as usize;
        let len = match b1 {
            0..=192 => b1,
            193..=240 => 193 + (b1 - 193) * 256 + self.byte()? as usize,
            241..=254 => {
                let b2 = self.byte()? as usize;
                let b3 = self.byte()? as usize;
                12_481 + (b1 - 241) * 65_536 + b2 * 256 + b3
            }
            _ => return Err(malformed("invalid length prefix")),
        };
        self.take(len)
    }

    fn account(&mut self) -> Result<String> {
        let raw = self.vl()?;
        let id: [u8; 20] = raw
            .try_into()
            .map_err(|_| malformed("AccountID must be 20 bytes"))?;
        Ok(encode_address(&id))
    }

    fn text(&mut self) -> Result<String> {
        String::from_utf8(self.vl()?.to_vec()).map_err(|_| malformed("text field is not UTF-8"))
    }

    fn amount(&mut self) -> Result<Amount> {
        let bits = u64::from_be_bytes(self.array::<8>()?);
        if bits & AMOUNT_NOT_XRP == 0 {
            if bits & AMOUNT_POSITIVE == 0 {
                return Err(malformed("negative XRP amount"));
            }
            return Ok(Amount::Drops(bits & !AMOUNT_POSITIVE));
        }
        let value = decode_issued_value(bits)?;
        let currency = decode_currency_bytes(&self.array::<20>()?)?;
        let issuer = encode_address(&self.array::<20>()?);
        Ok(Amount::Issued(IssuedAmount {
            currency,
            issuer,
            value,
        }))
    }

    fn memos(&mut self) -> Result<Vec<Memo>> {
        let mut memos = Vec::new();
        loop {
            if self.peek() == Some(ARRAY_END) {
                self.pos += 1;
                return Ok(memos);
            }
            if self.field_id()? != MEMO {
                return Err(malformed("unexpected object in Memos"));
            }
            let mut memo_type = String::new();
            let mut data = String::new();
            loop {
                if self.peek() == Some(OBJECT_END) {
                    self.pos += 1;
                    break;
                }
                match self.field_id()? {
                    MEMO_TYPE => memo_type = self.text()?,
                    MEMO_DATA => data = self.text()?,
                    other => return Err(malformed(format!("unexpected memo field {:?}", other))),
                }
            }
            memos.push(Memo { memo_type, data });
        }
    }

    fn paths(&mut self) -> Result<Vec<Vec<PathStep>>> {
        let mut paths = Vec::new();
        let mut current = Vec::new();
        loop {
            match self.byte()? {
                PATHSET_END => {
                    if !current.is_empty() || !paths.is_empty() {
                        paths.push(current);
                    }
                    return Ok(paths);
                }
                PATH_SEPARATOR => paths.push(std::mem::take(&mut current)),
                kind => {
                    let account = match kind & PATH_STEP_ACCOUNT {
                        0 => None,
                        _ => Some(encode_address(&self.array::<20>()?)),
                    };
                    let currency = match kind & PATH_STEP_CURRENCY {
                        0 => None,
                        _ => Some(decode_currency_bytes(&self.array::<20>()?)?),
                    };
                    let issuer = match kind & PATH_STEP_ISSUER {
                        0 => None,
                        _ => Some(encode_address(&self.array::<20>()?)),
                    };
                    current.push(PathStep {
                        account,
                        currency,
                        issuer,
                    });
                }
            }
        }
    }
}

fn decode_currency_bytes(bytes: &[u8; 20]) -> Result<String> {
    let ascii = if bytes[0] == 0 {
        if bytes.iter().all(|b| *b == 0) {
            return Ok(XRP.to_string());
        }
        bytes[12..15].to_vec()
    } else {
        bytes.iter().copied().take_while(|b| *b != 0).collect()
    };
    String::from_utf8(ascii).map_err(|_| malformed("currency code is not ASCII"))
}

fn decode_issued_value(bits: u64) -> Result<Decimal> {
    if bits == AMOUNT_NOT_XRP {
        return Ok(Decimal::ZERO);
    }
    let positive = bits & AMOUNT_POSITIVE != 0;
    let exponent = ((bits >> 54) & 0xFF) as i32 - EXPONENT_BIAS;
    let mut mantissa = (bits & MANTISSA_MASK) as i128;

    let value = if exponent >= 0 {
        for _ in 0..exponent {
            mantissa = mantissa
                .checked_mul(10)
                .ok_or_else(|| malformed("issued amount out of range"))?;
        }
        Decimal::try_from_i128_with_scale(mantissa, 0)
    } else {
        let mut scale = (-exponent) as u32;
        while scale > 28 && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        Decimal::try_from_i128_with_scale(mantissa, scale)
    }
    .map_err(|_| malformed("issued amount out of range"))?;

    Ok(if positive { value } else { -value }.normalize())
}

#[derive(Default)]
struct Fields {
    tx_type: Option<u16>,
    flags: u32,
    sequence: Option<u32>,
    last_ledger_sequence: Option<u32>,
    taxon: Option<u32>,
    nftoken_id: Option<String>,
    amount: Option<Amount>,
    limit: Option<Amount>,
    fee: Option<Amount>,
    signing_pub_key: Option<Vec<u8>>,
    txn_signature: Option<Vec<u8>>,
    uri: String,
    account: Option<String>,
    destination: Option<String>,
    memos: Vec<Memo>,
    paths: Option<Vec<Vec<PathStep>>>,
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| malformed(format!("missing {}", name)))
}

/// Decode a signed blob produced by [`encode_transaction`]
pub fn decode_transaction(blob: &[u8]) -> Result<DecodedTransaction> {
    let mut reader = Reader::new(blob);
    let mut f = Fields::default();
    let mut signature_span = None;

    while !reader.is_empty() {
        let start = reader.pos;
        match reader.field_id()? {
            TRANSACTION_TYPE => f.tx_type = Some(u16::from_be_bytes(reader.array()?)),
            FLAGS => f.flags = u32::from_be_bytes(reader.array()?),
            SEQUENCE => f.sequence = Some(u32::from_be_bytes(reader.array()?)),
            LAST_LEDGER_SEQUENCE => {
                f.last_ledger_sequence = Some(u32::from_be_bytes(reader.array()?))
            }
            NFTOKEN_TAXON => f.taxon = Some(u32::from_be_bytes(reader.array()?)),
            NFTOKEN_ID => f.nftoken_id = Some(hex::encode_upper(reader.array::<32>()?)),
            AMOUNT => f.amount = Some(reader.amount()?),
            LIMIT_AMOUNT => f.limit = Some(reader.amount()?),
            FEE => f.fee = Some(reader.amount()?),
            SIGNING_PUB_KEY => f.signing_pub_key = Some(reader.vl()?.to_vec()),
            TXN_SIGNATURE => {
                f.txn_signature = Some(reader.vl()?.to_vec());
                signature_span = Some((start, reader.pos));
            }
            URI => f.uri = reader.text()?,
            ACCOUNT => f.account = Some(reader.account()?),
            DESTINATION => f.destination = Some(reader.account()?),
            MEMOS => f.memos = reader.memos()?,
            PATHS => f.paths = Some(reader.paths()?),
            other => return Err(malformed(format!("unsupported field {:?}", other))),
        }
    }

    let account = required(f.account, "Account")?;
    let intent = match required(f.tx_type, "TransactionType")? {
        TT_PAYMENT => TransactionIntent::Payment(Payment {
            account,
            destination: required(f.destination, "Destination")?,
            amount: required(f.amount, "Amount")?,
            flags: f.flags,
            paths: f.paths,
            memos: f.memos,
        }),
        TT_TRUST_SET => match required(f.limit, "LimitAmount")? {
            Amount::Issued(limit) => TransactionIntent::TrustSet(TrustSet {
                account,
                limit,
                flags: f.flags,
            }),
            Amount::Drops(_) => return Err(malformed("LimitAmount must be an issued amount")),
        },
        TT_NFTOKEN_MINT => TransactionIntent::NFTokenMint(NFTokenMint {
            account,
            taxon: required(f.taxon, "NFTokenTaxon")?,
            flags: f.flags,
            uri: f.uri,
            destination: f.destination,
            memos: f.memos,
        }),
        TT_NFTOKEN_BURN => TransactionIntent::NFTokenBurn(NFTokenBurn {
            account,
            nftoken_id: required(f.nftoken_id, "NFTokenID")?,
            memos: f.memos,
        }),
        other => return Err(malformed(format!("unsupported TransactionType {}", other))),
    };

    let fee_drops = match required(f.fee, "Fee")? {
        Amount::Drops(drops) => drops,
        Amount::Issued(_) => return Err(malformed("Fee must be XRP")),
    };

    let mut signing_data = SIGNING_PREFIX.to_vec();
    match signature_span {
        Some((start, end)) => {
            signing_data.extend_from_slice(&blob[..start]);
            signing_data.extend_from_slice(&blob[end..]);
        }
        None => signing_data.extend_from_slice(blob),
    }

    Ok(DecodedTransaction {
        prepared: PreparedTransaction {
            intent,
            sequence: required(f.sequence, "Sequence")?,
            fee_drops,
            last_ledger_sequence: required(f.last_ledger_sequence, "LastLedgerSequence")?,
        },
        signing_pub_key: required(f.signing_pub_key, "SigningPubKey")?,
        txn_signature: f.txn_signature,
        signing_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{flags, FTHUSD, GOLD_ORDER_NFT_TAXON, USDF};
    use rust_decimal_macros::dec;

    const ISSUER: &str = "r3sNTMefq5gsRumMYsNznnX6yzzxVH6dTC";
    const MEMBER: &str = "rHhr2iRBgp3ZzzNH4YGQ59G7VAiGPEWj7f";

    fn prepared(intent: TransactionIntent) -> PreparedTransaction {
        PreparedTransaction {
            intent,
            sequence: 7,
            fee_drops: 12,
            last_ledger_sequence: 120,
        }
    }

    #[test]
    fn test_address_of_known_key() {
        let public_key =
            hex::decode("ED01FA53FA5A7E77798F882ECE20B1ABC00BB358A9E55A202D0D0676BD0CE37A63")
                .unwrap();
        assert_eq!(address_of(&public_key), "rLUEXYuLiQptky37CqLcm9USQpPiz5rkpD");
    }

    #[test]
    fn test_address_checksum_enforced() {
        assert!(is_valid_address(ISSUER));
        assert!(!is_valid_address("r3sNTMefq5gsRumMYsNznnX6yzzxVH6dTD"));
        assert!(!is_valid_address("rFthusdIssuer"));
        assert_eq!(encode_address(&decode_address(MEMBER).unwrap()), MEMBER);
    }

    #[test]
    fn test_field_headers() {
        assert_eq!(field_header(TRANSACTION_TYPE), vec![0x12]);
        assert_eq!(field_header(LAST_LEDGER_SEQUENCE), vec![0x20, 0x1B]);
        assert_eq!(field_header(NFTOKEN_TAXON), vec![0x20, 0x2A]);
        assert_eq!(field_header(MEMOS), vec![0xF9]);
        assert_eq!(field_header(PATHS), vec![0x01, 0x12]);
    }

    #[test]
    fn test_vl_prefix_boundaries() {
        assert_eq!(vl_prefix(192).unwrap(), vec![192]);
        assert_eq!(vl_prefix(193).unwrap(), vec![193, 0]);
        assert_eq!(vl_prefix(12_480).unwrap(), vec![240, 255]);
        assert_eq!(vl_prefix(12_481).unwrap(), vec![241, 0, 0]);

        let long = vec![0xAB; 12_481];
        let encoded = with_vl(&long).unwrap();
        assert_eq!(Reader::new(&encoded).vl().unwrap(), long.as_slice());
    }

    #[test]
    fn test_issued_amount_bits() {
        assert_eq!(issued_value_bits(dec!(7072.8)).unwrap(), 0xD559_20AC_9391_4000);
        assert_eq!(issued_value_bits(Decimal::ZERO).unwrap(), AMOUNT_NOT_XRP);
        assert_eq!(decode_issued_value(0xD559_20AC_9391_4000).unwrap(), dec!(7072.8));
        assert_eq!(decode_issued_value(issued_value_bits(dec!(-0.333)).unwrap()).unwrap(), dec!(-0.333));
    }

    #[test]
    fn test_precision_loss_rejected() {
        let err = issued_value_bits(dec!(1234567890.1234567)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(issued_value_bits(dec!(123456789012345600000)).is_ok());
    }

    #[test]
    fn test_xrp_amount_bits() {
        assert_eq!(encode_amount(&Amount::Drops(12)).unwrap(), hex::decode("400000000000000C").unwrap());
        assert!(encode_amount(&Amount::Drops(MAX_DROPS + 1)).is_err());
    }

    #[test]
    fn test_currency_layout() {
        let usd = currency_bytes("USD").unwrap();
        assert_eq!(&usd[12..15], b"USD");
        assert_eq!(decode_currency_bytes(&usd).unwrap(), "USD");

        let fthusd = currency_bytes(FTHUSD).unwrap();
        assert_eq!(hex::encode_upper(fthusd), crate::types::encode_currency(FTHUSD));
        assert_eq!(decode_currency_bytes(&fthusd).unwrap(), FTHUSD);
        assert_eq!(decode_currency_bytes(&[0u8; 20]).unwrap(), XRP);
    }

    #[test]
    fn test_field_order_is_canonical() {
        let intent = TransactionIntent::Payment(Payment::direct(ISSUER, MEMBER, Amount::Drops(1)));
        let blob = encode_transaction(&prepared(intent), &[0xED; 33], None).unwrap();
        // TransactionType, Flags, Sequence, LastLedgerSequence, Amount, Fee
        assert_eq!(&blob[..3], &[0x12, 0x00, 0x00]);
        assert_eq!(blob[3], 0x22);
        assert_eq!(blob[8], 0x24);
        assert_eq!(&blob[13..15], &[0x20, 0x1B]);
        assert_eq!(blob[19], 0x61);
        assert_eq!(blob[28], 0x68);
    }

    #[test]
    fn test_decode_restores_every_shape() {
        let shapes = vec![
            TransactionIntent::Payment(
                Payment::direct(
                    ISSUER,
                    MEMBER,
                    Amount::Issued(IssuedAmount::new(FTHUSD, ISSUER, dec!(1000.25))),
                )
                .with_memo("deposit_id", "dep-1"),
            ),
            TransactionIntent::Payment(Payment {
                paths: Some(vec![
                    vec![PathStep {
                        account: None,
                        currency: Some("USD".into()),
                        issuer: Some(ISSUER.into()),
                    }],
                    vec![PathStep {
                        account: Some(MEMBER.into()),
                        currency: None,
                        issuer: None,
                    }],
                ]),
                flags: flags::TF_NO_DIRECT_RIPPLE,
                ..Payment::direct(ISSUER, MEMBER, Amount::Drops(5))
            }),
            TransactionIntent::TrustSet(TrustSet::member_line(MEMBER, USDF, ISSUER, dec!(1000000))),
            TransactionIntent::TrustSet(TrustSet::authorization(ISSUER, FTHUSD, MEMBER)),
            TransactionIntent::NFTokenMint(NFTokenMint {
                account: ISSUER.into(),
                taxon: GOLD_ORDER_NFT_TAXON,
                flags: flags::TF_TRANSFERABLE,
                uri: "ipfs://fth/gold-order/1".into(),
                destination: Some(MEMBER.into()),
                memos: vec![Memo::new("gold_order_id", "gold-1")],
            }),
            TransactionIntent::NFTokenBurn(NFTokenBurn {
                account: MEMBER.into(),
                nftoken_id: format!("{:064X}", 42),
                memos: vec![],
            }),
        ];

        for intent in shapes {
            let tx = prepared(intent);
            let blob = encode_transaction(&tx, &[0xED; 33], Some(&[0x11; 64])).unwrap();
            let decoded = decode_transaction(&blob).unwrap();
            assert_eq!(decoded.prepared, tx);
            assert_eq!(decoded.signing_pub_key, vec![0xED; 33]);
            assert_eq!(decoded.txn_signature, Some(vec![0x11; 64]));
            assert_eq!(decoded.signing_data, signing_data(&tx, &[0xED; 33]).unwrap());
        }
    }

    #[test]
    fn test_invalid_address_rejected_before_encoding() {
        let intent =
            TransactionIntent::Payment(Payment::direct(ISSUER, "rNotAnAddress", Amount::Drops(1)));
        let err = encode_transaction(&prepared(intent), &[0xED; 33], None).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_truncated_blob_rejected() {
        let intent = TransactionIntent::Payment(Payment::direct(ISSUER, MEMBER, Amount::Drops(1)));
        let blob = encode_transaction(&prepared(intent), &[0xED; 33], None).unwrap();
        assert!(decode_transaction(&blob[..blob.len() - 3]).is_err());
    }
}
