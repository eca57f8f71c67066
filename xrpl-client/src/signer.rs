//! Signing identities
//!
//! Each operations wallet is an opaque [`Signer`]; key material never leaves
//! the implementation and is never logged. [`LocalSigner`] holds an Ed25519
//! key derived from an XRPL family seed and the classic address that key
//! controls; HSM- or KMS-backed signers plug in behind the same trait.
//!
//! Blobs are the canonical binary encoding from [`crate::codec`]; the
//! transaction hash is SHA-512Half over `TXN\0` and the blob bytes.

use crate::{
    codec::{self, DecodedTransaction},
    types::{PreparedTransaction, SignedTransaction},
    Error, Result,
};
use async_trait::async_trait;
use audit_ledger::SecretString;
use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha512};
use std::fmt;

/// Version prefix of Ed25519 family seeds (encodes as `sEd...`)
const ED25519_SEED_PREFIX: [u8; 3] = [0x01, 0xE1, 0x4B];

/// Key-type prefix of Ed25519 public keys
const ED25519_KEY_PREFIX: u8 = 0xED;

/// Signing identity
#[async_trait]
pub trait Signer: Send + Sync + fmt::Debug {
    /// Classic address this identity signs for
    fn address(&self) -> &str;

    /// Sign a prepared transaction
    async fn sign(&self, tx: &PreparedTransaction) -> Result<SignedTransaction>;
}

/// In-process Ed25519 signer
pub struct LocalSigner {
    address: String,
    signing_key: SigningKey,
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl LocalSigner {
    /// From an Ed25519 family seed (`sEd...`)
    pub fn from_seed(seed: &SecretString) -> Result<Self> {
        let entropy = decode_ed25519_seed(seed.expose())?;
        Ok(Self::from_entropy(&entropy))
    }

    /// From a configured wallet; the seed must control `address`
    pub fn for_wallet(address: &str, seed: &SecretString) -> Result<Self> {
        let signer = Self::from_seed(seed)?;
        if signer.address != address {
            return Err(Error::Config(format!(
                "Seed configured for {} controls {} instead",
                address, signer.address
            )));
        }
        Ok(signer)
    }

    /// From raw 16-byte seed entropy
    pub fn from_entropy(entropy: &[u8; 16]) -> Self {
        let digest = Sha512::digest(entropy);
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&digest[..32]);
        let signing_key = SigningKey::from_bytes(&secret);
        let address = codec::address_of(&public_key_bytes(&signing_key.verifying_key()));
        Self {
            address,
            signing_key,
        }
    }

    /// Random identity (tests and simulations)
    pub fn generate() -> Self {
        Self::from_entropy(&rand::random::<[u8; 16]>())
    }

    /// `SigningPubKey` bytes (`0xED` + public key)
    pub fn public_key(&self) -> [u8; 33] {
        public_key_bytes(&self.signing_key.verifying_key())
    }

    /// `SigningPubKey` field value (`ED` + hex public key)
    pub fn public_key_hex(&self) -> String {
        hex::encode_upper(self.public_key())
    }
}

fn public_key_bytes(key: &VerifyingKey) -> [u8; 33] {
    let mut bytes = [0u8; 33];
    bytes[0] = ED25519_KEY_PREFIX;
    bytes[1..].copy_from_slice(key.as_bytes());
    bytes
}

#[async_trait]
impl Signer for LocalSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, tx: &PreparedTransaction) -> Result<SignedTransaction> {
        let public_key = self.public_key();
        let signing_bytes = codec::signing_data(tx, &public_key)?;
        let signature = self.signing_key.sign(&signing_bytes);
        let blob = codec::encode_transaction(tx, &public_key, Some(&signature.to_bytes()))?;

        Ok(SignedTransaction {
            hash: codec::transaction_id(&blob),
            tx_blob: hex::encode_upper(&blob),
        })
    }
}

/// Decode a signed blob and verify its signature
pub fn verify_blob(tx_blob: &str) -> Result<DecodedTransaction> {
    let blob = hex::decode(tx_blob).map_err(|e| Error::Signing(format!("Invalid blob hex: {}", e)))?;
    let decoded = codec::decode_transaction(&blob)?;
    verify_signature(&decoded)?;
    Ok(decoded)
}

/// Verify `TxnSignature` against `SigningPubKey` over the signing data
pub fn verify_signature(decoded: &DecodedTransaction) -> Result<()> {
    let key_bytes: [u8; 32] = decoded
        .signing_pub_key
        .split_first()
        .filter(|(prefix, _)| **prefix == ED25519_KEY_PREFIX)
        .and_then(|(_, key)| key.try_into().ok())
        .ok_or_else(|| Error::Signing("Unsupported SigningPubKey".to_string()))?;
    let sig_bytes: [u8; 64] = decoded
        .txn_signature
        .as_deref()
        .and_then(|sig| sig.try_into().ok())
        .ok_or_else(|| Error::Signing("Missing or malformed TxnSignature".to_string()))?;

    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| Error::Signing(format!("Invalid public key: {}", e)))?;
    verifying_key
        .verify(&decoded.signing_data, &Signature::from_bytes(&sig_bytes))
        .map_err(|e| Error::Signing(format!("Signature verification failed: {}", e)))
}

/// Transaction hash of a hex-encoded signed blob
pub fn transaction_hash(tx_blob: &str) -> Result<String> {
    let blob = hex::decode(tx_blob).map_err(|e| Error::Signing(format!("Invalid blob hex: {}", e)))?;
    Ok(codec::transaction_id(&blob))
}

fn decode_ed25519_seed(seed: &str) -> Result<[u8; 16]> {
    // Error messages must not echo the seed
    let bytes = bs58::decode(seed.trim())
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(None)
        .into_vec()
        .map_err(|_| Error::Signing("Seed is not a valid base58check string".to_string()))?;

    if bytes.len() != ED25519_SEED_PREFIX.len() + 16 || bytes[..3] != ED25519_SEED_PREFIX {
        return Err(Error::Signing(
            "Only Ed25519 family seeds (sEd...) are supported".to_string(),
        ));
    }

    let mut entropy = [0u8; 16];
    entropy.copy_from_slice(&bytes[3..]);
    Ok(entropy)
}

#[cfg(test)]
pub(crate) fn encode_ed25519_seed(entropy: &[u8; 16]) -> String {
    let mut payload = ED25519_SEED_PREFIX.to_vec();
    payload.extend_from_slice(entropy);
    bs58::encode(payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check()
        .into_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amount, Payment, TransactionIntent};

    const KNOWN_SEED: &str = "sEdSKaCy2JT7JaM7v95H9SxkhP9wS2r";
    const KNOWN_ADDRESS: &str = "rLUEXYuLiQptky37CqLcm9USQpPiz5rkpD";
    const ORACLE: &str = "rH9ESAdrFfDAZtCZGa7JiwNJfKnC6CmGFQ";

    fn prepared(account: &str) -> PreparedTransaction {
        PreparedTransaction {
            intent: TransactionIntent::Payment(
                Payment::direct(account, ORACLE, Amount::Drops(1)).with_memo("por_hash", "0xabc"),
            ),
            sequence: 7,
            fee_drops: 12,
            last_ledger_sequence: 120,
        }
    }

    #[test]
    fn test_seed_roundtrip() {
        let entropy = [7u8; 16];
        let seed = encode_ed25519_seed(&entropy);
        assert!(seed.starts_with("sEd"));
        assert_eq!(decode_ed25519_seed(&seed).unwrap(), entropy);
    }

    #[test]
    fn test_secp_seed_rejected() {
        let mut payload = vec![0x21u8];
        payload.extend_from_slice(&[1u8; 16]);
        let seed = bs58::encode(payload)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .with_check()
            .into_string();
        let err = decode_ed25519_seed(&seed).unwrap_err();
        assert!(!err.to_string().contains(&seed));
    }

    #[test]
    fn test_bad_seed_not_echoed() {
        let secret = SecretString::new("sEdNOTAREALSEED");
        let err = LocalSigner::from_seed(&secret).unwrap_err();
        assert!(!err.to_string().contains("NOTAREALSEED"));
    }

    #[test]
    fn test_address_derived_from_seed() {
        let signer = LocalSigner::from_seed(&SecretString::new(KNOWN_SEED)).unwrap();
        assert_eq!(signer.address(), KNOWN_ADDRESS);
        assert_eq!(
            signer.public_key_hex(),
            "ED01FA53FA5A7E77798F882ECE20B1ABC00BB358A9E55A202D0D0676BD0CE37A63"
        );
    }

    #[test]
    fn test_wallet_seed_mismatch_rejected() {
        let seed = SecretString::new(KNOWN_SEED);
        assert!(LocalSigner::for_wallet(KNOWN_ADDRESS, &seed).is_ok());

        let err = LocalSigner::for_wallet(ORACLE, &seed).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains(KNOWN_ADDRESS));
        assert!(!err.to_string().contains(KNOWN_SEED));
    }

    #[test]
    fn test_debug_redacts_key() {
        let signer = LocalSigner::generate();
        let debug = format!("{:?}", signer);
        assert!(debug.contains(signer.address()));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_known_signed_blob() {
        let signer = LocalSigner::from_seed(&SecretString::new(KNOWN_SEED)).unwrap();
        let signed = signer.sign(&prepared(KNOWN_ADDRESS)).await.unwrap();

        assert_eq!(
            signed.tx_blob,
            "12000022000000002400000007201B0000007861400000000000000168400000000000000C\
             7321ED01FA53FA5A7E77798F882ECE20B1ABC00BB358A9E55A202D0D0676BD0CE37A63\
             7440645CD3B04885DDD26F303218CEEB383719C4AB4740B861C99C414A19CB7859C7620D\
             9BE1109AF48C47C51165CFC0CFC6B6D1887CA8BBDD2A9B31C932B9F53F04\
             8114D28B177E48D9A8D057E70F7E464B498367281B98\
             8314B1116674226780351A13D02B77003362A11D6774\
             F9EA7C08706F725F686173687D053078616263E1F1"
        );
        assert_eq!(
            signed.hash,
            "80001FD460103218433554D149404EF5591CD183CA20E06DCB64CC2E379429E4"
        );
        assert_eq!(transaction_hash(&signed.tx_blob).unwrap(), signed.hash);
    }

    #[tokio::test]
    async fn test_sign_and_verify() {
        let seed = SecretString::new(encode_ed25519_seed(&[3u8; 16]));
        let signer = LocalSigner::from_seed(&seed).unwrap();

        let signed = signer.sign(&prepared(signer.address())).await.unwrap();
        assert_eq!(signed.hash.len(), 64);

        let decoded = verify_blob(&signed.tx_blob).unwrap();
        assert_eq!(decoded.prepared, prepared(signer.address()));
        assert_eq!(decoded.signing_pub_key, signer.public_key().to_vec());

        // Deterministic: same key, same transaction, same hash
        let again = signer.sign(&prepared(signer.address())).await.unwrap();
        assert_eq!(again.hash, signed.hash);
    }

    #[tokio::test]
    async fn test_tampered_blob_rejected() {
        let signer = LocalSigner::generate();
        let signed = signer.sign(&prepared(signer.address())).await.unwrap();

        // Sequence 7 -> 8
        let forged = signed.tx_blob.replacen("2400000007", "2400000008", 1);
        assert_ne!(forged, signed.tx_blob);
        assert!(matches!(verify_blob(&forged), Err(Error::Signing(_))));
    }
}
