//! Configuration for the XRPL client

use crate::{codec, signer::LocalSigner};
use audit_ledger::SecretString;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operations wallet: classic address plus its (redacted) family seed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Classic address (`r...`) the seed signs for
    pub address: String,

    /// Ed25519 family seed (`sEd...`)
    pub seed: SecretString,
}

/// Trustline limits offered to members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustLimits {
    /// FTHUSD trustline limit (logical ceiling, not a risk limit)
    pub fthusd: Decimal,

    /// USDF trustline limit
    pub usdf: Decimal,
}

impl Default for TrustLimits {
    fn default() -> Self {
        Self {
            fthusd: Decimal::from(1_000_000u64),
            usdf: Decimal::from(1_000_000_000u64),
        }
    }
}

/// XRPL client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrplConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,

    /// FTHUSD issuing account
    pub fthusd_issuer: String,

    /// USDF issuing account
    pub usdf_issuer: String,

    /// Gold vault account (receives USDF for gold orders, mints order NFTs)
    pub gold_vault: String,

    /// Oracle account (destination of PoR anchors)
    pub oracle_account: String,

    /// Bonus operations wallet
    pub ops_bonus: Option<WalletConfig>,

    /// Gold operations wallet
    pub ops_gold: Option<WalletConfig>,

    /// Oracle operations wallet
    pub ops_oracle: Option<WalletConfig>,

    /// Issuer operations wallet (credits, authorizations, membership NFTs)
    pub ops_issuer: Option<WalletConfig>,

    /// Bound on submit-and-wait (seconds); about five ledger closes by default
    pub submit_timeout_secs: u64,

    /// Trustline limits
    #[serde(default)]
    pub trust_limits: TrustLimits,
}

impl Default for XrplConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://s.altnet.rippletest.net:51234".to_string(),
            fthusd_issuer: String::new(),
            usdf_issuer: String::new(),
            gold_vault: String::new(),
            oracle_account: String::new(),
            ops_bonus: None,
            ops_gold: None,
            ops_oracle: None,
            ops_issuer: None,
            submit_timeout_secs: 20,
            trust_limits: TrustLimits::default(),
        }
    }
}

impl XrplConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read XRPL config: {}", e)))?;
        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse XRPL config: {}", e)))
    }

    /// Build from `XRPL_*` environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `XRPL_*` environment overrides on top of the current values
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Some(v) = env_var("XRPL_RPC_URL") {
            self.rpc_url = v;
        }
        if let Some(v) = env_var("XRPL_FTHUSD_ISSUER") {
            self.fthusd_issuer = v;
        }
        if let Some(v) = env_var("XRPL_USDF_ISSUER") {
            self.usdf_issuer = v;
        }
        if let Some(v) = env_var("XRPL_GOLD_VAULT") {
            self.gold_vault = v;
        }
        if let Some(v) = env_var("XRPL_ORACLE_ACCOUNT") {
            self.oracle_account = v;
        }
        if let Some(v) = env_var("XRPL_SUBMIT_TIMEOUT_SECS") {
            self.submit_timeout_secs = v
                .parse()
                .map_err(|_| crate::Error::Config(format!("Invalid XRPL_SUBMIT_TIMEOUT_SECS: {}", v)))?;
        }

        wallet_from_env("BONUS", &mut self.ops_bonus)?;
        wallet_from_env("GOLD", &mut self.ops_gold)?;
        wallet_from_env("ORACLE", &mut self.ops_oracle)?;
        wallet_from_env("ISSUER", &mut self.ops_issuer)?;
        Ok(())
    }

    /// Check that the core accounts are well-formed classic addresses and
    /// that every configured seed controls its wallet address
    pub fn validate(&self) -> crate::Result<()> {
        let required = [
            ("XRPL_FTHUSD_ISSUER", &self.fthusd_issuer),
            ("XRPL_USDF_ISSUER", &self.usdf_issuer),
            ("XRPL_GOLD_VAULT", &self.gold_vault),
            ("XRPL_ORACLE_ACCOUNT", &self.oracle_account),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(crate::Error::Config(format!("Missing required setting: {}", name)));
            }
            if !codec::is_valid_address(value) {
                return Err(crate::Error::Config(format!(
                    "{} is not a valid XRPL address: {}",
                    name, value
                )));
            }
        }
        let wallets = [
            ("bonus", &self.ops_bonus),
            ("gold", &self.ops_gold),
            ("oracle", &self.ops_oracle),
            ("issuer", &self.ops_issuer),
        ];
        for (role, wallet) in wallets {
            if let Some(wallet) = wallet {
                LocalSigner::for_wallet(&wallet.address, &wallet.seed).map_err(|e| {
                    crate::Error::Config(format!("Operations wallet '{}': {}", role, e))
                })?;
            }
        }
        if self.submit_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "submit_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Submission timeout
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `XRPL_OPS_<ROLE>_SEED` + `XRPL_OPS_<ROLE>_ADDRESS`
fn wallet_from_env(role: &str, slot: &mut Option<WalletConfig>) -> crate::Result<()> {
    let seed = env_var(&format!("XRPL_OPS_{}_SEED", role));
    let address = env_var(&format!("XRPL_OPS_{}_ADDRESS", role));
    match (seed, address) {
        (Some(seed), Some(address)) => {
            *slot = Some(WalletConfig {
                address,
                seed: SecretString::new(seed),
            });
            Ok(())
        }
        (None, None) => Ok(()),
        _ => Err(crate::Error::Config(format!(
            "XRPL_OPS_{role}_SEED and XRPL_OPS_{role}_ADDRESS must be set together"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = XrplConfig::default();
        assert_eq!(config.submit_timeout(), Duration::from_secs(20));
        assert_eq!(config.trust_limits.fthusd, Decimal::from(1_000_000u64));
        assert!(config.validate().is_err());
    }

    fn valid() -> XrplConfig {
        XrplConfig {
            fthusd_issuer: "r3sNTMefq5gsRumMYsNznnX6yzzxVH6dTC".into(),
            usdf_issuer: "rpjfAeE3DeeHPFnN2PgGFW5YxnZFAjrEyN".into(),
            gold_vault: "rPPdduC9MRTrXZP1J7MQyEKKEYiFigWZ6Q".into(),
            oracle_account: "rH9ESAdrFfDAZtCZGa7JiwNJfKnC6CmGFQ".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_malformed_account_rejected() {
        assert!(valid().validate().is_ok());
        let config = XrplConfig {
            gold_vault: "rGoldVault".into(),
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("XRPL_GOLD_VAULT"));
    }

    #[test]
    fn test_seed_must_control_wallet_address() {
        // Seed of the issuer wallet configured for the oracle wallet
        let config = XrplConfig {
            ops_oracle: Some(WalletConfig {
                address: "rfPaNmieF15VqV752Q8qAc6ugtkKhWsA2R".into(),
                seed: SecretString::new("sEdSKaVGtEer9RrxMSMhFM2WVSW5LT3"),
            }),
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
        assert!(err.to_string().contains("oracle"));
        assert!(!err.to_string().contains("sEdSKaVGtEer9RrxMSMhFM2WVSW5LT3"));
    }

    #[test]
    fn test_seed_redacted_in_debug() {
        let config = XrplConfig {
            ops_oracle: Some(WalletConfig {
                address: "rOracleOps".into(),
                seed: SecretString::new("sEdSECRETSEEDVALUE"),
            }),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sEdSECRETSEEDVALUE"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_parse_toml() {
        let config: XrplConfig = toml::from_str(
            r#"
            rpc_url = "http://localhost:5005"
            fthusd_issuer = "r3sNTMefq5gsRumMYsNznnX6yzzxVH6dTC"
            usdf_issuer = "rpjfAeE3DeeHPFnN2PgGFW5YxnZFAjrEyN"
            gold_vault = "rPPdduC9MRTrXZP1J7MQyEKKEYiFigWZ6Q"
            oracle_account = "rH9ESAdrFfDAZtCZGa7JiwNJfKnC6CmGFQ"
            submit_timeout_secs = 30

            [ops_oracle]
            address = "rfPaNmieF15VqV752Q8qAc6ugtkKhWsA2R"
            seed = "sEdSMXdyfRjacE2nqs3geMqTSPkwE57"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.ops_oracle.unwrap().seed.expose(),
            "sEdSMXdyfRjacE2nqs3geMqTSPkwE57"
        );
        assert_eq!(config.trust_limits.usdf, Decimal::from(1_000_000_000u64));
    }
}
