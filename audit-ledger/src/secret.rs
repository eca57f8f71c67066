//! Credential wrapper that never prints its contents

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

const REDACTED: &str = "[REDACTED]";

/// Secret string (wallet seeds, operator keys)
///
/// `Debug`, `Display` and `Serialize` all emit `[REDACTED]`; the only way to
/// read the value is [`SecretString::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the raw secret
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<String> for SecretString {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| Self(s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_printed() {
        let seed = SecretString::new("sEdTM1uX8pu2do5XvTnutH6HsouMaM2");
        assert_eq!(format!("{:?}", seed), "[REDACTED]");
        assert_eq!(format!("{}", seed), "[REDACTED]");
        assert_eq!(serde_json::to_string(&seed).unwrap(), "\"[REDACTED]\"");
        assert_eq!(seed.expose(), "sEdTM1uX8pu2do5XvTnutH6HsouMaM2");
    }

    #[test]
    fn test_deserialize_trims() {
        let seed: SecretString = serde_json::from_str("\"  abc \"").unwrap();
        assert_eq!(seed.expose(), "abc");
    }
}
