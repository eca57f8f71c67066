//! Integer USD cents

use crate::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Non-negative amount of USD cents
///
/// Serializes as a decimal string so no JSON consumer ever sees a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Cents(pub u128);

impl Cents {
    /// Zero
    pub const ZERO: Cents = Cents(0);

    /// Raw value
    pub fn value(self) -> u128 {
        self.0
    }

    /// Checked addition
    pub fn checked_add(self, other: Cents) -> Option<Cents> {
        self.0.checked_add(other.0).map(Cents)
    }

    /// Token units (1 token = 100 cents)
    pub fn to_token_units(self) -> Result<Decimal> {
        let cents = i128::try_from(self.0).map_err(|_| Error::Overflow("token units"))?;
        Decimal::try_from_i128_with_scale(cents, 2).map_err(|_| Error::Overflow("token units"))
    }

    /// From token units, rounding half away from zero to the nearest cent
    pub fn from_token_units(units: Decimal) -> Result<Cents> {
        if units.is_sign_negative() && !units.is_zero() {
            return Err(Error::Source(format!("Negative token amount {}", units)));
        }
        let cents = units
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(Error::Overflow("cents"))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let mantissa = cents.mantissa();
        // Scale is 0 after rounding
        u128::try_from(mantissa)
            .map(Cents)
            .map_err(|_| Error::Overflow("cents"))
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cents {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u128>()
            .map(Cents)
            .map_err(|_| Error::Config(format!("Invalid cents value: {}", s)))
    }
}

impl From<u128> for Cents {
    fn from(value: u128) -> Self {
        Cents(value)
    }
}

impl Serialize for Cents {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Cents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Number(n) => Ok(Cents(u128::from(n))),
        }
    }
}
