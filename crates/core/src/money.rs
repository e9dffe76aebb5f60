use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A signed statement amount. Kept at the precision the bank reported it;
/// equality and hashing compare numeric value, so `-18.7 == -18.70`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// Canonical text used in identity keys: numeric value, no trailing zeros.
    pub fn canonical(self) -> String {
        self.0.normalize().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid amount '{0}'")]
pub struct ParseMoneyError(pub String);

impl FromStr for Money {
    type Err = ParseMoneyError;

    /// Accepts `1234.56`, `1,234.56`, `-18,70` and `1.234,56`. With both
    /// separators present the last one is the decimal point; a lone comma is
    /// one too. Several commas and no dot is ambiguous and rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseMoneyError(s.to_string());
        let trimmed = s.trim().trim_start_matches('+');

        let normalized = match (trimmed.rfind('.'), trimmed.rfind(',')) {
            (Some(dot), Some(comma)) if comma > dot => trimmed.replace('.', "").replace(',', "."),
            (Some(_), Some(_)) => trimmed.replace(',', ""),
            (None, Some(_)) if trimmed.matches(',').count() == 1 => trimmed.replace(',', "."),
            (None, Some(_)) => return Err(invalid()),
            _ => trimmed.to_string(),
        };
        Decimal::from_str(&normalized).map(Money).map_err(|_| invalid())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
