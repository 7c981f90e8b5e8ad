//! Shared money representation: integer minor units internally, decimal on the wire.
//!
//! Both the HTTP DTOs and the payment domain need the same rounding rule
//! (round-half-away-from-zero) so a dollar amount never drifts by a cent
//! depending on which layer converted it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 3-letter ISO 4217 currency code, stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct Currency(pub String);

impl Currency {
    pub fn parse(raw: &str) -> Result<Self, CurrencyError> {
        let trimmed = raw.trim().to_uppercase();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CurrencyError::InvalidFormat(raw.to_string()));
        }
        Ok(Self(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CurrencyError {
    #[error("currency code must be a 3-letter ISO code, got: {0}")]
    InvalidFormat(String),
}

/// Converts a wire decimal (dollars, as floating point) to minor units (cents).
///
/// Rounds half-away-from-zero, matching spec.md's money representation note:
/// never multiply through float in hot paths, and round consistently at the
/// one boundary where floats are unavoidable (the wire).
pub fn dollars_to_cents(amount: f64) -> i64 {
    let scaled = amount * 100.0;
    if scaled >= 0.0 {
        (scaled + 0.5).floor() as i64
    } else {
        (scaled - 0.5).ceil() as i64
    }
}

/// Converts minor units (cents) back to a wire decimal (dollars).
pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}
