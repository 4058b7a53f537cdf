//! DNA amount parsing for balance alerts.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("transaction carries no amount")]
    Missing,
    #[error("invalid amount `{value}`: {reason}")]
    Invalid { value: String, reason: String },
}

/// Parses a node amount, rounds it to two decimals and returns the shortest
/// textual form. `Ok(None)` means the rounded value is not positive.
pub fn incoming_amount(raw: Option<&str>) -> Result<Option<String>, AmountError> {
    let raw = raw.map(str::trim).ok_or(AmountError::Missing)?;
    let value = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|err| AmountError::Invalid {
            value: raw.to_string(),
            reason: err.to_string(),
        })?;

    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    if rounded <= Decimal::ZERO {
        return Ok(None);
    }

    Ok(Some(trim_amount(&format!("{rounded:.2}"))))
}

/// Strips non-significant trailing zeros and a dangling decimal point.
pub fn trim_amount(amount: &str) -> String {
    if !amount.contains('.') {
        return amount.to_string();
    }
    amount
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
