use crate::errors::ServiceError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const USD: &str = "USD";
pub const AMD: &str = "AMD";

/// A price as the catalog reports it: a decimal string plus an ISO currency code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: String,
    pub currency_code: String,
}

impl Money {
    pub fn usd(amount: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            currency_code: USD.to_string(),
        }
    }

    /// Parses the amount as a non-negative USD decimal.
    ///
    /// Malformed strings, negative amounts and other currencies are rejected
    /// instead of leaking into totals.
    pub fn to_usd(&self) -> Result<Decimal, ServiceError> {
        if !self.currency_code.eq_ignore_ascii_case(USD) {
            return Err(ServiceError::InvalidInput(format!(
                "Unsupported price currency '{}', expected {}",
                self.currency_code, USD
            )));
        }
        parse_amount(&self.amount)
    }
}

/// Parses a decimal amount string, rejecting anything that is not a finite,
/// non-negative number.
pub fn parse_amount(raw: &str) -> Result<Decimal, ServiceError> {
    let trimmed = raw.trim();
    let value = Decimal::from_str(trimmed)
        .map_err(|_| ServiceError::InvalidInput(format!("Malformed price '{}'", raw)))?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(ServiceError::InvalidInput(format!(
            "Negative price '{}'",
            raw
        )));
    }

    Ok(value)
}

/// Rounds an AMD amount to whole drams, halves away from zero.
pub fn round_to_dram(amount: Decimal) -> Result<i64, ServiceError> {
    amount
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| ServiceError::InvalidInput(format!("Amount {} is out of range", amount)))
}

/// Two-decimal USD string, as sent to the international gateway.
pub fn format_usd(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// Thousands-grouped dram amount for display ("17,550").
pub fn format_amd(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
