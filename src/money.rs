// ============================================================================
// Money
// ============================================================================
//
// Every numeric value that reaches the document (CLI arguments, restored
// storage payloads) goes through these helpers. Anything that does not
// read as a number becomes zero; nothing here returns an error.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Currency marker appended to every formatted amount.
pub const CURRENCY_SYMBOL: &str = "€";

/// Parse a decimal from user or stored text, accepting a comma as the
/// decimal separator. Invalid input yields zero.
pub fn coerce_decimal(input: &str) -> Decimal {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .unwrap_or(Decimal::ZERO)
}

/// Like [`coerce_decimal`] but also maps negative values to zero, for fields
/// constrained to be `>= 0` (unit price, deposit).
pub fn coerce_non_negative(input: &str) -> Decimal {
    non_negative(coerce_decimal(input))
}

pub fn non_negative(value: Decimal) -> Decimal {
    if value.is_sign_negative() {
        Decimal::ZERO
    } else {
        value
    }
}

/// Parse an item quantity. Only whole, non-negative numbers are accepted;
/// anything else (fractions, negatives, words) is zero.
pub fn coerce_quantity(input: &str) -> u32 {
    let trimmed = input.trim();
    if let Ok(q) = trimmed.parse::<u32>() {
        return q;
    }
    let value = coerce_decimal(trimmed);
    if value.is_sign_negative() || value.fract() != Decimal::ZERO {
        return 0;
    }
    value.to_u32().unwrap_or(0)
}

/// Round to cents, half away from zero.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Fixed two-decimal rendering without currency marker, e.g. `550.00`.
pub fn format_amount(value: Decimal) -> String {
    format!("{:.2}", round_cents(value))
}

/// Amount followed by the currency marker, e.g. `550.00 €`.
pub fn format_currency(value: Decimal) -> String {
    format!("{} {}", format_amount(value), CURRENCY_SYMBOL)
}
