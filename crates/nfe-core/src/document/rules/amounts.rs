//! Amount parsing and currency formatting.
//!
//! Amounts stay exact `Decimal` values from parsing through summation;
//! rounding only happens when an amount is formatted for display.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use super::patterns::AMOUNT;

/// Parse an NF-e amount (e.g. "1234.56").
///
/// Only plain decimal notation is accepted: no thousands separators, no
/// comma decimals, no exponents. Values wider than the NF-e amount fields
/// (13 integer digits, 10 fraction digits) are rejected, which keeps any
/// realistic sum of amounts far from `Decimal::MAX`.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if !AMOUNT.is_match(s) {
        return None;
    }
    Decimal::from_str(s).ok()
}

/// Round half-up (midpoint away from zero) to `decimal_places`.
pub fn round_currency(amount: Decimal, decimal_places: u32) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointAwayFromZero);
    // Pad to a fixed scale so 100 prints as 100.00
    rounded.rescale(decimal_places);
    rounded
}

/// Format an amount as `<symbol> <value>` (e.g. "R$ 1234.56").
pub fn format_currency(amount: Decimal, symbol: &str, decimal_places: u32) -> String {
    let value = round_currency(amount, decimal_places);
    if symbol.is_empty() {
        value.to_string()
    } else {
        format!("{} {}", symbol, value)
    }
}
