//! Money codec
//!
//! Converts between the decimal-string representation used on the wire and
//! the integer minor-unit (cent) representation the ledger stores. Amounts
//! with more than two fractional digits are truncated toward zero, never
//! rounded, so "10.129" becomes 1012 minor units.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::LedgerError;

/// Fractional digits carried by the ledger.
const SCALE: u32 = 2;

/// Parse a decimal string into minor units.
///
/// Sign-preserving: "-3" parses to -300. Positivity is a ledger rule,
/// enforced by the store rather than the codec.
///
/// # Errors
/// `LedgerError::InvalidAmount` if the text is not a well-formed decimal
/// number or the value does not fit in an `i64` count of cents.
pub fn parse_minor(text: &str) -> Result<i64, LedgerError> {
    let raw = Decimal::from_str(text.trim())
        .map_err(|e| LedgerError::invalid_amount(e.to_string()))?;

    raw.trunc_with_scale(SCALE)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| LedgerError::invalid_amount(format!("amount out of range: {text}")))
}

/// Render minor units as a fixed two-decimal string (1050 -> "10.50").
pub fn format_minor(minor: i64) -> String {
    format!("{:.2}", Decimal::new(minor, SCALE))
}
