//! Money arithmetic
//!
//! Prices travel as `f64` in rows and JSON. Every sum or product goes
//! through `Decimal` and is rounded back to 2 decimal places, so cart
//! and order totals never accumulate float drift.

use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price
pub const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
pub const MAX_QUANTITY: i32 = 9999;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(value = ?value, "Non-finite f64 in monetary calculation, defaulting to zero");
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// `unit_price * quantity`
pub fn line_total(unit_price: f64, quantity: i32) -> Decimal {
    to_decimal(unit_price) * Decimal::from(quantity)
}

/// Sum of `unit_price * quantity` over lines, rounded for storage
pub fn sum_lines<I>(lines: I) -> f64
where
    I: IntoIterator<Item = (f64, i32)>,
{
    let total = lines
        .into_iter()
        .fold(Decimal::ZERO, |acc, (price, qty)| acc + line_total(price, qty));
    to_f64(total)
}

/// Validate a price coming from a client
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && (0.0..=MAX_PRICE).contains(&price)
}
