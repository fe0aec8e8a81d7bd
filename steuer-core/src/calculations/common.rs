//! Common utility functions for tax calculations.
//!
//! Rounding, ratio and cent-conversion helpers shared by the calculators and
//! the threshold rules.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds a decimal value to exactly two decimal places using half-up rounding.
///
/// This follows standard financial rounding conventions where values at exactly
/// 0.005 are rounded up to 0.01 (away from zero).
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use steuer_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_up(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_up(dec!(-123.455)), dec!(-123.46)); // Away from zero
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a ratio to four decimal places, half-up.
///
/// ```
/// use rust_decimal_macros::dec;
/// use steuer_core::calculations::common::round_ratio;
///
/// assert_eq!(round_ratio(dec!(0.33335)), dec!(0.3334));
/// ```
pub fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// `numerator / denominator` rounded to four places, or `None` when the
/// denominator is zero or the division overflows.
pub fn ratio(
    numerator: Decimal,
    denominator: Decimal,
) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator).map(round_ratio)
}

/// Clamps negative values to zero.
pub fn floor_at_zero(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Converts integral cents to a 2-decimal EUR amount.
pub fn cents_to_euros(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Converts an EUR amount to integral cents (half-up), or `None` if it does
/// not fit into an `i64`.
pub fn euros_to_cents(amount: Decimal) -> Option<i64> {
    round_half_up(amount).checked_mul(Decimal::ONE_HUNDRED)?.to_i64()
}
