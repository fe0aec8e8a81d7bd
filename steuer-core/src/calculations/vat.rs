//! Conversion between gross, net and VAT amounts (Umsatzsteuer).
//!
//! | Operation         | Formula                           |
//! |-------------------|-----------------------------------|
//! | `extract_vat`     | gross × rate / (100 + rate)       |
//! | `net_from_gross`  | gross × 100 / (100 + rate)        |
//! | `gross_from_net`  | net × (100 + rate) / 100          |
//!
//! Rates are percentages (19 for the standard rate). Every result is rounded
//! to two decimals, half-up. A zero amount short-circuits to zero before the
//! rate is looked at, and a zero rate yields no VAT.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use steuer_core::calculations::VatConverter;
//!
//! let converter = VatConverter::new(dec!(19)).unwrap();
//!
//! assert_eq!(converter.extract_vat(dec!(119.00)).unwrap(), dec!(19.00));
//! assert_eq!(converter.net_from_gross(dec!(119.00)).unwrap(), dec!(100.00));
//! assert_eq!(converter.gross_from_net(dec!(100.00)).unwrap(), dec!(119.00));
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::calculations::common::round_half_up;

/// Regelsteuersatz, §12 Abs. 1 UStG.
pub const STANDARD_RATE: Decimal = dec!(19);

/// Ermäßigter Steuersatz, §12 Abs. 2 UStG.
pub const REDUCED_RATE: Decimal = dec!(7);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VatError {
    #[error("VAT rate must be non-negative, got {0}")]
    NegativeRate(Decimal),

    #[error("VAT conversion of {amount} at {rate}% overflows")]
    Overflow { amount: Decimal, rate: Decimal },
}

/// Converts amounts at one fixed VAT rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VatConverter {
    rate: Decimal,
}

impl VatConverter {
    /// # Errors
    ///
    /// Returns [`VatError::NegativeRate`] for a rate below zero.
    pub fn new(rate: Decimal) -> Result<Self, VatError> {
        if rate < Decimal::ZERO {
            return Err(VatError::NegativeRate(rate));
        }
        Ok(Self { rate })
    }

    pub fn standard() -> Self {
        Self {
            rate: STANDARD_RATE,
        }
    }

    pub fn reduced() -> Self {
        Self { rate: REDUCED_RATE }
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// The VAT contained in a gross amount.
    ///
    /// # Errors
    ///
    /// Returns [`VatError::Overflow`] if the amount is too large to convert.
    pub fn extract_vat(
        &self,
        gross: Decimal,
    ) -> Result<Decimal, VatError> {
        if gross.is_zero() || self.rate.is_zero() {
            return Ok(Decimal::new(0, 2));
        }
        self.scale(gross, self.rate, Decimal::ONE_HUNDRED + self.rate)
    }

    /// The net amount contained in a gross amount.
    ///
    /// # Errors
    ///
    /// Returns [`VatError::Overflow`] if the amount is too large to convert.
    pub fn net_from_gross(
        &self,
        gross: Decimal,
    ) -> Result<Decimal, VatError> {
        if gross.is_zero() {
            return Ok(Decimal::new(0, 2));
        }
        self.scale(gross, Decimal::ONE_HUNDRED, Decimal::ONE_HUNDRED + self.rate)
    }

    /// The gross amount for a net amount.
    ///
    /// # Errors
    ///
    /// Returns [`VatError::Overflow`] if the amount is too large to convert.
    pub fn gross_from_net(
        &self,
        net: Decimal,
    ) -> Result<Decimal, VatError> {
        if net.is_zero() {
            return Ok(Decimal::new(0, 2));
        }
        self.scale(net, Decimal::ONE_HUNDRED + self.rate, Decimal::ONE_HUNDRED)
    }

    // amount × numerator / denominator, rounded to cents
    fn scale(
        &self,
        amount: Decimal,
        numerator: Decimal,
        denominator: Decimal,
    ) -> Result<Decimal, VatError> {
        amount
            .checked_mul(numerator)
            .and_then(|product| product.checked_div(denominator))
            .map(round_half_up)
            .ok_or(VatError::Overflow {
                amount,
                rate: self.rate,
            })
    }
}

/// VAT contained in `gross` at `rate` percent.
///
/// # Errors
///
/// Rejects a negative rate unless the amount is zero.
pub fn extract_vat(
    gross: Decimal,
    rate: Decimal,
) -> Result<Decimal, VatError> {
    if gross.is_zero() {
        return Ok(Decimal::new(0, 2));
    }
    VatConverter::new(rate)?.extract_vat(gross)
}

/// Net amount contained in `gross` at `rate` percent.
///
/// # Errors
///
/// Rejects a negative rate unless the amount is zero.
pub fn net_from_gross(
    gross: Decimal,
    rate: Decimal,
) -> Result<Decimal, VatError> {
    if gross.is_zero() {
        return Ok(Decimal::new(0, 2));
    }
    VatConverter::new(rate)?.net_from_gross(gross)
}

/// Gross amount for `net` at `rate` percent.
///
/// # Errors
///
/// Rejects a negative rate unless the amount is zero.
pub fn gross_from_net(
    net: Decimal,
    rate: Decimal,
) -> Result<Decimal, VatError> {
    if net.is_zero() {
        return Ok(Decimal::new(0, 2));
    }
    VatConverter::new(rate)?.gross_from_net(net)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    // =========================================================================
    // Conversions
    // =========================================================================

    #[test]
    fn standard_rate_gross_119() {
        assert_eq!(extract_vat(dec!(119.00), dec!(19)), Ok(dec!(19.00)));
        assert_eq!(net_from_gross(dec!(119.00), dec!(19)), Ok(dec!(100.00)));
    }

    #[test]
    fn reduced_rate() {
        let converter = VatConverter::reduced();

        assert_eq!(converter.extract_vat(dec!(107.00)), Ok(dec!(7.00)));
        assert_eq!(converter.gross_from_net(dec!(50.00)), Ok(dec!(53.50)));
    }

    #[test]
    fn results_round_half_up_to_cents() {
        // 10 × 19 / 119 = 1.596...
        assert_eq!(extract_vat(dec!(10.00), dec!(19)), Ok(dec!(1.60)));
        // 10 × 100 / 119 = 8.403...
        assert_eq!(net_from_gross(dec!(10.00), dec!(19)), Ok(dec!(8.40)));
    }

    #[test]
    fn negative_amounts_convert_symmetrically() {
        assert_eq!(extract_vat(dec!(-119.00), dec!(19)), Ok(dec!(-19.00)));
        assert_eq!(gross_from_net(dec!(-100.00), dec!(19)), Ok(dec!(-119.00)));
    }

    // =========================================================================
    // Short-circuits and rejection
    // =========================================================================

    #[test]
    fn zero_amount_is_zero() {
        assert_eq!(extract_vat(Decimal::ZERO, dec!(19)), Ok(dec!(0.00)));
        assert_eq!(net_from_gross(Decimal::ZERO, dec!(19)), Ok(dec!(0.00)));
        assert_eq!(gross_from_net(Decimal::ZERO, dec!(19)), Ok(dec!(0.00)));
    }

    #[test]
    fn zero_amount_with_negative_rate_is_not_rejected() {
        assert_eq!(extract_vat(Decimal::ZERO, dec!(-5)), Ok(dec!(0.00)));
    }

    #[test]
    fn zero_rate_has_no_vat() {
        assert_eq!(extract_vat(dec!(250.00), Decimal::ZERO), Ok(dec!(0.00)));
        assert_eq!(net_from_gross(dec!(250.00), Decimal::ZERO), Ok(dec!(250.00)));
        assert_eq!(gross_from_net(dec!(250.00), Decimal::ZERO), Ok(dec!(250.00)));
    }

    #[test]
    fn negative_rate_is_rejected() {
        assert_eq!(
            extract_vat(dec!(100), dec!(-19)),
            Err(VatError::NegativeRate(dec!(-19)))
        );
        assert_eq!(VatConverter::new(dec!(-0.01)), Err(VatError::NegativeRate(dec!(-0.01))));
    }

    #[test]
    fn overflow_is_reported() {
        let result = gross_from_net(Decimal::MAX, dec!(19));

        assert_eq!(
            result,
            Err(VatError::Overflow {
                amount: Decimal::MAX,
                rate: dec!(19),
            })
        );
    }

    // =========================================================================
    // Round-trip properties
    // =========================================================================

    #[test]
    fn net_round_trips_through_gross_within_a_cent() {
        for rate in [dec!(0), dec!(7), dec!(19)] {
            let mut net = dec!(0.01);
            while net < dec!(2000) {
                let gross = gross_from_net(net, rate).unwrap();
                let back = net_from_gross(gross, rate).unwrap();

                assert!((back - net).abs() <= dec!(0.01), "{net} at {rate}% came back as {back}");
                net += dec!(7.77);
            }
        }
    }

    #[test]
    fn vat_and_net_add_up_to_gross_within_a_cent() {
        for rate in [dec!(7), dec!(19)] {
            let mut gross = dec!(0.01);
            while gross < dec!(2000) {
                let vat = extract_vat(gross, rate).unwrap();
                let net = net_from_gross(gross, rate).unwrap();

                assert!((vat + net - gross).abs() <= dec!(0.01), "{gross} at {rate}%");
                gross += dec!(3.33);
            }
        }
    }
}
