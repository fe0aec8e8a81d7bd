//! Progressive income tax per §32a EStG.
//!
//! The tariff consists of five contiguous zones over the taxable income
//! (zu versteuerndes Einkommen, zvE):
//!
//! | Zone | Range                              | Formula                    |
//! |------|------------------------------------|----------------------------|
//! | 1    | zvE ≤ Grundfreibetrag              | 0                          |
//! | 2    | ≤ `zone2_upper`                    | (a·y + b)·y                |
//! | 3    | ≤ `zone3_upper`                    | (a·z + b)·z + c            |
//! | 4    | ≤ `zone4_upper`                    | 0.42·zvE − sub             |
//! | 5    | above                              | 0.45·zvE − sub             |
//!
//! with `y = (zvE − Grundfreibetrag) / 10 000` and
//! `z = (zvE − zone2_upper) / 10 000`. The result is truncated to whole euros
//! (§32a Abs. 1 S. 6 EStG) and expressed with two decimals.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use steuer_core::TAX_YEAR_2024;
//! use steuer_core::calculations::BracketTaxCalculator;
//!
//! let calculator = BracketTaxCalculator::new(&TAX_YEAR_2024);
//!
//! assert_eq!(calculator.tax(dec!(11604)).unwrap(), dec!(0.00));
//! assert_eq!(calculator.tax(dec!(50000)).unwrap(), dec!(10906.00));
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::calculations::common::round_half_up;
use crate::{TaxYearError, TaxYearParams, TaxYearTable};

const TEN_THOUSAND: Decimal = dec!(10000);

/// Fractional digits kept for the zone variables `y` and `z`.
const ZONE_VARIABLE_SCALE: u32 = 10;

/// Errors that can occur when computing income tax.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IncomeTaxError {
    /// Taxable income must not be negative.
    #[error("taxable income must be non-negative, got {0}")]
    NegativeTaxableIncome(Decimal),

    #[error(transparent)]
    TaxYear(#[from] TaxYearError),
}

/// Evaluates the §32a tariff for one set of [`TaxYearParams`].
#[derive(Debug, Clone, Copy)]
pub struct BracketTaxCalculator<'a> {
    params: &'a TaxYearParams,
}

impl<'a> BracketTaxCalculator<'a> {
    pub fn new(params: &'a TaxYearParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &'a TaxYearParams {
        self.params
    }

    /// Income tax on `zve`, truncated to whole euros, with two decimals.
    ///
    /// # Errors
    ///
    /// Returns [`IncomeTaxError::NegativeTaxableIncome`] for a negative zvE.
    pub fn tax(
        &self,
        zve: Decimal,
    ) -> Result<Decimal, IncomeTaxError> {
        if zve < Decimal::ZERO {
            return Err(IncomeTaxError::NegativeTaxableIncome(zve));
        }

        let p = self.params;
        let raw = if zve <= p.grundfreibetrag {
            Decimal::ZERO
        } else if zve <= p.zone2_upper {
            let y = self.zone_variable(zve, p.grundfreibetrag);
            (p.zone2_a * y + p.zone2_b) * y
        } else if zve <= p.zone3_upper {
            let z = self.zone_variable(zve, p.zone2_upper);
            (p.zone3_a * z + p.zone3_b) * z + p.zone3_c
        } else if zve <= p.zone4_upper {
            p.zone4_rate * zve - p.zone4_sub
        } else {
            p.zone5_rate * zve - p.zone5_sub
        };

        Ok(whole_euros(raw.max(Decimal::ZERO)))
    }

    /// Marginal tax rate at `zve` in percent, two decimals.
    ///
    /// Zones 2 and 3 use the derivative of the quadratic, `(2a·y + b) / 10 000`.
    ///
    /// # Errors
    ///
    /// Returns [`IncomeTaxError::NegativeTaxableIncome`] for a negative zvE.
    pub fn marginal_rate(
        &self,
        zve: Decimal,
    ) -> Result<Decimal, IncomeTaxError> {
        if zve < Decimal::ZERO {
            return Err(IncomeTaxError::NegativeTaxableIncome(zve));
        }

        let p = self.params;
        let rate = if zve <= p.grundfreibetrag {
            Decimal::ZERO
        } else if zve <= p.zone2_upper {
            let y = self.zone_variable(zve, p.grundfreibetrag);
            derivative(p.zone2_a, p.zone2_b, y)
        } else if zve <= p.zone3_upper {
            let z = self.zone_variable(zve, p.zone2_upper);
            derivative(p.zone3_a, p.zone3_b, z)
        } else if zve <= p.zone4_upper {
            p.zone4_rate
        } else {
            p.zone5_rate
        };

        Ok(round_half_up(rate * Decimal::ONE_HUNDRED))
    }

    fn zone_variable(
        &self,
        zve: Decimal,
        lower: Decimal,
    ) -> Decimal {
        ((zve - lower) / TEN_THOUSAND)
            .round_dp_with_strategy(ZONE_VARIABLE_SCALE, RoundingStrategy::MidpointAwayFromZero)
    }
}

fn derivative(
    a: Decimal,
    b: Decimal,
    x: Decimal,
) -> Decimal {
    ((dec!(2) * a * x + b) / TEN_THOUSAND)
        .round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncates to whole euros and expresses the result with two decimals.
pub(crate) fn whole_euros(value: Decimal) -> Decimal {
    let mut truncated = value.trunc();
    truncated.rescale(2);
    truncated
}

/// Income tax on `zve` for `year`, resolving the parameters from `table`
/// (falling back to the latest known year).
///
/// # Errors
///
/// Fails on a negative zvE or an empty parameter table.
pub fn compute_tax(
    table: &TaxYearTable,
    zve: Decimal,
    year: i32,
) -> Result<Decimal, IncomeTaxError> {
    let params = table.resolve(year)?;
    BracketTaxCalculator::new(params).tax(zve)
}
