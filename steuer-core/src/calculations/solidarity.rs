//! Solidaritätszuschlag per §4 SolZG.
//!
//! No surcharge is due up to the Freigrenze. Above it, the Milderungszone caps
//! the surcharge at a fraction of the excess over the Freigrenze, so the
//! surcharge starts at zero and rises smoothly until it reaches the full rate:
//!
//! ```text
//! soli = min(tax × soli_rate, (tax − soli_exemption) × soli_milderungs_rate)
//! ```
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use steuer_core::TAX_YEAR_2024;
//! use steuer_core::calculations::SurchargeCalculator;
//!
//! let calculator = SurchargeCalculator::new(&TAX_YEAR_2024);
//!
//! assert_eq!(calculator.surcharge(dec!(18130)), dec!(0.00));
//! assert_eq!(calculator.surcharge(dec!(20000)), dec!(222.53));
//! assert_eq!(calculator.surcharge(dec!(40000)), dec!(2200.00));
//! ```

use rust_decimal::Decimal;

use crate::calculations::common::round_half_up;
use crate::{TaxYearError, TaxYearParams, TaxYearTable};

#[derive(Debug, Clone, Copy)]
pub struct SurchargeCalculator<'a> {
    params: &'a TaxYearParams,
}

impl<'a> SurchargeCalculator<'a> {
    pub fn new(params: &'a TaxYearParams) -> Self {
        Self { params }
    }

    /// Surcharge on a computed income tax amount, two decimals.
    pub fn surcharge(
        &self,
        income_tax: Decimal,
    ) -> Decimal {
        let p = self.params;
        if income_tax <= p.soli_exemption {
            return Decimal::new(0, 2);
        }

        let full = round_half_up(income_tax * p.soli_rate);
        let milderung = round_half_up((income_tax - p.soli_exemption) * p.soli_milderungs_rate);
        full.min(milderung)
    }
}

/// Surcharge on `income_tax` for `year`, resolving the parameters from `table`.
///
/// # Errors
///
/// Returns [`TaxYearError::NoParameters`] for an empty table.
pub fn compute_surcharge(
    table: &TaxYearTable,
    income_tax: Decimal,
    year: i32,
) -> Result<Decimal, TaxYearError> {
    let params = table.resolve(year)?;
    Ok(SurchargeCalculator::new(params).surcharge(income_tax))
}
