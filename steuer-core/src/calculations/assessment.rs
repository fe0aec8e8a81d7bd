//! Annual income tax assessment across all three income streams.
//!
//! # Computation
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Gross income: employment + Freiberuf + Gewerbe |
//! | 2    | Deductions: stream business expenses, Werbungskostenpauschale (only with employment income), Sonderausgabenpauschale |
//! | 3    | zvE: gross − deductions, floored at zero and truncated to whole euros |
//! | 4    | Income tax on zvE (§32a EStG) |
//! | 5    | Solidaritätszuschlag on the income tax |
//! | 6    | Marginal rate at zvE and effective rate (total tax / gross) |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use steuer_core::TAX_YEAR_2024;
//! use steuer_core::calculations::{AssessmentCalculator, AssessmentInput};
//!
//! let input = AssessmentInput {
//!     employment_income: dec!(40000),
//!     freiberuf_income: dec!(20000),
//!     gewerbe_income: dec!(10000),
//!     freiberuf_expenses: dec!(5000),
//!     gewerbe_expenses: dec!(2000),
//! };
//!
//! let assessment = AssessmentCalculator::new(&TAX_YEAR_2024).calculate(&input).unwrap();
//!
//! assert_eq!(assessment.taxable_income, dec!(61734));
//! assert_eq!(assessment.income_tax, dec!(15371.00));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::TaxYearParams;
use crate::calculations::common::round_half_up;
use crate::calculations::{BracketTaxCalculator, IncomeTaxError, SurchargeCalculator};

/// Annual figures per stream, in EUR.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentInput {
    pub employment_income: Decimal,
    pub freiberuf_income: Decimal,
    pub gewerbe_income: Decimal,
    pub freiberuf_expenses: Decimal,
    pub gewerbe_expenses: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionBreakdown {
    pub freiberuf_expenses: Decimal,
    pub gewerbe_expenses: Decimal,
    pub werbungskostenpauschale: Decimal,
    pub sonderausgabenpauschale: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxAssessment {
    pub tax_year: i32,
    pub gross_income: Decimal,
    pub deductions: DeductionBreakdown,
    /// zvE in whole euros.
    pub taxable_income: Decimal,
    pub income_tax: Decimal,
    pub solidarity_surcharge: Decimal,
    pub total_tax: Decimal,
    /// Percent, two decimals.
    pub marginal_rate: Decimal,
    /// Total tax over gross income in percent, two decimals.
    pub effective_rate: Decimal,
}

/// Runs the assessment for one tax year.
#[derive(Debug, Clone, Copy)]
pub struct AssessmentCalculator<'a> {
    params: &'a TaxYearParams,
}

impl<'a> AssessmentCalculator<'a> {
    pub fn new(params: &'a TaxYearParams) -> Self {
        Self { params }
    }

    /// # Errors
    ///
    /// Propagates [`IncomeTaxError`] from the tariff.
    pub fn calculate(
        &self,
        input: &AssessmentInput,
    ) -> Result<TaxAssessment, IncomeTaxError> {
        let gross_income = input.employment_income + input.freiberuf_income + input.gewerbe_income;
        let deductions = self.deductions(input);
        let taxable_income = (gross_income - deductions.total).max(Decimal::ZERO).trunc();

        let tariff = BracketTaxCalculator::new(self.params);
        let income_tax = tariff.tax(taxable_income)?;
        let solidarity_surcharge = SurchargeCalculator::new(self.params).surcharge(income_tax);
        let total_tax = income_tax + solidarity_surcharge;
        let marginal_rate = tariff.marginal_rate(taxable_income)?;

        Ok(TaxAssessment {
            tax_year: self.params.tax_year,
            gross_income,
            deductions,
            taxable_income,
            income_tax,
            solidarity_surcharge,
            total_tax,
            marginal_rate,
            effective_rate: effective_rate(total_tax, gross_income),
        })
    }

    fn deductions(
        &self,
        input: &AssessmentInput,
    ) -> DeductionBreakdown {
        let werbungskostenpauschale = if input.employment_income > Decimal::ZERO {
            self.params.werbungskostenpauschale
        } else {
            Decimal::ZERO
        };
        let sonderausgabenpauschale = self.params.sonderausgabenpauschale;

        DeductionBreakdown {
            freiberuf_expenses: input.freiberuf_expenses,
            gewerbe_expenses: input.gewerbe_expenses,
            werbungskostenpauschale,
            sonderausgabenpauschale,
            total: input.freiberuf_expenses
                + input.gewerbe_expenses
                + werbungskostenpauschale
                + sonderausgabenpauschale,
        }
    }
}

fn effective_rate(
    total_tax: Decimal,
    gross_income: Decimal,
) -> Decimal {
    if gross_income <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_half_up(total_tax * Decimal::ONE_HUNDRED / gross_income)
}
