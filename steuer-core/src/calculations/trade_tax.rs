//! Gewerbesteuer (trade tax) on the Gewerbe profit.
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Gewerbeertrag: Gewerbe income − Gewerbe expenses, floored at zero |
//! | 2    | Taxable: Gewerbeertrag − Freibetrag (24 500 EUR), floored at zero |
//! | 3    | Steuermessbetrag: taxable × Steuermesszahl (3.5 %) |
//! | 4    | Gewerbesteuer: Messbetrag × Hebesatz / 100 |
//! | 5    | §35 EStG credit: min(4.0 × Messbetrag, income tax) |
//! | 6    | Net burden: Gewerbesteuer − credit, floored at zero |

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::{floor_at_zero, round_half_up};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TradeTaxError {
    #[error("Hebesatz must be positive, got {0}")]
    InvalidHebesatz(u32),

    #[error("Steuermesszahl must be between 0 and 1, got {0}")]
    InvalidMesszahl(Decimal),

    #[error("Freibetrag must be non-negative, got {0}")]
    NegativeFreibetrag(Decimal),
}

/// Municipal and statutory trade tax parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeTaxConfig {
    /// Municipal multiplier in percent.
    pub hebesatz: u32,
    /// Freibetrag for individuals and partnerships, §11 Abs. 1 GewStG.
    pub freibetrag: Decimal,
    pub messzahl: Decimal,
    /// Multiple of the Messbetrag creditable against income tax, §35 EStG.
    pub credit_factor: Decimal,
}

impl Default for TradeTaxConfig {
    fn default() -> Self {
        Self {
            hebesatz: 410,
            freibetrag: dec!(24500),
            messzahl: dec!(0.035),
            credit_factor: dec!(4.0),
        }
    }
}

impl TradeTaxConfig {
    /// # Errors
    ///
    /// Returns [`TradeTaxError`] for a zero Hebesatz, a Messzahl outside
    /// [0, 1] or a negative Freibetrag.
    pub fn validate(&self) -> Result<(), TradeTaxError> {
        if self.hebesatz == 0 {
            return Err(TradeTaxError::InvalidHebesatz(self.hebesatz));
        }
        if self.messzahl < Decimal::ZERO || self.messzahl > Decimal::ONE {
            return Err(TradeTaxError::InvalidMesszahl(self.messzahl));
        }
        if self.freibetrag < Decimal::ZERO {
            return Err(TradeTaxError::NegativeFreibetrag(self.freibetrag));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeTaxResult {
    pub profit: Decimal,
    pub taxable_profit: Decimal,
    pub messbetrag: Decimal,
    pub hebesatz: u32,
    pub trade_tax: Decimal,
    pub credit: Decimal,
    pub net_burden: Decimal,
}

#[derive(Debug, Clone)]
pub struct TradeTaxCalculator {
    config: TradeTaxConfig,
}

impl TradeTaxCalculator {
    pub fn new(config: TradeTaxConfig) -> Self {
        Self { config }
    }

    /// # Errors
    ///
    /// Returns [`TradeTaxError`] if the configuration is invalid.
    pub fn calculate(
        &self,
        gewerbe_income: Decimal,
        gewerbe_expenses: Decimal,
        income_tax: Decimal,
    ) -> Result<TradeTaxResult, TradeTaxError> {
        self.config.validate()?;

        let profit = floor_at_zero(gewerbe_income - gewerbe_expenses);
        let taxable_profit = floor_at_zero(profit - self.config.freibetrag);
        let messbetrag = round_half_up(taxable_profit * self.config.messzahl);
        let trade_tax =
            round_half_up(messbetrag * Decimal::from(self.config.hebesatz) / Decimal::ONE_HUNDRED);

        let max_credit = round_half_up(self.config.credit_factor * messbetrag);
        let credit = max_credit.min(floor_at_zero(income_tax));
        let net_burden = floor_at_zero(trade_tax - credit);

        Ok(TradeTaxResult {
            profit,
            taxable_profit,
            messbetrag,
            hebesatz: self.config.hebesatz,
            trade_tax,
            credit,
            net_burden,
        })
    }
}
