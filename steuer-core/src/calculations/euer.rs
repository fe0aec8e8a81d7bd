//! Einnahmenüberschussrechnung (EÜR): profit per self-employed stream.
//!
//! Operating expenses are the stream's share of every expense that was not
//! capitalized. Capitalized purchases enter through their yearly AfA share
//! instead, so their cost is never counted twice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::floor_at_zero;
use crate::models::IncomeStream;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EuerError {
    #[error("{0} income has no EÜR")]
    NotSelfEmployed(IncomeStream),

    #[error("{0} exceeds the decimal range")]
    Overflow(&'static str),
}

/// One stream's EÜR for a year. `profit` may be negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EuerStatement {
    pub tax_year: i32,
    pub stream: IncomeStream,
    pub income: Decimal,
    pub operating_expenses: Decimal,
    pub depreciation: Decimal,
    pub total_expenses: Decimal,
    pub profit: Decimal,
}

impl EuerStatement {
    /// # Errors
    ///
    /// [`EuerError::NotSelfEmployed`] for employment income.
    pub fn build(
        tax_year: i32,
        stream: IncomeStream,
        income: Decimal,
        operating_expenses: Decimal,
        depreciation: Decimal,
    ) -> Result<Self, EuerError> {
        if !stream.is_self_employed() {
            return Err(EuerError::NotSelfEmployed(stream));
        }

        let total_expenses = operating_expenses
            .checked_add(depreciation)
            .ok_or(EuerError::Overflow("total expenses"))?;
        let profit = income
            .checked_sub(total_expenses)
            .ok_or(EuerError::Overflow("profit"))?;

        Ok(Self {
            tax_year,
            stream,
            income,
            operating_expenses,
            depreciation,
            total_expenses,
            profit,
        })
    }
}

/// Freiberuf and Gewerbe statements of the same year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualEuer {
    pub freiberuf: EuerStatement,
    pub gewerbe: EuerStatement,
}

impl DualEuer {
    pub fn combined_profit(&self) -> Decimal {
        self.freiberuf.profit + self.gewerbe.profit
    }

    /// Combined profit floored at zero; the base for tax reserves.
    pub fn net_profit(&self) -> Decimal {
        floor_at_zero(self.combined_profit())
    }
}
