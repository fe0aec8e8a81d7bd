//! Monthly tax reserve (Steuerrücklage) for self-employed profit.
//!
//! During January to November of the running year the year-to-date profit is
//! extrapolated to the full year before the reserve rate is applied. In
//! December, and for any other year, the profit is taken as it is.

use std::sync::Arc;

use chrono::Datelike;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{floor_at_zero, round_half_up};
use super::projection::{AnnualProjector, ProjectionError};
use crate::clock::Clock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxReserveError {
    #[error("reserve rate must be between 0 and 100 percent, got {0}")]
    InvalidRate(Decimal),

    #[error("already reserved amount must be non-negative, got {0}")]
    NegativeReserved(Decimal),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("{0} exceeds the decimal range")]
    Overflow(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxReserveConfig {
    /// Share of the projected profit to set aside, in percent.
    pub rate_percent: Decimal,
}

impl Default for TaxReserveConfig {
    fn default() -> Self {
        Self {
            rate_percent: dec!(30),
        }
    }
}

impl TaxReserveConfig {
    pub fn validate(&self) -> Result<(), TaxReserveError> {
        if self.rate_percent < Decimal::ZERO || self.rate_percent > Decimal::ONE_HUNDRED {
            return Err(TaxReserveError::InvalidRate(self.rate_percent));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxReserve {
    pub year: i32,
    /// Year-to-date profit the reserve is based on.
    pub net_profit: Decimal,
    pub rate_percent: Decimal,
    /// `net_profit` extrapolated to the full year, or unchanged.
    pub projected_profit: Decimal,
    pub annual_reserve: Decimal,
    pub already_reserved: Decimal,
    /// `max(annual_reserve - already_reserved, 0)`.
    pub remaining: Decimal,
    pub months_remaining: u32,
    pub monthly_reserve: Decimal,
}

#[derive(Debug, Clone)]
pub struct TaxReserveCalculator {
    clock: Arc<dyn Clock>,
    config: TaxReserveConfig,
}

impl TaxReserveCalculator {
    pub fn new(
        clock: Arc<dyn Clock>,
        config: TaxReserveConfig,
    ) -> Self {
        Self { clock, config }
    }

    /// Months left to save in, counting the current one. Zero for a past
    /// year, twelve for a future one.
    pub fn months_remaining(
        &self,
        year: i32,
    ) -> u32 {
        let today = self.clock.today();
        match year.cmp(&today.year()) {
            std::cmp::Ordering::Less => 0,
            std::cmp::Ordering::Greater => 12,
            std::cmp::Ordering::Equal => 12 - today.month() + 1,
        }
    }

    /// # Errors
    ///
    /// [`TaxReserveError::InvalidRate`] for a rate outside `0..=100` and
    /// [`TaxReserveError::NegativeReserved`] for a negative
    /// `already_reserved`.
    pub fn calculate(
        &self,
        net_profit: Decimal,
        year: i32,
        already_reserved: Decimal,
    ) -> Result<TaxReserve, TaxReserveError> {
        self.config.validate()?;
        if already_reserved < Decimal::ZERO {
            return Err(TaxReserveError::NegativeReserved(already_reserved));
        }

        let net_profit = floor_at_zero(net_profit);
        let projected_profit = self.projected(net_profit, year)?;

        let rate = self.config.rate_percent;
        let annual_reserve = projected_profit
            .checked_mul(rate)
            .map(|v| round_half_up(v / Decimal::ONE_HUNDRED))
            .ok_or(TaxReserveError::Overflow("annual reserve"))?;
        let remaining = floor_at_zero(annual_reserve - already_reserved);

        let months_remaining = self.months_remaining(year);
        let monthly_reserve = if months_remaining == 0 {
            Decimal::ZERO
        } else {
            round_half_up(remaining / Decimal::from(months_remaining))
        };

        Ok(TaxReserve {
            year,
            net_profit,
            rate_percent: rate,
            projected_profit,
            annual_reserve,
            already_reserved,
            remaining,
            months_remaining,
            monthly_reserve,
        })
    }

    fn projected(
        &self,
        net_profit: Decimal,
        year: i32,
    ) -> Result<Decimal, TaxReserveError> {
        let today = self.clock.today();
        if year != today.year() || today.month() == 12 {
            return Ok(net_profit);
        }
        let projection = AnnualProjector::new(self.clock.clone()).project(net_profit, year)?;
        Ok(projection.amount().unwrap_or(net_profit))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clock::FixedClock;

    fn calculator_on(
        y: i32,
        m: u32,
        d: u32,
    ) -> TaxReserveCalculator {
        let today = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        TaxReserveCalculator::new(Arc::new(FixedClock::on(today)), TaxReserveConfig::default())
    }

    #[test]
    fn mid_year_profit_is_extrapolated() {
        // 2026-07-02 is day 183 of 365
        let reserve = calculator_on(2026, 7, 2).calculate(dec!(18300), 2026, dec!(0)).unwrap();

        assert_eq!(reserve.projected_profit, dec!(36500.00));
        assert_eq!(reserve.annual_reserve, dec!(10950.00));
        assert_eq!(reserve.months_remaining, 6);
        assert_eq!(reserve.monthly_reserve, dec!(1825.00));
    }

    #[test]
    fn december_uses_the_profit_as_is() {
        let reserve = calculator_on(2026, 12, 5).calculate(dec!(40000), 2026, dec!(9000)).unwrap();

        assert_eq!(reserve.projected_profit, dec!(40000));
        assert_eq!(reserve.annual_reserve, dec!(12000.00));
        assert_eq!(reserve.remaining, dec!(3000.00));
        assert_eq!(reserve.months_remaining, 1);
        assert_eq!(reserve.monthly_reserve, dec!(3000.00));
    }

    #[test]
    fn past_year_has_nothing_left_to_spread() {
        let reserve = calculator_on(2026, 3, 1).calculate(dec!(50000), 2025, dec!(0)).unwrap();

        assert_eq!(reserve.projected_profit, dec!(50000));
        assert_eq!(reserve.remaining, dec!(15000.00));
        assert_eq!(reserve.months_remaining, 0);
        assert_eq!(reserve.monthly_reserve, dec!(0));
    }

    #[test]
    fn future_year_spreads_over_twelve_months() {
        let reserve = calculator_on(2026, 10, 18).calculate(dec!(12000), 2027, dec!(0)).unwrap();

        assert_eq!(reserve.projected_profit, dec!(12000));
        assert_eq!(reserve.months_remaining, 12);
        assert_eq!(reserve.monthly_reserve, dec!(300.00));
    }

    #[test]
    fn reserve_beyond_the_annual_amount_leaves_nothing_remaining() {
        let reserve = calculator_on(2026, 12, 1).calculate(dec!(10000), 2026, dec!(5000)).unwrap();

        assert_eq!(reserve.annual_reserve, dec!(3000.00));
        assert_eq!(reserve.remaining, dec!(0));
        assert_eq!(reserve.monthly_reserve, dec!(0));
    }

    #[test]
    fn loss_reserves_nothing() {
        let reserve = calculator_on(2026, 5, 1).calculate(dec!(-2500), 2026, dec!(0)).unwrap();

        assert_eq!(reserve.net_profit, dec!(0));
        assert_eq!(reserve.annual_reserve, dec!(0));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap()));
        let greedy = TaxReserveCalculator::new(
            clock,
            TaxReserveConfig {
                rate_percent: dec!(120),
            },
        );

        assert_eq!(
            greedy.calculate(dec!(1000), 2026, dec!(0)),
            Err(TaxReserveError::InvalidRate(dec!(120)))
        );
        assert_eq!(
            calculator_on(2026, 5, 1).calculate(dec!(1000), 2026, dec!(-1)),
            Err(TaxReserveError::NegativeReserved(dec!(-1)))
        );
    }
}
