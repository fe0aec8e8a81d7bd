//! Year-scoped ledger aggregates for one user.
//!
//! Every figure is fetched separately and kept as its own `Result`, so a
//! failed query only affects the rules that read that figure.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use super::rules::RuleError;
use crate::calculations::AssessmentInput;
use crate::calculations::common::{cents_to_euros, floor_at_zero};
use crate::db::{LedgerError, LedgerRepository};
use crate::models::IncomeStream;

/// Aggregates for one (user, year), in EUR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearSnapshot {
    pub user_id: i64,
    pub year: i32,
    employment: Result<Decimal, LedgerError>,
    freiberuf: Result<Decimal, LedgerError>,
    gewerbe: Result<Decimal, LedgerError>,
    freiberuf_expenses: Result<Decimal, LedgerError>,
    gewerbe_expenses: Result<Decimal, LedgerError>,
}

impl YearSnapshot {
    pub fn employment(&self) -> Result<Decimal, RuleError> {
        self.employment.clone().map_err(RuleError::from)
    }

    pub fn freiberuf(&self) -> Result<Decimal, RuleError> {
        self.freiberuf.clone().map_err(RuleError::from)
    }

    pub fn gewerbe(&self) -> Result<Decimal, RuleError> {
        self.gewerbe.clone().map_err(RuleError::from)
    }

    pub fn freiberuf_expenses(&self) -> Result<Decimal, RuleError> {
        self.freiberuf_expenses.clone().map_err(RuleError::from)
    }

    pub fn gewerbe_expenses(&self) -> Result<Decimal, RuleError> {
        self.gewerbe_expenses.clone().map_err(RuleError::from)
    }

    /// Freiberuf plus Gewerbe revenue.
    pub fn self_employed(&self) -> Result<Decimal, RuleError> {
        self.freiberuf()?
            .checked_add(self.gewerbe()?)
            .ok_or(RuleError::Overflow("self-employed revenue"))
    }

    /// `max(gewerbe − gewerbe_expenses, 0)`.
    pub fn gewerbe_profit(&self) -> Result<Decimal, RuleError> {
        self.gewerbe()?
            .checked_sub(self.gewerbe_expenses()?)
            .map(floor_at_zero)
            .ok_or(RuleError::Overflow("gewerbe profit"))
    }

    /// The annual figures the assessment needs. Fails on the first figure
    /// that could not be read.
    pub fn assessment_input(&self) -> Result<AssessmentInput, RuleError> {
        Ok(AssessmentInput {
            employment_income: self.employment()?,
            freiberuf_income: self.freiberuf()?,
            gewerbe_income: self.gewerbe()?,
            freiberuf_expenses: self.freiberuf_expenses()?,
            gewerbe_expenses: self.gewerbe_expenses()?,
        })
    }
}

/// Reads [`YearSnapshot`]s from the ledger.
#[derive(Clone)]
pub struct RevenueAggregator {
    ledger: Arc<dyn LedgerRepository>,
}

impl RevenueAggregator {
    pub fn new(ledger: Arc<dyn LedgerRepository>) -> Self {
        Self { ledger }
    }

    /// # Errors
    ///
    /// Returns [`RuleError::YearOutOfRange`] if the calendar year cannot be
    /// represented. Query failures are kept inside the snapshot.
    pub async fn snapshot(
        &self,
        user_id: i64,
        year: i32,
    ) -> Result<YearSnapshot, RuleError> {
        let (from, to) = year_bounds(year).ok_or(RuleError::YearOutOfRange(year))?;
        debug!(user_id, year, "reading year aggregates");

        let revenue = |stream: IncomeStream| async move {
            self.ledger
                .sum_revenue_cents(user_id, stream, from, to)
                .await
                .map(cents_to_euros)
        };
        let expenses = |stream: IncomeStream| async move {
            self.ledger
                .sum_expense_cents(user_id, stream, from, to)
                .await
                .map(cents_to_euros)
        };

        Ok(YearSnapshot {
            user_id,
            year,
            employment: revenue(IncomeStream::Employment).await,
            freiberuf: revenue(IncomeStream::Freiberuf).await,
            gewerbe: revenue(IncomeStream::Gewerbe).await,
            freiberuf_expenses: expenses(IncomeStream::Freiberuf).await,
            gewerbe_expenses: expenses(IncomeStream::Gewerbe).await,
        })
    }
}

impl std::fmt::Debug for RevenueAggregator {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RevenueAggregator").finish_non_exhaustive()
    }
}

/// January 1st and December 31st of `year`.
pub fn year_bounds(year: i32) -> Option<(NaiveDate, NaiveDate)> {
    Some((
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::db::InMemoryLedger;
    use crate::models::{Allocation, NewExpenseEntry, NewIncomeEntry};

    fn date(
        y: i32,
        m: u32,
        d: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn book(
        ledger: &InMemoryLedger,
        stream: IncomeStream,
        amount_cents: i64,
        entry_date: NaiveDate,
    ) {
        ledger
            .insert_income(NewIncomeEntry {
                user_id: 1,
                stream,
                amount_cents,
                entry_date,
                source: None,
                description: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn snapshot_is_scoped_to_the_calendar_year() {
        let ledger = Arc::new(InMemoryLedger::new());
        book(&ledger, IncomeStream::Gewerbe, 1_000_000, date(2025, 1, 1)).await;
        book(&ledger, IncomeStream::Gewerbe, 500_000, date(2025, 12, 31)).await;
        book(&ledger, IncomeStream::Gewerbe, 9_900_000, date(2026, 1, 1)).await;
        book(&ledger, IncomeStream::Freiberuf, 3_000_000, date(2025, 5, 5)).await;
        book(&ledger, IncomeStream::Employment, 4_000_000, date(2025, 5, 5)).await;

        let snapshot = RevenueAggregator::new(ledger).snapshot(1, 2025).await.unwrap();

        assert_eq!(snapshot.gewerbe(), Ok(dec!(15000.00)));
        assert_eq!(snapshot.freiberuf(), Ok(dec!(30000.00)));
        assert_eq!(snapshot.employment(), Ok(dec!(40000.00)));
        assert_eq!(snapshot.self_employed(), Ok(dec!(45000.00)));
    }

    #[tokio::test]
    async fn empty_ledger_yields_zero() {
        let snapshot = RevenueAggregator::new(Arc::new(InMemoryLedger::new()))
            .snapshot(1, 2025)
            .await
            .unwrap();

        assert_eq!(snapshot.self_employed(), Ok(Decimal::ZERO));
        assert_eq!(snapshot.gewerbe_profit(), Ok(Decimal::ZERO));
    }

    #[tokio::test]
    async fn gewerbe_profit_is_floored_at_zero() {
        let ledger = Arc::new(InMemoryLedger::new());
        book(&ledger, IncomeStream::Gewerbe, 100_000, date(2025, 3, 1)).await;
        ledger
            .insert_expense(NewExpenseEntry {
                user_id: 1,
                amount_cents: 250_000,
                category: "Wareneinkauf".to_string(),
                entry_date: date(2025, 3, 2),
                allocation: Allocation::entirely(IncomeStream::Gewerbe),
                description: None,
            })
            .await
            .unwrap();

        let snapshot = RevenueAggregator::new(ledger).snapshot(1, 2025).await.unwrap();

        assert_eq!(snapshot.gewerbe_expenses(), Ok(dec!(2500.00)));
        assert_eq!(snapshot.gewerbe_profit(), Ok(Decimal::ZERO));
    }

    #[tokio::test]
    async fn assessment_input_carries_every_stream() {
        let ledger = Arc::new(InMemoryLedger::new());
        book(&ledger, IncomeStream::Employment, 4_000_000, date(2025, 6, 30)).await;
        book(&ledger, IncomeStream::Freiberuf, 2_000_000, date(2025, 6, 30)).await;

        let snapshot = RevenueAggregator::new(ledger).snapshot(1, 2025).await.unwrap();

        assert_eq!(
            snapshot.assessment_input(),
            Ok(AssessmentInput {
                employment_income: dec!(40000.00),
                freiberuf_income: dec!(20000.00),
                ..AssessmentInput::default()
            })
        );
    }

    #[test]
    fn year_bounds_cover_the_whole_year() {
        assert_eq!(year_bounds(2024), Some((date(2024, 1, 1), date(2024, 12, 31))));
        assert_eq!(year_bounds(i32::MAX), None);
    }
}
