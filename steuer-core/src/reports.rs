//! EÜR statements read from the ledger.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::calculations::common::cents_to_euros;
use crate::calculations::euer::{DualEuer, EuerError, EuerStatement};
use crate::calculations::{AllocatedAsset, StreamDepreciation, stream_totals_for_year};
use crate::db::{LedgerError, LedgerRepository};
use crate::models::IncomeStream;
use crate::monitor::year_bounds;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Euer(#[from] EuerError),

    #[error("year {0} is out of range")]
    YearOutOfRange(i32),
}

pub struct EuerReporter {
    ledger: Arc<dyn LedgerRepository>,
}

impl EuerReporter {
    pub fn new(ledger: Arc<dyn LedgerRepository>) -> Self {
        Self { ledger }
    }

    /// The year's AfA over every asset of `user_id`, split by the allocation
    /// of the expense each asset came from.
    pub async fn stream_depreciation(
        &self,
        user_id: i64,
        year: i32,
    ) -> Result<StreamDepreciation, ReportError> {
        let assets: Vec<AllocatedAsset> = self
            .ledger
            .list_assets(user_id)
            .await?
            .iter()
            .map(|record| record.allocated())
            .collect();
        Ok(stream_totals_for_year(&assets, year))
    }

    /// # Errors
    ///
    /// [`EuerError::NotSelfEmployed`] for employment, before any query runs.
    pub async fn generate(
        &self,
        user_id: i64,
        stream: IncomeStream,
        year: i32,
    ) -> Result<EuerStatement, ReportError> {
        if !stream.is_self_employed() {
            return Err(EuerError::NotSelfEmployed(stream).into());
        }
        let depreciation = self.stream_depreciation(user_id, year).await?;
        self.statement(user_id, stream, year, &depreciation).await
    }

    pub async fn generate_dual(
        &self,
        user_id: i64,
        year: i32,
    ) -> Result<DualEuer, ReportError> {
        let depreciation = self.stream_depreciation(user_id, year).await?;
        Ok(DualEuer {
            freiberuf: self
                .statement(user_id, IncomeStream::Freiberuf, year, &depreciation)
                .await?,
            gewerbe: self
                .statement(user_id, IncomeStream::Gewerbe, year, &depreciation)
                .await?,
        })
    }

    async fn statement(
        &self,
        user_id: i64,
        stream: IncomeStream,
        year: i32,
        depreciation: &StreamDepreciation,
    ) -> Result<EuerStatement, ReportError> {
        let (from, to) = year_bounds(year).ok_or(ReportError::YearOutOfRange(year))?;
        debug!(user_id, year, %stream, "building EÜR");

        let income_cents = self.ledger.sum_revenue_cents(user_id, stream, from, to).await?;

        let capitalized: HashSet<i64> = self
            .ledger
            .list_assets(user_id)
            .await?
            .iter()
            .filter_map(|record| record.expense_id)
            .collect();
        let operating_cents = self
            .ledger
            .list_expenses(user_id, from, to)
            .await?
            .iter()
            .filter(|entry| !capitalized.contains(&entry.id))
            .map(|entry| entry.allocation.allocate_cents(entry.amount_cents, stream))
            .try_fold(0i64, |acc, cents| acc.checked_add(cents))
            .ok_or(EuerError::Overflow("operating expenses"))?;

        let afa = match stream {
            IncomeStream::Freiberuf => depreciation.freiberuf,
            IncomeStream::Gewerbe => depreciation.gewerbe,
            IncomeStream::Employment => return Err(EuerError::NotSelfEmployed(stream).into()),
        };

        Ok(EuerStatement::build(
            year,
            stream,
            cents_to_euros(income_cents),
            cents_to_euros(operating_cents),
            afa,
        )?)
    }
}

impl std::fmt::Debug for EuerReporter {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("EuerReporter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::GwgPolicy;
    use crate::db::InMemoryLedger;
    use crate::events::IncomeEventBus;
    use crate::models::{Allocation, NewExpenseEntry, NewIncomeEntry};
    use crate::service::LedgerService;

    fn date(
        y: i32,
        m: u32,
        d: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn income(
        stream: IncomeStream,
        amount_cents: i64,
    ) -> NewIncomeEntry {
        NewIncomeEntry {
            user_id: 7,
            stream,
            amount_cents,
            entry_date: date(2025, 6, 30),
            source: None,
            description: None,
        }
    }

    fn expense(
        amount_cents: i64,
        allocation: Allocation,
        description: &str,
    ) -> NewExpenseEntry {
        NewExpenseEntry {
            user_id: 7,
            amount_cents,
            category: "Arbeitsmittel".to_string(),
            entry_date: date(2025, 3, 31),
            allocation,
            description: Some(description.to_string()),
        }
    }

    async fn booked_ledger() -> (LedgerService, EuerReporter) {
        let ledger: Arc<dyn LedgerRepository> = Arc::new(InMemoryLedger::new());
        let service = LedgerService::new(ledger.clone(), IncomeEventBus::new(), GwgPolicy::default());

        service.record_income(income(IncomeStream::Freiberuf, 1_800_000)).await.unwrap();
        service.record_income(income(IncomeStream::Gewerbe, 200_000)).await.unwrap();
        service.record_income(income(IncomeStream::Employment, 350_000)).await.unwrap();
        // 1200 over 36 months, 400 per full year
        service
            .record_expense(expense(120_000, Allocation::new(50, 30, 20).unwrap(), "Notebook"), None)
            .await
            .unwrap();
        service
            .record_expense(expense(24_000, Allocation::new(50, 50, 0).unwrap(), "Jahreslizenz"), None)
            .await
            .unwrap();

        (service, EuerReporter::new(ledger))
    }

    #[tokio::test]
    async fn stream_depreciation_reads_persisted_assets() {
        let (_, reporter) = booked_ledger().await;

        let afa = reporter.stream_depreciation(7, 2025).await.unwrap();

        // March to December, 10 months of 1200 / 36
        assert_eq!(afa.total, dec!(333.33));
        assert_eq!(afa.freiberuf, dec!(166.67));
        assert_eq!(afa.gewerbe, dec!(100.00));
        assert_eq!(afa.personal, dec!(66.67));
    }

    #[tokio::test]
    async fn statement_uses_afa_instead_of_capitalized_cost() {
        let (_, reporter) = booked_ledger().await;

        let freiberuf = reporter.generate(7, IncomeStream::Freiberuf, 2025).await.unwrap();

        assert_eq!(freiberuf.income, dec!(18000.00));
        assert_eq!(freiberuf.operating_expenses, dec!(120.00));
        assert_eq!(freiberuf.depreciation, dec!(166.67));
        assert_eq!(freiberuf.total_expenses, dec!(286.67));
        assert_eq!(freiberuf.profit, dec!(17713.33));
    }

    #[tokio::test]
    async fn dual_statement_combines_both_streams() {
        let (_, reporter) = booked_ledger().await;

        let dual = reporter.generate_dual(7, 2025).await.unwrap();

        assert_eq!(dual.gewerbe.operating_expenses, dec!(120.00));
        assert_eq!(dual.gewerbe.depreciation, dec!(100.00));
        assert_eq!(dual.gewerbe.profit, dec!(1780.00));
        assert_eq!(dual.combined_profit(), dec!(19493.33));
    }

    #[tokio::test]
    async fn disposed_asset_stops_depreciating() {
        let (service, reporter) = booked_ledger().await;
        let asset = service.list_assets(7).await.unwrap().remove(0);
        service.dispose_asset(asset.id, 7, date(2026, 6, 15)).await.unwrap();

        let full_year = reporter.stream_depreciation(7, 2026).await.unwrap();
        let after = reporter.stream_depreciation(7, 2027).await.unwrap();

        assert!(full_year.total < dec!(400.00), "{full_year:?}");
        assert_eq!(after.total, dec!(0));
    }

    #[tokio::test]
    async fn employment_statement_is_rejected() {
        let (_, reporter) = booked_ledger().await;

        let result = reporter.generate(7, IncomeStream::Employment, 2025).await;

        assert_eq!(
            result,
            Err(ReportError::Euer(EuerError::NotSelfEmployed(IncomeStream::Employment)))
        );
    }

    #[tokio::test]
    async fn other_years_only_carry_depreciation() {
        let (_, reporter) = booked_ledger().await;

        let statement = reporter.generate(7, IncomeStream::Freiberuf, 2026).await.unwrap();

        assert_eq!(statement.income, dec!(0));
        assert_eq!(statement.operating_expenses, dec!(0));
        assert_eq!(statement.depreciation, dec!(200.00));
        assert_eq!(statement.profit, dec!(-200.00));
    }
}
