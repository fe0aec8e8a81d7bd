use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{
    AssetRecord, ExpenseEntry, IncomeEntry, IncomeStream, NewAssetRecord, NewExpenseEntry,
    NewIncomeEntry,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage of income and expense bookings, capitalized assets, and the
/// date-ranged sums the threshold monitor and the assessment read.
///
/// Date ranges are inclusive on both ends. Sums are in cents and are `0`
/// when no row matches. A sum that does not fit in `i64` is a
/// [`LedgerError::Database`].
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    // Income
    async fn insert_income(
        &self,
        entry: NewIncomeEntry,
    ) -> Result<IncomeEntry, LedgerError>;

    async fn get_income(
        &self,
        id: i64,
    ) -> Result<IncomeEntry, LedgerError>;

    async fn update_income(
        &self,
        entry: &IncomeEntry,
    ) -> Result<(), LedgerError>;

    // Expenses
    async fn insert_expense(
        &self,
        entry: NewExpenseEntry,
    ) -> Result<ExpenseEntry, LedgerError>;

    async fn list_expenses(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExpenseEntry>, LedgerError>;

    // Depreciation assets
    async fn insert_asset(
        &self,
        asset: NewAssetRecord,
    ) -> Result<AssetRecord, LedgerError>;

    async fn get_asset(
        &self,
        id: i64,
    ) -> Result<AssetRecord, LedgerError>;

    /// Persists the disposal date of an existing asset.
    async fn update_asset(
        &self,
        asset: &AssetRecord,
    ) -> Result<(), LedgerError>;

    async fn list_assets(
        &self,
        user_id: i64,
    ) -> Result<Vec<AssetRecord>, LedgerError>;

    // Aggregates
    async fn sum_revenue_cents(
        &self,
        user_id: i64,
        stream: IncomeStream,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, LedgerError>;

    /// Sum of the share of every expense allocated to `stream`, each share
    /// truncated to whole cents. Employment always sums to `0`.
    async fn sum_expense_cents(
        &self,
        user_id: i64,
        stream: IncomeStream,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, LedgerError>;
}
