//! Bookkeeping unit of work.
//!
//! Every income mutation goes through [`LedgerService`], which writes it to
//! the ledger and then publishes the matching [`IncomeEvent`] before
//! returning. Listener failures are logged by the bus and never surface here.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::info;

use crate::calculations::common::cents_to_euros;
use crate::calculations::{ExpenseTreatment, GwgPolicy};
use crate::db::{LedgerError, LedgerRepository};
use crate::events::{IncomeEvent, IncomeEventBus};
use crate::models::{
    AssetRecord, DepreciationError, ExpenseEntry, IncomeEntry, IncomeStream, NewAssetRecord,
    NewExpenseEntry, NewIncomeEntry,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Depreciation(#[from] DepreciationError),

    #[error("amount must be positive, got {0} cents")]
    NonPositiveAmount(i64),

    #[error("expense category must not be empty")]
    MissingCategory,
}

/// A stored expense and, for purchases above the GWG threshold, the asset it
/// was capitalized as. `asset` is `None` for immediately deductible expenses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExpense {
    pub entry: ExpenseEntry,
    pub asset: Option<AssetRecord>,
}

pub struct LedgerService {
    ledger: Arc<dyn LedgerRepository>,
    bus: IncomeEventBus,
    gwg: GwgPolicy,
}

impl LedgerService {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        bus: IncomeEventBus,
        gwg: GwgPolicy,
    ) -> Self {
        Self { ledger, bus, gwg }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerRepository> {
        &self.ledger
    }

    /// # Errors
    ///
    /// [`ServiceError::NonPositiveAmount`] for zero or negative amounts, or
    /// the ledger's error.
    pub async fn record_income(
        &self,
        entry: NewIncomeEntry,
    ) -> Result<IncomeEntry, ServiceError> {
        if entry.amount_cents <= 0 {
            return Err(ServiceError::NonPositiveAmount(entry.amount_cents));
        }

        let stored = self.ledger.insert_income(entry).await?;
        info!(
            entry_id = stored.id,
            user_id = stored.user_id,
            stream = %stored.stream,
            amount = %stored.amount(),
            "income recorded"
        );

        self.bus.publish(IncomeEvent::Created { entry_id: stored.id }).await;
        Ok(stored)
    }

    /// Replaces a stored income entry.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Ledger`] with [`LedgerError::NotFound`] for an
    /// unknown id, and the same amount check as [`Self::record_income`].
    pub async fn amend_income(
        &self,
        entry: IncomeEntry,
    ) -> Result<IncomeEntry, ServiceError> {
        if entry.amount_cents <= 0 {
            return Err(ServiceError::NonPositiveAmount(entry.amount_cents));
        }

        self.ledger.update_income(&entry).await?;
        info!(entry_id = entry.id, amount = %entry.amount(), "income amended");

        self.bus.publish(IncomeEvent::Modified { entry_id: entry.id }).await;
        Ok(entry)
    }

    /// Stores an expense and classifies it against the GWG threshold.
    /// Purchases above the threshold are also stored as a depreciation asset
    /// named after the expense description, or its category when there is
    /// none, and carrying the expense's allocation.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Depreciation`] for an invalid useful life. Nothing is
    /// written in that case.
    pub async fn record_expense(
        &self,
        entry: NewExpenseEntry,
        useful_life_months: Option<i64>,
    ) -> Result<RecordedExpense, ServiceError> {
        if entry.amount_cents <= 0 {
            return Err(ServiceError::NonPositiveAmount(entry.amount_cents));
        }
        if entry.category.trim().is_empty() {
            return Err(ServiceError::MissingCategory);
        }

        let name = entry.description.clone().unwrap_or_else(|| entry.category.clone());
        let treatment = self.gwg.classify(
            &name,
            entry.entry_date,
            cents_to_euros(entry.amount_cents),
            useful_life_months,
        )?;

        let stored = self.ledger.insert_expense(entry).await?;
        let asset = match treatment {
            ExpenseTreatment::Immediate => None,
            ExpenseTreatment::Capitalized(asset) => {
                let record = self
                    .ledger
                    .insert_asset(NewAssetRecord {
                        user_id: stored.user_id,
                        expense_id: Some(stored.id),
                        allocation: Some(stored.allocation),
                        asset,
                    })
                    .await?;
                Some(record)
            }
        };
        info!(
            entry_id = stored.id,
            user_id = stored.user_id,
            amount = %stored.amount(),
            asset_id = asset.as_ref().map(|a| a.id),
            freiberuf_share = stored.allocation.share_pct(IncomeStream::Freiberuf),
            gewerbe_share = stored.allocation.share_pct(IncomeStream::Gewerbe),
            "expense recorded"
        );

        Ok(RecordedExpense {
            entry: stored,
            asset,
        })
    }

    pub async fn list_assets(
        &self,
        user_id: i64,
    ) -> Result<Vec<AssetRecord>, ServiceError> {
        Ok(self.ledger.list_assets(user_id).await?)
    }

    /// Marks an asset of `user_id` as disposed on `date`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] when the asset does not exist or belongs to
    /// another user, [`ServiceError::Depreciation`] when it is already
    /// disposed or `date` precedes the acquisition.
    pub async fn dispose_asset(
        &self,
        asset_id: i64,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<AssetRecord, ServiceError> {
        let mut record = self.ledger.get_asset(asset_id).await?;
        if record.user_id != user_id {
            return Err(LedgerError::NotFound.into());
        }

        record.asset.dispose(date)?;
        self.ledger.update_asset(&record).await?;
        info!(asset_id, user_id, %date, name = record.asset.name(), "asset disposed");

        Ok(record)
    }
}

impl std::fmt::Debug for LedgerService {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LedgerService")
            .field("bus", &self.bus)
            .field("gwg", &self.gwg)
            .finish_non_exhaustive()
    }
}
