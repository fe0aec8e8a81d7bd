//! Process-local ledger backed by a mutex-guarded map.
//!
//! Used by tests and by the `memory` backend of the CLI. Nothing survives the
//! process.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDate;

use super::factory::{DbConfig, LedgerFactory};
use super::repository::{LedgerError, LedgerRepository};
use crate::models::{
    AssetRecord, ExpenseEntry, IncomeEntry, IncomeStream, NewAssetRecord, NewExpenseEntry,
    NewIncomeEntry,
};

#[derive(Debug, Default)]
struct Tables {
    income: BTreeMap<i64, IncomeEntry>,
    expenses: BTreeMap<i64, ExpenseEntry>,
    assets: BTreeMap<i64, AssetRecord>,
    next_income_id: i64,
    next_expense_id: i64,
    next_asset_id: i64,
}

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    tables: Mutex<Tables>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, LedgerError> {
        self.tables
            .lock()
            .map_err(|_| LedgerError::Database("ledger lock poisoned".to_string()))
    }
}

fn in_range(
    date: NaiveDate,
    from: NaiveDate,
    to: NaiveDate,
) -> bool {
    from <= date && date <= to
}

fn checked_total(cents: impl IntoIterator<Item = i64>) -> Result<i64, LedgerError> {
    cents
        .into_iter()
        .try_fold(0i64, |acc, c| acc.checked_add(c))
        .ok_or_else(|| LedgerError::Database("sum exceeds the i64 cent range".to_string()))
}

#[async_trait]
impl LedgerRepository for InMemoryLedger {
    async fn insert_income(
        &self,
        entry: NewIncomeEntry,
    ) -> Result<IncomeEntry, LedgerError> {
        let mut tables = self.lock()?;
        tables.next_income_id += 1;
        let stored = entry.into_entry(tables.next_income_id);
        tables.income.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_income(
        &self,
        id: i64,
    ) -> Result<IncomeEntry, LedgerError> {
        self.lock()?.income.get(&id).cloned().ok_or(LedgerError::NotFound)
    }

    async fn update_income(
        &self,
        entry: &IncomeEntry,
    ) -> Result<(), LedgerError> {
        let mut tables = self.lock()?;
        let existing = tables.income.get_mut(&entry.id).ok_or(LedgerError::NotFound)?;
        *existing = entry.clone();
        Ok(())
    }

    async fn insert_expense(
        &self,
        entry: NewExpenseEntry,
    ) -> Result<ExpenseEntry, LedgerError> {
        let mut tables = self.lock()?;
        tables.next_expense_id += 1;
        let stored = entry.into_entry(tables.next_expense_id);
        tables.expenses.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_expenses(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExpenseEntry>, LedgerError> {
        Ok(self
            .lock()?
            .expenses
            .values()
            .filter(|e| e.user_id == user_id && in_range(e.entry_date, from, to))
            .cloned()
            .collect())
    }

    async fn insert_asset(
        &self,
        asset: NewAssetRecord,
    ) -> Result<AssetRecord, LedgerError> {
        let mut tables = self.lock()?;
        tables.next_asset_id += 1;
        let stored = asset.into_record(tables.next_asset_id);
        tables.assets.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_asset(
        &self,
        id: i64,
    ) -> Result<AssetRecord, LedgerError> {
        self.lock()?.assets.get(&id).cloned().ok_or(LedgerError::NotFound)
    }

    async fn update_asset(
        &self,
        asset: &AssetRecord,
    ) -> Result<(), LedgerError> {
        let mut tables = self.lock()?;
        let existing = tables.assets.get_mut(&asset.id).ok_or(LedgerError::NotFound)?;
        *existing = asset.clone();
        Ok(())
    }

    async fn list_assets(
        &self,
        user_id: i64,
    ) -> Result<Vec<AssetRecord>, LedgerError> {
        Ok(self
            .lock()?
            .assets
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn sum_revenue_cents(
        &self,
        user_id: i64,
        stream: IncomeStream,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, LedgerError> {
        let tables = self.lock()?;
        checked_total(
            tables
                .income
                .values()
                .filter(|e| e.user_id == user_id && e.stream == stream)
                .filter(|e| in_range(e.entry_date, from, to))
                .map(|e| e.amount_cents),
        )
    }

    async fn sum_expense_cents(
        &self,
        user_id: i64,
        stream: IncomeStream,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, LedgerError> {
        let tables = self.lock()?;
        checked_total(
            tables
                .expenses
                .values()
                .filter(|e| e.user_id == user_id && in_range(e.entry_date, from, to))
                .map(|e| e.allocation.allocate_cents(e.amount_cents, stream)),
        )
    }
}

/// [`LedgerFactory`] for the `"memory"` backend. Every `create` returns a
/// fresh, empty ledger.
pub struct MemoryLedgerFactory;

#[async_trait]
impl LedgerFactory for MemoryLedgerFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, LedgerError> {
        Ok(Box::new(InMemoryLedger::new()))
    }
}
