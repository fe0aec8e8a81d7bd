use std::io::Read;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use steuer_core::calculations::common::euros_to_cents;
use steuer_core::service::{LedgerService, ServiceError};
use steuer_core::{Allocation, AssetRecord, IncomeStream, NewExpenseEntry, NewIncomeEntry};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when importing ledger data.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Row {row}: {reason}")]
    InvalidRecord { row: usize, reason: String },

    #[error("Row {row}: {source}")]
    Service {
        row: usize,
        #[source]
        source: ServiceError,
    },
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParse(err.to_string())
    }
}

/// A single record from an income CSV file.
///
/// - `user_id`: owner of the entry
/// - `stream`: `EMPLOYMENT`, `FREIBERUF` or `GEWERBE` (case-insensitive)
/// - `amount`: EUR, e.g. `1250.00`
/// - `entry_date`: `YYYY-MM-DD`
/// - `source`, `description`: optional, may be empty
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IncomeRecord {
    pub user_id: i64,
    pub stream: String,
    pub amount: Decimal,
    pub entry_date: NaiveDate,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub description: Option<String>,
}

/// A single record from an expense CSV file. The three percentages must add
/// up to 100; `useful_life_months` only matters above the GWG threshold.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ExpenseRecord {
    pub user_id: i64,
    pub amount: Decimal,
    pub category: String,
    pub entry_date: NaiveDate,
    pub freiberuf_pct: u8,
    pub gewerbe_pct: u8,
    pub personal_pct: u8,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub useful_life_months: Option<i64>,
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.trim().parse::<i64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

fn cents(
    amount: Decimal,
    row: usize,
) -> Result<i64, ImportError> {
    let cents = euros_to_cents(amount).ok_or_else(|| ImportError::InvalidRecord {
        row,
        reason: format!("amount {amount} out of range"),
    })?;
    if cents <= 0 {
        return Err(ImportError::InvalidRecord {
            row,
            reason: format!("amount must be positive, got {amount}"),
        });
    }
    Ok(cents)
}

impl IncomeRecord {
    /// Applies every check the ledger service would, so a converted entry
    /// can only fail to record on a storage error.
    ///
    /// `row` is 1-based and only used for error messages.
    pub fn to_new_entry(
        &self,
        row: usize,
    ) -> Result<NewIncomeEntry, ImportError> {
        let stream = IncomeStream::parse(&self.stream).ok_or_else(|| ImportError::InvalidRecord {
            row,
            reason: format!("unknown income stream '{}'", self.stream),
        })?;

        Ok(NewIncomeEntry {
            user_id: self.user_id,
            stream,
            amount_cents: cents(self.amount, row)?,
            entry_date: self.entry_date,
            source: self.source.clone(),
            description: self.description.clone(),
        })
    }
}

impl ExpenseRecord {
    pub fn to_new_entry(
        &self,
        row: usize,
    ) -> Result<NewExpenseEntry, ImportError> {
        let invalid = |reason: String| ImportError::InvalidRecord { row, reason };

        let allocation = Allocation::new(self.freiberuf_pct, self.gewerbe_pct, self.personal_pct)
            .map_err(|e| invalid(e.to_string()))?;
        let category = self.category.trim();
        if category.is_empty() {
            return Err(invalid("category must not be empty".to_string()));
        }
        if let Some(months) = self.useful_life_months.filter(|months| *months < 1) {
            return Err(invalid(format!("useful life must be at least one month, got {months}")));
        }

        Ok(NewExpenseEntry {
            user_id: self.user_id,
            amount_cents: cents(self.amount, row)?,
            category: category.to_string(),
            entry_date: self.entry_date,
            allocation,
            description: self.description.clone(),
        })
    }
}

/// What an import wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub income_entries: usize,
    pub expense_entries: usize,
    /// Assets stored for purchases above the GWG threshold, in import order.
    pub capitalized: Vec<AssetRecord>,
}

type ExpenseRow = (NewExpenseEntry, Option<i64>);

fn income_entries(records: &[IncomeRecord]) -> Result<Vec<NewIncomeEntry>, ImportError> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| record.to_new_entry(i + 1))
        .collect()
}

fn expense_entries(records: &[ExpenseRecord]) -> Result<Vec<ExpenseRow>, ImportError> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| Ok((record.to_new_entry(i + 1)?, record.useful_life_months)))
        .collect()
}

/// Loader for ledger entries from CSV files.
///
/// Parsing is separate from importing so a file can be validated as a whole
/// before anything is written. Importing goes through [`LedgerService`], so
/// every income row triggers the threshold monitor like any other booking.
pub struct LedgerImporter;

impl LedgerImporter {
    pub fn parse_income<R: Read>(reader: R) -> Result<Vec<IncomeRecord>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: IncomeRecord = result?;
            records.push(record);
        }

        debug!(count = records.len(), "parsed income records");
        Ok(records)
    }

    pub fn parse_expenses<R: Read>(reader: R) -> Result<Vec<ExpenseRecord>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: ExpenseRecord = result?;
            records.push(record);
        }

        debug!(count = records.len(), "parsed expense records");
        Ok(records)
    }

    /// Validates every record before the first write and stops at the first
    /// invalid one, so a bad row leaves the ledger untouched. Only a storage
    /// failure can interrupt the import after rows were written; it is
    /// reported as [`ImportError::Service`] with the failing row.
    pub async fn import_income(
        service: &LedgerService,
        records: &[IncomeRecord],
    ) -> Result<usize, ImportError> {
        let entries = income_entries(records)?;
        Self::record_income(service, entries).await
    }

    /// Same validation as [`Self::import_income`]. Returns the assets that
    /// were capitalized.
    pub async fn import_expenses(
        service: &LedgerService,
        records: &[ExpenseRecord],
    ) -> Result<Vec<AssetRecord>, ImportError> {
        let entries = expense_entries(records)?;
        Self::record_expenses(service, entries).await
    }

    /// Validates both files before writing, then imports expenses before
    /// income so profit-based rules see them.
    pub async fn import(
        service: &LedgerService,
        income: &[IncomeRecord],
        expenses: &[ExpenseRecord],
    ) -> Result<ImportSummary, ImportError> {
        let expense_rows = expense_entries(expenses)?;
        let income_rows = income_entries(income)?;

        let capitalized = Self::record_expenses(service, expense_rows).await?;
        let income_entries = Self::record_income(service, income_rows).await?;

        Ok(ImportSummary {
            income_entries,
            expense_entries: expenses.len(),
            capitalized,
        })
    }

    async fn record_income(
        service: &LedgerService,
        entries: Vec<NewIncomeEntry>,
    ) -> Result<usize, ImportError> {
        let count = entries.len();
        for (i, entry) in entries.into_iter().enumerate() {
            service
                .record_income(entry)
                .await
                .map_err(|source| ImportError::Service { row: i + 1, source })?;
        }

        info!(count, "income imported");
        Ok(count)
    }

    async fn record_expenses(
        service: &LedgerService,
        entries: Vec<ExpenseRow>,
    ) -> Result<Vec<AssetRecord>, ImportError> {
        let count = entries.len();
        let mut capitalized = Vec::new();
        for (i, (entry, useful_life_months)) in entries.into_iter().enumerate() {
            let recorded = service
                .record_expense(entry, useful_life_months)
                .await
                .map_err(|source| ImportError::Service { row: i + 1, source })?;
            capitalized.extend(recorded.asset);
        }

        info!(count, capitalized = capitalized.len(), "expenses imported");
        Ok(capitalized)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use steuer_core::calculations::GwgPolicy;
    use steuer_core::db::InMemoryLedger;
    use steuer_core::events::IncomeEventBus;

    use super::*;

    const INCOME_CSV: &str = "user_id,stream,amount,entry_date,source,description
1,FREIBERUF,1500.00,2025-01-15,Kunde A,Beratung Januar
1,gewerbe,249.99,2025-02-01,,
2,EMPLOYMENT,4000,2025-01-31,Arbeitgeber,
";

    const EXPENSE_CSV: &str = "user_id,amount,category,entry_date,freiberuf_pct,gewerbe_pct,personal_pct,description,useful_life_months
1,120.00,Software,2025-01-10,100,0,0,Lizenz,
1,1200.00,Arbeitsmittel,2025-01-15,50,30,20,Notebook,36
";

    fn service() -> LedgerService {
        LedgerService::new(
            Arc::new(InMemoryLedger::new()),
            IncomeEventBus::new(),
            GwgPolicy::default(),
        )
    }

    #[test]
    fn test_parse_income_csv() {
        let records = LedgerImporter::parse_income(INCOME_CSV.as_bytes()).expect("Failed to parse CSV");

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            IncomeRecord {
                user_id: 1,
                stream: "FREIBERUF".to_string(),
                amount: dec!(1500.00),
                entry_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
                source: Some("Kunde A".to_string()),
                description: Some("Beratung Januar".to_string()),
            }
        );
        assert_eq!(records[1].source, None);
        assert_eq!(records[1].description, None);
    }

    #[test]
    fn test_income_record_converts_to_cents() {
        let records = LedgerImporter::parse_income(INCOME_CSV.as_bytes()).unwrap();

        let entry = records[1].to_new_entry(2).unwrap();

        assert_eq!(entry.stream, IncomeStream::Gewerbe);
        assert_eq!(entry.amount_cents, 24_999);
    }

    #[test]
    fn test_unknown_stream_names_the_row() {
        let csv = "user_id,stream,amount,entry_date,source,description\n1,PRIVAT,10,2025-01-01,,";
        let records = LedgerImporter::parse_income(csv.as_bytes()).unwrap();

        let err = records[0].to_new_entry(1).unwrap_err();

        assert_eq!(err.to_string(), "Row 1: unknown income stream 'PRIVAT'");
    }

    #[test]
    fn test_malformed_date_is_a_csv_error() {
        let csv = "user_id,stream,amount,entry_date,source,description\n1,GEWERBE,10,01.02.2025,,";

        let result = LedgerImporter::parse_income(csv.as_bytes());

        assert!(matches!(result, Err(ImportError::CsvParse(_))), "{result:?}");
    }

    #[test]
    fn test_parse_expenses_csv() {
        let records = LedgerImporter::parse_expenses(EXPENSE_CSV.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].useful_life_months, None);
        assert_eq!(records[1].useful_life_months, Some(36));
        assert_eq!(
            records[1].to_new_entry(2).unwrap().allocation,
            Allocation::new(50, 30, 20).unwrap()
        );
    }

    #[test]
    fn test_expense_allocation_must_total_100() {
        let csv = "user_id,amount,category,entry_date,freiberuf_pct,gewerbe_pct,personal_pct,description,useful_life_months
1,10,Porto,2025-01-01,50,50,50,,";
        let records = LedgerImporter::parse_expenses(csv.as_bytes()).unwrap();

        let result = records[0].to_new_entry(1);

        assert!(matches!(result, Err(ImportError::InvalidRecord { row: 1, .. })), "{result:?}");
    }

    #[tokio::test]
    async fn test_import_writes_all_rows_and_reports_capitalized_assets() {
        let service = service();
        let income = LedgerImporter::parse_income(INCOME_CSV.as_bytes()).unwrap();
        let expenses = LedgerImporter::parse_expenses(EXPENSE_CSV.as_bytes()).unwrap();

        let summary = LedgerImporter::import(&service, &income, &expenses).await.unwrap();

        assert_eq!(summary.income_entries, 3);
        assert_eq!(summary.expense_entries, 2);
        assert_eq!(summary.capitalized.len(), 1);
        assert_eq!(summary.capitalized[0].asset.name(), "Notebook");
        assert_eq!(summary.capitalized[0].expense_id, Some(2));
        assert_eq!(service.ledger().get_income(3).await.unwrap().user_id, 2);
    }

    #[tokio::test]
    async fn test_invalid_row_leaves_ledger_untouched() {
        let service = service();
        let csv = "user_id,stream,amount,entry_date,source,description
1,FREIBERUF,100,2025-01-01,,
1,UNBEKANNT,100,2025-01-02,,";
        let records = LedgerImporter::parse_income(csv.as_bytes()).unwrap();

        let result = LedgerImporter::import_income(&service, &records).await;

        assert!(matches!(result, Err(ImportError::InvalidRecord { row: 2, .. })), "{result:?}");
        assert!(service.ledger().get_income(1).await.is_err());
    }

    #[tokio::test]
    async fn test_zero_amount_is_rejected_before_any_write() {
        let service = service();
        let csv = "user_id,stream,amount,entry_date,source,description\n1,FREIBERUF,0,2025-01-01,,";
        let records = LedgerImporter::parse_income(csv.as_bytes()).unwrap();

        let result = LedgerImporter::import_income(&service, &records).await;

        assert!(matches!(result, Err(ImportError::InvalidRecord { row: 1, .. })), "{result:?}");
    }

    #[tokio::test]
    async fn test_negative_amount_after_valid_row_writes_nothing() {
        let service = service();
        let csv = "user_id,stream,amount,entry_date,source,description
1,FREIBERUF,500.00,2025-01-01,,
1,FREIBERUF,-5.00,2025-01-02,,";
        let records = LedgerImporter::parse_income(csv.as_bytes()).unwrap();

        let result = LedgerImporter::import_income(&service, &records).await;

        assert!(matches!(result, Err(ImportError::InvalidRecord { row: 2, .. })), "{result:?}");
        let (from, to) = (
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        );
        let stored = service
            .ledger()
            .sum_revenue_cents(1, IncomeStream::Freiberuf, from, to)
            .await
            .unwrap();
        assert_eq!(stored, 0);
    }

    #[test]
    fn test_expense_rows_are_checked_like_the_service() {
        let header = "user_id,amount,category,entry_date,freiberuf_pct,gewerbe_pct,personal_pct,description,useful_life_months\n";
        for row in [
            "1,-10,Porto,2025-01-01,100,0,0,,",
            "1,10, ,2025-01-01,100,0,0,,",
            "1,1200,Arbeitsmittel,2025-01-01,100,0,0,Notebook,0",
        ] {
            let records = LedgerImporter::parse_expenses(format!("{header}{row}").as_bytes()).unwrap();

            let result = records[0].to_new_entry(1);

            assert!(matches!(result, Err(ImportError::InvalidRecord { row: 1, .. })), "{row}: {result:?}");
        }
    }

    #[tokio::test]
    async fn test_bad_income_row_keeps_expenses_out_of_the_ledger() {
        let service = service();
        let expenses = LedgerImporter::parse_expenses(EXPENSE_CSV.as_bytes()).unwrap();
        let csv = "user_id,stream,amount,entry_date,source,description\n1,FREIBERUF,-1,2025-01-01,,";
        let income = LedgerImporter::parse_income(csv.as_bytes()).unwrap();

        let result = LedgerImporter::import(&service, &income, &expenses).await;

        assert!(matches!(result, Err(ImportError::InvalidRecord { row: 1, .. })), "{result:?}");
        let listed = service
            .ledger()
            .list_expenses(
                1,
                NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            )
            .await
            .unwrap();
        assert!(listed.is_empty());
        assert!(service.list_assets(1).await.unwrap().is_empty());
    }
}
