use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use steuer_core::calculations::common::{cents_to_euros, euros_to_cents};
use steuer_core::{
    Allocation, AssetRecord, DepreciationAsset, ExpenseEntry, IncomeEntry, IncomeStream,
    LedgerError, LedgerRepository, NewAssetRecord, NewExpenseEntry, NewIncomeEntry,
};
use tracing::debug;

const MEMORY: &str = ":memory:";

pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Opens `database_url`, creating the file if needed.
    ///
    /// Accepts a bare path (`ledger.db`), a sqlx URL (`sqlite://ledger.db`)
    /// or `:memory:`. An in-memory database is held on a single connection
    /// that never expires, since every new connection would see an empty
    /// database.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database url: {}", database_url))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new();
        if database_url == MEMORY || database_url == "sqlite::memory:" {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;

        debug!(database_url, "sqlite ledger opened");
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_err(e: sqlx::Error) -> LedgerError {
    LedgerError::Database(e.to_string())
}

fn stream_column(stream: IncomeStream) -> Option<&'static str> {
    match stream {
        IncomeStream::Freiberuf => Some("freiberuf_pct"),
        IncomeStream::Gewerbe => Some("gewerbe_pct"),
        IncomeStream::Employment => None,
    }
}

fn get_pct(
    row: &SqliteRow,
    column: &str,
) -> Result<u8, LedgerError> {
    let raw: i64 = row.try_get(column).map_err(db_err)?;
    u8::try_from(raw).map_err(|_| LedgerError::Database(format!("{column} out of range: {raw}")))
}

fn row_to_income(row: &SqliteRow) -> Result<IncomeEntry, LedgerError> {
    let stream: String = row.try_get("stream").map_err(db_err)?;
    Ok(IncomeEntry {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        stream: IncomeStream::parse(&stream)
            .ok_or_else(|| LedgerError::Database(format!("Unknown income stream: {stream}")))?,
        amount_cents: row.try_get("amount_cents").map_err(db_err)?,
        entry_date: row.try_get::<NaiveDate, _>("entry_date").map_err(db_err)?,
        source: row.try_get("source").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
    })
}

fn row_to_expense(row: &SqliteRow) -> Result<ExpenseEntry, LedgerError> {
    let allocation = Allocation::new(
        get_pct(row, "freiberuf_pct")?,
        get_pct(row, "gewerbe_pct")?,
        get_pct(row, "personal_pct")?,
    )
    .map_err(|e| LedgerError::Database(e.to_string()))?;

    Ok(ExpenseEntry {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        amount_cents: row.try_get("amount_cents").map_err(db_err)?,
        category: row.try_get("category").map_err(db_err)?,
        entry_date: row.try_get::<NaiveDate, _>("entry_date").map_err(db_err)?,
        allocation,
        description: row.try_get("description").map_err(db_err)?,
    })
}

fn row_to_asset(row: &SqliteRow) -> Result<AssetRecord, LedgerError> {
    let freiberuf: Option<i64> = row.try_get("freiberuf_pct").map_err(db_err)?;
    let allocation = match freiberuf {
        Some(_) => Some(
            Allocation::new(
                get_pct(row, "freiberuf_pct")?,
                get_pct(row, "gewerbe_pct")?,
                get_pct(row, "personal_pct")?,
            )
            .map_err(|e| LedgerError::Database(e.to_string()))?,
        ),
        None => None,
    };

    let name: String = row.try_get("name").map_err(db_err)?;
    let net_cost_cents: i64 = row.try_get("net_cost_cents").map_err(db_err)?;
    let mut asset = DepreciationAsset::new(
        name,
        row.try_get::<NaiveDate, _>("acquisition_date").map_err(db_err)?,
        cents_to_euros(net_cost_cents),
        row.try_get("useful_life_months").map_err(db_err)?,
    )
    .map_err(|e| LedgerError::Database(e.to_string()))?;

    let disposal: Option<NaiveDate> = row.try_get("disposal_date").map_err(db_err)?;
    if let Some(date) = disposal {
        asset.dispose(date).map_err(|e| LedgerError::Database(e.to_string()))?;
    }

    Ok(AssetRecord {
        id: row.try_get("id").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        expense_id: row.try_get("expense_entry_id").map_err(db_err)?,
        allocation,
        asset,
    })
}

const ASSET_COLUMNS: &str = "id, user_id, expense_entry_id, name, acquisition_date, net_cost_cents,
     useful_life_months, disposal_date, freiberuf_pct, gewerbe_pct, personal_pct";

#[async_trait]
impl LedgerRepository for SqliteLedger {
    async fn insert_income(
        &self,
        entry: NewIncomeEntry,
    ) -> Result<IncomeEntry, LedgerError> {
        let result = sqlx::query(
            "INSERT INTO income_entry (user_id, stream, amount_cents, entry_date, source, description)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id)
        .bind(entry.stream.as_str())
        .bind(entry.amount_cents)
        .bind(entry.entry_date)
        .bind(&entry.source)
        .bind(&entry.description)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(entry.into_entry(result.last_insert_rowid()))
    }

    async fn get_income(
        &self,
        id: i64,
    ) -> Result<IncomeEntry, LedgerError> {
        let row = sqlx::query(
            "SELECT id, user_id, stream, amount_cents, entry_date, source, description
             FROM income_entry WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::NotFound)?;

        row_to_income(&row)
    }

    async fn update_income(
        &self,
        entry: &IncomeEntry,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query(
            "UPDATE income_entry
             SET user_id = ?, stream = ?, amount_cents = ?, entry_date = ?, source = ?, description = ?
             WHERE id = ?",
        )
        .bind(entry.user_id)
        .bind(entry.stream.as_str())
        .bind(entry.amount_cents)
        .bind(entry.entry_date)
        .bind(&entry.source)
        .bind(&entry.description)
        .bind(entry.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound);
        }

        Ok(())
    }

    async fn insert_expense(
        &self,
        entry: NewExpenseEntry,
    ) -> Result<ExpenseEntry, LedgerError> {
        let result = sqlx::query(
            "INSERT INTO expense_entry (
                user_id, amount_cents, category, entry_date,
                freiberuf_pct, gewerbe_pct, personal_pct, description
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id)
        .bind(entry.amount_cents)
        .bind(&entry.category)
        .bind(entry.entry_date)
        .bind(i64::from(entry.allocation.freiberuf_pct()))
        .bind(i64::from(entry.allocation.gewerbe_pct()))
        .bind(i64::from(entry.allocation.personal_pct()))
        .bind(&entry.description)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(entry.into_entry(result.last_insert_rowid()))
    }

    async fn list_expenses(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExpenseEntry>, LedgerError> {
        let rows = sqlx::query(
            "SELECT id, user_id, amount_cents, category, entry_date,
                    freiberuf_pct, gewerbe_pct, personal_pct, description
             FROM expense_entry
             WHERE user_id = ? AND entry_date BETWEEN ? AND ?
             ORDER BY entry_date, id",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_expense).collect()
    }

    async fn insert_asset(
        &self,
        record: NewAssetRecord,
    ) -> Result<AssetRecord, LedgerError> {
        let net_cost_cents = euros_to_cents(record.asset.net_cost()).ok_or_else(|| {
            LedgerError::Database(format!("net cost out of range: {}", record.asset.net_cost()))
        })?;
        let shares = record.allocation.map(|a| {
            (
                i64::from(a.freiberuf_pct()),
                i64::from(a.gewerbe_pct()),
                i64::from(a.personal_pct()),
            )
        });

        let result = sqlx::query(
            "INSERT INTO depreciation_asset (
                user_id, expense_entry_id, name, acquisition_date, net_cost_cents,
                useful_life_months, disposal_date, freiberuf_pct, gewerbe_pct, personal_pct
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.user_id)
        .bind(record.expense_id)
        .bind(record.asset.name())
        .bind(record.asset.acquisition_date())
        .bind(net_cost_cents)
        .bind(i64::from(record.asset.useful_life_months()))
        .bind(record.asset.disposal_date())
        .bind(shares.map(|s| s.0))
        .bind(shares.map(|s| s.1))
        .bind(shares.map(|s| s.2))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(record.into_record(result.last_insert_rowid()))
    }

    async fn get_asset(
        &self,
        id: i64,
    ) -> Result<AssetRecord, LedgerError> {
        let sql = format!("SELECT {ASSET_COLUMNS} FROM depreciation_asset WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::NotFound)?;

        row_to_asset(&row)
    }

    async fn update_asset(
        &self,
        record: &AssetRecord,
    ) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE depreciation_asset SET disposal_date = ? WHERE id = ?")
            .bind(record.asset.disposal_date())
            .bind(record.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::NotFound);
        }

        Ok(())
    }

    async fn list_assets(
        &self,
        user_id: i64,
    ) -> Result<Vec<AssetRecord>, LedgerError> {
        let sql = format!(
            "SELECT {ASSET_COLUMNS} FROM depreciation_asset WHERE user_id = ? ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(row_to_asset).collect()
    }

    async fn sum_revenue_cents(
        &self,
        user_id: i64,
        stream: IncomeStream,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, LedgerError> {
        let row = sqlx::query(
            "SELECT COALESCE(SUM(amount_cents), 0) AS total
             FROM income_entry
             WHERE user_id = ? AND stream = ? AND entry_date BETWEEN ? AND ?",
        )
        .bind(user_id)
        .bind(stream.as_str())
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        row.try_get("total").map_err(db_err)
    }

    async fn sum_expense_cents(
        &self,
        user_id: i64,
        stream: IncomeStream,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<i64, LedgerError> {
        let Some(column) = stream_column(stream) else {
            return Ok(0);
        };

        // Integer division truncates each share, matching Allocation::allocate_cents.
        let sql = format!(
            "SELECT COALESCE(SUM(amount_cents / 100 * {column} + amount_cents % 100 * {column} / 100), 0) AS total
             FROM expense_entry
             WHERE user_id = ? AND entry_date BETWEEN ? AND ?"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        row.try_get("total").map_err(db_err)
    }
}
