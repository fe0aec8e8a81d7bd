use async_trait::async_trait;
use steuer_core::db::{DbConfig, LedgerFactory};
use steuer_core::{LedgerError, LedgerRepository};

use crate::repository::SqliteLedger;

/// [`LedgerFactory`] for SQLite.
///
/// Register this with a [`steuer_core::db::LedgerRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use steuer_core::db::LedgerRegistry;
/// use steuer_db_sqlite::SqliteLedgerFactory;
///
/// let mut registry = LedgerRegistry::new();
/// registry.register(Box::new(SqliteLedgerFactory));
/// ```
pub struct SqliteLedgerFactory;

#[async_trait]
impl LedgerFactory for SqliteLedgerFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Open the database described by `config.connection_string` and bring
    /// its schema up to date.
    ///
    /// Accepted connection-string values:
    /// * A bare file path, e.g. `"ledger.db"`. The file is created if it
    ///   does not exist.
    /// * `":memory:"`, an ephemeral in-memory database.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn LedgerRepository>, LedgerError> {
        let ledger = SqliteLedger::new(&config.connection_string)
            .await
            .map_err(|e| LedgerError::Connection(format!("{e:#}")))?;
        ledger
            .run_migrations()
            .await
            .map_err(|e| LedgerError::Database(format!("{e:#}")))?;
        Ok(Box::new(ledger))
    }
}
