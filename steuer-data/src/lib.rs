//! CSV import, configuration and logging for the `steuer-check` binary.

pub mod config;
pub mod loader;
pub mod logging;

pub use config::{ConfigError, EngineConfig};
pub use loader::{ExpenseRecord, ImportError, ImportSummary, IncomeRecord, LedgerImporter};
pub use logging::init_logging;
