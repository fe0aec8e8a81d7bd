//! SQLite backend for the steuer ledger.

mod factory;
mod repository;

pub use factory::SqliteLedgerFactory;
pub use repository::SqliteLedger;
