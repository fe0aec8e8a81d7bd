pub mod factory;
pub mod memory;
pub mod repository;

pub use factory::{DbConfig, LedgerFactory, LedgerRegistry};
pub use memory::{InMemoryLedger, MemoryLedgerFactory};
pub use repository::{LedgerError, LedgerRepository};
