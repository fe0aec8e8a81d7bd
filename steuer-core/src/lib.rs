pub mod calculations;
pub mod clock;
pub mod db;
pub mod events;
pub mod models;
pub mod monitor;
pub mod reports;
pub mod service;

pub use db::repository::{LedgerError, LedgerRepository};
pub use models::*;
