//! Statutory threshold monitoring.
//!
//! [`ThresholdMonitor`] listens for income events, reads the year's
//! aggregates through [`RevenueAggregator`], runs every [`ThresholdRule`]
//! and hands fired alerts to the [`AlertDispatcher`].

pub mod aggregator;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod rules;

pub use aggregator::{RevenueAggregator, YearSnapshot, year_bounds};
pub use config::MonitorConfig;
pub use dispatch::{AlertCollector, AlertDispatcher, AlertSubscriber};
pub use engine::ThresholdMonitor;
pub use rules::{Finding, RuleContext, RuleError, ThresholdRule, default_rules};
