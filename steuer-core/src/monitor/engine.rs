use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;
use tracing::{debug, error, warn};

use super::aggregator::RevenueAggregator;
use super::config::MonitorConfig;
use super::dispatch::AlertDispatcher;
use super::rules::{RuleContext, RuleError, ThresholdRule, default_rules};
use crate::calculations::AnnualProjector;
use crate::clock::Clock;
use crate::db::LedgerRepository;
use crate::events::{IncomeEvent, IncomeEventListener, ListenerError};
use crate::models::{IncomeStream, ThresholdAlert};

/// Re-evaluates every threshold rule for the (user, year) of an income entry
/// whenever that entry is created or modified.
///
/// Alerts fire on every evaluation that crosses a threshold; there is no
/// suppression of repeats.
pub struct ThresholdMonitor {
    ledger: Arc<dyn LedgerRepository>,
    aggregator: RevenueAggregator,
    projector: AnnualProjector,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
    rules: Vec<Box<dyn ThresholdRule>>,
    dispatcher: AlertDispatcher,
}

impl ThresholdMonitor {
    pub fn new(
        ledger: Arc<dyn LedgerRepository>,
        clock: Arc<dyn Clock>,
        config: MonitorConfig,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            aggregator: RevenueAggregator::new(ledger.clone()),
            projector: AnnualProjector::new(clock.clone()),
            ledger,
            clock,
            config,
            rules: default_rules(),
            dispatcher,
        }
    }

    /// Replaces the rule set.
    pub fn with_rules(
        mut self,
        rules: Vec<Box<dyn ThresholdRule>>,
    ) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Evaluates the rules for the year of income entry `entry_id` and
    /// dispatches every alert that fired.
    ///
    /// # Errors
    ///
    /// Only if the entry or its year cannot be resolved. Failing rules are
    /// logged and skipped.
    pub async fn evaluate(
        &self,
        entry_id: i64,
    ) -> Result<Vec<ThresholdAlert>, RuleError> {
        let entry = self.ledger.get_income(entry_id).await?;
        let year = entry.entry_date.year();
        self.evaluate_for(entry.user_id, year, entry.stream).await
    }

    /// Evaluates the rules for one (user, year) as if triggered by an entry
    /// of `stream`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::YearOutOfRange`] for an unrepresentable year.
    pub async fn evaluate_for(
        &self,
        user_id: i64,
        year: i32,
        stream: IncomeStream,
    ) -> Result<Vec<ThresholdAlert>, RuleError> {
        let snapshot = self.aggregator.snapshot(user_id, year).await?;
        let ctx = RuleContext {
            stream,
            snapshot: &snapshot,
            config: &self.config,
            projector: &self.projector,
        };

        let mut alerts = Vec::new();
        for rule in &self.rules {
            let kind = rule.kind();
            match rule.evaluate(&ctx) {
                Ok(Some(finding)) => {
                    warn!(
                        kind = %kind,
                        user_id,
                        year,
                        ratio = %finding.ratio,
                        amount = %finding.reference_amount,
                        "threshold reached"
                    );
                    let alert = ThresholdAlert {
                        kind,
                        ratio: finding.ratio,
                        reference_amount: finding.reference_amount,
                        user_id,
                        year,
                        occurred_at: self.clock.now(),
                    };
                    self.dispatcher.dispatch(&alert);
                    alerts.push(alert);
                }
                Ok(None) => debug!(kind = %kind, user_id, year, "threshold not reached"),
                Err(e) => error!(kind = %kind, user_id, year, error = %e, "threshold rule failed"),
            }
        }
        Ok(alerts)
    }
}

impl std::fmt::Debug for ThresholdMonitor {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ThresholdMonitor")
            .field("config", &self.config)
            .field("rules", &self.rules.iter().map(|r| r.kind()).collect::<Vec<_>>())
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IncomeEventListener for ThresholdMonitor {
    fn name(&self) -> &'static str {
        "threshold-monitor"
    }

    async fn on_income_event(
        &self,
        event: &IncomeEvent,
    ) -> Result<(), ListenerError> {
        self.evaluate(event.entry_id()).await.map(|_| ()).map_err(|e| ListenerError {
            listener: "threshold-monitor",
            message: e.to_string(),
        })
    }
}
