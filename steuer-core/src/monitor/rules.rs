//! The statutory threshold rules.
//!
//! Each rule reads only the figures it needs from a [`YearSnapshot`] and
//! answers with an optional [`Finding`]. Rules are independent: the engine
//! evaluates all of them even if some fail.
//!
//! | rule                          | fires when                                           |
//! |-------------------------------|------------------------------------------------------|
//! | `KleinunternehmerCurrentYear` | revenue / current limit ≥ warning ratio              |
//! | `KleinunternehmerProjected`   | projected revenue / projected limit ≥ warning ratio  |
//! | `Abfaerbung`                  | gewerbe / self-employed > ratio **and** gewerbe > min |
//! | `GewerbesteuerFreibetrag`     | gewerbe profit > Freibetrag                          |
//! | `Bilanzierungspflicht`        | gewerbe > revenue limit **or** profit > profit limit |
//! | `MandatoryFiling`             | freiberuf + gewerbe > 410, never for employment      |

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use super::aggregator::YearSnapshot;
use super::config::MonitorConfig;
use crate::calculations::common::ratio;
use crate::calculations::{AnnualProjector, ProjectionError};
use crate::db::LedgerError;
use crate::models::{IncomeStream, ThresholdKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("ledger read failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("arithmetic overflow computing {0}")]
    Overflow(&'static str),

    #[error("year {0} is out of range")]
    YearOutOfRange(i32),

    #[error("invalid monitor setting {field}: {value}")]
    InvalidSetting { field: &'static str, value: Decimal },
}

/// What a rule sees for one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    /// Stream of the entry that triggered the evaluation.
    pub stream: IncomeStream,
    pub snapshot: &'a YearSnapshot,
    pub config: &'a MonitorConfig,
    pub projector: &'a AnnualProjector,
}

/// A fired rule, before it is stamped into a
/// [`ThresholdAlert`](crate::models::ThresholdAlert).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finding {
    /// 4 decimals.
    pub ratio: Decimal,
    pub reference_amount: Decimal,
}

pub trait ThresholdRule: Send + Sync {
    fn kind(&self) -> ThresholdKind;

    /// `Ok(None)` when the rule does not fire or does not apply.
    fn evaluate(
        &self,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Finding>, RuleError>;
}

/// The six rules in evaluation order.
pub fn default_rules() -> Vec<Box<dyn ThresholdRule>> {
    vec![
        Box::new(KleinunternehmerCurrentYear),
        Box::new(KleinunternehmerProjected),
        Box::new(Abfaerbung),
        Box::new(GewerbesteuerFreibetrag),
        Box::new(Bilanzierungspflicht),
        Box::new(MandatoryFiling),
    ]
}

fn checked_ratio(
    numerator: Decimal,
    denominator: Decimal,
    what: &'static str,
) -> Result<Decimal, RuleError> {
    ratio(numerator, denominator).ok_or(RuleError::Overflow(what))
}

// ============================================================================
// Kleinunternehmer (§19 UStG)
// ============================================================================

pub struct KleinunternehmerCurrentYear;

impl ThresholdRule for KleinunternehmerCurrentYear {
    fn kind(&self) -> ThresholdKind {
        ThresholdKind::KleinunternehmerCurrentYear
    }

    fn evaluate(
        &self,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Finding>, RuleError> {
        let revenue = ctx.snapshot.self_employed()?;
        if revenue.is_zero() {
            debug!(user_id = ctx.snapshot.user_id, "no self-employed revenue, skipping");
            return Ok(None);
        }

        let ratio = checked_ratio(revenue, ctx.config.current_year_limit, "current-year ratio")?;
        Ok((ratio >= ctx.config.warning_ratio).then_some(Finding {
            ratio,
            reference_amount: revenue,
        }))
    }
}

pub struct KleinunternehmerProjected;

impl ThresholdRule for KleinunternehmerProjected {
    fn kind(&self) -> ThresholdKind {
        ThresholdKind::KleinunternehmerProjected
    }

    fn evaluate(
        &self,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Finding>, RuleError> {
        let revenue = ctx.snapshot.self_employed()?;
        if revenue.is_zero() {
            debug!(user_id = ctx.snapshot.user_id, "no self-employed revenue, skipping");
            return Ok(None);
        }

        let Some(projected) = ctx.projector.project(revenue, ctx.snapshot.year)?.amount() else {
            debug!(year = ctx.snapshot.year, "future year, skipping projection");
            return Ok(None);
        };

        let ratio = checked_ratio(projected, ctx.config.projected_year_limit, "projected ratio")?;
        Ok((ratio >= ctx.config.warning_ratio).then_some(Finding {
            ratio,
            reference_amount: projected,
        }))
    }
}

// ============================================================================
// Abfärbung (§15 Abs. 3 Nr. 1 EStG)
// ============================================================================

pub struct Abfaerbung;

impl ThresholdRule for Abfaerbung {
    fn kind(&self) -> ThresholdKind {
        ThresholdKind::Abfaerbung
    }

    fn evaluate(
        &self,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Finding>, RuleError> {
        let gewerbe = ctx.snapshot.gewerbe()?;
        let self_employed = ctx.snapshot.self_employed()?;
        if self_employed.is_zero() {
            return Ok(None);
        }

        let ratio = checked_ratio(gewerbe, self_employed, "abfaerbung ratio")?;
        let fires = ratio > ctx.config.abfaerbung_ratio && gewerbe > ctx.config.abfaerbung_min_amount;
        Ok(fires.then_some(Finding {
            ratio,
            reference_amount: gewerbe,
        }))
    }
}

// ============================================================================
// Gewerbesteuer
// ============================================================================

pub struct GewerbesteuerFreibetrag;

impl ThresholdRule for GewerbesteuerFreibetrag {
    fn kind(&self) -> ThresholdKind {
        ThresholdKind::GewerbesteuerFreibetrag
    }

    fn evaluate(
        &self,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Finding>, RuleError> {
        let profit = ctx.snapshot.gewerbe_profit()?;
        if profit <= ctx.config.gewerbe_freibetrag {
            return Ok(None);
        }

        Ok(Some(Finding {
            ratio: checked_ratio(profit, ctx.config.gewerbe_freibetrag, "freibetrag ratio")?,
            reference_amount: profit,
        }))
    }
}

/// §141 AO. The ratio is the larger of the two limit utilisations.
pub struct Bilanzierungspflicht;

impl ThresholdRule for Bilanzierungspflicht {
    fn kind(&self) -> ThresholdKind {
        ThresholdKind::Bilanzierungspflicht
    }

    fn evaluate(
        &self,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Finding>, RuleError> {
        let revenue = ctx.snapshot.gewerbe()?;
        let profit = ctx.snapshot.gewerbe_profit()?;
        if revenue <= ctx.config.bilanzierung_revenue && profit <= ctx.config.bilanzierung_profit {
            return Ok(None);
        }

        let revenue_ratio = checked_ratio(revenue, ctx.config.bilanzierung_revenue, "revenue ratio")?;
        let profit_ratio = checked_ratio(profit, ctx.config.bilanzierung_profit, "profit ratio")?;
        Ok(Some(Finding {
            ratio: revenue_ratio.max(profit_ratio),
            reference_amount: revenue,
        }))
    }
}

// ============================================================================
// Mandatory filing (§46 Abs. 2 Nr. 1 EStG)
// ============================================================================

pub struct MandatoryFiling;

impl ThresholdRule for MandatoryFiling {
    fn kind(&self) -> ThresholdKind {
        ThresholdKind::MandatoryFiling
    }

    fn evaluate(
        &self,
        ctx: &RuleContext<'_>,
    ) -> Result<Option<Finding>, RuleError> {
        if ctx.stream == IncomeStream::Employment {
            return Ok(None);
        }

        let side_income = ctx.snapshot.self_employed()?;
        if side_income <= ctx.config.mandatory_filing_threshold {
            return Ok(None);
        }

        Ok(Some(Finding {
            ratio: checked_ratio(side_income, ctx.config.mandatory_filing_threshold, "filing ratio")?,
            reference_amount: side_income,
        }))
    }
}
