//! Full-year extrapolation of partial-year aggregates.
//!
//! A past year is already complete and is returned unchanged. The current
//! year is scaled linearly by elapsed days:
//!
//! ```text
//! projected = aggregate × days_in_year / max(day_of_year(today), 1)
//! ```
//!
//! A future year has no data to extrapolate from; callers skip it.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::round_half_up;
use crate::clock::Clock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("projection of {0} overflows")]
    Overflow(Decimal),
}

/// Result of projecting an aggregate for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    /// The year is over; the aggregate is final.
    Elapsed(Decimal),
    /// The year is in progress.
    Extrapolated {
        projected: Decimal,
        day_of_year: u32,
        days_in_year: u32,
    },
    /// The year has not started.
    Future,
}

impl Projection {
    /// The full-year amount, `None` for a future year.
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Self::Elapsed(amount) => Some(*amount),
            Self::Extrapolated { projected, .. } => Some(*projected),
            Self::Future => None,
        }
    }
}

/// Projects aggregates against an injected [`Clock`].
#[derive(Debug, Clone)]
pub struct AnnualProjector {
    clock: Arc<dyn Clock>,
}

impl AnnualProjector {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// # Errors
    ///
    /// Returns [`ProjectionError::Overflow`] if the scaled amount does not
    /// fit into a `Decimal`.
    pub fn project(
        &self,
        aggregate: Decimal,
        year: i32,
    ) -> Result<Projection, ProjectionError> {
        let today = self.clock.today();
        if year < today.year() {
            return Ok(Projection::Elapsed(aggregate));
        }
        if year > today.year() {
            return Ok(Projection::Future);
        }

        let day_of_year = today.ordinal().max(1);
        let days_in_year = days_in_year(year);
        let projected = aggregate
            .checked_mul(Decimal::from(days_in_year))
            .and_then(|scaled| scaled.checked_div(Decimal::from(day_of_year)))
            .map(round_half_up)
            .ok_or(ProjectionError::Overflow(aggregate))?;

        Ok(Projection::Extrapolated {
            projected,
            day_of_year,
            days_in_year,
        })
    }
}

/// 366 in leap years, 365 otherwise.
pub fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_yo_opt(year, 366).is_some() {
        366
    } else {
        365
    }
}
