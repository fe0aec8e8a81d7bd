use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when creating, disposing or depreciating an asset.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DepreciationError {
    /// Useful life must be at least one month.
    #[error("useful life must be at least one month, got {0}")]
    InvalidUsefulLife(i64),

    /// Net cost must be non-negative.
    #[error("net cost must be non-negative, got {0}")]
    NegativeNetCost(Decimal),

    /// The asset was already disposed.
    #[error("asset already disposed on {0}")]
    AlreadyDisposed(NaiveDate),

    /// Disposal cannot precede acquisition.
    #[error("disposal date {disposal} precedes acquisition date {acquisition}")]
    DisposalBeforeAcquisition {
        acquisition: NaiveDate,
        disposal: NaiveDate,
    },
}

/// A capitalized purchase depreciated straight-line over its useful life (AfA).
///
/// The only mutation after creation is [`DepreciationAsset::dispose`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepreciationAsset {
    name: String,
    acquisition_date: NaiveDate,
    net_cost: Decimal,
    useful_life_months: u32,
    disposal_date: Option<NaiveDate>,
}

impl DepreciationAsset {
    /// # Errors
    ///
    /// Returns [`DepreciationError::InvalidUsefulLife`] for a useful life
    /// below one month and [`DepreciationError::NegativeNetCost`] for a
    /// negative cost.
    pub fn new(
        name: impl Into<String>,
        acquisition_date: NaiveDate,
        net_cost: Decimal,
        useful_life_months: i64,
    ) -> Result<Self, DepreciationError> {
        let useful_life_months = u32::try_from(useful_life_months)
            .ok()
            .filter(|months| *months >= 1)
            .ok_or(DepreciationError::InvalidUsefulLife(useful_life_months))?;
        if net_cost < Decimal::ZERO {
            return Err(DepreciationError::NegativeNetCost(net_cost));
        }
        Ok(Self {
            name: name.into(),
            acquisition_date,
            net_cost,
            useful_life_months,
            disposal_date: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn acquisition_date(&self) -> NaiveDate {
        self.acquisition_date
    }

    pub fn net_cost(&self) -> Decimal {
        self.net_cost
    }

    pub fn useful_life_months(&self) -> u32 {
        self.useful_life_months
    }

    pub fn disposal_date(&self) -> Option<NaiveDate> {
        self.disposal_date
    }

    pub fn is_disposed(&self) -> bool {
        self.disposal_date.is_some()
    }

    /// Records the disposal of the asset. Depreciation runs up to and
    /// including the disposal month and stops afterwards.
    ///
    /// # Errors
    ///
    /// Rejects a second disposal and a disposal date before acquisition.
    pub fn dispose(
        &mut self,
        date: NaiveDate,
    ) -> Result<(), DepreciationError> {
        if let Some(disposed) = self.disposal_date {
            return Err(DepreciationError::AlreadyDisposed(disposed));
        }
        if date < self.acquisition_date {
            return Err(DepreciationError::DisposalBeforeAcquisition {
                acquisition: self.acquisition_date,
                disposal: date,
            });
        }
        self.disposal_date = Some(date);
        Ok(())
    }

    /// Month index (year·12 + month − 1) of the first depreciation month.
    pub(crate) fn start_month_index(&self) -> i64 {
        month_index(self.acquisition_date)
    }

    /// Month index of the last depreciation month: the end of the useful
    /// life, or the disposal month when that comes first.
    pub(crate) fn end_month_index(&self) -> i64 {
        let natural_end = self.start_month_index() + i64::from(self.useful_life_months) - 1;
        match self.disposal_date {
            Some(disposal) => natural_end.min(month_index(disposal)),
            None => natural_end,
        }
    }
}

pub(crate) fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}
