//! Straight-line depreciation (lineare AfA, §7 Abs. 1 EStG).
//!
//! Depreciation starts in the month of acquisition and every started month
//! counts in full (Monatsprinzip). A disposal stops depreciation after the
//! disposal month and writes the remaining book value off.
//!
//! Purchases up to the GWG threshold (§6 Abs. 2 EStG) are expensed
//! immediately instead; see [`GwgPolicy`].
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use steuer_core::DepreciationAsset;
//! use steuer_core::calculations::DepreciationCalculator;
//!
//! let acquired = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
//! let laptop = DepreciationAsset::new("Laptop", acquired, dec!(1200.00), 36).unwrap();
//! let calculator = DepreciationCalculator::new(&laptop);
//!
//! assert_eq!(calculator.for_year(2026), dec!(400.00));
//! assert_eq!(calculator.schedule().len(), 3);
//! ```

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{floor_at_zero, round_half_up};
use crate::models::month_index;
use crate::{Allocation, DepreciationAsset, DepreciationError, IncomeStream};

const MONTHLY_RATE_SCALE: u32 = 10;

/// One row of a depreciation schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepreciationYearEntry {
    pub year: i32,
    pub depreciation: Decimal,
    /// Book value at the end of the year.
    pub remaining_book_value: Decimal,
    /// Residual book value written off on disposal, zero otherwise.
    pub written_off: Decimal,
}

/// Computes year-by-year depreciation for a single asset.
#[derive(Debug, Clone, Copy)]
pub struct DepreciationCalculator<'a> {
    asset: &'a DepreciationAsset,
}

impl<'a> DepreciationCalculator<'a> {
    pub fn new(asset: &'a DepreciationAsset) -> Self {
        Self { asset }
    }

    /// `net_cost / useful_life_months`, 10 decimals.
    pub fn monthly_rate(&self) -> Decimal {
        (self.asset.net_cost() / Decimal::from(self.asset.useful_life_months()))
            .round_dp_with_strategy(MONTHLY_RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Depreciation for a full year of use, two decimals.
    pub fn annual_rate(&self) -> Decimal {
        round_half_up(self.monthly_rate() * dec!(12))
    }

    /// Number of depreciation months falling into `year`.
    pub fn months_in_year(
        &self,
        year: i32,
    ) -> u32 {
        let year_start = i64::from(year) * 12;
        let first = self.asset.start_month_index().max(year_start);
        let last = self.asset.end_month_index().min(year_start + 11);
        u32::try_from(last - first + 1).unwrap_or(0)
    }

    /// Depreciation booked in `year`, two decimals.
    pub fn for_year(
        &self,
        year: i32,
    ) -> Decimal {
        let months = self.months_in_year(year);
        if months == 0 {
            return Decimal::new(0, 2);
        }
        round_half_up(self.monthly_rate() * Decimal::from(months))
    }

    /// Book value as of `as_of`: net cost minus the depreciation of every year
    /// up to and including the year of `as_of`, floored at zero. Zero at and
    /// after the disposal date.
    pub fn remaining_book_value(
        &self,
        as_of: NaiveDate,
    ) -> Decimal {
        if self.asset.disposal_date().is_some_and(|disposed| as_of >= disposed) {
            return Decimal::new(0, 2);
        }

        let first_year = year_of(self.asset.start_month_index());
        let depreciated: Decimal = (first_year..=year_of(month_index(as_of)))
            .map(|year| self.for_year(year))
            .sum();
        round_half_up(floor_at_zero(self.asset.net_cost() - depreciated))
    }

    /// Year-by-year schedule from the acquisition year to the last
    /// depreciation year. In the disposal year the remaining book value is
    /// written off and reported as zero.
    pub fn schedule(&self) -> Vec<DepreciationYearEntry> {
        let first_year = year_of(self.asset.start_month_index());
        let last_year = year_of(self.asset.end_month_index());
        let disposal_year = self.asset.disposal_date().map(|d| year_of(month_index(d)));

        let mut remaining = self.asset.net_cost();
        let mut entries = Vec::new();
        for year in first_year..=last_year {
            let depreciation = self.for_year(year);
            remaining = round_half_up(floor_at_zero(remaining - depreciation));

            let written_off = if disposal_year == Some(year) {
                std::mem::replace(&mut remaining, Decimal::new(0, 2))
            } else {
                Decimal::new(0, 2)
            };

            entries.push(DepreciationYearEntry {
                year,
                depreciation,
                remaining_book_value: remaining,
                written_off,
            });
        }
        entries
    }
}

fn year_of(month_index: i64) -> i32 {
    // month indices are built from a NaiveDate year, so this always fits
    month_index.div_euclid(12) as i32
}

/// Depreciation of `asset` booked in `year`.
pub fn compute_depreciation_for_year(
    asset: &DepreciationAsset,
    year: i32,
) -> Decimal {
    DepreciationCalculator::new(asset).for_year(year)
}

/// Full schedule for `asset` as `(year, depreciation, remaining book value)`
/// rows.
pub fn compute_schedule(asset: &DepreciationAsset) -> Vec<DepreciationYearEntry> {
    DepreciationCalculator::new(asset).schedule()
}

// ============================================================================
// GWG (geringwertige Wirtschaftsgüter)
// ============================================================================

/// How a purchase is booked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpenseTreatment {
    /// Expensed in full in the year of purchase.
    Immediate,
    /// Capitalized and depreciated over its useful life.
    Capitalized(DepreciationAsset),
}

/// Decides between immediate expensing and capitalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GwgPolicy {
    /// Net cost up to which a purchase is expensed immediately.
    pub threshold: Decimal,
    /// Useful life for capitalized purchases unless the caller overrides it.
    pub default_useful_life_months: i64,
}

impl Default for GwgPolicy {
    fn default() -> Self {
        Self {
            threshold: dec!(800.00),
            default_useful_life_months: 36,
        }
    }
}

impl GwgPolicy {
    pub fn is_gwg(
        &self,
        net_cost: Decimal,
    ) -> bool {
        net_cost <= self.threshold
    }

    /// Classifies a purchase, creating the [`DepreciationAsset`] when it
    /// exceeds the threshold.
    ///
    /// # Errors
    ///
    /// Propagates [`DepreciationError`] if the asset cannot be created, e.g.
    /// for a useful life below one month.
    pub fn classify(
        &self,
        name: &str,
        acquisition_date: NaiveDate,
        net_cost: Decimal,
        useful_life_months: Option<i64>,
    ) -> Result<ExpenseTreatment, DepreciationError> {
        if self.is_gwg(net_cost) {
            return Ok(ExpenseTreatment::Immediate);
        }
        let months = useful_life_months.unwrap_or(self.default_useful_life_months);
        let asset = DepreciationAsset::new(name, acquisition_date, net_cost, months)?;
        Ok(ExpenseTreatment::Capitalized(asset))
    }
}

// ============================================================================
// Per-stream totals
// ============================================================================

/// An asset together with the allocation of the expense it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedAsset {
    pub asset: DepreciationAsset,
    /// `None` counts toward the total only.
    pub allocation: Option<Allocation>,
}

/// A year's depreciation split by income stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDepreciation {
    pub freiberuf: Decimal,
    pub gewerbe: Decimal,
    pub personal: Decimal,
    pub total: Decimal,
}

/// Sums the depreciation of `assets` for `year`, split by allocation share.
pub fn stream_totals_for_year(
    assets: &[AllocatedAsset],
    year: i32,
) -> StreamDepreciation {
    let mut totals = StreamDepreciation::default();

    for item in assets {
        let depreciation = compute_depreciation_for_year(&item.asset, year);
        if depreciation.is_zero() {
            continue;
        }
        totals.total += depreciation;

        if let Some(allocation) = item.allocation {
            totals.freiberuf += share(depreciation, allocation.share_pct(IncomeStream::Freiberuf));
            totals.gewerbe += share(depreciation, allocation.share_pct(IncomeStream::Gewerbe));
            totals.personal += share(depreciation, allocation.personal_pct());
        }
    }

    StreamDepreciation {
        freiberuf: round_half_up(totals.freiberuf),
        gewerbe: round_half_up(totals.gewerbe),
        personal: round_half_up(totals.personal),
        total: round_half_up(totals.total),
    }
}

fn share(
    amount: Decimal,
    pct: u8,
) -> Decimal {
    round_half_up(amount * Decimal::from(pct) / Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(
        y: i32,
        m: u32,
        d: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn laptop() -> DepreciationAsset {
        DepreciationAsset::new("Laptop", date(2026, 1, 15), dec!(1200.00), 36).unwrap()
    }

    // =========================================================================
    // Yearly depreciation
    // =========================================================================

    #[test]
    fn full_year_of_three_year_asset() {
        let asset = laptop();
        let calculator = DepreciationCalculator::new(&asset);

        assert_eq!(calculator.for_year(2026), dec!(400.00));
        assert_eq!(calculator.for_year(2027), dec!(400.00));
        assert_eq!(calculator.for_year(2028), dec!(400.00));
    }

    #[test]
    fn nothing_outside_useful_life() {
        let asset = laptop();
        let calculator = DepreciationCalculator::new(&asset);

        assert_eq!(calculator.for_year(2025), dec!(0.00));
        assert_eq!(calculator.for_year(2029), dec!(0.00));
    }

    #[test]
    fn first_year_is_pro_rated_from_acquisition_month() {
        let asset = DepreciationAsset::new("Monitor", date(2026, 10, 31), dec!(1000.00), 36).unwrap();
        let calculator = DepreciationCalculator::new(&asset);

        assert_eq!(calculator.months_in_year(2026), 3);
        assert_eq!(calculator.months_in_year(2027), 12);
        assert_eq!(calculator.months_in_year(2028), 12);
        assert_eq!(calculator.months_in_year(2029), 9);
        assert_eq!(calculator.for_year(2026), dec!(83.33));
        assert_eq!(calculator.for_year(2029), dec!(250.00));
    }

    #[test]
    fn short_life_within_one_year() {
        let asset = DepreciationAsset::new("Lizenz", date(2026, 3, 1), dec!(900.00), 6).unwrap();
        let calculator = DepreciationCalculator::new(&asset);

        // March through August
        assert_eq!(calculator.months_in_year(2026), 6);
        assert_eq!(calculator.for_year(2026), dec!(900.00));
    }

    #[test]
    fn monthly_and_annual_rate() {
        let asset = DepreciationAsset::new("Monitor", date(2026, 1, 1), dec!(1000.00), 36).unwrap();
        let calculator = DepreciationCalculator::new(&asset);

        assert_eq!(calculator.monthly_rate(), dec!(27.7777777778));
        assert_eq!(calculator.annual_rate(), dec!(333.33));
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    #[test]
    fn disposal_stops_depreciation_after_disposal_month() {
        let mut asset = laptop();
        asset.dispose(date(2027, 4, 2)).unwrap();
        let calculator = DepreciationCalculator::new(&asset);

        assert_eq!(calculator.for_year(2026), dec!(400.00));
        // January through April
        assert_eq!(calculator.for_year(2027), dec!(133.33));
        assert_eq!(calculator.for_year(2028), dec!(0.00));
    }

    #[test]
    fn disposal_in_acquisition_year() {
        let mut asset = DepreciationAsset::new("Kamera", date(2026, 3, 10), dec!(1200.00), 12).unwrap();
        asset.dispose(date(2026, 5, 20)).unwrap();
        let calculator = DepreciationCalculator::new(&asset);

        assert_eq!(calculator.months_in_year(2026), 3);
        assert_eq!(calculator.for_year(2026), dec!(300.00));
    }

    #[test]
    fn disposal_after_useful_life_does_not_extend_depreciation() {
        let mut asset = laptop();
        asset.dispose(date(2030, 6, 1)).unwrap();
        let calculator = DepreciationCalculator::new(&asset);

        assert_eq!(calculator.for_year(2029), dec!(0.00));
        assert_eq!(calculator.for_year(2030), dec!(0.00));
    }

    // =========================================================================
    // Book value
    // =========================================================================

    #[test]
    fn remaining_book_value_by_year() {
        let asset = laptop();
        let calculator = DepreciationCalculator::new(&asset);

        assert_eq!(calculator.remaining_book_value(date(2026, 6, 30)), dec!(800.00));
        assert_eq!(calculator.remaining_book_value(date(2027, 12, 31)), dec!(400.00));
        assert_eq!(calculator.remaining_book_value(date(2031, 1, 1)), dec!(0.00));
    }

    #[test]
    fn remaining_book_value_before_acquisition_is_net_cost() {
        let asset = laptop();

        let value = DepreciationCalculator::new(&asset).remaining_book_value(date(2025, 12, 31));

        assert_eq!(value, dec!(1200.00));
    }

    #[test]
    fn remaining_book_value_is_zero_at_and_after_disposal() {
        let mut asset = laptop();
        asset.dispose(date(2027, 4, 2)).unwrap();
        let calculator = DepreciationCalculator::new(&asset);

        assert_eq!(calculator.remaining_book_value(date(2027, 4, 1)), dec!(666.67));
        assert_eq!(calculator.remaining_book_value(date(2027, 4, 2)), dec!(0.00));
        assert_eq!(calculator.remaining_book_value(date(2029, 1, 1)), dec!(0.00));
    }

    // =========================================================================
    // Schedule
    // =========================================================================

    #[test]
    fn schedule_of_undisposed_asset_sums_to_net_cost() {
        let asset = DepreciationAsset::new("Monitor", date(2026, 10, 31), dec!(1000.00), 36).unwrap();

        let schedule = compute_schedule(&asset);
        let total: Decimal = schedule.iter().map(|e| e.depreciation).sum();

        assert_eq!(
            schedule.iter().map(|e| e.year).collect::<Vec<_>>(),
            vec![2026, 2027, 2028, 2029]
        );
        // one cent of rounding per year at most
        assert!((dec!(1000.00) - total).abs() <= dec!(0.04));
        assert_eq!(schedule.last().map(|e| e.remaining_book_value), Some(dec!(0.01)));
    }

    #[test]
    fn schedule_rows_carry_book_value() {
        let schedule = compute_schedule(&laptop());

        assert_eq!(
            schedule,
            vec![
                DepreciationYearEntry {
                    year: 2026,
                    depreciation: dec!(400.00),
                    remaining_book_value: dec!(800.00),
                    written_off: dec!(0.00),
                },
                DepreciationYearEntry {
                    year: 2027,
                    depreciation: dec!(400.00),
                    remaining_book_value: dec!(400.00),
                    written_off: dec!(0.00),
                },
                DepreciationYearEntry {
                    year: 2028,
                    depreciation: dec!(400.00),
                    remaining_book_value: dec!(0.00),
                    written_off: dec!(0.00),
                },
            ]
        );
    }

    #[test]
    fn schedule_is_truncated_by_disposal() {
        let mut asset = laptop();
        asset.dispose(date(2027, 4, 2)).unwrap();

        let schedule = compute_schedule(&asset);

        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[1].depreciation, dec!(133.33));
        assert_eq!(schedule[1].remaining_book_value, dec!(0.00));
        assert_eq!(schedule[1].written_off, dec!(666.67));
    }

    // =========================================================================
    // GWG
    // =========================================================================

    #[test]
    fn gwg_threshold_is_inclusive() {
        let policy = GwgPolicy::default();

        assert!(policy.is_gwg(dec!(800.00)));
        assert!(!policy.is_gwg(dec!(800.01)));
    }

    #[test]
    fn purchase_up_to_threshold_is_expensed() {
        let treatment = GwgPolicy::default()
            .classify("Stuhl", date(2026, 2, 1), dec!(799.99), None)
            .unwrap();

        assert_eq!(treatment, ExpenseTreatment::Immediate);
    }

    #[test]
    fn purchase_above_threshold_is_capitalized_with_default_life() {
        let treatment = GwgPolicy::default()
            .classify("Laptop", date(2026, 1, 15), dec!(1200.00), None)
            .unwrap();

        assert_eq!(treatment, ExpenseTreatment::Capitalized(laptop()));
    }

    #[test]
    fn caller_can_override_useful_life() {
        let treatment = GwgPolicy::default()
            .classify("Schreibtisch", date(2026, 1, 1), dec!(1300.00), Some(156))
            .unwrap();

        match treatment {
            ExpenseTreatment::Capitalized(asset) => assert_eq!(asset.useful_life_months(), 156),
            other => panic!("expected capitalization, got {other:?}"),
        }
    }

    #[test]
    fn invalid_override_is_rejected() {
        let result = GwgPolicy::default().classify("Server", date(2026, 1, 1), dec!(5000), Some(0));

        assert_eq!(result, Err(DepreciationError::InvalidUsefulLife(0)));
    }

    // =========================================================================
    // Stream totals
    // =========================================================================

    #[test]
    fn stream_totals_split_by_allocation() {
        let assets = vec![
            AllocatedAsset {
                asset: laptop(),
                allocation: Some(Allocation::new(50, 30, 20).unwrap()),
            },
            AllocatedAsset {
                asset: DepreciationAsset::new("Drucker", date(2026, 7, 1), dec!(900.00), 36).unwrap(),
                allocation: None,
            },
        ];

        let totals = stream_totals_for_year(&assets, 2026);

        assert_eq!(
            totals,
            StreamDepreciation {
                freiberuf: dec!(200.00),
                gewerbe: dec!(120.00),
                personal: dec!(80.00),
                // 400.00 + 6 × 25.00
                total: dec!(550.00),
            }
        );
    }

    #[test]
    fn stream_totals_skip_years_without_depreciation() {
        let assets = vec![AllocatedAsset {
            asset: laptop(),
            allocation: Some(Allocation::entirely(IncomeStream::Gewerbe)),
        }];

        assert_eq!(stream_totals_for_year(&assets, 2031), StreamDepreciation {
            freiberuf: dec!(0.00),
            gewerbe: dec!(0.00),
            personal: dec!(0.00),
            total: dec!(0.00),
        });
    }
}
