use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised while building or querying the tax-year parameter table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxYearError {
    /// The table holds no parameters at all, so there is nothing to fall back to.
    #[error("no tax year parameters available (requested {0})")]
    NoParameters(i32),

    /// Zone boundaries must be non-negative and strictly increasing.
    #[error("zone boundaries for {0} are not strictly increasing")]
    BoundariesNotIncreasing(i32),

    /// A rate lies outside [0, 1].
    #[error("{field} for {year} must be between 0 and 1, got {value}")]
    RateOutOfRange {
        year: i32,
        field: &'static str,
        value: Decimal,
    },

    /// Two entries share the same year.
    #[error("duplicate parameters for tax year {0}")]
    DuplicateYear(i32),
}

/// Year-specific parameters for the §32a EStG income tax formula, the
/// solidarity surcharge and the flat deductions.
///
/// The formula itself lives in [`crate::calculations::BracketTaxCalculator`];
/// this struct only carries the numbers published for a Veranlagungszeitraum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearParams {
    pub tax_year: i32,

    // Zone boundaries over zvE (EUR)
    pub grundfreibetrag: Decimal,
    pub zone2_upper: Decimal,
    pub zone3_upper: Decimal,
    pub zone4_upper: Decimal,

    // Zone 2: (a·y + b)·y
    pub zone2_a: Decimal,
    pub zone2_b: Decimal,

    // Zone 3: (a·z + b)·z + c
    pub zone3_a: Decimal,
    pub zone3_b: Decimal,
    pub zone3_c: Decimal,

    // Zones 4 and 5: rate·zvE − sub
    pub zone4_rate: Decimal,
    pub zone4_sub: Decimal,
    pub zone5_rate: Decimal,
    pub zone5_sub: Decimal,

    // Solidaritätszuschlag
    pub soli_rate: Decimal,
    pub soli_exemption: Decimal,
    pub soli_milderungs_rate: Decimal,

    // Flat deductions
    pub werbungskostenpauschale: Decimal,
    pub sonderausgabenpauschale: Decimal,
}

/// §32a EStG, Veranlagungszeitraum 2024.
pub const TAX_YEAR_2024: TaxYearParams = TaxYearParams {
    tax_year: 2024,
    grundfreibetrag: dec!(11604),
    zone2_upper: dec!(17005),
    zone3_upper: dec!(66760),
    zone4_upper: dec!(277825),
    zone2_a: dec!(922.98),
    zone2_b: dec!(1400),
    zone3_a: dec!(181.19),
    zone3_b: dec!(2397),
    zone3_c: dec!(1025.38),
    zone4_rate: dec!(0.42),
    zone4_sub: dec!(10602.13),
    zone5_rate: dec!(0.45),
    zone5_sub: dec!(18936.88),
    soli_rate: dec!(0.055),
    soli_exemption: dec!(18130),
    soli_milderungs_rate: dec!(0.119),
    werbungskostenpauschale: dec!(1230),
    sonderausgabenpauschale: dec!(36),
};

/// §32a EStG, Veranlagungszeitraum 2025.
pub const TAX_YEAR_2025: TaxYearParams = TaxYearParams {
    tax_year: 2025,
    grundfreibetrag: dec!(12096),
    zone2_upper: dec!(17443),
    zone3_upper: dec!(68480),
    zone4_upper: dec!(277825),
    zone2_a: dec!(932.30),
    zone2_b: dec!(1400),
    zone3_a: dec!(176.64),
    zone3_b: dec!(2397),
    zone3_c: dec!(1015.13),
    zone4_rate: dec!(0.42),
    zone4_sub: dec!(10911.92),
    zone5_rate: dec!(0.45),
    zone5_sub: dec!(19246.67),
    soli_rate: dec!(0.055),
    soli_exemption: dec!(19950),
    soli_milderungs_rate: dec!(0.119),
    werbungskostenpauschale: dec!(1230),
    sonderausgabenpauschale: dec!(36),
};

impl TaxYearParams {
    /// Checks the structural invariants the formula relies on.
    ///
    /// # Errors
    ///
    /// Returns [`TaxYearError`] if the four boundaries are not strictly
    /// increasing from a non-negative Grundfreibetrag, or if any rate lies
    /// outside [0, 1].
    pub fn validate(&self) -> Result<(), TaxYearError> {
        let boundaries = [
            self.grundfreibetrag,
            self.zone2_upper,
            self.zone3_upper,
            self.zone4_upper,
        ];
        if self.grundfreibetrag < Decimal::ZERO || boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TaxYearError::BoundariesNotIncreasing(self.tax_year));
        }

        let rates = [
            ("zone4_rate", self.zone4_rate),
            ("zone5_rate", self.zone5_rate),
            ("soli_rate", self.soli_rate),
            ("soli_milderungs_rate", self.soli_milderungs_rate),
        ];
        for (field, value) in rates {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(TaxYearError::RateOutOfRange {
                    year: self.tax_year,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// Lookup table of [`TaxYearParams`] keyed by year.
///
/// Years without their own entry resolve to the most recent known year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxYearTable {
    // sorted ascending by tax_year
    years: Vec<TaxYearParams>,
}

impl TaxYearTable {
    /// Builds a table from arbitrary parameter sets.
    ///
    /// # Errors
    ///
    /// Propagates [`TaxYearParams::validate`] failures and rejects duplicate
    /// years.
    pub fn new(mut years: Vec<TaxYearParams>) -> Result<Self, TaxYearError> {
        for params in &years {
            params.validate()?;
        }
        years.sort_by_key(|p| p.tax_year);
        if let Some(dup) = years.windows(2).find(|w| w[0].tax_year == w[1].tax_year) {
            return Err(TaxYearError::DuplicateYear(dup[0].tax_year));
        }
        Ok(Self { years })
    }

    /// The statutory parameters shipped with the crate.
    pub fn statutory() -> Self {
        Self {
            years: vec![TAX_YEAR_2024, TAX_YEAR_2025],
        }
    }

    pub fn supported_years(&self) -> Vec<i32> {
        self.years.iter().map(|p| p.tax_year).collect()
    }

    pub fn latest(&self) -> Option<&TaxYearParams> {
        self.years.last()
    }

    /// Resolves the parameters for `year`, falling back to the most recent
    /// known year when `year` has no entry of its own.
    ///
    /// # Errors
    ///
    /// Returns [`TaxYearError::NoParameters`] only when the table is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use steuer_core::TaxYearTable;
    ///
    /// let table = TaxYearTable::statutory();
    /// assert_eq!(table.resolve(2024).unwrap().tax_year, 2024);
    /// assert_eq!(table.resolve(2031).unwrap().tax_year, 2025);
    /// ```
    pub fn resolve(
        &self,
        year: i32,
    ) -> Result<&TaxYearParams, TaxYearError> {
        if let Some(params) = self.years.iter().find(|p| p.tax_year == year) {
            return Ok(params);
        }
        let fallback = self.latest().ok_or(TaxYearError::NoParameters(year))?;
        debug!(
            requested = year,
            resolved = fallback.tax_year,
            "no parameters for tax year; using latest known year"
        );
        Ok(fallback)
    }
}

impl Default for TaxYearTable {
    fn default() -> Self {
        Self::statutory()
    }
}
