use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::rules::RuleError;

/// Statutory limits the threshold rules compare against, in EUR.
///
/// | field                        | default   | source                     |
/// |------------------------------|-----------|----------------------------|
/// | `current_year_limit`         | 22,000    | §19 Abs. 1 UStG            |
/// | `projected_year_limit`       | 50,000    | §19 Abs. 1 UStG            |
/// | `warning_ratio`              | 0.80      |                            |
/// | `abfaerbung_ratio`           | 0.03      | BFH IV R 54/11             |
/// | `abfaerbung_min_amount`      | 24,500    | BFH IV R 54/11             |
/// | `gewerbe_freibetrag`         | 24,500    | §11 Abs. 1 GewStG          |
/// | `bilanzierung_revenue`       | 800,000   | §141 Abs. 1 Nr. 1 AO       |
/// | `bilanzierung_profit`        | 80,000    | §141 Abs. 1 Nr. 4 AO       |
/// | `mandatory_filing_threshold` | 410       | §46 Abs. 2 Nr. 1 EStG      |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub current_year_limit: Decimal,
    pub projected_year_limit: Decimal,
    pub warning_ratio: Decimal,
    pub abfaerbung_ratio: Decimal,
    pub abfaerbung_min_amount: Decimal,
    pub gewerbe_freibetrag: Decimal,
    pub bilanzierung_revenue: Decimal,
    pub bilanzierung_profit: Decimal,
    pub mandatory_filing_threshold: Decimal,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            current_year_limit: dec!(22000),
            projected_year_limit: dec!(50000),
            warning_ratio: dec!(0.80),
            abfaerbung_ratio: dec!(0.03),
            abfaerbung_min_amount: dec!(24500),
            gewerbe_freibetrag: dec!(24500),
            bilanzierung_revenue: dec!(800000),
            bilanzierung_profit: dec!(80000),
            mandatory_filing_threshold: dec!(410),
        }
    }
}

impl MonitorConfig {
    /// Limits used as ratio denominators must be positive; ratios must be
    /// non-negative.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidSetting`] naming the first offending field.
    pub fn validate(&self) -> Result<(), RuleError> {
        let positive = [
            ("current_year_limit", self.current_year_limit),
            ("projected_year_limit", self.projected_year_limit),
            ("gewerbe_freibetrag", self.gewerbe_freibetrag),
            ("bilanzierung_revenue", self.bilanzierung_revenue),
            ("bilanzierung_profit", self.bilanzierung_profit),
            ("mandatory_filing_threshold", self.mandatory_filing_threshold),
        ];
        for (field, value) in positive {
            if value <= Decimal::ZERO {
                return Err(RuleError::InvalidSetting { field, value });
            }
        }

        let non_negative = [
            ("warning_ratio", self.warning_ratio),
            ("abfaerbung_ratio", self.abfaerbung_ratio),
            ("abfaerbung_min_amount", self.abfaerbung_min_amount),
        ];
        for (field, value) in non_negative {
            if value < Decimal::ZERO {
                return Err(RuleError::InvalidSetting { field, value });
            }
        }
        Ok(())
    }
}
