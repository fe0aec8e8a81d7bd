use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The statutory thresholds watched by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThresholdKind {
    /// §19 UStG, revenue booked so far in the year.
    KleinunternehmerCurrentYear,
    /// §19 UStG, revenue extrapolated to the full year.
    KleinunternehmerProjected,
    /// §15 Abs. 3 Nr. 1 EStG, trade income infecting the freelance stream.
    Abfaerbung,
    /// §11 GewStG, trade profit above the Freibetrag.
    GewerbesteuerFreibetrag,
    /// §141 AO, duty to keep double-entry books.
    Bilanzierungspflicht,
    /// §46 Abs. 2 Nr. 1 EStG, side income above 410 EUR.
    MandatoryFiling,
}

impl ThresholdKind {
    pub const ALL: [ThresholdKind; 6] = [
        ThresholdKind::KleinunternehmerCurrentYear,
        ThresholdKind::KleinunternehmerProjected,
        ThresholdKind::Abfaerbung,
        ThresholdKind::GewerbesteuerFreibetrag,
        ThresholdKind::Bilanzierungspflicht,
        ThresholdKind::MandatoryFiling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KleinunternehmerCurrentYear => "KLEINUNTERNEHMER_CURRENT_YEAR",
            Self::KleinunternehmerProjected => "KLEINUNTERNEHMER_PROJECTED",
            Self::Abfaerbung => "ABFAERBUNG",
            Self::GewerbesteuerFreibetrag => "GEWERBESTEUER_FREIBETRAG",
            Self::Bilanzierungspflicht => "BILANZIERUNGSPFLICHT",
            Self::MandatoryFiling => "MANDATORY_FILING",
        }
    }
}

impl std::fmt::Display for ThresholdKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emitted whenever a threshold rule fires for a (user, year) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdAlert {
    pub kind: ThresholdKind,
    /// Observed value over the threshold, 4 decimals.
    pub ratio: Decimal,
    /// The EUR figure the rule compared, 2 decimals.
    pub reference_amount: Decimal,
    pub user_id: i64,
    pub year: i32,
    pub occurred_at: DateTime<Utc>,
}
