use serde::{Deserialize, Serialize};

/// The three income streams a taxpayer can book against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncomeStream {
    /// Dependent employment (§19 EStG).
    Employment,
    /// Liberal profession (§18 EStG).
    Freiberuf,
    /// Registered trade (§15 EStG).
    Gewerbe,
}

impl IncomeStream {
    pub const SELF_EMPLOYED: [IncomeStream; 2] = [IncomeStream::Freiberuf, IncomeStream::Gewerbe];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employment => "EMPLOYMENT",
            Self::Freiberuf => "FREIBERUF",
            Self::Gewerbe => "GEWERBE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EMPLOYMENT" => Some(Self::Employment),
            "FREIBERUF" => Some(Self::Freiberuf),
            "GEWERBE" => Some(Self::Gewerbe),
            _ => None,
        }
    }

    pub fn is_self_employed(&self) -> bool {
        !matches!(self, Self::Employment)
    }
}

impl std::fmt::Display for IncomeStream {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_round_trips_every_stream() {
        for stream in [
            IncomeStream::Employment,
            IncomeStream::Freiberuf,
            IncomeStream::Gewerbe,
        ] {
            assert_eq!(IncomeStream::parse(stream.as_str()), Some(stream));
        }
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(IncomeStream::parse(" gewerbe "), Some(IncomeStream::Gewerbe));
    }

    #[test]
    fn parse_rejects_unknown_codes() {
        assert_eq!(IncomeStream::parse("PERSONAL"), None);
    }

    #[test]
    fn only_employment_is_not_self_employed() {
        assert!(!IncomeStream::Employment.is_self_employed());
        assert!(IncomeStream::Freiberuf.is_self_employed());
        assert!(IncomeStream::Gewerbe.is_self_employed());
    }
}
