use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::IncomeStream;
use crate::calculations::common::cents_to_euros;

/// Rejected expense allocation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("allocation percentages must add up to 100, got {0}")]
    InvalidTotal(u16),
}

/// How an expense is split between the business streams and private use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AllocationShares")]
pub struct Allocation {
    freiberuf_pct: u8,
    gewerbe_pct: u8,
    personal_pct: u8,
}

impl Allocation {
    /// # Errors
    ///
    /// Returns [`AllocationError::InvalidTotal`] unless the three shares
    /// add up to exactly 100.
    pub fn new(
        freiberuf_pct: u8,
        gewerbe_pct: u8,
        personal_pct: u8,
    ) -> Result<Self, AllocationError> {
        let total = u16::from(freiberuf_pct) + u16::from(gewerbe_pct) + u16::from(personal_pct);
        if total != 100 {
            return Err(AllocationError::InvalidTotal(total));
        }
        Ok(Self {
            freiberuf_pct,
            gewerbe_pct,
            personal_pct,
        })
    }

    /// Books the whole expense to one stream. Employment maps to private use,
    /// since employment expenses are covered by the Werbungskostenpauschale.
    pub fn entirely(stream: IncomeStream) -> Self {
        match stream {
            IncomeStream::Freiberuf => Self {
                freiberuf_pct: 100,
                gewerbe_pct: 0,
                personal_pct: 0,
            },
            IncomeStream::Gewerbe => Self {
                freiberuf_pct: 0,
                gewerbe_pct: 100,
                personal_pct: 0,
            },
            IncomeStream::Employment => Self::personal(),
        }
    }

    pub fn personal() -> Self {
        Self {
            freiberuf_pct: 0,
            gewerbe_pct: 0,
            personal_pct: 100,
        }
    }

    pub fn freiberuf_pct(&self) -> u8 {
        self.freiberuf_pct
    }

    pub fn gewerbe_pct(&self) -> u8 {
        self.gewerbe_pct
    }

    pub fn personal_pct(&self) -> u8 {
        self.personal_pct
    }

    /// Business share for `stream` in percent.
    pub fn share_pct(
        &self,
        stream: IncomeStream,
    ) -> u8 {
        match stream {
            IncomeStream::Freiberuf => self.freiberuf_pct,
            IncomeStream::Gewerbe => self.gewerbe_pct,
            IncomeStream::Employment => 0,
        }
    }

    /// The part of `amount_cents` allocated to `stream`, truncated to whole
    /// cents.
    pub fn allocate_cents(
        &self,
        amount_cents: i64,
        stream: IncomeStream,
    ) -> i64 {
        let pct = i64::from(self.share_pct(stream));
        // split before multiplying so large amounts cannot overflow
        amount_cents / 100 * pct + amount_cents % 100 * pct / 100
    }
}

#[derive(Deserialize)]
struct AllocationShares {
    freiberuf_pct: u8,
    gewerbe_pct: u8,
    personal_pct: u8,
}

impl TryFrom<AllocationShares> for Allocation {
    type Error = AllocationError;

    fn try_from(shares: AllocationShares) -> Result<Self, Self::Error> {
        Allocation::new(shares.freiberuf_pct, shares.gewerbe_pct, shares.personal_pct)
    }
}

/// A persisted income booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeEntry {
    pub id: i64,
    pub user_id: i64,
    pub stream: IncomeStream,
    pub amount_cents: i64,
    pub entry_date: NaiveDate,
    pub source: Option<String>,
    pub description: Option<String>,
}

impl IncomeEntry {
    pub fn amount(&self) -> Decimal {
        cents_to_euros(self.amount_cents)
    }
}

/// For creating new income entries (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIncomeEntry {
    pub user_id: i64,
    pub stream: IncomeStream,
    pub amount_cents: i64,
    pub entry_date: NaiveDate,
    pub source: Option<String>,
    pub description: Option<String>,
}

impl NewIncomeEntry {
    pub fn into_entry(
        self,
        id: i64,
    ) -> IncomeEntry {
        IncomeEntry {
            id,
            user_id: self.user_id,
            stream: self.stream,
            amount_cents: self.amount_cents,
            entry_date: self.entry_date,
            source: self.source,
            description: self.description,
        }
    }
}

/// A persisted business or private expense (net amount).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    pub id: i64,
    pub user_id: i64,
    pub amount_cents: i64,
    pub category: String,
    pub entry_date: NaiveDate,
    pub allocation: Allocation,
    pub description: Option<String>,
}

impl ExpenseEntry {
    pub fn amount(&self) -> Decimal {
        cents_to_euros(self.amount_cents)
    }
}

/// For creating new expense entries (no id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpenseEntry {
    pub user_id: i64,
    pub amount_cents: i64,
    pub category: String,
    pub entry_date: NaiveDate,
    pub allocation: Allocation,
    pub description: Option<String>,
}

impl NewExpenseEntry {
    pub fn into_entry(
        self,
        id: i64,
    ) -> ExpenseEntry {
        ExpenseEntry {
            id,
            user_id: self.user_id,
            amount_cents: self.amount_cents,
            category: self.category,
            entry_date: self.entry_date,
            allocation: self.allocation,
            description: self.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn allocation_requires_total_of_100() {
        assert!(Allocation::new(50, 30, 20).is_ok());
        assert_eq!(
            Allocation::new(50, 30, 30),
            Err(AllocationError::InvalidTotal(110))
        );
        assert_eq!(Allocation::new(0, 0, 0), Err(AllocationError::InvalidTotal(0)));
    }

    #[test]
    fn allocate_cents_truncates_to_whole_cents() {
        let allocation = Allocation::new(33, 33, 34).unwrap();

        assert_eq!(allocation.allocate_cents(1_000, IncomeStream::Freiberuf), 330);
        assert_eq!(allocation.allocate_cents(1_001, IncomeStream::Gewerbe), 330);
    }

    #[test]
    fn employment_never_receives_a_business_share() {
        let allocation = Allocation::entirely(IncomeStream::Employment);

        assert_eq!(allocation, Allocation::personal());
        assert_eq!(allocation.allocate_cents(5_000, IncomeStream::Employment), 0);
    }

    #[test]
    fn entirely_books_full_amount_to_stream() {
        let allocation = Allocation::entirely(IncomeStream::Gewerbe);

        assert_eq!(allocation.allocate_cents(12_345, IncomeStream::Gewerbe), 12_345);
        assert_eq!(allocation.allocate_cents(12_345, IncomeStream::Freiberuf), 0);
    }

    #[test]
    fn allocate_cents_handles_amounts_near_the_limit() {
        let allocation = Allocation::new(50, 30, 20).unwrap();

        assert_eq!(allocation.allocate_cents(i64::MAX, IncomeStream::Freiberuf), i64::MAX / 2);
        assert_eq!(allocation.allocate_cents(1_001, IncomeStream::Gewerbe), 300);
    }
}
