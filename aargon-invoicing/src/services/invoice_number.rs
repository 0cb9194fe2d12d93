//! Invoice number generation.
//!
//! Numbers are date-prefixed for sortable listings, with a random suffix so
//! concurrent creations need no coordination: `INV-20250131-1A2B3C4D`.
//! Uniqueness is still enforced by the storage layer's unique constraint; the
//! lifecycle manager retries with a fresh number on the (practically
//! impossible) collision.

use chrono::NaiveDate;
use uuid::Uuid;

/// Source of candidate invoice numbers. The lifecycle manager asks for a new
/// candidate on every attempt, including collision retries.
pub trait InvoiceNumberSource: Send + Sync {
    fn next(&self, date: NaiveDate) -> String;
}

/// Default generator: configured prefix, creation date, 8 uppercase hex
/// characters of randomness.
#[derive(Debug, Clone)]
pub struct InvoiceNumberGenerator {
    prefix: String,
}

impl InvoiceNumberGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for InvoiceNumberGenerator {
    fn default() -> Self {
        Self::new("INV")
    }
}

impl InvoiceNumberSource for InvoiceNumberGenerator {
    fn next(&self, date: NaiveDate) -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        format!("{}-{}-{}", self.prefix, date.format("%Y%m%d"), suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn format_is_prefix_date_suffix() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let number = InvoiceNumberGenerator::default().next(date);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "INV");
        assert_eq!(parts[1], "20250131");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(parts[2], parts[2].to_uppercase());
    }

    #[test]
    fn numbers_for_the_same_day_are_distinct() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        let generator = InvoiceNumberGenerator::default();
        let numbers: HashSet<String> = (0..500).map(|_| generator.next(date)).collect();
        assert_eq!(numbers.len(), 500);
    }

    #[test]
    fn same_day_numbers_sort_after_earlier_days() {
        let generator = InvoiceNumberGenerator::default();
        let jan = generator.next(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        let feb = generator.next(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert!(jan < feb);
    }
}
