//! Data models for valuation records and the search work set.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One (property type, volume number) pair; the unit of scraping work.
///
/// Generated fresh for each run, consumed once, and discarded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchCombination {
    /// Exact option text of the property type, e.g. "Full Title Property".
    pub property_type: String,
    /// Volume number as the portal lists it, e.g. "17".
    pub volume_no: String,
}

impl SearchCombination {
    /// Creates a combination from the given type and volume.
    pub fn new(property_type: impl Into<String>, volume_no: impl Into<String>) -> Self {
        Self { property_type: property_type.into(), volume_no: volume_no.into() }
    }

    /// Builds the full work set: every configured property type crossed
    /// with every volume number, volumes iterated innermost so the portal
    /// sees the same order a person walking the form would produce.
    pub fn cartesian(
        property_types: &[String],
        volumes: std::ops::RangeInclusive<u32>,
    ) -> Vec<SearchCombination> {
        let mut combinations = Vec::new();
        for property_type in property_types {
            for volume in volumes.clone() {
                combinations.push(SearchCombination::new(property_type.clone(), volume.to_string()));
            }
        }
        combinations
    }
}

impl std::fmt::Display for SearchCombination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / volume {}", self.property_type, self.volume_no)
    }
}

/// A results row exactly as lifted from the table, before normalization.
///
/// All fields are the raw cell text, whitespace and all; the normalizer
/// owns trimming and numeric parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub description: String,
    pub street_address: String,
    pub extent: String,
    pub market_value: String,
}

/// A normalized valuation record ready for storage.
///
/// Identity is the full tuple including `captured_on`: storage is
/// append-only snapshotting, so the same property harvested again on a
/// later date becomes a new row rather than an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub property_type: String,
    pub volume_no: String,
    pub description: String,
    pub street_address: String,
    /// Area, non-negative, rounded to 2 decimal places.
    pub extent: Decimal,
    /// Currency amount, non-negative, rounded to 2 decimal places.
    pub market_value: Decimal,
    /// None until the batch lands; the store stamps the whole batch with
    /// one wall-clock date, not each record with its scrape time.
    pub captured_on: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cartesian_covers_full_space() {
        let types = vec!["Full Title Property".to_string(), "Sectional Title Property".to_string()];
        let combinations = SearchCombination::cartesian(&types, 1..=89);

        assert_eq!(combinations.len(), 178);
        assert_eq!(combinations[0], SearchCombination::new("Full Title Property", "1"));
        assert_eq!(combinations[88], SearchCombination::new("Full Title Property", "89"));
        assert_eq!(combinations[89], SearchCombination::new("Sectional Title Property", "1"));
        assert_eq!(combinations[177], SearchCombination::new("Sectional Title Property", "89"));
    }

    #[test]
    fn test_cartesian_empty_inputs() {
        assert!(SearchCombination::cartesian(&[], 1..=89).is_empty());

        let types = vec!["Full Title Property".to_string()];
        // Inverted range yields no volumes, so no work.
        assert!(SearchCombination::cartesian(&types, 5..=4).is_empty());
    }

    #[test]
    fn test_combination_display() {
        let combo = SearchCombination::new("Sectional Title Property", "12");
        assert_eq!(combo.to_string(), "Sectional Title Property / volume 12");
    }

    #[test]
    fn test_record_equality_includes_capture_date() {
        let record = PropertyRecord {
            property_type: "Full Title Property".into(),
            volume_no: "1".into(),
            description: "Erf 123".into(),
            street_address: "10 Marine Drive".into(),
            extent: "120.50".parse().unwrap(),
            market_value: "750000.00".parse().unwrap(),
            captured_on: None,
        };

        let mut dated = record.clone();
        dated.captured_on = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_ne!(record, dated);
    }
}
