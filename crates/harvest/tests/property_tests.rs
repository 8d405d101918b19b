//! Property-based tests for the loader, reshaping and gap filling.
//!
//! # Running Property Tests
//!
//! ```bash
//! cargo test -p harvest --test property_tests
//!
//! # More cases
//! PROPTEST_CASES=10000 cargo test -p harvest --test property_tests
//! ```

use proptest::prelude::*;

use harvest::input::{Loader, LoaderConfig};
use harvest::merge::fill_series;
use harvest::transform::{CropTransformer, TidyTransform};
use harvest::{Merger, RowKey, TidyTable, Year};
use indexmap::IndexMap;

// =============================================================================
// Test Strategies
// =============================================================================

/// A series of optional values over consecutive years starting at 1990.
fn series() -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(prop::option::of(-1.0e6..1.0e6f64), 1..40)
}

fn axis(len: usize) -> Vec<i64> {
    (0..len)
        .map(|i| Year::new(1990 + i as i32).unwrap().axis())
        .collect()
}

/// Format an integer with a thousands separator.
fn with_separator(value: u64, separator: &str) -> String {
    let digits = value.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Gap filling
// =============================================================================

proptest! {
    #[test]
    fn fill_keeps_known_values(values in series()) {
        let mut filled = values.clone();
        fill_series(&axis(values.len()), &mut filled);

        for (before, after) in values.iter().zip(&filled) {
            if before.is_some() {
                prop_assert_eq!(before, after);
            }
        }
    }

    #[test]
    fn fill_leaves_no_gap_when_any_value_is_known(values in series()) {
        let mut filled = values.clone();
        fill_series(&axis(values.len()), &mut filled);

        let any_known = values.iter().any(Option::is_some);
        prop_assert_eq!(filled.iter().all(Option::is_some), any_known);
        if !any_known {
            prop_assert!(filled.iter().all(Option::is_none));
        }
    }

    #[test]
    fn fill_stays_within_known_range(values in series()) {
        let known: Vec<f64> = values.iter().flatten().copied().collect();
        prop_assume!(!known.is_empty());
        let min = known.iter().copied().fold(f64::INFINITY, f64::min);
        let max = known.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut filled = values.clone();
        fill_series(&axis(values.len()), &mut filled);

        for value in filled.into_iter().flatten() {
            prop_assert!(value >= min - 1e-6 && value <= max + 1e-6);
        }
    }
}

// =============================================================================
// Years
// =============================================================================

proptest! {
    #[test]
    fn stored_year_text_parses_back(y in 1000..=9999i32) {
        let year = Year::new(y).unwrap();
        prop_assert_eq!(Year::parse_stored(&year.to_timestamp_text()), Some(year));
        prop_assert_eq!(Year::parse_header(&y.to_string()), Some(year));
    }

    #[test]
    fn non_year_headers_are_rejected(header in "[A-Za-z ]{1,12}") {
        prop_assert_eq!(Year::parse_header(&header), None);
    }
}

// =============================================================================
// Loader
// =============================================================================

proptest! {
    #[test]
    fn loader_uses_first_working_encoding(
        bogus in prop::collection::vec("bogus-[a-z]{3,8}", 0..3),
        utf8_first in any::<bool>(),
    ) {
        let mut encodings: Vec<String> = bogus;
        if utf8_first {
            encodings.extend(["utf-8".to_string(), "latin1".to_string()]);
        } else {
            encodings.extend(["latin1".to_string(), "utf-8".to_string()]);
        }
        let text = "Country,2000\nC\u{f4}te d'Ivoire,1\n";

        let (table, metadata) = Loader::new().load("t.csv", text.as_bytes(), &encodings).unwrap();

        let expected = if utf8_first { "UTF-8" } else { "windows-1252" };
        prop_assert_eq!(metadata.encoding.as_str(), expected);
        prop_assert!(!table.is_empty());
    }
}

// =============================================================================
// Crop cleaning
// =============================================================================

proptest! {
    #[test]
    fn crop_values_parse_through_separators(
        value in 1u64..10_000_000_000,
        separator in prop_oneof![Just(","), Just(" "), Just("\u{a0}")],
    ) {
        let text = format!(
            "Location;Crop;Unit;2000\nWorld;Rice;Thousand tonnes;{}\n",
            with_separator(value, separator)
        );
        let raw = Loader::with_config(LoaderConfig::with_delimiter(b';'))
            .parse_text(&text)
            .unwrap();

        let table = CropTransformer::new().transform(raw).unwrap();

        prop_assert_eq!(
            table.value("World", Year::new(2000).unwrap(), "Rice"),
            Some(value as f64)
        );
    }
}

// =============================================================================
// Merge totals
// =============================================================================

proptest! {
    #[test]
    fn total_is_sum_of_present_crops(
        crops in prop::collection::vec(prop::option::of(0.0..1.0e6f64), 4),
    ) {
        let year = Year::new(2000).unwrap();
        let key = || vec![RowKey::new("World", year)];

        let mut emissions = IndexMap::new();
        emissions.insert("CH4".to_string(), vec![Some(1.0)]);
        let emissions = TidyTable::from_parts("Country", key(), emissions).unwrap();

        let mut columns = IndexMap::new();
        for (name, value) in ["Maize", "Rice", "Soybean", "Wheat"].iter().zip(&crops) {
            columns.insert(name.to_string(), vec![*value]);
        }
        let crop = TidyTable::from_parts("Location", key(), columns).unwrap();

        let merged = Merger::new().merge(&emissions, &crop).unwrap();
        let total = merged.value("World", year, "TotalCropProduction");

        let present: Vec<f64> = crops.iter().flatten().copied().collect();
        if present.is_empty() {
            prop_assert_eq!(total, None);
        } else {
            let expected: f64 = present.iter().sum();
            let total = total.unwrap();
            prop_assert!((total - expected).abs() < 1e-6);
        }
    }
}
