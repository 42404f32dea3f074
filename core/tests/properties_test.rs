// Property-based tests for reconciliation invariants.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use rowdelta_core::test_fixtures::row;
use rowdelta_core::{reconcile, Dataset, HashAlgorithm, ReconcileOptions, Row};

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn header() -> Row {
    row(&["area", "period", "value"])
}

/// Small alphabets so duplicates and shared dimension keys are common
fn arb_row() -> impl Strategy<Value = Row> {
    (
        prop_oneof![Just("a"), Just("A"), Just("b"), Just("c,d"), Just("")],
        prop_oneof![Just("2020"), Just("2021")],
        prop_oneof![Just("1"), Just("2"), Just("x"), Just("X")],
    )
        .prop_map(|(area, period, value)| row(&[area, period, value]))
}

fn arb_dataset() -> impl Strategy<Value = Dataset> {
    prop::collection::vec(arb_row(), 0..24)
        .prop_map(|rows| Dataset::new(header(), rows))
}

fn options() -> ReconcileOptions {
    ReconcileOptions::for_observation("value")
}

/// Case-folded copy of some fields, usable as a map key
fn lowered(fields: &[String]) -> Vec<String> {
    fields.iter().map(|f| f.to_lowercase()).collect()
}

fn full_row_counts(dataset: &Dataset) -> HashMap<Vec<String>, usize> {
    let mut counts = HashMap::new();
    for row in &dataset.rows {
        *counts.entry(lowered(row)).or_insert(0) += 1;
    }
    counts
}

proptest! {
    #![proptest_config(config())]

    #[test]
    fn prop_every_row_classified_exactly_once(old in arb_dataset(), new in arb_dataset()) {
        let result = reconcile(&old, &new, &options()).unwrap();

        let mut new_seen = HashSet::new();
        for idx in result.unchanged.iter().map(|m| m.new_index)
            .chain(result.corrected.iter().map(|c| c.new_index))
            .chain(result.added.iter().map(|a| a.row_index))
        {
            prop_assert!(new_seen.insert(idx), "new row {} classified twice", idx);
        }
        prop_assert_eq!(new_seen.len(), new.len());

        let mut old_seen = HashSet::new();
        for idx in result.unchanged.iter().map(|m| m.old_index)
            .chain(result.corrected.iter().map(|c| c.old_index))
            .chain(result.deleted.iter().map(|d| d.row_index))
        {
            prop_assert!(old_seen.insert(idx), "old row {} classified twice", idx);
        }
        prop_assert_eq!(old_seen.len(), old.len());
    }

    #[test]
    fn prop_self_reconciliation_is_unchanged(old in arb_dataset()) {
        let result = reconcile(&old, &old, &options()).unwrap();
        prop_assert_eq!(result.unchanged.len(), old.len());
        prop_assert!(!result.has_changes());
    }

    #[test]
    fn prop_pairs_share_identity(old in arb_dataset(), new in arb_dataset()) {
        let result = reconcile(&old, &new, &options()).unwrap();

        for m in &result.unchanged {
            let before = &old.rows[m.old_index as usize];
            let after = &new.rows[m.new_index as usize];
            prop_assert_eq!(lowered(before), lowered(after));
        }
        for c in &result.corrected {
            prop_assert_eq!(lowered(&c.before[..2]), lowered(&c.after[..2]));
            prop_assert!(c.before[2].to_lowercase() != c.after[2].to_lowercase());
        }
    }

    #[test]
    fn prop_hash_algorithms_agree(old in arb_dataset(), new in arb_dataset()) {
        let crypto = reconcile(&old, &new, &options()).unwrap();
        let fast_options = options().with_hash_algorithm(HashAlgorithm::Fast);
        let fast = reconcile(&old, &new, &fast_options).unwrap();
        prop_assert_eq!(crypto, fast);
    }

    #[test]
    fn prop_unchanged_count_is_maximal(old in arb_dataset(), new in arb_dataset()) {
        let result = reconcile(&old, &new, &options()).unwrap();

        let new_counts = full_row_counts(&new);
        let expected: usize = full_row_counts(&old)
            .iter()
            .map(|(key, n)| (*n).min(new_counts.get(key).copied().unwrap_or(0)))
            .sum();
        prop_assert_eq!(result.unchanged.len(), expected);
    }

    #[test]
    fn prop_no_added_row_shares_deleted_key(old in arb_dataset(), new in arb_dataset()) {
        let result = reconcile(&old, &new, &options()).unwrap();

        let deleted: HashSet<Vec<String>> = result
            .deleted
            .iter()
            .map(|d| lowered(&d.data[..2]))
            .collect();
        for a in &result.added {
            let key = lowered(&a.data[..2]);
            prop_assert!(
                !deleted.contains(&key),
                "added row {} could have corrected a deleted row",
                a.row_index
            );
        }
    }
}
