//! Two-phase multiset reconciliation of an old and a new dataset snapshot
//!
//! Phase 1 matches rows on their full content. Whatever is left over is
//! matched again on the dimension key (every column but the observation
//! column): a new row that finds an old partner there is a correction of that
//! old row's measured value, otherwise it is an addition. Old rows left over
//! after both phases are deletions.
//!
//! Both phases consume digest occurrences through [`IdentityIndex`], so
//! duplicate rows are matched one-for-one and each run is O(n + m).

use crate::config::ReconcileOptions;
use crate::dataset::{Dataset, Row};
use crate::error::{Result, RowDeltaError};
use crate::hash::{Digest, HashComputer};
use crate::index::IdentityIndex;
use crate::schema;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

/// Class assigned to a row instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Unchanged,
    Added,
    Corrected,
    Deleted,
}

/// A new row whose full content matched an old row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowMatch {
    pub old_index: u64,
    pub new_index: u64,
    pub data: Row,
}

/// Cell change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellChange {
    pub before: String,
    pub after: String,
}

/// A new row that shares its dimension key with an old row but differs in content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCorrection {
    pub old_index: u64,
    pub new_index: u64,
    pub before: Row,
    pub after: Row,
    /// Columns whose text differs, in header order
    pub changes: IndexMap<String, CellChange>,
}

/// An added (new side) or deleted (old side) row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedRow {
    pub row_index: u64,
    pub data: Row,
}

/// Complete classification of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub header: Vec<String>,
    pub observation_column: String,
    pub old_row_count: usize,
    pub new_row_count: usize,
    pub unchanged: Vec<RowMatch>,
    pub added: Vec<ClassifiedRow>,
    pub corrected: Vec<RowCorrection>,
    pub deleted: Vec<ClassifiedRow>,
}

/// Row counts per class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub old_rows: usize,
    pub new_rows: usize,
    pub unchanged: usize,
    pub added: usize,
    pub corrected: usize,
    pub deleted: usize,
}

/// Phases of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    Validating,
    Hashing,
    ExactMatch,
    DimensionMatch,
    Complete,
}

/// Progress information during a run
#[derive(Debug, Clone)]
pub struct ReconcileProgress {
    pub phase: ReconcilePhase,
    pub processed_rows: u64,
    pub total_rows: u64,
    pub message: String,
}

/// Runs reconciliations with a fixed set of options
#[derive(Debug, Clone)]
pub struct Reconciler {
    options: ReconcileOptions,
    hasher: HashComputer,
}

impl Reconciler {
    pub fn new(options: ReconcileOptions) -> Self {
        let hasher = HashComputer::new(options.hash_algorithm, options.case_normalization)
            .with_parallel(options.parallel_hashing);
        Self { options, hasher }
    }

    pub fn options(&self) -> &ReconcileOptions {
        &self.options
    }

    pub fn reconcile(&self, old: &Dataset, new: &Dataset) -> Result<Reconciliation> {
        self.reconcile_with_progress(old, new, None)
    }

    /// Classify every row of `new` and every unmatched row of `old`
    ///
    /// Fails before any hashing on schema problems; nothing is returned unless
    /// the whole run succeeds.
    pub fn reconcile_with_progress(
        &self,
        old: &Dataset,
        new: &Dataset,
        progress_callback: Option<&dyn Fn(ReconcileProgress)>,
    ) -> Result<Reconciliation> {
        let report = |phase: ReconcilePhase, processed: usize, total: usize, message: &str| {
            if let Some(callback) = progress_callback {
                callback(ReconcileProgress {
                    phase,
                    processed_rows: processed as u64,
                    total_rows: total as u64,
                    message: message.to_string(),
                });
            }
        };
        let total_rows = old.len() + new.len();
        let started = Instant::now();

        // Phase 0: validation
        report(ReconcilePhase::Validating, 0, total_rows, "Validating headers...");
        let observation_column = self.options.require_observation_column()?;
        let observation_index = schema::validate_inputs(old, new, observation_column)?;

        let mut result = Reconciliation {
            header: new.header.clone(),
            observation_column: observation_column.to_string(),
            old_row_count: old.len(),
            new_row_count: new.len(),
            unchanged: Vec::new(),
            added: Vec::new(),
            corrected: Vec::new(),
            deleted: Vec::new(),
        };

        if old.is_empty() || new.is_empty() {
            result.added = classified(new, 0..new.len());
            result.deleted = classified(old, 0..old.len());
            report(ReconcilePhase::Complete, total_rows, total_rows, "Reconciliation complete");
            log_summary(&result, started);
            return Ok(result);
        }

        // Digests for the exact-match phase
        report(ReconcilePhase::Hashing, 0, total_rows, "Hashing rows...");
        let phase_start = Instant::now();
        let old_full = self.hasher.full_digests(&old.rows);
        let new_full = self.hasher.full_digests(&new.rows);
        log::debug!(
            "Hashed {} rows with {} in {:?}",
            total_rows,
            self.hasher.algorithm(),
            phase_start.elapsed()
        );

        // Phase 1: exact match on full content
        report(ReconcilePhase::ExactMatch, 0, new.len(), "Matching identical rows...");
        let phase_start = Instant::now();
        let mut old_full_index = IdentityIndex::build(old_full.iter().copied());
        let mut unchanged_new = Vec::new();
        let mut new_residual = Vec::new();
        for (new_idx, digest) in new_full.iter().enumerate() {
            if old_full_index.take(digest) {
                unchanged_new.push((new_idx, *digest));
            } else {
                new_residual.push(new_idx);
            }
        }
        let exact = old_full_index.claim_instances(old_full.iter().copied().enumerate());
        let old_residual = exact.unclaimed_indices();
        let unchanged_pairs = pair_in_order(&exact.claimed, &unchanged_new)?;
        log::debug!(
            "Exact match: {} unchanged, {} old and {} new rows left over ({:?})",
            unchanged_pairs.len(),
            old_residual.len(),
            new_residual.len(),
            phase_start.elapsed()
        );

        result.unchanged = unchanged_pairs
            .into_iter()
            .map(|(old_idx, new_idx)| RowMatch {
                old_index: old_idx as u64,
                new_index: new_idx as u64,
                data: new.rows[new_idx].clone(),
            })
            .collect();

        // Phase 2: match leftovers on the dimension key
        report(
            ReconcilePhase::DimensionMatch,
            unchanged_new.len(),
            new.len(),
            "Matching corrections...",
        );
        let phase_start = Instant::now();
        let old_dim = self
            .hasher
            .dimension_digests_for(&old.rows, &old_residual, observation_index);
        let new_dim = self
            .hasher
            .dimension_digests_for(&new.rows, &new_residual, observation_index);

        let mut old_dim_index = IdentityIndex::build(old_dim.iter().copied());
        if old_dim_index.len() < old_dim.len() {
            log::warn!(
                "{} unmatched old rows share a dimension key with another row; \
                 corrections among them are paired in file order",
                old_dim.len() - old_dim_index.len()
            );
        }

        let mut corrected_new = Vec::new();
        for (&new_idx, digest) in new_residual.iter().zip(new_dim.iter()) {
            if old_dim_index.take(digest) {
                corrected_new.push((new_idx, *digest));
            } else {
                result.added.push(ClassifiedRow {
                    row_index: new_idx as u64,
                    data: new.rows[new_idx].clone(),
                });
            }
        }

        let old_keys = old_residual.iter().copied().zip(old_dim.iter().copied());
        let dimension = old_dim_index.claim_instances(old_keys);
        let correction_pairs = pair_in_order(&dimension.claimed, &corrected_new)?;

        result.corrected = correction_pairs
            .into_iter()
            .map(|(old_idx, new_idx)| {
                let before = old.rows[old_idx].clone();
                let after = new.rows[new_idx].clone();
                let changes = compare_rows(&new.header, &before, &after);
                RowCorrection {
                    old_index: old_idx as u64,
                    new_index: new_idx as u64,
                    before,
                    after,
                    changes,
                }
            })
            .collect();
        result.deleted = classified(old, dimension.unclaimed_indices().into_iter());
        log::debug!(
            "Dimension match: {} corrected, {} added, {} deleted ({:?})",
            result.corrected.len(),
            result.added.len(),
            result.deleted.len(),
            phase_start.elapsed()
        );

        report(ReconcilePhase::Complete, total_rows, total_rows, "Reconciliation complete");
        log_summary(&result, started);
        Ok(result)
    }
}

/// Reconcile with the given options in one call
pub fn reconcile(
    old: &Dataset,
    new: &Dataset,
    options: &ReconcileOptions,
) -> Result<Reconciliation> {
    Reconciler::new(options.clone()).reconcile(old, new)
}

fn classified(dataset: &Dataset, indices: impl Iterator<Item = usize>) -> Vec<ClassifiedRow> {
    indices
        .map(|idx| ClassifiedRow {
            row_index: idx as u64,
            data: dataset.rows[idx].clone(),
        })
        .collect()
}

/// Pair claimed old rows with matched new rows, per digest, first-in-first-out
///
/// Both slices are `(row_index, digest)` in original order. Each digest has as
/// many claimed old instances as matched new rows, so every new row pairs.
fn pair_in_order(
    old_claimed: &[(usize, Digest)],
    new_matched: &[(usize, Digest)],
) -> Result<Vec<(usize, usize)>> {
    let mut queues: HashMap<Digest, VecDeque<usize>> = HashMap::new();
    for &(old_idx, digest) in old_claimed {
        queues.entry(digest).or_default().push_back(old_idx);
    }
    new_matched
        .iter()
        .map(|&(new_idx, digest)| {
            queues
                .get_mut(&digest)
                .and_then(|queue| queue.pop_front())
                .map(|old_idx| (old_idx, new_idx))
                .ok_or_else(|| unpaired(new_idx, &digest))
        })
        .collect()
}

fn unpaired(new_idx: usize, digest: &Digest) -> RowDeltaError {
    RowDeltaError::Internal(format!(
        "matched new row {new_idx} has no old partner for digest {digest}"
    ))
}

/// Columns whose raw text differs between two rows, in header order
fn compare_rows(
    header: &[String],
    before: &[String],
    after: &[String],
) -> IndexMap<String, CellChange> {
    let mut changes = IndexMap::new();
    for (col_idx, col) in header.iter().enumerate() {
        let before_value = before.get(col_idx).map(|s| s.as_str()).unwrap_or("");
        let after_value = after.get(col_idx).map(|s| s.as_str()).unwrap_or("");
        if before_value != after_value {
            changes.insert(
                col.clone(),
                CellChange {
                    before: before_value.to_string(),
                    after: after_value.to_string(),
                },
            );
        }
    }
    changes
}

fn log_summary(result: &Reconciliation, started: Instant) {
    let summary = result.summary();
    log::info!(
        "Reconciled {} old / {} new rows in {:?}: {} unchanged, {} added, {} corrected, {} deleted",
        summary.old_rows,
        summary.new_rows,
        started.elapsed(),
        summary.unchanged,
        summary.added,
        summary.corrected,
        summary.deleted
    );
}

impl Reconciliation {
    pub fn summary(&self) -> ReconciliationSummary {
        ReconciliationSummary {
            old_rows: self.old_row_count,
            new_rows: self.new_row_count,
            unchanged: self.unchanged.len(),
            added: self.added.len(),
            corrected: self.corrected.len(),
            deleted: self.deleted.len(),
        }
    }

    /// Check if there are any row changes
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.corrected.is_empty() || !self.deleted.is_empty()
    }

    /// Get total number of changed rows
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.corrected.len() + self.deleted.len()
    }

    /// Class of every new row, indexed by new row position
    pub fn new_classifications(&self) -> Vec<Option<Classification>> {
        let mut classes = vec![None; self.new_row_count];
        for m in &self.unchanged {
            classes[m.new_index as usize] = Some(Classification::Unchanged);
        }
        for c in &self.corrected {
            classes[c.new_index as usize] = Some(Classification::Corrected);
        }
        for a in &self.added {
            classes[a.row_index as usize] = Some(Classification::Added);
        }
        classes
    }

    /// Class of every old row, indexed by old row position
    pub fn old_classifications(&self) -> Vec<Option<Classification>> {
        let mut classes = vec![None; self.old_row_count];
        for m in &self.unchanged {
            classes[m.old_index as usize] = Some(Classification::Unchanged);
        }
        for c in &self.corrected {
            classes[c.old_index as usize] = Some(Classification::Corrected);
        }
        for d in &self.deleted {
            classes[d.row_index as usize] = Some(Classification::Deleted);
        }
        classes
    }

    pub fn unchanged_rows(&self) -> Vec<&Row> {
        self.unchanged.iter().map(|m| &m.data).collect()
    }

    pub fn added_rows(&self) -> Vec<&Row> {
        self.added.iter().map(|r| &r.data).collect()
    }

    /// New-side values of corrected rows
    pub fn corrected_rows(&self) -> Vec<&Row> {
        self.corrected.iter().map(|c| &c.after).collect()
    }

    pub fn deleted_rows(&self) -> Vec<&Row> {
        self.deleted.iter().map(|r| &r.data).collect()
    }
}

impl ReconciliationSummary {
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.corrected > 0 || self.deleted > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgorithm;

    fn row(values: &[&str]) -> Row {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn dataset(rows: &[&[&str]]) -> Dataset {
        let rows = rows.iter().map(|r| row(r)).collect();
        Dataset::new(row(&["id", "region", "value"]), rows)
    }

    fn reconciler() -> Reconciler {
        Reconciler::new(ReconcileOptions::for_observation("value"))
    }

    #[test]
    fn test_mixed_classification() {
        let old = dataset(&[
            &["x", "A", "10"],
            &["y", "B", "20"],
            &["z", "C", "30"],
        ]);
        let new = dataset(&[
            &["y", "B", "20"],
            &["x", "A", "11"],
            &["w", "D", "40"],
        ]);

        let result = reconciler().reconcile(&old, &new).unwrap();

        assert_eq!(result.unchanged.len(), 1);
        assert_eq!((result.unchanged[0].old_index, result.unchanged[0].new_index), (1, 0));

        assert_eq!(result.corrected.len(), 1);
        let correction = &result.corrected[0];
        assert_eq!((correction.old_index, correction.new_index), (0, 1));
        assert_eq!(correction.changes.len(), 1);
        assert_eq!(correction.changes["value"].before, "10");
        assert_eq!(correction.changes["value"].after, "11");

        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].row_index, 2);
        assert_eq!(result.deleted.len(), 1);
        assert_eq!(result.deleted[0].data, row(&["z", "C", "30"]));
        assert_eq!(result.total_changes(), 3);
    }

    #[test]
    fn test_duplicate_corrections_pair_in_order() {
        let old = dataset(&[&["x", "A", "1"], &["x", "A", "2"]]);
        let new = dataset(&[&["x", "A", "3"], &["x", "A", "4"], &["x", "A", "5"]]);

        let result = reconciler().reconcile(&old, &new).unwrap();

        let pairs: Vec<(u64, u64)> = result
            .corrected
            .iter()
            .map(|c| (c.old_index, c.new_index))
            .collect();
        assert_eq!(pairs, vec![(0, 0), (1, 1)]);
        assert_eq!(result.added.len(), 1);
        assert_eq!(result.added[0].row_index, 2);
        assert!(result.deleted.is_empty());
    }

    #[test]
    fn test_unchanged_pairs_earliest_old_instance() {
        let old = dataset(&[&["a", "A", "1"], &["b", "B", "2"], &["a", "A", "1"]]);
        let new = dataset(&[&["a", "A", "1"]]);

        let result = reconciler().reconcile(&old, &new).unwrap();
        assert_eq!(result.unchanged[0].old_index, 0);
        let deleted: Vec<u64> = result.deleted.iter().map(|r| r.row_index).collect();
        assert_eq!(deleted, vec![1, 2]);
    }

    #[test]
    fn test_case_sensitive_mode_reports_correction() {
        let old = dataset(&[&["x", "North", "10"]]);
        let new = dataset(&[&["x", "north", "10"]]);

        let insensitive = reconciler().reconcile(&old, &new).unwrap();
        assert_eq!(insensitive.unchanged.len(), 1);

        let sensitive = Reconciler::new(
            ReconcileOptions::for_observation("value").with_case_normalization(false),
        )
        .reconcile(&old, &new)
        .unwrap();
        assert_eq!(sensitive.unchanged.len(), 0);
        assert_eq!(sensitive.added.len(), 1);
        assert_eq!(sensitive.deleted.len(), 1);
    }

    #[test]
    fn test_case_only_difference_in_observation_is_unchanged() {
        // Lower-cased observation text matches in phase 1
        let old = dataset(&[&["x", "A", "N/A"]]);
        let new = dataset(&[&["x", "A", "n/a"]]);
        let result = reconciler().reconcile(&old, &new).unwrap();
        assert_eq!(result.unchanged.len(), 1);
        assert!(!result.has_changes());
    }

    #[test]
    fn test_missing_observation_option() {
        let old = dataset(&[&["x", "A", "1"]]);
        let err = Reconciler::new(ReconcileOptions::default())
            .reconcile(&old, &old)
            .unwrap_err();
        assert!(matches!(err, RowDeltaError::InvalidInput(_)));
    }

    #[test]
    fn test_fast_and_cryptographic_agree() {
        let old = dataset(&[&["x", "A", "1"], &["y", "B", "2"], &["y", "B", "2"]]);
        let new = dataset(&[&["y", "B", "2"], &["x", "A", "9"], &["q", "Q", "0"]]);

        let crypto = reconciler().reconcile(&old, &new).unwrap();
        let fast = Reconciler::new(
            ReconcileOptions::for_observation("value").with_hash_algorithm(HashAlgorithm::Fast),
        )
        .reconcile(&old, &new)
        .unwrap();
        assert_eq!(crypto, fast);
    }

    #[test]
    fn test_progress_reaches_complete() {
        use std::cell::RefCell;

        let old = dataset(&[&["x", "A", "1"]]);
        let new = dataset(&[&["x", "A", "2"]]);
        let phases = RefCell::new(Vec::new());
        let callback: &dyn Fn(ReconcileProgress) = &|p| phases.borrow_mut().push(p.phase);

        reconciler()
            .reconcile_with_progress(&old, &new, Some(callback))
            .unwrap();

        let phases = phases.into_inner();
        assert_eq!(phases.first(), Some(&ReconcilePhase::Validating));
        assert_eq!(phases.last(), Some(&ReconcilePhase::Complete));
        assert!(phases.contains(&ReconcilePhase::DimensionMatch));
    }

    #[test]
    fn test_empty_new_deletes_everything() {
        let old = dataset(&[&["x", "A", "1"], &["y", "B", "2"]]);
        let new = dataset(&[]);
        let result = reconciler().reconcile(&old, &new).unwrap();
        assert_eq!(result.deleted.len(), 2);
        assert!(result.added.is_empty());
        assert!(result.unchanged.is_empty() && result.corrected.is_empty());
    }
}
