//! Header validation gating every reconciliation run

use crate::dataset::Dataset;
use crate::error::{Result, RowDeltaError};
use std::collections::HashSet;

/// Check that old and new headers are identical in membership and order
pub fn validate_headers(old: &[String], new: &[String]) -> Result<()> {
    if old == new {
        return Ok(());
    }

    Err(RowDeltaError::SchemaMismatch {
        old: old.to_vec(),
        new: new.to_vec(),
        detail: describe_header_difference(old, new),
    })
}

/// Human-readable description of how two headers differ
pub fn describe_header_difference(old: &[String], new: &[String]) -> String {
    let old_names: HashSet<&String> = old.iter().collect();
    let new_names: HashSet<&String> = new.iter().collect();

    let removed: Vec<&str> = old
        .iter()
        .filter(|col| !new_names.contains(col))
        .map(|s| s.as_str())
        .collect();
    let added: Vec<&str> = new
        .iter()
        .filter(|col| !old_names.contains(col))
        .map(|s| s.as_str())
        .collect();

    let mut parts = Vec::new();
    if !removed.is_empty() {
        parts.push(format!("columns only in old: [{}]", removed.join(", ")));
    }
    if !added.is_empty() {
        parts.push(format!("columns only in new: [{}]", added.join(", ")));
    }
    if parts.is_empty() {
        if old.len() != new.len() {
            parts.push(format!(
                "column counts differ ({} vs {})",
                old.len(),
                new.len()
            ));
        } else {
            parts.push("same columns in a different order".to_string());
        }
    }
    parts.join("; ")
}

/// Reject headers that name the same column twice
pub fn ensure_unique_columns(header: &[String], label: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for col in header {
        if !seen.insert(col) {
            return Err(RowDeltaError::invalid_input(format!(
                "Duplicate column '{col}' in {label} header"
            )));
        }
    }
    Ok(())
}

/// Position of the observation column, failing if the header lacks it
pub fn observation_index(header: &[String], column: &str) -> Result<usize> {
    header
        .iter()
        .position(|col| col == column)
        .ok_or_else(|| RowDeltaError::MissingObservationColumn {
            column: column.to_string(),
            header: header.to_vec(),
        })
}

/// Check every row has exactly as many fields as the header
pub fn validate_rows(dataset: &Dataset, label: &str) -> Result<()> {
    let expected = dataset.header.len();
    match dataset
        .rows
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != expected)
    {
        Some((row_index, row)) => Err(RowDeltaError::MalformedRow {
            dataset: label.to_string(),
            row_index: row_index as u64,
            expected,
            found: row.len(),
        }),
        None => Ok(()),
    }
}

/// Full precondition check for a run; returns the observation column index
pub fn validate_inputs(old: &Dataset, new: &Dataset, observation_column: &str) -> Result<usize> {
    validate_headers(&old.header, &new.header)?;
    // Headers are equal from here on, so one duplicate check covers both
    ensure_unique_columns(&new.header, "input")?;
    let obs_idx = observation_index(&new.header, observation_column)?;
    validate_rows(old, "old")?;
    validate_rows(new, "new")?;
    Ok(obs_idx)
}
