//! Detection of rows that repeat a dimension key within one dataset
//!
//! Two rows with the same dimension key describe the same observation twice,
//! usually with conflicting values. They reconcile fine, but which old row a
//! correction pairs with is then decided by file order alone.

use crate::config::ReconcileOptions;
use crate::dataset::{Dataset, Row};
use crate::error::Result;
use crate::hash::{Digest, HashComputer};
use crate::schema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A row whose dimension key already appeared earlier in the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionDuplicate {
    pub row_index: u64,
    /// Index of the first row with the same dimension key
    pub first_index: u64,
    pub data: Row,
}

/// Duplicates found in a dataset plus the dataset with them removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    pub duplicates: Vec<DimensionDuplicate>,
    /// First occurrence of every dimension key, original order kept
    pub filtered: Dataset,
}

impl DuplicateReport {
    pub fn has_duplicates(&self) -> bool {
        !self.duplicates.is_empty()
    }
}

/// Find every row that repeats an earlier row's dimension key
pub fn find_dimension_duplicates(
    dataset: &Dataset,
    options: &ReconcileOptions,
) -> Result<DuplicateReport> {
    let observation_column = options.require_observation_column()?;
    schema::ensure_unique_columns(&dataset.header, "input")?;
    let observation_index = schema::observation_index(&dataset.header, observation_column)?;
    schema::validate_rows(dataset, "input")?;

    let hasher = HashComputer::new(options.hash_algorithm, options.case_normalization)
        .with_parallel(options.parallel_hashing);
    let digests = hasher.dimension_digests(&dataset.rows, observation_index);

    let mut first_seen: HashMap<Digest, usize> = HashMap::with_capacity(digests.len());
    let mut duplicates = Vec::new();
    let mut kept = Vec::with_capacity(dataset.len());

    for (row_index, digest) in digests.iter().enumerate() {
        match first_seen.get(digest) {
            Some(&first_index) => duplicates.push(DimensionDuplicate {
                row_index: row_index as u64,
                first_index: first_index as u64,
                data: dataset.rows[row_index].clone(),
            }),
            None => {
                first_seen.insert(*digest, row_index);
                kept.push(dataset.rows[row_index].clone());
            }
        }
    }

    log::info!(
        "Found {} rows repeating a dimension key out of {}",
        duplicates.len(),
        dataset.len()
    );

    Ok(DuplicateReport {
        duplicates,
        filtered: Dataset::new(dataset.header.clone(), kept),
    })
}
