//! Dataset builders shared by unit tests, integration tests and benches

use crate::dataset::{Dataset, Row};

/// Observation column used by the generated datasets
pub const OBSERVATION_COLUMN: &str = "Value";

pub fn row(values: &[&str]) -> Row {
    values.iter().map(|v| v.to_string()).collect()
}

pub fn dataset(header: &[&str], rows: &[&[&str]]) -> Dataset {
    Dataset::new(row(header), rows.iter().map(|r| row(r)).collect())
}

/// Statistics-style header: three dimensions plus the observation
pub fn statistics_header() -> Row {
    row(&["Area", "Period", "Measure", OBSERVATION_COLUMN])
}

/// A deterministic statistics dataset with `rows` distinct dimension keys
pub fn statistics_dataset(rows: usize) -> Dataset {
    let data = (0..rows)
        .map(|i| {
            vec![
                format!("E{:08}", i / 12),
                format!("{}-{:02}", 2000 + (i / 12) % 25, i % 12 + 1),
                "count".to_string(),
                ((i * 37) % 1000).to_string(),
            ]
        })
        .collect();
    Dataset::new(statistics_header(), data)
}

/// Derive a new snapshot from `old`
///
/// Every `correct_every`-th row gets a new observation, every `delete_every`-th
/// row is dropped and `appended` fresh rows are added at the end. A step of 0
/// disables that change.
pub fn revise(
    old: &Dataset,
    correct_every: usize,
    delete_every: usize,
    appended: usize,
) -> Dataset {
    let mut rows = Vec::with_capacity(old.len() + appended);
    for (i, original) in old.rows.iter().enumerate() {
        if delete_every > 0 && i % delete_every == delete_every - 1 {
            continue;
        }
        let mut row = original.clone();
        if correct_every > 0 && i % correct_every == 0 {
            if let Some(value) = row.last_mut() {
                value.push('1');
            }
        }
        rows.push(row);
    }
    for i in 0..appended {
        rows.push(vec![
            format!("N{:08}", i),
            "2030-01".to_string(),
            "count".to_string(),
            i.to_string(),
        ]);
    }
    Dataset::new(old.header.clone(), rows)
}
