//! In-memory tabular dataset: an ordered header plus ordered rows

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single row, values aligned with the owning dataset's header
pub type Row = Vec<String>;

/// Ordered, index-addressable rows sharing one header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(header: Vec<String>, rows: Vec<Row>) -> Self {
        Self { header, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Position of a column in the header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|col| col == name)
    }

    /// Value of a named column in a given row
    pub fn value(&self, index: usize, column: &str) -> Option<&str> {
        let col_idx = self.column_index(column)?;
        self.rows.get(index)?.get(col_idx).map(|s| s.as_str())
    }

    /// Name-keyed view of a row, in header order
    pub fn record(&self, index: usize) -> Option<IndexMap<String, String>> {
        self.rows.get(index).map(|row| to_record(&self.header, row))
    }
}

/// Zip a header with a row into an ordered column → value map
pub fn to_record(header: &[String], row: &[String]) -> IndexMap<String, String> {
    header
        .iter()
        .zip(row.iter())
        .map(|(col, value)| (col.clone(), value.clone()))
        .collect()
}
