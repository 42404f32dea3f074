//! CSV output of reconciliation results
//!
//! Each non-empty class is written to `<prefix>-<kind>.csv` in the output
//! directory with the dataset header as its first record. Every file is first
//! written beside its target as `<name>.csv.tmp`; targets are only replaced
//! once all temporary files are complete.

use crate::dataset::{Dataset, Row};
use crate::error::{Result, RowDeltaError};
use crate::reconcile::Reconciliation;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Output file kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Appends,
    Corrections,
    Deletes,
    Unchanged,
}

impl OutputKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputKind::Appends => "appends",
            OutputKind::Corrections => "corrections",
            OutputKind::Deletes => "deletes",
            OutputKind::Unchanged => "unchanged",
        }
    }
}

/// Export options for customizing output
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Replace files that already exist
    pub force: bool,
    /// Also write unchanged rows
    pub write_unchanged: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            force: true,
            write_unchanged: false,
        }
    }
}

/// A file produced (or planned) by the writer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFile {
    pub kind: OutputKind,
    pub path: PathBuf,
    pub rows: usize,
}

/// Writes the classified row sets of a reconciliation to CSV files
#[derive(Debug, Clone)]
pub struct ReconciliationWriter {
    output_dir: PathBuf,
    prefix: String,
    options: ExportOptions,
}

impl ReconciliationWriter {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            prefix: prefix.into(),
            options: ExportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn output_path(&self, kind: OutputKind) -> PathBuf {
        self.output_dir
            .join(format!("{}-{}.csv", self.prefix, kind.suffix()))
    }

    /// Files `write` would produce; empty classes are skipped
    pub fn planned_outputs(&self, result: &Reconciliation) -> Vec<OutputFile> {
        self.row_sets(result)
            .into_iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(kind, rows)| OutputFile {
                kind,
                path: self.output_path(kind),
                rows: rows.len(),
            })
            .collect()
    }

    /// Write every non-empty class and return the files written
    pub fn write(&self, result: &Reconciliation) -> Result<Vec<OutputFile>> {
        let planned = self.planned_outputs(result);
        if planned.is_empty() {
            log::info!("No changes to write");
            return Ok(planned);
        }

        if !self.options.force {
            if let Some(existing) = planned.iter().find(|file| file.path.exists()) {
                return Err(RowDeltaError::export(format!(
                    "Output file '{}' already exists (use --force to overwrite)",
                    existing.path.display()
                )));
            }
        }

        fs::create_dir_all(&self.output_dir)
            .map_err(|e| RowDeltaError::io(&self.output_dir, e))?;

        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(planned.len());
        for (kind, rows) in self.row_sets(result) {
            if rows.is_empty() {
                continue;
            }
            let path = self.output_path(kind);
            let temp_path = path.with_extension("csv.tmp");
            if let Err(e) = write_csv(&temp_path, &result.header, &rows) {
                discard_temp_files(staged.iter().map(|(temp, _)| temp).chain([&temp_path]));
                return Err(e);
            }
            staged.push((temp_path, path));
        }

        for (i, (temp_path, path)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(temp_path, path) {
                discard_temp_files(staged[i..].iter().map(|(temp, _)| temp));
                return Err(RowDeltaError::io(path, e));
            }
        }
        for file in &planned {
            log::info!("Wrote {} rows to {}", file.rows, file.path.display());
        }

        Ok(planned)
    }

    fn row_sets<'a>(&self, result: &'a Reconciliation) -> Vec<(OutputKind, Vec<&'a Row>)> {
        let mut sets = vec![
            (OutputKind::Appends, result.added_rows()),
            (OutputKind::Corrections, result.corrected_rows()),
            (OutputKind::Deletes, result.deleted_rows()),
        ];
        if self.options.write_unchanged {
            sets.push((OutputKind::Unchanged, result.unchanged_rows()));
        }
        sets
    }
}

/// Best-effort cleanup after a failed write
fn discard_temp_files<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) {
    for path in paths {
        if path.exists() {
            if let Err(e) = fs::remove_file(path) {
                log::warn!("Failed to remove temporary file {}: {e}", path.display());
            }
        }
    }
}

/// Write rows under a header to a CSV file
pub fn write_csv(path: &Path, header: &[String], rows: &[&Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| {
        RowDeltaError::export(format!("Cannot create '{}': {e}", path.display()))
    })?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row.iter())?;
    }
    writer.flush().map_err(|e| RowDeltaError::io(path, e))?;
    Ok(())
}

/// Write a whole dataset to a CSV file
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    let rows: Vec<&Row> = dataset.rows.iter().collect();
    write_csv(path, &dataset.header, &rows)
}
