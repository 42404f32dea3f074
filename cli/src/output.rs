//! Output formatting utilities

use chrono::Utc;
use rowdelta_core::duplicates::DuplicateReport;
use rowdelta_core::export::OutputFile;
use rowdelta_core::reconcile::{Reconciliation, RowCorrection};
use rowdelta_core::{Config, HashAlgorithm, Result};
use std::path::Path;

/// Rows sampled per class in the tree view
const SAMPLE_ROWS: usize = 3;

/// Pretty printer for rowdelta output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print the outcome of a compare run
    pub fn print_reconciliation(
        result: &Reconciliation,
        old: &Path,
        new: &Path,
        outputs: &[OutputFile],
        dry_run: bool,
    ) {
        let summary = result.summary();
        println!("🔍 Reconciliation: {} → {}", old.display(), new.display());
        println!(
            "├─ Rows: {} old, {} new (observation column '{}')",
            summary.old_rows, summary.new_rows, result.observation_column
        );

        if !result.has_changes() {
            println!(
                "└─ ✅ No changes between datasets ({} rows unchanged)",
                summary.unchanged
            );
            return;
        }

        println!("├─ Unchanged: {}", summary.unchanged);
        Self::print_corrections(&result.corrected, "│  ");
        println!("├─ Added: {}", summary.added);
        let added = result.added.iter().map(|r| r.row_index);
        Self::print_indices(added, summary.added, "│  ");
        println!("├─ Deleted: {}", summary.deleted);
        let deleted = result.deleted.iter().map(|r| r.row_index);
        Self::print_indices(deleted, summary.deleted, "│  ");

        let verb = if dry_run { "Would write" } else { "Wrote" };
        println!("└─ {verb} {} file(s)", outputs.len());
        for (i, file) in outputs.iter().enumerate() {
            let marker = if i == outputs.len() - 1 { "└─" } else { "├─" };
            println!("   {marker} {} ({})", file.path.display(), format_rows(file.rows));
        }
    }

    fn print_corrections(corrections: &[RowCorrection], prefix: &str) {
        println!("├─ Corrected: {}", corrections.len());
        for (i, correction) in corrections.iter().take(SAMPLE_ROWS).enumerate() {
            let is_last =
                i == corrections.len().min(SAMPLE_ROWS) - 1 && corrections.len() <= SAMPLE_ROWS;
            let marker = if is_last { "└─" } else { "├─" };
            let changes: Vec<String> = correction
                .changes
                .iter()
                .map(|(col, change)| format!("{col}: '{}' → '{}'", change.before, change.after))
                .collect();
            println!(
                "{prefix}{marker} Row {} (was {}): {}",
                correction.new_index,
                correction.old_index,
                changes.join(", ")
            );
        }
        if corrections.len() > SAMPLE_ROWS {
            println!(
                "{prefix}└─ ... and {} more corrected rows",
                corrections.len() - SAMPLE_ROWS
            );
        }
    }

    fn print_indices(indices: impl Iterator<Item = u64>, total: usize, prefix: &str) {
        if total == 0 {
            return;
        }
        let sample: Vec<String> = indices.take(SAMPLE_ROWS).map(|i| i.to_string()).collect();
        println!(
            "{prefix}└─ Indices: {}{}",
            sample.join(", "),
            if total > SAMPLE_ROWS { "..." } else { "" }
        );
    }

    /// Machine-readable key=value summary
    pub fn print_quiet(result: &Reconciliation, outputs: &[OutputFile]) {
        let summary = result.summary();
        println!("unchanged={}", summary.unchanged);
        println!("added={}", summary.added);
        println!("corrected={}", summary.corrected);
        println!("deleted={}", summary.deleted);
        for file in outputs {
            println!("{}={}", file.kind.suffix(), file.path.display());
        }
    }

    /// Print dimension duplicates found in one file
    pub fn print_duplicates(report: &DuplicateReport, file: &Path, written: Option<&Path>) {
        println!("🔎 Duplicate dimension keys in {}", file.display());
        if !report.has_duplicates() {
            println!("└─ ✅ No duplicates ({} rows)", report.filtered.len());
            return;
        }
        println!("├─ Duplicate rows: {}", report.duplicates.len());
        for duplicate in report.duplicates.iter().take(SAMPLE_ROWS) {
            println!(
                "│  ├─ Row {} repeats row {}: [{}]",
                duplicate.row_index,
                duplicate.first_index,
                duplicate.data.join(", ")
            );
        }
        if report.duplicates.len() > SAMPLE_ROWS {
            println!("│  └─ ... and {} more", report.duplicates.len() - SAMPLE_ROWS);
        }
        match written {
            Some(path) => println!(
                "└─ Wrote {} to {}",
                format_rows(report.filtered.len()),
                path.display()
            ),
            None => println!("└─ Rows after filtering: {}", report.filtered.len()),
        }
    }

    /// Print the active configuration
    pub fn print_config(config: &Config, source: &str) {
        println!("Current configuration ({source}):");
        println!(
            "  Observation column: {}",
            config
                .reconcile
                .observation_column
                .as_deref()
                .unwrap_or("<not set>")
        );
        println!("  Hash algorithm: {}", config.reconcile.hash_algorithm);
        println!("  Case normalization: {}", config.reconcile.case_normalization);
        println!("  Parallel hashing: {}", config.reconcile.parallel_hashing);
        println!("  Output directory: {}", config.output.directory.display());
        println!("  Test output directory: {}", config.output.test_directory.display());
        println!("  Write unchanged: {}", config.output.write_unchanged);
        println!("  Overwrite: {}", config.output.overwrite);
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format a compare run as JSON
    pub fn format_reconciliation(
        result: &Reconciliation,
        algorithm: HashAlgorithm,
        outputs: &[OutputFile],
        dry_run: bool,
    ) -> Result<String> {
        let corrections: Vec<serde_json::Value> = result
            .corrected
            .iter()
            .map(|c| {
                serde_json::json!({
                    "old_index": c.old_index,
                    "new_index": c.new_index,
                    "changes": c.changes,
                })
            })
            .collect();
        let json = serde_json::json!({
            "generated_at": Utc::now().to_rfc3339(),
            "observation_column": result.observation_column,
            "hash_algorithm": algorithm,
            "summary": result.summary(),
            "has_changes": result.has_changes(),
            "added": result.added.iter().map(|r| r.row_index).collect::<Vec<_>>(),
            "deleted": result.deleted.iter().map(|r| r.row_index).collect::<Vec<_>>(),
            "corrected": corrections,
            "dry_run": dry_run,
            "outputs": outputs,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }

    pub fn format_duplicates(report: &DuplicateReport) -> Result<String> {
        let json = serde_json::json!({
            "duplicate_count": report.duplicates.len(),
            "rows_after_filtering": report.filtered.len(),
            "duplicates": report.duplicates,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}

/// Format a row count with its unit
fn format_rows(count: usize) -> String {
    if count == 1 {
        "1 row".to_string()
    } else {
        format!("{count} rows")
    }
}
