//! CSV loading into in-memory datasets

use crate::dataset::Dataset;
use crate::error::{Result, RowDeltaError};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Instant;

const UTF8_BOM: char = '\u{feff}';

/// Load a CSV file whose first record is the header
pub fn load_csv(path: &Path) -> Result<Dataset> {
    let started = Instant::now();
    let file = File::open(path).map_err(|e| RowDeltaError::io(path, e))?;
    let dataset = read_csv(BufReader::new(file), path)?;
    log::debug!(
        "Loaded {} rows x {} columns from {} in {:?}",
        dataset.len(),
        dataset.header.len(),
        path.display(),
        started.elapsed()
    );
    Ok(dataset)
}

/// Load CSV from any reader; `source` names the input in error messages
pub fn load_csv_from_reader<R: Read>(reader: R, source: &Path) -> Result<Dataset> {
    read_csv(reader, source)
}

fn read_csv<R: Read>(reader: R, source: &Path) -> Result<Dataset> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let mut header: Vec<String> = csv_reader
        .headers()
        .map_err(|e| csv_error(source, e))?
        .iter()
        .map(String::from)
        .collect();

    if header.is_empty() {
        return Err(RowDeltaError::Parse {
            path: source.to_path_buf(),
            line: 1,
            message: "missing header row".to_string(),
        });
    }
    if let Some(first) = header.first_mut() {
        if let Some(stripped) = first.strip_prefix(UTF8_BOM) {
            *first = stripped.to_string();
        }
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|e| csv_error(source, e))?;
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(Dataset::new(header, rows))
}

fn csv_error(source: &Path, err: csv::Error) -> RowDeltaError {
    let line = err.position().map(|pos| pos.line()).unwrap_or(0);
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(io_err) => RowDeltaError::io(source, io_err),
        _ => RowDeltaError::Parse {
            path: source.to_path_buf(),
            line,
            message,
        },
    }
}
