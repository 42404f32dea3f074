//! # rowdelta-core
//!
//! Core library for rowdelta - keyless reconciliation of two snapshots of the
//! same tabular dataset. Every row of the new snapshot is classified as
//! unchanged, added or corrected, and every old row without a partner as
//! deleted, without any primary key.
//!
//! This crate provides the core functionality that can be used by different interfaces
//! (CLI, scripts, services, etc.).

pub mod canonical;
pub mod config;
pub mod data;
pub mod dataset;
pub mod duplicates;
pub mod error;
pub mod export;
pub mod hash;
pub mod index;
pub mod reconcile;
pub mod schema;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod test_fixtures;

// Re-export the most commonly used types for convenience
pub use config::{Config, OutputConfig, ReconcileOptions};
pub use data::load_csv;
pub use dataset::{Dataset, Row};
pub use duplicates::{find_dimension_duplicates, DuplicateReport};
pub use error::{Result, RowDeltaError};
pub use export::{ExportOptions, OutputKind, ReconciliationWriter};
pub use hash::{Digest, HashAlgorithm, HashComputer};
pub use index::IdentityIndex;
pub use reconcile::{
    reconcile, Classification, Reconciler, Reconciliation, ReconciliationSummary,
};
