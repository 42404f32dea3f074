//! Row content hashing
//!
//! Rows are canonicalized (see [`crate::canonical`]) and then digested with the
//! configured algorithm. `Cryptographic` uses BLAKE3 and is the default; `Fast`
//! uses xxh3-128 for very large inputs where accidental collisions are an
//! accepted risk.

use crate::canonical::RowCanonicalizer;
use crate::dataset::Row;
use crate::error::RowDeltaError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use xxhash_rust::xxh3::xxh3_128;

/// Rows per rayon task when hashing in parallel
pub const HASH_CHUNK_SIZE: usize = 4096;

/// Digest algorithm used for row identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// xxh3, 128-bit
    Fast,
    /// BLAKE3, 256-bit
    #[default]
    Cryptographic,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Fast => "fast",
            HashAlgorithm::Cryptographic => "cryptographic",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = RowDeltaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fast" | "xxh3" => Ok(HashAlgorithm::Fast),
            "cryptographic" | "blake3" => Ok(HashAlgorithm::Cryptographic),
            other => Err(RowDeltaError::invalid_input(format!(
                "Unknown hash algorithm '{other}' (expected 'fast' or 'cryptographic')"
            ))),
        }
    }
}

/// Fixed-length content digest of a canonical row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Digest {
    Fast(u128),
    Cryptographic([u8; 32]),
}

impl Digest {
    pub fn to_hex(&self) -> String {
        match self {
            Digest::Fast(value) => format!("{value:032x}"),
            Digest::Cryptographic(bytes) => {
                bytes.iter().map(|b| format!("{b:02x}")).collect()
            }
        }
    }

    /// Digest length in bytes
    pub fn byte_len(&self) -> usize {
        match self {
            Digest::Fast(_) => 16,
            Digest::Cryptographic(_) => 32,
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Computes full-row and dimension digests for rows
#[derive(Debug, Clone, Copy)]
pub struct HashComputer {
    algorithm: HashAlgorithm,
    canonicalizer: RowCanonicalizer,
    parallel: bool,
}

impl Default for HashComputer {
    fn default() -> Self {
        Self::new(HashAlgorithm::default(), true)
    }
}

impl HashComputer {
    pub fn new(algorithm: HashAlgorithm, case_normalization: bool) -> Self {
        Self {
            algorithm,
            canonicalizer: RowCanonicalizer::new(case_normalization),
            parallel: true,
        }
    }

    /// Toggle rayon-backed hashing; output is identical either way
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Digest an already canonicalized row
    pub fn digest(&self, canonical: &[u8]) -> Digest {
        match self.algorithm {
            HashAlgorithm::Fast => Digest::Fast(xxh3_128(canonical)),
            HashAlgorithm::Cryptographic => {
                Digest::Cryptographic(*blake3::hash(canonical).as_bytes())
            }
        }
    }

    /// Digest over every column of `row`
    pub fn full_digest(&self, row: &[String]) -> Digest {
        self.digest(&self.canonicalizer.canonicalize(row, None))
    }

    /// Digest over every column of `row` except the observation column
    pub fn dimension_digest(&self, row: &[String], observation_index: usize) -> Digest {
        self.digest(&self.canonicalizer.canonicalize(row, Some(observation_index)))
    }

    /// Full digests for all rows, in row order
    pub fn full_digests(&self, rows: &[Row]) -> Vec<Digest> {
        self.digest_all(rows.len(), |i| &rows[i], None)
    }

    /// Dimension digests for all rows, in row order
    pub fn dimension_digests(&self, rows: &[Row], observation_index: usize) -> Vec<Digest> {
        self.digest_all(rows.len(), |i| &rows[i], Some(observation_index))
    }

    /// Dimension digests for the rows at `indices`, in the order given
    pub fn dimension_digests_for(
        &self,
        rows: &[Row],
        indices: &[usize],
        observation_index: usize,
    ) -> Vec<Digest> {
        self.digest_all(indices.len(), |i| &rows[indices[i]], Some(observation_index))
    }

    fn digest_all<'a, F>(&self, count: usize, row_at: F, exclude: Option<usize>) -> Vec<Digest>
    where
        F: Fn(usize) -> &'a Row + Sync,
    {
        let hash_range = |start: usize, end: usize| -> Vec<Digest> {
            let mut buf = Vec::new();
            (start..end)
                .map(|i| {
                    self.canonicalizer.canonicalize_into(&mut buf, row_at(i), exclude);
                    self.digest(&buf)
                })
                .collect()
        };

        if !self.parallel || count <= HASH_CHUNK_SIZE {
            return hash_range(0, count);
        }

        // Chunks are hashed independently and stitched back in order
        let chunks: Vec<Vec<Digest>> = (0..count.div_ceil(HASH_CHUNK_SIZE))
            .into_par_iter()
            .map(|chunk| {
                let start = chunk * HASH_CHUNK_SIZE;
                hash_range(start, (start + HASH_CHUNK_SIZE).min(count))
            })
            .collect();

        let mut digests = Vec::with_capacity(count);
        for chunk in chunks {
            digests.extend(chunk);
        }
        digests
    }
}
