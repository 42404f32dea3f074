//! Deterministic row serialization used as hash input
//!
//! Fields are written in header order, each as `<byte length>:<bytes>;`, so
//! two rows only share a canonical form when every retained field is equal
//! (after optional lower-casing). Plain concatenation would let `["ab", "c"]`
//! and `["a", "bc"]` collide.

use std::borrow::Cow;

/// Produces the canonical byte form of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCanonicalizer {
    case_normalization: bool,
}

impl Default for RowCanonicalizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RowCanonicalizer {
    pub fn new(case_normalization: bool) -> Self {
        Self { case_normalization }
    }

    /// Canonical form of `row`, omitting the column at `exclude` if given
    pub fn canonicalize(&self, row: &[String], exclude: Option<usize>) -> Vec<u8> {
        let mut buf = Vec::with_capacity(row.iter().map(|v| v.len() + 4).sum());
        self.canonicalize_into(&mut buf, row, exclude);
        buf
    }

    /// Same as [`canonicalize`](Self::canonicalize) but reuses `buf`, which is
    /// cleared first
    pub fn canonicalize_into(&self, buf: &mut Vec<u8>, row: &[String], exclude: Option<usize>) {
        buf.clear();
        for (idx, value) in row.iter().enumerate() {
            if Some(idx) == exclude {
                continue;
            }
            let field = self.normalize(value);
            buf.extend_from_slice(field.len().to_string().as_bytes());
            buf.push(b':');
            buf.extend_from_slice(field.as_bytes());
            buf.push(b';');
        }
    }

    fn normalize<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if !self.case_normalization {
            return Cow::Borrowed(value);
        }
        if value.is_ascii() {
            if value.bytes().any(|b| b.is_ascii_uppercase()) {
                Cow::Owned(value.to_ascii_lowercase())
            } else {
                Cow::Borrowed(value)
            }
        } else {
            Cow::Owned(value.to_lowercase())
        }
    }
}
