//! Multiset of digests with consume-once matching

use crate::hash::Digest;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    total: usize,
    remaining: usize,
}

/// Count map from digest to occurrences in one dataset
///
/// `take` consumes a single occurrence, so k old rows and m new rows sharing a
/// digest match exactly `min(k, m)` times. Plain membership would let one old
/// row absorb every new duplicate.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    slots: HashMap<Digest, Slot>,
    remaining: usize,
}

/// `(row_index, digest)` instances split by whether their occurrence was consumed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimedInstances {
    pub claimed: Vec<(usize, Digest)>,
    pub unclaimed: Vec<(usize, Digest)>,
}

impl ClaimedInstances {
    pub fn claimed_indices(&self) -> Vec<usize> {
        self.claimed.iter().map(|(idx, _)| *idx).collect()
    }

    pub fn unclaimed_indices(&self) -> Vec<usize> {
        self.unclaimed.iter().map(|(idx, _)| *idx).collect()
    }
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index counting each digest occurrence
    pub fn build<I>(digests: I) -> Self
    where
        I: IntoIterator<Item = Digest>,
    {
        let mut index = Self::new();
        for digest in digests {
            index.insert(digest);
        }
        index
    }

    pub fn insert(&mut self, digest: Digest) {
        let slot = self.slots.entry(digest).or_insert(Slot {
            total: 0,
            remaining: 0,
        });
        slot.total += 1;
        slot.remaining += 1;
        self.remaining += 1;
    }

    /// Consume one occurrence of `digest`; false when none are left
    pub fn take(&mut self, digest: &Digest) -> bool {
        match self.slots.get_mut(digest) {
            Some(slot) if slot.remaining > 0 => {
                slot.remaining -= 1;
                self.remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// Unconsumed occurrences of `digest`
    pub fn count(&self, digest: &Digest) -> usize {
        self.slots.get(digest).map_or(0, |slot| slot.remaining)
    }

    /// Occurrences of `digest` consumed so far
    pub fn consumed(&self, digest: &Digest) -> usize {
        self.slots
            .get(digest)
            .map_or(0, |slot| slot.total - slot.remaining)
    }

    /// Total unconsumed occurrences across all digests
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Number of distinct digests
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Attribute consumed occurrences to concrete row instances
    ///
    /// `instances` are `(row_index, digest)` pairs in original order. For each
    /// digest the earliest `consumed(digest)` instances are claimed and the
    /// rest are left unclaimed. Output preserves input order.
    pub fn claim_instances<I>(&self, instances: I) -> ClaimedInstances
    where
        I: IntoIterator<Item = (usize, Digest)>,
    {
        let mut budget: HashMap<Digest, usize> = HashMap::new();
        let mut result = ClaimedInstances::default();

        for (row_index, digest) in instances {
            let left = budget
                .entry(digest)
                .or_insert_with(|| self.consumed(&digest));
            if *left > 0 {
                *left -= 1;
                result.claimed.push((row_index, digest));
            } else {
                result.unclaimed.push((row_index, digest));
            }
        }

        result
    }
}
