//! Value occurrence index.
//!
//! Maps each value to the number of keys currently holding it. The index is
//! rebuilt from the records at load time and maintained incrementally after
//! that. Zero counts are never stored.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tracing::warn;

/// Value to occurrence count mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurrenceIndex {
    counts: HashMap<String, u64>,
}

impl OccurrenceIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index by scanning record values.
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut index = Self::new();
        for value in values {
            index.increment(value);
        }
        index
    }

    /// Number of keys holding `value`. Absent values count as zero.
    pub fn get(&self, value: &str) -> u64 {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// Record one more key holding `value`.
    pub fn increment(&mut self, value: &str) {
        *self.counts.entry(value.to_string()).or_insert(0) += 1;
    }

    /// Record one fewer key holding `value`.
    ///
    /// Saturates at zero and drops the entry when it reaches zero.
    pub fn decrement(&mut self, value: &str) {
        self.apply_delta(value, -1);
    }

    /// Add a signed delta to the count for `value`.
    ///
    /// The result is clamped at zero; zero entries are removed.
    pub fn apply_delta(&mut self, value: &str, delta: i64) {
        if delta == 0 {
            return;
        }

        match self.counts.entry(value.to_string()) {
            Entry::Occupied(mut entry) => {
                let next = entry.get().saturating_add_signed(delta);
                if next == 0 {
                    entry.remove();
                } else {
                    *entry.get_mut() = next;
                }
            }
            Entry::Vacant(entry) => {
                if delta > 0 {
                    entry.insert(delta.unsigned_abs());
                } else {
                    warn!("Negative delta {delta} for unindexed value {value:?}");
                }
            }
        }
    }

    /// Count including an uncommitted delta, clamped at zero.
    pub fn effective(&self, value: &str, delta: i64) -> u64 {
        self.get(value).saturating_add_signed(delta)
    }

    /// Number of distinct values with a non-zero count.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no value is indexed.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
