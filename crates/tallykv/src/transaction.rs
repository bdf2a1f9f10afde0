//! Transaction overlay.
//!
//! While a transaction is open, writes are staged in an [`Overlay`] instead
//! of touching the committed records. The overlay exists only inside
//! [`TransactionState::Active`], so "overlay present" and "transaction open"
//! cannot disagree.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Pending effect of a key inside an open transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending<'a> {
    /// The key will hold this value after commit
    Set(&'a str),
    /// The key will be removed after commit
    Tombstone,
}

impl<'a> Pending<'a> {
    /// Value visible to reads, `None` for a tombstone.
    pub const fn value(self) -> Option<&'a str> {
        match self {
            Self::Set(value) => Some(value),
            Self::Tombstone => None,
        }
    }
}

/// Uncommitted writes, deletes and count deltas of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    /// Key to staged value; `None` marks a tombstone.
    writes: BTreeMap<String, Option<String>>,
    /// Keys removed during the transaction. Always the tombstoned keys of `writes`.
    deletes: BTreeSet<String>,
    /// Net change to apply to the occurrence index on commit.
    deltas: HashMap<String, i64>,
}

impl Overlay {
    /// Create an empty overlay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending effect for `key`, if the transaction touched it.
    pub fn lookup(&self, key: &str) -> Option<Pending<'_>> {
        self.writes.get(key).map(|staged| match staged {
            Some(value) => Pending::Set(value),
            None => Pending::Tombstone,
        })
    }

    /// Stage `key = value`, replacing whatever was effective before.
    ///
    /// `prior` is the value visible for `key` before this write. The
    /// increment for `value` and decrement for `prior` are both recorded
    /// even when they are equal.
    pub fn stage_set(&mut self, key: &str, value: &str, prior: Option<&str>) {
        self.writes.insert(key.to_string(), Some(value.to_string()));
        self.deletes.remove(key);
        self.adjust(value, 1);
        if let Some(prior) = prior {
            self.adjust(prior, -1);
        }
    }

    /// Stage removal of `key`, whose effective value is `prior`.
    pub fn stage_delete(&mut self, key: &str, prior: &str) {
        self.writes.insert(key.to_string(), None);
        self.deletes.insert(key.to_string());
        self.adjust(prior, -1);
    }

    /// Pending count delta for `value`.
    pub fn delta(&self, value: &str) -> i64 {
        self.deltas.get(value).copied().unwrap_or(0)
    }

    /// Number of keys touched by the transaction.
    pub fn touched_keys(&self) -> usize {
        self.writes.len()
    }

    /// Split into staged sets, staged deletes and count deltas.
    pub fn into_parts(
        self,
    ) -> (
        impl Iterator<Item = (String, String)>,
        BTreeSet<String>,
        HashMap<String, i64>,
    ) {
        let sets = self
            .writes
            .into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)));
        (sets, self.deletes, self.deltas)
    }

    fn adjust(&mut self, value: &str, by: i64) {
        let delta = self.deltas.entry(value.to_string()).or_insert(0);
        *delta += by;
        if *delta == 0 {
            self.deltas.remove(value);
        }
    }
}

/// Whether a transaction is open, and its overlay if so.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransactionState {
    /// No transaction; writes go straight to the committed records
    #[default]
    Idle,
    /// A transaction is open and accumulating writes
    Active(Overlay),
}

impl TransactionState {
    /// Whether a transaction is open.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// The open overlay, if any.
    pub const fn overlay(&self) -> Option<&Overlay> {
        match self {
            Self::Active(overlay) => Some(overlay),
            Self::Idle => None,
        }
    }

    /// The open overlay, mutably.
    pub fn overlay_mut(&mut self) -> Option<&mut Overlay> {
        match self {
            Self::Active(overlay) => Some(overlay),
            Self::Idle => None,
        }
    }

    /// Close the transaction and hand back its overlay.
    pub fn take(&mut self) -> Option<Overlay> {
        match std::mem::take(self) {
            Self::Active(overlay) => Some(overlay),
            Self::Idle => None,
        }
    }
}
