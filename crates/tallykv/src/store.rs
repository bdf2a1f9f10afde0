//! Key-value store with a value occurrence index and single-level
//! transactions.
//!
//! The committed records and the [`OccurrenceIndex`] are held in memory and
//! always agree while no transaction is open: for every value `v`, the index
//! holds the number of records whose value is `v`. Each mutation pairs the
//! increment for the new value with the decrement for the value it replaced.
//!
//! During a transaction, mutations are staged in an [`Overlay`] and reads
//! and counts see the overlay on top of the committed state.

use crate::codec;
use crate::error::{Result, TransactionError};
use crate::index::OccurrenceIndex;
use crate::transaction::{Overlay, Pending, TransactionState};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// File-backed store.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    records: BTreeMap<String, String>,
    index: OccurrenceIndex,
    /// Set by every mutation, cleared by a successful save.
    changes_made: bool,
    transaction: TransactionState,
}

impl Store {
    /// Open the store backed by `path`, loading it if it exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file exists but cannot be read or parsed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = codec::load(&path)?;
        let index = OccurrenceIndex::from_values(records.values());

        info!(
            "Opened store {} with {} records, {} distinct values",
            path.display(),
            records.len(),
            index.len()
        );

        Ok(Self {
            path,
            records,
            index,
            changes_made: false,
            transaction: TransactionState::Idle,
        })
    }

    /// Effective value of `key`, seeing uncommitted writes.
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(pending) = self.transaction.overlay().and_then(|o| o.lookup(key)) {
            return pending.value();
        }
        self.records.get(key).map(String::as_str)
    }

    /// Set `key` to `value`.
    pub fn set(&mut self, key: &str, value: &str) {
        self.changes_made = true;
        let prior = self.get(key).map(str::to_string);

        if let Some(overlay) = self.transaction.overlay_mut() {
            trace!("Staging set {key}={value} (was {prior:?})");
            overlay.stage_set(key, value, prior.as_deref());
        } else {
            trace!("Setting {key}={value} (was {prior:?})");
            self.records.insert(key.to_string(), value.to_string());
            self.index.increment(value);
            if let Some(prior) = prior {
                self.index.decrement(&prior);
            }
        }
    }

    /// Delete `key`.
    ///
    /// Only keys present in the committed records can be deleted; a key that
    /// exists only as an uncommitted write is left alone. Deleting a key
    /// that is already deleted in the open transaction does nothing.
    pub fn delete(&mut self, key: &str) {
        if !self.records.contains_key(key) {
            trace!("Delete of {key} ignored, no committed record");
            return;
        }

        if self.transaction.is_active() {
            let Some(prior) = self.get(key).map(str::to_string) else {
                trace!("Delete of {key} ignored, already deleted in transaction");
                return;
            };
            if let Some(overlay) = self.transaction.overlay_mut() {
                trace!("Staging delete of {key} (was {prior})");
                overlay.stage_delete(key, &prior);
            }
        } else if let Some(prior) = self.records.remove(key) {
            trace!("Deleting {key} (was {prior})");
            self.index.decrement(&prior);
        }

        self.changes_made = true;
    }

    /// Number of keys whose effective value is `value`.
    pub fn count(&self, value: &str) -> u64 {
        let delta = self.transaction.overlay().map_or(0, |o| o.delta(value));
        self.index.effective(value, delta)
    }

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::AlreadyActive` if one is already open; the
    /// open transaction is kept as is.
    pub fn begin(&mut self) -> std::result::Result<(), TransactionError> {
        if self.transaction.is_active() {
            return Err(TransactionError::AlreadyActive);
        }
        self.transaction = TransactionState::Active(Overlay::new());
        debug!("Transaction started");
        Ok(())
    }

    /// Fold the open transaction into the committed state, then save.
    ///
    /// Without an open transaction this is just a save.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Save` if the backing file cannot be written. The
    /// committed state has already been updated at that point.
    pub fn commit(&mut self) -> Result<()> {
        if let Some(overlay) = self.transaction.take() {
            let touched = overlay.touched_keys();
            let (sets, deletes, deltas) = overlay.into_parts();

            for (key, value) in sets {
                self.records.insert(key, value);
            }
            for key in &deletes {
                self.records.remove(key);
            }
            for (value, delta) in &deltas {
                self.index.apply_delta(value, *delta);
            }

            info!("Committed transaction touching {touched} keys");
        }

        self.save()?;
        Ok(())
    }

    /// Discard the open transaction.
    ///
    /// # Errors
    ///
    /// Returns `TransactionError::NotFound` if no transaction is open; the
    /// store is unchanged.
    pub fn rollback(&mut self) -> std::result::Result<(), TransactionError> {
        match self.transaction.take() {
            Some(overlay) => {
                info!("Rolled back transaction touching {} keys", overlay.touched_keys());
                Ok(())
            }
            None => Err(TransactionError::NotFound),
        }
    }

    /// Write the committed records to the backing file.
    ///
    /// Does nothing when there are no unsaved changes or a transaction is
    /// open; uncommitted writes never reach the file. Returns whether the
    /// file was written.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Save` if the file cannot be written.
    pub fn save(&mut self) -> Result<bool> {
        if !self.changes_made {
            trace!("Save skipped, no changes");
            return Ok(false);
        }
        if self.transaction.is_active() {
            debug!("Save skipped, transaction open");
            return Ok(false);
        }

        codec::save(&self.path, &self.records)?;
        self.changes_made = false;
        Ok(true)
    }

    /// Whether a transaction is open.
    pub const fn in_transaction(&self) -> bool {
        self.transaction.is_active()
    }

    /// Whether there are mutations not yet written to the file.
    pub const fn is_dirty(&self) -> bool {
        self.changes_made
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of committed records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no committed records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Committed records in key order.
    pub fn records(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The committed occurrence index.
    pub const fn index(&self) -> &OccurrenceIndex {
        &self.index
    }

    /// Pending effect of `key` in the open transaction, if any.
    pub fn pending(&self, key: &str) -> Option<Pending<'_>> {
        self.transaction.overlay().and_then(|o| o.lookup(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_with(content: &str) -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.csv");
        std::fs::write(&path, content).unwrap();
        let store = Store::open(&path).unwrap();
        (dir, store)
    }

    /// Recount values by scanning the committed records.
    fn scanned(store: &Store) -> OccurrenceIndex {
        OccurrenceIndex::from_values(store.records.values())
    }

    #[test]
    fn test_open_builds_index() {
        let (_dir, store) = open_with("foo,bar\nbiz,baz\nbar,foo\nbat,foo");
        assert_eq!(store.count("foo"), 2);
        assert_eq!(store.count("bar"), 1);
        assert_eq!(store.count("asd"), 0);
        assert_eq!(store.len(), 4);
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_overwrite_pairs_increment_and_decrement() {
        let (_dir, mut store) = open_with("a,x\nb,x");
        store.set("a", "y");
        assert_eq!(store.count("x"), 1);
        assert_eq!(store.count("y"), 1);
        assert_eq!(store.index, scanned(&store));
    }

    #[test]
    fn test_delete_in_transaction_after_reset() {
        let (_dir, mut store) = open_with("a,1");
        store.begin().unwrap();
        store.set("a", "2");
        store.delete("a");
        assert_eq!(store.get("a"), None);
        assert_eq!(store.count("1"), 0);
        assert_eq!(store.count("2"), 0);

        store.commit().unwrap();
        assert!(store.is_empty());
        assert!(store.index.is_empty());
    }

    #[test]
    fn test_double_delete_in_transaction() {
        let (_dir, mut store) = open_with("a,1\nb,1");
        store.begin().unwrap();
        store.delete("a");
        store.delete("a");
        assert_eq!(store.count("1"), 1);
        store.commit().unwrap();
        assert_eq!(store.count("1"), 1);
        assert_eq!(store.index, scanned(&store));
    }

    #[test]
    fn test_delete_pending_only_key_is_ignored() {
        let (_dir, mut store) = open_with("");
        store.begin().unwrap();
        store.set("new", "v");
        store.delete("new");
        assert_eq!(store.get("new"), Some("v"));
        assert_eq!(store.count("v"), 1);
    }

    #[test]
    fn test_set_after_delete_in_transaction() {
        let (_dir, mut store) = open_with("a,1");
        store.begin().unwrap();
        store.delete("a");
        store.set("a", "3");
        assert_eq!(store.get("a"), Some("3"));
        store.commit().unwrap();
        assert_eq!(store.get("a"), Some("3"));
        assert_eq!(store.count("1"), 0);
        assert_eq!(store.count("3"), 1);
        assert_eq!(store.index, scanned(&store));
    }

    #[test]
    fn test_nested_begin_is_rejected() {
        let (_dir, mut store) = open_with("a,1");
        store.begin().unwrap();
        store.set("a", "2");
        assert_eq!(store.begin(), Err(TransactionError::AlreadyActive));
        assert_eq!(store.get("a"), Some("2"));
        assert_eq!(store.pending("a"), Some(Pending::Set("2")));
    }

    #[test]
    fn test_commit_without_transaction_saves() {
        let (dir, mut store) = open_with("a,1");
        store.set("b", "2");
        store.commit().unwrap();
        assert!(!store.is_dirty());
        let saved = std::fs::read_to_string(dir.path().join("db.csv")).unwrap();
        assert_eq!(saved, "a,1\nb,2");
    }

    #[test]
    fn test_commit_flushes_transaction() {
        let (dir, mut store) = open_with("a,1");
        store.begin().unwrap();
        store.set("b", "1");
        store.delete("a");
        assert!(matches!(store.commit(), Ok(())));
        assert!(!store.in_transaction());
        assert!(!store.is_dirty());
        assert_eq!(store.count("1"), 1);
        let saved = std::fs::read_to_string(dir.path().join("db.csv")).unwrap();
        assert_eq!(saved, "b,1");
    }

    #[test]
    fn test_save_clears_dirty_flag() {
        let (_dir, mut store) = open_with("a,1");
        assert!(!store.save().unwrap());
        store.set("a", "2");
        assert!(store.is_dirty());
        assert!(store.save().unwrap());
        assert!(!store.is_dirty());
        assert!(!store.save().unwrap());
    }
}
