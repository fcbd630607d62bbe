//! Atomically swappable index snapshots.
//!
//! Readers call [`IndexStore::snapshot`] and receive an `Arc` to an immutable
//! [`IndexSnapshot`]. A rebuild fills a private [`IndexBuilder`] and publishes
//! it with [`IndexBuilder::commit`], which swaps the whole snapshot in one step.
//! Dropping a builder without committing leaves the published snapshot as is.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

/// One search key and the relative paths registered under it.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub key: String,
    /// Lowercased key, precomputed for case-insensitive tiers
    pub key_lower: String,
    /// Unique, non-empty, sorted
    pub paths: Vec<String>,
}

/// Immutable view of the index. Never mutated after publication.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    entries: Vec<IndexEntry>,
    by_key: FxHashMap<String, usize>,
    files: FxHashSet<String>,
}

impl IndexSnapshot {
    /// Entries in key order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Look up the paths registered for an exact (case-sensitive) key.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.by_key
            .get(key)
            .map(|&idx| self.entries[idx].paths.as_slice())
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    /// Number of search keys.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of distinct indexed files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Holds the currently published snapshot.
#[derive(Debug, Default)]
pub struct IndexStore {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Either the pre- or post-rebuild index, never a mix.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            // The lock only guards a pointer swap, so a poisoned lock still
            // holds a complete snapshot.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Start a rebuild. The builder is invisible to readers until committed.
    pub fn begin_rebuild(&self) -> IndexBuilder<'_> {
        IndexBuilder {
            store: self,
            keys: FxHashMap::default(),
            files: FxHashSet::default(),
        }
    }

    fn publish(&self, snapshot: Arc<IndexSnapshot>) {
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

/// Build-in-progress snapshot, exclusively owned by one rebuild.
#[derive(Debug)]
pub struct IndexBuilder<'a> {
    store: &'a IndexStore,
    keys: FxHashMap<String, BTreeSet<String>>,
    files: FxHashSet<String>,
}

impl IndexBuilder<'_> {
    /// Register `path` under the search `key`. Duplicate pairs are ignored.
    pub fn add(&mut self, key: &str, path: &str) {
        if !self.files.contains(path) {
            self.files.insert(path.to_string());
        }
        self.keys
            .entry(key.to_string())
            .or_default()
            .insert(path.to_string());
    }

    /// Register a file under both its bare file name and its relative path.
    pub fn add_file(&mut self, file_name: &str, relative_path: &str) {
        self.add(file_name, relative_path);
        self.add(relative_path, relative_path);
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Freeze the builder and atomically replace the visible snapshot.
    pub fn commit(self) -> Arc<IndexSnapshot> {
        let store = self.store;
        let snapshot = Arc::new(self.freeze());
        store.publish(Arc::clone(&snapshot));
        snapshot
    }

    fn freeze(self) -> IndexSnapshot {
        let mut entries: Vec<IndexEntry> = self
            .keys
            .into_iter()
            .map(|(key, paths)| IndexEntry {
                key_lower: key.to_lowercase(),
                key,
                paths: paths.into_iter().collect(),
            })
            .collect();
        entries.sort_unstable_by(|a, b| a.key.cmp(&b.key));

        let by_key = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.key.clone(), idx))
            .collect();

        IndexSnapshot {
            entries,
            by_key,
            files: self.files,
        }
    }
}
