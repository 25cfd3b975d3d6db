//! Single-flight memoizing keyed store.

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// A concurrency-safe map that computes each value at most once.
///
/// The first caller for a key runs the computation while concurrent callers
/// for the same key block on the entry's cell and then observe the same
/// value ("single flight"). The map lock is held only while locating or
/// inserting an entry, never during a computation, so computations for
/// distinct keys proceed in parallel.
///
/// The store never interprets a computation's failure; it only decides
/// whether to remember the outcome. Failed computations (via
/// [`get_or_try_compute`](Self::get_or_try_compute)) are forgotten so a
/// future caller retries.
pub struct KeyedOnceMap<K, V> {
    entries: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> KeyedOnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the entry cell for `key`, inserting an empty one if needed.
    fn entry(&self, key: &K) -> Arc<OnceCell<V>> {
        let mut entries = self.entries.lock().unwrap();
        Arc::clone(
            entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new())),
        )
    }

    /// Returns the value for `key`, computing it if absent.
    ///
    /// Guarantees at most one invocation of `compute` per key across all
    /// concurrent callers. The second tuple element is `true` if the value
    /// was already cached (this caller did not run the computation).
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> V) -> (V, bool) {
        let cell = self.entry(&key);
        let mut ran = false;
        let value = cell
            .get_or_init(|| {
                ran = true;
                compute()
            })
            .clone();
        (value, !ran)
    }

    /// Returns the value for `key`, computing it if absent, without caching
    /// failures.
    ///
    /// If `compute` returns `Err`, the entry is removed so a future caller
    /// retries the computation. The error is propagated unchanged.
    pub fn get_or_try_compute<E>(
        &self,
        key: K,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<(V, bool), E> {
        let cell = self.entry(&key);
        let mut ran = false;
        match cell.get_or_try_init(|| {
            ran = true;
            compute()
        }) {
            Ok(value) => Ok((value.clone(), !ran)),
            Err(e) => {
                let mut entries = self.entries.lock().unwrap();
                // Only evict the cell we failed on; a concurrent retry may
                // already have installed a fresh one.
                if let Some(current) = entries.get(&key) {
                    if Arc::ptr_eq(current, &cell) {
                        entries.remove(&key);
                    }
                }
                Err(e)
            }
        }
    }

    /// Returns the cached value for `key`, if any computation has finished.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Stores a value directly, replacing any existing or in-flight entry.
    ///
    /// For pre-seeding values known up front.
    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key, Arc::new(OnceCell::with_value(value)));
    }

    /// Removes the entry for `key`, if present.
    pub fn remove(&self, key: &K) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
    }

    /// Returns the number of entries, counting in-flight computations.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Returns `true` if the store has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl<K, V> Default for KeyedOnceMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
