//! Compiled pattern cache owned by a format registry.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

/// Insert-if-absent map shared by readers. Values are built outside the lock;
/// when two builders race, the first insert wins and both observe it.
#[derive(Debug)]
pub struct PatternCache<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for PatternCache<K, V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Clone> PatternCache<K, V> {
    pub fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(key).cloned()
    }

    /// Return the cached value, or build and insert it.
    pub fn get_or_try_insert<E>(
        &self,
        key: K,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let built = build()?;
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        Ok(map.entry(key).or_insert(built).clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
