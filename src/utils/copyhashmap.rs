use {
    ahash::AHashMap,
    std::{cell::RefCell, hash::Hash},
};

/// A hash map behind a `RefCell` whose borrows never escape a single call.
///
/// Callers that need to run code which might re-enter the map must move the
/// values out first.
pub struct CopyHashMap<K, V> {
    map: RefCell<AHashMap<K, V>>,
}

impl<K, V> Default for CopyHashMap<K, V> {
    fn default() -> Self {
        Self {
            map: Default::default(),
        }
    }
}

impl<K: Eq + Hash, V> CopyHashMap<K, V> {
    pub fn set(&self, k: K, v: V) {
        self.map.borrow_mut().insert(k, v);
    }

    pub fn remove(&self, k: &K) -> Option<V> {
        self.map.borrow_mut().remove(k)
    }

    pub fn contains(&self, k: &K) -> bool {
        self.map.borrow().contains_key(k)
    }

    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }

    /// Removes and returns all entries matching `f`.
    pub fn take_matching(&self, mut f: impl FnMut(&K, &V) -> bool) -> Vec<(K, V)>
    where
        K: Copy,
    {
        let mut map = self.map.borrow_mut();
        let keys: Vec<K> = map
            .iter()
            .filter(|(k, v)| f(k, v))
            .map(|(k, _)| *k)
            .collect();
        let mut taken = Vec::with_capacity(keys.len());
        for k in keys {
            if let Some(v) = map.remove(&k) {
                taken.push((k, v));
            }
        }
        taken
    }
}
