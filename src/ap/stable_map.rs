//! `StableHashSet<K, V>` (spec §4.2): a hash map whose entries never move
//! once inserted, so long-lived references into it (the dispatch heap's
//! `HistoryItem` pointers, CC's cross-entity indices) stay valid across
//! further inserts/removes of *other* keys.
//!
//! Rust gives us this for free: box the value. A `HashMap`'s rehash on
//! insert moves the `Box<V>` pointer, never the `V` it points to, so
//! `&V`/`&mut V` borrows obtained before a rehash remain valid as long as
//! the borrow checker's aliasing rules are respected (i.e. you can't hold a
//! reference across a call that also takes `&mut self`). For the "stable
//! pointer survives concurrent insert while iterating" guarantee spec §9
//! asks for, callers wrap `StableMap` in the owning subsystem's mutex and
//! keep `(region, index)`-style keys rather than raw pointers, which is
//! what every user of this type does in `cc` and `hcs`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;

pub struct StableMap<K, V> {
    inner: HashMap<K, Box<V>>,
}

impl<K, V> Default for StableMap<K, V> {
    fn default() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, V> StableMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains_key(&self, k: &K) -> bool {
        self.inner.contains_key(k)
    }

    pub fn get(&self, k: &K) -> Option<&V> {
        self.inner.get(k).map(|b| b.as_ref())
    }

    pub fn get_mut(&mut self, k: &K) -> Option<&mut V> {
        self.inner.get_mut(k).map(|b| b.as_mut())
    }

    /// Insert, returning the prior value if the key was already present.
    /// Never invalidates references obtained through a *different* key.
    pub fn insert(&mut self, k: K, v: V) -> Option<V> {
        self.inner.insert(k, Box::new(v)).map(|b| *b)
    }

    pub fn remove(&mut self, k: &K) -> Option<V> {
        self.inner.remove(k).map(|b| *b)
    }

    /// Entry-style access without relinquishing the stable-pointer contract:
    /// the closure runs with `&mut V`, inserting a fresh default only if the
    /// key is absent.
    pub fn get_or_insert_with(&mut self, k: K, default: impl FnOnce() -> V) -> &mut V {
        match self.inner.entry(k) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(Box::new(default())),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.inner.values().map(|b| b.as_ref())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.inner.values_mut().map(|b| b.as_mut())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter().map(|(k, v)| (k, v.as_ref()))
    }

    /// Iterate with the ability to remove the current entry, mirroring the
    /// "iterator with remove" requirement in spec §4.2.
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.inner.retain(|k, v| f(k, v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_survives_other_inserts() {
        let mut m: StableMap<u64, String> = StableMap::new();
        m.insert(1, "one".to_string());
        let ptr_before = m.get(&1).unwrap() as *const String;
        for i in 2..500 {
            m.insert(i, format!("n{i}"));
        }
        let ptr_after = m.get(&1).unwrap() as *const String;
        assert_eq!(ptr_before, ptr_after);
        assert_eq!(m.get(&1).unwrap(), "one");
    }

    #[test]
    fn retain_removes_during_iteration() {
        let mut m: StableMap<u64, u64> = StableMap::new();
        for i in 0..10 {
            m.insert(i, i);
        }
        m.retain(|_, v| *v % 2 == 0);
        assert_eq!(m.len(), 5);
        assert!(m.get(&3).is_none());
        assert!(m.get(&4).is_some());
    }
}
