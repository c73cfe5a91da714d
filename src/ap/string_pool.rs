//! `StringPool` (spec §4.2, §4.4): interns strings so that DSE's comparators
//! can treat field equality across rows as a pointer compare instead of a
//! byte-for-byte compare, once two rows' values have been interned to the
//! same allocation.
//!
//! The reference keeps a manual refcount prefix per pool entry. In Rust,
//! `Arc<str>`'s own strong count already *is* that refcount, so `intern`
//! hands back a clone of the pool's `Arc<str>` and `release` is just
//! dropping it — no manual bookkeeping, no use-after-free class of bug.
//! `gc()` sweeps entries the pool is the sole remaining owner of, matching
//! "refcount reaching zero removes the string" (spec §3 invariants).

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct StringPool {
    entries: HashMap<Arc<str>, ()>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning a pointer-stable, refcounted handle. Equal
    /// strings interned through the same pool are `Arc::ptr_eq`.
    pub fn intern(&mut self, s: &str) -> Arc<str> {
        if let Some((key, _)) = self.entries.get_key_value(s) {
            return key.clone();
        }
        let arc: Arc<str> = Arc::from(s);
        self.entries.insert(arc.clone(), ());
        arc
    }

    /// Remove pool entries that nothing outside the pool references anymore
    /// (strong_count == 1, i.e. only the pool's own key holds it twice, so
    /// the threshold is 2 since `get_key_value` above doesn't clone extra).
    pub fn gc(&mut self) {
        self.entries.retain(|k, _| Arc::strong_count(k) > 1);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_share_storage() {
        let mut pool = StringPool::new();
        let a = pool.intern("example.com");
        let b = pool.intern("example.com");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn gc_drops_unreferenced_entries() {
        let mut pool = StringPool::new();
        {
            let _held = pool.intern("transient");
            pool.gc();
            assert_eq!(pool.len(), 1);
        }
        pool.gc();
        assert_eq!(pool.len(), 0);
    }
}
