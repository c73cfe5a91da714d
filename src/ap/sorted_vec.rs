//! `SortedVector<T>` (spec §4.2): append + sort + unique + binary search.
//! Used for the small auxiliary membership lists DSE builds while
//! reconciling cross-table aggregates (host→group membership, etc.) before
//! those grow large enough to warrant a hash index.

pub struct SortedVec<T> {
    inner: Vec<T>,
    dirty: bool,
}

impl<T> Default for SortedVec<T> {
    fn default() -> Self {
        Self {
            inner: Vec::new(),
            dirty: false,
        }
    }
}

impl<T: Ord> SortedVec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: T) {
        self.inner.push(value);
        self.dirty = true;
    }

    /// Sort and remove duplicates. Idempotent; a no-op if nothing changed
    /// since the last call.
    pub fn normalize(&mut self) {
        if !self.dirty {
            return;
        }
        self.inner.sort_unstable();
        self.inner.dedup();
        self.dirty = false;
    }

    pub fn contains(&mut self, value: &T) -> bool {
        self.normalize();
        self.inner.binary_search(value).is_ok()
    }

    pub fn remove(&mut self, value: &T) -> bool {
        self.normalize();
        match self.inner.binary_search(value) {
            Ok(idx) => {
                self.inner.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn as_slice(&mut self) -> &[T] {
        self.normalize();
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_dedups_and_finds() {
        let mut v: SortedVec<u64> = SortedVec::new();
        for x in [5, 1, 3, 1, 5, 2] {
            v.push(x);
        }
        assert_eq!(v.as_slice(), &[1, 2, 3, 5]);
        assert!(v.contains(&3));
        assert!(!v.contains(&4));
        assert!(v.remove(&3));
        assert!(!v.contains(&3));
    }
}
