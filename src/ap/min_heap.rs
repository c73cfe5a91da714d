//! `MinHeap<E>` (spec §4.2): a binary heap with a total-order comparator and
//! no intrinsic key update — callers re-insert when an entry's key changes.
//! This backs the dispatch heap in `hcs::index`, ordered by
//! `tail.timestamp` ascending with itemid as the tie-break (spec §3's
//! ordering invariant).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Wraps `T` to flip `std::cmp::Ord` so `BinaryHeap` (a max-heap) behaves as
/// a min-heap without asking callers to implement `Ord` backwards.
struct MinOrd<T>(T);

impl<T: Ord> Ord for MinOrd<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}
impl<T: Ord> PartialOrd for MinOrd<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: Ord> PartialEq for MinOrd<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<T: Ord> Eq for MinOrd<T> {}

pub struct MinHeap<E: Ord> {
    inner: BinaryHeap<MinOrd<E>>,
}

impl<E: Ord> Default for MinHeap<E> {
    fn default() -> Self {
        Self {
            inner: BinaryHeap::new(),
        }
    }
}

impl<E: Ord> MinHeap<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, e: E) {
        self.inner.push(MinOrd(e));
    }

    pub fn peek(&self) -> Option<&E> {
        self.inner.peek().map(|m| &m.0)
    }

    pub fn pop(&mut self) -> Option<E> {
        self.inner.pop().map(|m| m.0)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn size(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
    struct Entry {
        ts: i64,
        itemid: u64,
    }

    #[test]
    fn pops_in_ascending_order_with_itemid_tiebreak() {
        let mut h: MinHeap<Entry> = MinHeap::new();
        h.insert(Entry { ts: 5, itemid: 2 });
        h.insert(Entry { ts: 5, itemid: 1 });
        h.insert(Entry { ts: 1, itemid: 9 });
        h.insert(Entry { ts: 3, itemid: 4 });

        assert_eq!(h.pop(), Some(Entry { ts: 1, itemid: 9 }));
        assert_eq!(h.pop(), Some(Entry { ts: 3, itemid: 4 }));
        assert_eq!(h.pop(), Some(Entry { ts: 5, itemid: 1 }));
        assert_eq!(h.pop(), Some(Entry { ts: 5, itemid: 2 }));
        assert_eq!(h.pop(), None);
    }

    #[test]
    fn peek_matches_next_pop() {
        let mut h: MinHeap<i64> = MinHeap::new();
        h.insert(10);
        h.insert(3);
        h.insert(7);
        assert_eq!(h.peek(), Some(&3));
        assert_eq!(h.pop(), Some(3));
        assert_eq!(h.peek(), Some(&7));
    }
}
