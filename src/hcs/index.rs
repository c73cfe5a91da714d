//! History index and dispatch heap (spec §4.5.2). Mirrors `cc`'s use of
//! `ap::StableMap`/`ap::MinHeap`, but owned exclusively by HCS (spec §3
//! "Ownership").

use super::value::RawValue;
use crate::ap::{MinHeap, StableMap};
use crate::cc::model::Id;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryItemStatus {
    Normal,
    Busy,
}

pub struct HistoryItem {
    pub itemid: Id,
    pub status: HistoryItemStatus,
    /// Insertion-order list: new values are appended at the front (head),
    /// the tail (back) is the oldest pending value and is what dispatch
    /// order is keyed on (spec §4.5.2, §3 invariant "tail is oldest").
    values: VecDeque<RawValue>,
}

impl HistoryItem {
    pub fn tail(&self) -> Option<&RawValue> {
        self.values.back()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct DispatchEntry {
    tail_ts: i64,
    itemid: Id,
}

struct IndexInner {
    items: StableMap<Id, HistoryItem>,
    heap: MinHeap<DispatchEntry>,
}

pub struct HistoryIndex {
    inner: Mutex<IndexInner>,
}

impl Default for HistoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryIndex {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(IndexInner {
                items: StableMap::new(),
                heap: MinHeap::new(),
            }),
        }
    }

    /// Append a value for `itemid` (spec §4.5.2). On first sight of an
    /// itemid this creates the `HistoryItem` and schedules it on the
    /// dispatch heap; on a repeat the heap is left untouched because the
    /// tail (the scheduling key) never moves forward on an append.
    pub fn push_value(&self, v: RawValue) {
        let mut inner = self.inner.lock().unwrap();
        let itemid = v.itemid;
        match inner.items.get_mut(&itemid) {
            Some(item) => {
                item.values.push_front(v);
                item.status = HistoryItemStatus::Normal;
            }
            None => {
                let tail_ts = v.ts_sec;
                let mut values = VecDeque::with_capacity(4);
                values.push_front(v);
                inner.items.insert(
                    itemid,
                    HistoryItem {
                        itemid,
                        status: HistoryItemStatus::Normal,
                        values,
                    },
                );
                inner.heap.insert(DispatchEntry { tail_ts, itemid });
            }
        }
    }

    /// Pop up to `max` itemids ready for dispatch, skipping (and leaving
    /// in place) any still marked `busy` (spec §4.5.3 step 1-2).
    pub fn pop_batch(&self, max: usize) -> Vec<Id> {
        let mut inner = self.inner.lock().unwrap();
        let mut out = Vec::with_capacity(max);
        let mut skipped = Vec::new();
        while out.len() < max {
            match inner.heap.pop() {
                None => break,
                Some(entry) => {
                    let busy = inner
                        .items
                        .get(&entry.itemid)
                        .map(|it| it.status == HistoryItemStatus::Busy)
                        .unwrap_or(true);
                    if busy {
                        skipped.push(entry);
                    } else {
                        out.push(entry.itemid);
                    }
                }
            }
        }
        for entry in skipped {
            inner.heap.insert(entry);
        }
        out
    }

    /// A popped item lost the trigger-lock race: mark it busy and put its
    /// scheduling entry back so the next pop skips it until a fresh value
    /// clears the flag (spec §4.5.3 step 2).
    pub fn defer(&self, itemid: Id) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(item) = inner.items.get_mut(&itemid) {
            item.status = HistoryItemStatus::Busy;
            let tail_ts = item.tail().map(|v| v.ts_sec).unwrap_or(0);
            inner.heap.insert(DispatchEntry { tail_ts, itemid });
        }
    }

    pub fn tail_value(&self, itemid: Id) -> Option<RawValue> {
        let inner = self.inner.lock().unwrap();
        inner.items.get(&itemid).and_then(|it| it.tail().cloned())
    }

    /// A tail value was committed: drop it and either re-schedule the item
    /// (values remain) or remove it from the index entirely (spec §4.5.3
    /// step 9).
    pub fn complete(&self, itemid: Id) {
        let mut inner = self.inner.lock().unwrap();
        let remove = if let Some(item) = inner.items.get_mut(&itemid) {
            item.values.pop_back();
            if item.values.is_empty() {
                true
            } else {
                item.status = HistoryItemStatus::Normal;
                let tail_ts = item.tail().unwrap().ts_sec;
                inner.heap.insert(DispatchEntry { tail_ts, itemid });
                false
            }
        } else {
            false
        };
        if remove {
            inner.items.remove(&itemid);
        }
    }

    pub fn heap_len(&self) -> usize {
        self.inner.lock().unwrap().heap.size()
    }

    pub fn item_count(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn contains(&self, itemid: Id) -> bool {
        self.inner.lock().unwrap().items.contains_key(&itemid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcs::value::{HistoryValue, ValueFlags};

    fn raw(itemid: Id, ts: i64) -> RawValue {
        RawValue {
            itemid,
            flags: ValueFlags::default(),
            value: HistoryValue::Float(1.0),
            ts_sec: ts,
            ts_ns: 0,
            lastlogsize: 0,
            mtime: 0,
            undef: false,
        }
    }

    #[test]
    fn dispatch_order_follows_tail_timestamp() {
        let idx = HistoryIndex::new();
        idx.push_value(raw(1, 300));
        idx.push_value(raw(2, 100));
        idx.push_value(raw(3, 200));
        let batch = idx.pop_batch(10);
        assert_eq!(batch, vec![2, 3, 1]);
    }

    #[test]
    fn append_to_existing_item_does_not_move_heap_entry() {
        let idx = HistoryIndex::new();
        idx.push_value(raw(1, 100));
        idx.push_value(raw(1, 50)); // a later, smaller ts appended afterwards
        assert_eq!(idx.heap_len(), 1);
        let batch = idx.pop_batch(10);
        assert_eq!(batch, vec![1]);
        // tail is still the original oldest value (ts=100), not the newly appended one
        assert_eq!(idx.tail_value(1).unwrap().ts_sec, 100);
    }

    #[test]
    fn deferred_item_is_skipped_until_requeued() {
        let idx = HistoryIndex::new();
        idx.push_value(raw(1, 10));
        idx.push_value(raw(2, 20));
        let batch = idx.pop_batch(1);
        assert_eq!(batch, vec![1]);
        idx.defer(1);
        // item 1 is busy: next pop should get item 2, not 1
        let batch2 = idx.pop_batch(1);
        assert_eq!(batch2, vec![2]);
        // a fresh value clears the busy flag
        idx.push_value(raw(1, 15));
        let batch3 = idx.pop_batch(1);
        assert_eq!(batch3, vec![1]);
    }

    #[test]
    fn complete_removes_exhausted_item_but_requeues_nonempty_one() {
        let idx = HistoryIndex::new();
        idx.push_value(raw(1, 10));
        idx.push_value(raw(1, 5));
        idx.pop_batch(1);
        idx.complete(1); // drains tail (ts=10); one value remains
        assert!(idx.contains(1));
        assert_eq!(idx.heap_len(), 1);
        idx.pop_batch(1);
        idx.complete(1); // drains last value
        assert!(!idx.contains(1));
        assert_eq!(idx.heap_len(), 0);
    }
}
