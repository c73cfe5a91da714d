//! Ingest path: collectors call `HistoryBuffer::add`, which admits the value
//! against the shared `history-values` region before handing it to the
//! index (spec §4.5.1, §9 point iii). A region at capacity is a transient
//! condition, not a fatal one: the caller busy-waits and retries rather than
//! dropping the value or erroring out, matching the reference's "block
//! until space frees up" backpressure contract.

use super::index::HistoryIndex;
use super::value::RawValue;
use crate::sa::{Region, RegionKind};
use std::sync::Arc;
use std::time::Duration;

/// Rough per-value footprint charged against the region, independent of the
/// value's actual variant; the reference budgets by slot count more than by
/// exact byte size, and so do we.
pub(crate) const VALUE_SLOT_BYTES: usize = 128;

pub struct HistoryBuffer {
    region: Arc<Region>,
    index: Arc<HistoryIndex>,
}

impl HistoryBuffer {
    pub fn new(region: Arc<Region>, index: Arc<HistoryIndex>) -> Self {
        assert_eq!(region.kind(), RegionKind::HistoryValues);
        Self { region, index }
    }

    /// Admit and index one value, retrying admission every second while the
    /// region is full (spec §9 point iii: "OOM backpressure"). Never fails;
    /// a caller racing against shutdown should wrap this in a timeout.
    pub async fn add(&self, value: RawValue) {
        while !self.region.alloc(VALUE_SLOT_BYTES) {
            tracing::warn!("history-values region full, backing off");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.index.push_value(value);
    }

    /// Release the slot charged by `add` once the value has been drained out
    /// of the index by the syncer (spec §4.5.3 step 9).
    pub fn release_one(&self) {
        self.region.free(VALUE_SLOT_BYTES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcs::value::{HistoryValue, ValueFlags};

    fn raw(itemid: u64) -> RawValue {
        RawValue {
            itemid,
            flags: ValueFlags::default(),
            value: HistoryValue::Float(1.0),
            ts_sec: 100,
            ts_ns: 0,
            lastlogsize: 0,
            mtime: 0,
            undef: false,
        }
    }

    #[tokio::test]
    async fn add_indexes_the_value_and_charges_the_region() {
        let region = Arc::new(Region::new(RegionKind::HistoryValues, 1024));
        let index = Arc::new(HistoryIndex::new());
        let buf = HistoryBuffer::new(region.clone(), index.clone());
        buf.add(raw(1)).await;
        assert!(index.contains(1));
        assert_eq!(region.stats().used, VALUE_SLOT_BYTES as i64);
        buf.release_one();
        assert_eq!(region.stats().used, 0);
    }

    #[tokio::test]
    async fn add_waits_out_a_full_region() {
        let region = Arc::new(Region::new(RegionKind::HistoryValues, VALUE_SLOT_BYTES));
        let index = Arc::new(HistoryIndex::new());
        let buf = HistoryBuffer::new(region.clone(), index.clone());
        buf.add(raw(1)).await;
        assert!(!region.alloc(1));

        let region2 = region.clone();
        let buf2 = HistoryBuffer::new(region2, index.clone());
        let waiter = tokio::spawn(async move {
            buf2.add(raw(2)).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());
        region.free(VALUE_SLOT_BYTES);
        waiter.await.unwrap();
        assert!(index.contains(2));
    }
}
