//! Collector interface (spec §4.5.1, §1 "protocol family collectors" —
//! Non-goal: this crate does not implement agent/SNMP/IPMI/trapper wire
//! protocols). A collector is anything that turns a wire message into a
//! `RawValue` and calls `HistoryBuffer::add`; this trait is the seam so a
//! test harness or a future protocol crate can drive ingestion without
//! depending on any particular transport.

use crate::hcs::ingest::HistoryBuffer;
use crate::hcs::value::RawValue;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait Collector: Send + Sync {
    /// Human-readable protocol family name, surfaced on the stats endpoint.
    fn name(&self) -> &'static str;

    /// Run until cancelled, pushing every value it receives through `buffer`.
    async fn run(&self, buffer: Arc<HistoryBuffer>) -> anyhow::Result<()>;
}

/// A collector fed directly in-process (used by tests and by the trapper
/// item type, which receives values pushed rather than polled).
pub struct DirectCollector {
    rx: tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<RawValue>>,
}

impl DirectCollector {
    pub fn new() -> (Self, tokio::sync::mpsc::UnboundedSender<RawValue>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        (
            Self {
                rx: tokio::sync::Mutex::new(rx),
            },
            tx,
        )
    }
}

#[async_trait]
impl Collector for DirectCollector {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn run(&self, buffer: Arc<HistoryBuffer>) -> anyhow::Result<()> {
        let mut rx = self.rx.lock().await;
        while let Some(value) = rx.recv().await {
            buffer.add(value).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcs::index::HistoryIndex;
    use crate::hcs::value::{HistoryValue, ValueFlags};
    use crate::sa::{Region, RegionKind};

    #[tokio::test]
    async fn direct_collector_forwards_values_into_the_buffer() {
        let (collector, tx) = DirectCollector::new();
        let region = Arc::new(Region::new(RegionKind::HistoryValues, 1 << 20));
        let index = Arc::new(HistoryIndex::new());
        let buffer = Arc::new(HistoryBuffer::new(region, index.clone()));

        let buffer_clone = buffer.clone();
        let handle = tokio::spawn(async move { collector.run(buffer_clone).await });

        tx.send(RawValue {
            itemid: 1,
            flags: ValueFlags::default(),
            value: HistoryValue::Float(1.0),
            ts_sec: 10,
            ts_ns: 0,
            lastlogsize: 0,
            mtime: 0,
            undef: false,
        })
        .unwrap();
        drop(tx);
        handle.await.unwrap().unwrap();
        assert!(index.contains(1));
    }
}
