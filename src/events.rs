//! Internal event bus (spec §6). The core only produces these; an external
//! correlation/notification layer (non-goal, not modelled here) consumes
//! them. We model the bus as a bounded `tokio::sync::mpsc` channel the way
//! the teacher's `usage_tracker` fans batched events out of the hot path:
//! producers never block on a full channel past a send, and a slow or
//! absent consumer cannot stall ingestion.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemEventObject {
    Item,
    DiscoveryRule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    Normal,
    NotSupported,
}

#[derive(Debug, Clone)]
pub struct ItemStateEvent {
    pub object: ItemEventObject,
    pub objectid: u64,
    pub ts_sec: i64,
    pub state: ItemState,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerValue {
    Ok,
    Problem,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub objectid: u64,
    pub ts_sec: i64,
    pub value: TriggerValue,
    pub severity: u8,
    pub recovery: bool,
}

#[derive(Debug, Clone)]
pub enum CoreEvent {
    Item(ItemStateEvent),
    Trigger(TriggerEvent),
}

#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<CoreEvent>,
}

impl EventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn publish(&self, event: CoreEvent) {
        // Fire-and-forget: a closed receiver (no consumer wired up) must
        // never propagate as an ingestion-path error.
        let _ = self.tx.send(event);
    }

    pub fn publish_item_state(&self, event: ItemStateEvent) {
        self.publish(CoreEvent::Item(event));
    }

    pub fn publish_trigger(&self, event: TriggerEvent) {
        self.publish(CoreEvent::Trigger(event));
    }
}
