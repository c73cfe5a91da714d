//! Sync loop (spec §4.5.3): pop a batch off the dispatch heap, lock its
//! triggers, normalise and commit history/trends/item-state, re-evaluate
//! triggers, export, and return items to the index. Mirrors the shape of
//! the teacher's `retention_enforcer` background loop, but the cycle body
//! itself is the reference's eleven-step batch pipeline rather than a
//! single SQL statement.

use super::exporter::{Exporter, HistoryRecord, TrendRecord};
use super::index::HistoryIndex;
use super::normalize::{self, HistoryTable};
use super::trends::TrendIndex;
use super::triggers_eval::{self, TriggerEvaluator};
use super::value::{HistoryValue, RawValue};
use crate::cc::model::{
    Id, InventoryMode, InventoryValue, ItemDiff, ItemStatus2, ValueType,
};
use crate::cc::ConfigCache;
use crate::config::{ProgramType, SyncerConfig};
use crate::events::{EventBus, ItemEventObject, ItemState, ItemStateEvent, TriggerValue, TriggerEvent};
use crate::sa::Region;
use crate::store::{HistoryRow, HistoryRowValue, Store, TrendRow};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Syncer {
    pub cc: Arc<ConfigCache>,
    pub store: Arc<Store>,
    pub index: Arc<HistoryIndex>,
    pub trends: Arc<TrendIndex>,
    pub region: Arc<Region>,
    pub exporter: Arc<dyn Exporter>,
    pub evaluator: Arc<dyn TriggerEvaluator>,
    pub events: EventBus,
    pub config: SyncerConfig,
    pub program_type: ProgramType,
}

/// Outcome of one cycle, used by the loop driver to decide whether to keep
/// looping within the same wall-clock budget (spec §4.5.3 step 11).
#[derive(Debug, Default)]
pub struct CycleReport {
    pub batch_len: usize,
    pub processed: usize,
}

/// Fixed re-poll interval for calculated-item triggers (spec §4.3); the
/// reference derives this from the item's own `delay`, which this rewrite
/// does not thread through to the timer queue.
const TIMER_RECHECK_SECS: i64 = 60;

fn value_table(vt: ValueType) -> &'static str {
    match vt {
        ValueType::Float => "history",
        ValueType::Unsigned => "history_uint",
        ValueType::Str => "history_str",
        ValueType::Text => "history_text",
        ValueType::Log => "history_log",
    }
}

fn history_table_name(t: HistoryTable) -> &'static str {
    match t {
        HistoryTable::History => "history",
        HistoryTable::HistoryUint => "history_uint",
        HistoryTable::HistoryStr => "history_str",
        HistoryTable::HistoryText => "history_text",
        HistoryTable::HistoryLog => "history_log",
    }
}

fn value_as_string(v: &HistoryValue) -> String {
    match v {
        HistoryValue::Float(f) => f.to_string(),
        HistoryValue::Unsigned(u) => u.to_string(),
        HistoryValue::Str(s) | HistoryValue::Text(s) => s.clone(),
        HistoryValue::Log { value, .. } => value.clone(),
    }
}

/// Bitmask a proxy-history row carries alongside its value so the upstream
/// server can redo the novalue/meta/nohistory/notrends decisions itself
/// (spec §3, §4.5.1).
fn flags_bitmask(flags: &super::value::ValueFlags) -> i32 {
    let mut bits = 0;
    if flags.meta {
        bits |= 1;
    }
    if flags.novalue {
        bits |= 2;
    }
    if flags.nohistory {
        bits |= 4;
    }
    if flags.notrends {
        bits |= 8;
    }
    bits
}

fn value_as_f64(v: &HistoryValue) -> Option<f64> {
    match v {
        HistoryValue::Float(f) => Some(*f),
        HistoryValue::Unsigned(u) => Some(*u as f64),
        _ => None,
    }
}

fn value_as_json(v: &HistoryValue) -> serde_json::Value {
    match v {
        HistoryValue::Float(f) => serde_json::json!(f),
        HistoryValue::Unsigned(u) => serde_json::json!(u),
        HistoryValue::Str(s) | HistoryValue::Text(s) => serde_json::json!(s),
        HistoryValue::Log {
            timestamp,
            source,
            severity,
            logeventid,
            value,
        } => serde_json::json!({
            "timestamp": timestamp,
            "source": source,
            "severity": severity,
            "logeventid": logeventid,
            "value": value,
        }),
    }
}

impl Syncer {
    /// Run one full iteration of the eleven-step batch pipeline. Returns
    /// `None` if nothing was popped (heap empty) or nothing survived trigger
    /// locking, signalling the driver loop it can stop for this tick.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        // Step 1: pop a batch, left at status normal.
        let batch = self.index.pop_batch(self.config.batch_max);
        if batch.is_empty() {
            return None;
        }
        let batch_len = batch.len();

        // Step 2: lock triggers; deferred items go back to the index busy.
        let outcome = self.cc.lock_triggers_by_history_items(batch);
        for itemid in &outcome.deferred {
            self.index.defer(*itemid);
        }
        if outcome.locked.is_empty() {
            return Some(CycleReport { batch_len, processed: 0 });
        }
        let locked = outcome.locked;

        // Step 3: copy tail values, holding the index lock only for the copy.
        let tails: Vec<(Id, RawValue)> = locked
            .iter()
            .filter_map(|id| self.index.tail_value(*id).map(|v| (*id, v)))
            .collect();

        // Step 4: normalise outside the lock.
        let items: HashMap<Id, _> = self
            .cc
            .get_items_by_ids(&locked)
            .into_iter()
            .filter_map(|(id, item)| item.map(|i| (id, i)))
            .collect();
        let hosts: HashMap<Id, _> = self
            .cc
            .get_hosts_by_item_ids(&locked)
            .into_iter()
            .filter_map(|(id, host)| host.map(|h| (id, h)))
            .collect();

        let mut item_diffs = Vec::new();
        let mut history_rows: Vec<(&'static str, Id, i64, i64, i32, HistoryValue)> = Vec::new();
        let mut item_events = Vec::new();
        let mut trends_to_flush = Vec::new();
        let mut inventory_values = Vec::new();

        for (itemid, raw) in &tails {
            let Some(item) = items.get(itemid) else {
                tracing::warn!(itemid, "history value for item missing from CC, dropping");
                continue;
            };

            let outcome = normalize::normalize(item, raw.clone());
            let table = history_table_name(outcome.table);
            debug_assert_eq!(table, value_table(item.value_type));

            // A conversion failure still records the error payload to
            // `history` and flips the item to not-supported (spec §7); only
            // trend computation below is skipped for it.
            let skip_history =
                outcome.value.flags.novalue || outcome.value.flags.meta || outcome.value.flags.nohistory;
            if !skip_history {
                history_rows.push((
                    table,
                    *itemid,
                    outcome.value.ts_sec,
                    outcome.value.ts_ns,
                    flags_bitmask(&outcome.value.flags),
                    outcome.value.value.clone(),
                ));
            }

            if !outcome.value.flags.novalue
                && !outcome.value.flags.meta
                && !outcome.conversion_failed
            {
                if !outcome.value.flags.notrends {
                    if let Some(f) = value_as_f64(&outcome.value.value) {
                        let is_uint = matches!(item.value_type, ValueType::Unsigned);
                        if let Some(flushed) =
                            self.trends.add_value(*itemid, is_uint, f, outcome.value.ts_sec)
                        {
                            trends_to_flush.push(flushed);
                        }
                    }
                }
            }

            let new_state = if outcome.conversion_failed {
                ItemStatus2::NotSupported
            } else {
                ItemStatus2::Normal
            };
            if new_state != item.state {
                item_events.push(ItemStateEvent {
                    object: ItemEventObject::Item,
                    objectid: *itemid,
                    ts_sec: outcome.value.ts_sec,
                    state: match new_state {
                        ItemStatus2::Normal => ItemState::Normal,
                        ItemStatus2::NotSupported => ItemState::NotSupported,
                    },
                    error: outcome.error.as_deref().unwrap_or("").to_string(),
                });
            }

            item_diffs.push(ItemDiff {
                itemid: *itemid,
                lastclock: Some(outcome.value.ts_sec),
                lastlogsize: Some(outcome.value.lastlogsize),
                mtime: Some(outcome.value.mtime),
                state: Some(new_state),
                error: outcome.error.clone().or(Some(item.error.clone())),
            });

            if let (Some(link), Some(host)) = (item.inventory_link, hosts.get(itemid)) {
                if let Some(inv) = self.cc.host_inventory(host.hostid) {
                    if inv.mode == InventoryMode::Automatic {
                        inventory_values.push(InventoryValue {
                            hostid: host.hostid,
                            field: self.cc.intern(&format!("field_{link}")),
                            value: self.cc.intern(&value_as_string(&outcome.value.value)),
                        });
                    }
                }
            }
        }

        let sweep_now = tails.last().map(|(_, v)| v.ts_sec).unwrap_or(0);
        trends_to_flush.extend(self.trends.sweep_due(sweep_now, self.config.trends_cleanup_minute));

        // Step 5: first transaction — history, item diff, trends, events.
        if let Err(e) = self.commit_batch(&history_rows, &item_diffs, &trends_to_flush) {
            tracing::error!("syncer: batch commit failed: {e}");
        }
        self.cc.apply_item_diff(item_diffs);
        self.cc.apply_inventory_values(inventory_values);
        for event in item_events {
            self.events.publish_item_state(event);
        }

        // Step 6-7: trigger re-evaluation plus timer-triggers, second
        // transaction for the trigger diff and derived events.
        let affected_items: Vec<Id> = tails.iter().map(|(id, _)| *id).collect();
        let triggers = self.cc.get_triggers_by_item_ids_and_timestamps(&affected_items, sweep_now);
        let locked_trigger_ids: Vec<Id> = triggers.iter().map(|t| t.triggerid).collect();
        let timer_triggerids = self.cc.get_timer_triggerids(sweep_now, self.config.batch_max);
        let timer_triggers = self.cc.get_triggers_by_ids(&timer_triggerids);
        let mut all_triggers = triggers;
        all_triggers.extend(timer_triggers);
        let mut trigger_diffs = Vec::new();
        for trigger in &all_triggers {
            let (diff, _unknown) = triggers_eval::reevaluate(trigger, self.evaluator.as_ref(), sweep_now).await;
            if let Some(diff) = diff {
                if diff.value != trigger.value {
                    self.events.publish_trigger(TriggerEvent {
                        objectid: diff.triggerid,
                        ts_sec: diff.last_change,
                        value: match diff.value {
                            crate::cc::model::TriggerValueState::Ok => TriggerValue::Ok,
                            crate::cc::model::TriggerValueState::Problem => TriggerValue::Problem,
                            crate::cc::model::TriggerValueState::Unknown => TriggerValue::Unknown,
                        },
                        severity: trigger.severity,
                        recovery: diff.value == crate::cc::model::TriggerValueState::Ok,
                    });
                }
                trigger_diffs.push(diff);
            }
        }
        // Timer-triggered (calculated-item) triggers share the re-evaluation
        // path above; once evaluated they're rescheduled a fixed interval
        // out rather than on the item's own `delay`, which this rewrite
        // does not thread through to the timer queue (see DESIGN.md).
        for timerid in timer_triggerids {
            self.cc.schedule_timer_check(timerid, sweep_now + TIMER_RECHECK_SECS);
        }
        if let Err(e) = self.commit_trigger_diffs(&trigger_diffs) {
            tracing::error!("syncer: trigger diff commit failed: {e}");
        }
        self.cc.apply_trigger_diff(trigger_diffs);

        // Step 8: export.
        for (_table, itemid, clock, ns, _flags, value) in &history_rows {
            if let Err(e) = self
                .exporter
                .export_history(HistoryRecord {
                    itemid: *itemid,
                    clock: *clock,
                    ns: *ns,
                    value: value_as_json(value),
                })
                .await
            {
                tracing::warn!("exporter: history export failed: {e}");
            }
        }
        for trend in &trends_to_flush {
            let (min, avg, max) = trend.min_avg_max();
            if let Err(e) = self
                .exporter
                .export_trend(TrendRecord {
                    itemid: trend.itemid,
                    clock: trend.clock,
                    num: trend.num,
                    min,
                    avg,
                    max,
                })
                .await
            {
                tracing::warn!("exporter: trend export failed: {e}");
            }
        }
        if let Err(e) = self.exporter.flush().await {
            tracing::warn!("exporter: flush failed: {e}");
        }

        // Step 9: return processed items to the index, freeing their slot.
        for (itemid, _) in &tails {
            self.index.complete(*itemid);
            self.region.free(super::ingest::VALUE_SLOT_BYTES);
        }

        // Step 10: release only the triggers this cycle locked, not every
        // trigger globally — other syncer workers may hold locks of their own.
        self.cc.unlock_triggers(&locked_trigger_ids);

        Some(CycleReport {
            batch_len,
            processed: tails.len(),
        })
    }

    /// Translates the cycle's in-memory rows into `Store` row types and
    /// commits them in one retried transaction (spec §4.5.3 step 5). Proxy
    /// mode routes every row to `proxy_history` instead of the per-type
    /// server tables; `Store` decides based on `is_proxy`.
    fn commit_batch(
        &self,
        history_rows: &[(&'static str, Id, i64, i64, i32, HistoryValue)],
        item_diffs: &[ItemDiff],
        trends: &[super::trends::Trend],
    ) -> anyhow::Result<()> {
        let store_rows: Vec<HistoryRow> = history_rows
            .iter()
            .map(|(table, itemid, clock, ns, flags, value)| HistoryRow {
                table: *table,
                itemid: *itemid,
                clock: *clock,
                ns: *ns,
                flags: *flags,
                value: match value {
                    HistoryValue::Log {
                        timestamp,
                        source,
                        severity,
                        logeventid,
                        value,
                    } => HistoryRowValue::Log {
                        timestamp: *timestamp,
                        source: source.clone(),
                        severity: *severity,
                        logeventid: *logeventid,
                        value: value.clone(),
                    },
                    other => HistoryRowValue::Scalar(value_as_string(other)),
                },
            })
            .collect();

        let store_trends: Vec<TrendRow> = trends
            .iter()
            .map(|trend| {
                let (min, avg, max) = trend.min_avg_max();
                TrendRow {
                    table: if trend.is_uint() { "trends_uint" } else { "trends" },
                    itemid: trend.itemid,
                    clock: trend.clock,
                    num: trend.num,
                    min,
                    avg,
                    max,
                }
            })
            .collect();

        self.store
            .commit_history_batch(&store_rows, item_diffs, &store_trends, self.program_type.is_proxy())
    }

    fn commit_trigger_diffs(&self, diffs: &[crate::cc::model::TriggerDiff]) -> anyhow::Result<()> {
        let rows: Vec<(Id, i64, i32)> = diffs
            .iter()
            .map(|diff| {
                let value = match diff.value {
                    crate::cc::model::TriggerValueState::Ok => 0,
                    crate::cc::model::TriggerValueState::Problem => 1,
                    crate::cc::model::TriggerValueState::Unknown => 2,
                };
                (diff.triggerid, diff.last_change, value)
            })
            .collect();
        self.store.commit_trigger_events(&rows)
    }

    /// Drive cycles until the heap is drained below `SYNC_MIN_PCNT` of the
    /// last batch or `SYNC_TIME_MAX` has elapsed (spec §4.5.3 step 11).
    pub async fn run_loop_tick(&self) {
        let started = Instant::now();
        let mut last_batch_len = self.config.batch_max.max(1);
        loop {
            if started.elapsed() > Duration::from_secs(self.config.sync_time_max_secs) {
                break;
            }
            match self.run_cycle().await {
                None => break,
                Some(report) => {
                    last_batch_len = report.batch_len;
                    let ratio = report.processed as f64 / last_batch_len.max(1) as f64;
                    if ratio < self.config.sync_min_pcnt {
                        break;
                    }
                }
            }
        }
    }
}

pub fn spawn(syncer: Arc<Syncer>, worker_count: usize) {
    for worker in 0..worker_count {
        let syncer = syncer.clone();
        tokio::spawn(async move {
            tracing::info!("syncer[{worker}]: started");
            let mut interval = tokio::time::interval(Duration::from_millis(200));
            loop {
                interval.tick().await;
                syncer.run_loop_tick().await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hcs::exporter::NullExporter;
    use crate::hcs::triggers_eval::{EvalResult, TriggerEvaluator};
    use crate::hcs::value::ValueFlags;
    use crate::sa::RegionKind;
    use async_trait::async_trait;

    struct AlwaysFalse;
    #[async_trait]
    impl TriggerEvaluator for AlwaysFalse {
        async fn eval_expression(&self, _expression: &str) -> EvalResult {
            EvalResult::False
        }
    }

    fn seed(cc: &ConfigCache) {
        use crate::cc::model::*;
        cc.upsert_host(Host {
            hostid: 1,
            host: Arc::from("h1"),
            status: HostStatus::Monitored,
            proxy_hostid: None,
            maintenance_status: MaintenanceStatus::NotInMaintenance,
            maintenanceid: None,
            tls_connect: 1,
            tls_accept: 1,
            tls_psk_identity: None,
            ipmi_authtype: -1,
            ipmi_username: None,
            ipmi_password: None,
            availability: InterfaceAvailability::default(),
        });
        cc.upsert_item(Item {
            itemid: 100,
            hostid: 1,
            value_type: ValueType::Float,
            status: ItemStatus::Active,
            item_type: ItemType::Trapper,
            key: Arc::from("agent.ping"),
            delay: Arc::from("30"),
            history_secs: 3600,
            trends_secs: 86400,
            interfaceid: None,
            valuemapid: None,
            units: Arc::from(""),
            inventory_link: None,
            type_params: ItemTypeParams::default(),
            lastclock: 0,
            lastlogsize: 0,
            mtime: 0,
            state: ItemStatus2::Normal,
            error: Arc::from(""),
        });
    }

    #[tokio::test]
    async fn cycle_processes_a_popped_batch_end_to_end() {
        let cc = Arc::new(ConfigCache::new());
        seed(&cc);
        let store = Arc::new(Store::open_in_memory().unwrap());
        let index = Arc::new(HistoryIndex::new());
        index.push_value(RawValue {
            itemid: 100,
            flags: ValueFlags::default(),
            value: HistoryValue::Float(42.0),
            ts_sec: 1000,
            ts_ns: 0,
            lastlogsize: 0,
            mtime: 0,
            undef: false,
        });

        let syncer = Syncer {
            cc: cc.clone(),
            store,
            index: index.clone(),
            trends: Arc::new(TrendIndex::new()),
            region: Arc::new(Region::new(RegionKind::HistoryValues, 1 << 20)),
            exporter: Arc::new(NullExporter),
            evaluator: Arc::new(AlwaysFalse),
            events: EventBus::new().0,
            config: SyncerConfig {
                start_db_syncers: 1,
                batch_max: 10,
                sync_time_max_secs: 10,
                sync_min_pcnt: 0.1,
                trends_cleanup_minute: 55,
            },
            program_type: crate::config::ProgramType::Server,
        };

        let report = syncer.run_cycle().await.unwrap();
        assert_eq!(report.processed, 1);
        assert!(!index.contains(100));
        let item = cc.get_items_by_ids(&[100])[0].1.clone().unwrap();
        assert_eq!(item.lastclock, 1000);
    }

    #[tokio::test]
    async fn conversion_failure_still_writes_history_but_skips_trend() {
        let cc = Arc::new(ConfigCache::new());
        seed(&cc);
        let store = Arc::new(Store::open_in_memory().unwrap());
        let index = Arc::new(HistoryIndex::new());
        // item 100 is declared Float; feeding it a Str value fails conversion.
        index.push_value(RawValue {
            itemid: 100,
            flags: ValueFlags::default(),
            value: HistoryValue::Str("not a float".into()),
            ts_sec: 1000,
            ts_ns: 0,
            lastlogsize: 0,
            mtime: 0,
            undef: false,
        });

        let syncer = Syncer {
            cc: cc.clone(),
            store: store.clone(),
            index: index.clone(),
            trends: Arc::new(TrendIndex::new()),
            region: Arc::new(Region::new(RegionKind::HistoryValues, 1 << 20)),
            exporter: Arc::new(NullExporter),
            evaluator: Arc::new(AlwaysFalse),
            events: EventBus::new().0,
            config: SyncerConfig {
                start_db_syncers: 1,
                batch_max: 10,
                sync_time_max_secs: 10,
                sync_min_pcnt: 0.1,
                trends_cleanup_minute: 55,
            },
            program_type: crate::config::ProgramType::Server,
        };

        syncer.run_cycle().await.unwrap();
        let item = cc.get_items_by_ids(&[100])[0].1.clone().unwrap();
        assert_eq!(item.state, crate::cc::model::ItemStatus2::NotSupported);
        let row: (i64, String) = store
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT clock, value FROM history WHERE itemid = 100",
                    [],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )?)
            })
            .unwrap();
        assert_eq!(row.0, 1000);
    }
}
