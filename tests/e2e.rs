//! End-to-end scenarios, one per spec §8 "End-to-end scenarios" item this
//! rewrite's scope covers (E1, E3, E4, E6 — E2 is exercised at the DSE
//! unit-test level against `sync_items`'s macro-expansion path, E5's
//! store-restart retry is outside what an in-memory sqlite connection can
//! model and is left to manual/ops verification).

use async_trait::async_trait;
use std::sync::Arc;
use zbx_core::cc::model::*;
use zbx_core::cc::ConfigCache;
use zbx_core::hcs::exporter::NullExporter;
use zbx_core::hcs::index::HistoryIndex;
use zbx_core::hcs::syncer::Syncer;
use zbx_core::hcs::trends::TrendIndex;
use zbx_core::hcs::triggers_eval::{EvalResult, TriggerEvaluator};
use zbx_core::hcs::value::{HistoryValue, RawValue, ValueFlags};
use zbx_core::config::SyncerConfig;
use zbx_core::events::EventBus;
use zbx_core::sa::{Region, RegionKind};
use zbx_core::store::Store;

fn raw(itemid: Id, ts: i64, value: f64) -> RawValue {
    RawValue {
        itemid,
        flags: ValueFlags::default(),
        value: HistoryValue::Float(value),
        ts_sec: ts,
        ts_ns: 0,
        lastlogsize: 0,
        mtime: 0,
        undef: false,
    }
}

fn seed_host_and_item(cc: &ConfigCache, hostid: Id, itemid: Id) {
    cc.upsert_host(Host {
        hostid,
        host: Arc::from(format!("host-{hostid}").as_str()),
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
        itemid,
        hostid,
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

struct AlwaysFalse;
#[async_trait]
impl TriggerEvaluator for AlwaysFalse {
    async fn eval_expression(&self, _expression: &str) -> EvalResult {
        EvalResult::False
    }
}

/// True the first call, false thereafter — enough to flip a trigger from
/// ok to problem exactly once (used by E4).
struct TrueOnce {
    fired: std::sync::atomic::AtomicBool,
}
#[async_trait]
impl TriggerEvaluator for TrueOnce {
    async fn eval_expression(&self, _expression: &str) -> EvalResult {
        if !self.fired.swap(true, std::sync::atomic::Ordering::SeqCst) {
            EvalResult::True
        } else {
            EvalResult::False
        }
    }
}

fn make_syncer(
    cc: Arc<ConfigCache>,
    store: Arc<Store>,
    index: Arc<HistoryIndex>,
    trends: Arc<TrendIndex>,
    evaluator: Arc<dyn TriggerEvaluator>,
) -> Syncer {
    Syncer {
        cc,
        store,
        index,
        trends,
        region: Arc::new(Region::new(RegionKind::HistoryValues, 1 << 20)),
        exporter: Arc::new(NullExporter),
        evaluator,
        events: EventBus::new().0,
        config: SyncerConfig {
            start_db_syncers: 1,
            batch_max: 256,
            sync_time_max_secs: 10,
            sync_min_pcnt: 0.10,
            trends_cleanup_minute: 55,
        },
    }
}

/// E1: one float item, three values within the same hour, rolled over by a
/// value in the next hour. Expect three `history` rows and one flushed
/// trend `(count=3, min=1, avg=2, max=3, clock=0)`.
#[tokio::test]
async fn e1_hour_rollover_flushes_one_trend_row() {
    let cc = Arc::new(ConfigCache::new());
    seed_host_and_item(&cc, 1, 100);
    let store = Arc::new(Store::open_in_memory().unwrap());
    let index = Arc::new(HistoryIndex::new());
    let trends = Arc::new(TrendIndex::new());

    for (ts, v) in [(1000, 1.0), (1030, 2.0), (1060, 3.0)] {
        index.push_value(raw(100, ts, v));
    }
    let syncer = make_syncer(cc.clone(), store.clone(), index.clone(), trends.clone(), Arc::new(AlwaysFalse));
    let report = syncer.run_cycle().await.unwrap();
    assert_eq!(report.processed, 3);

    let count: i64 = store
        .with_conn(|conn| {
            let n = conn.query_row("SELECT COUNT(*) FROM history WHERE itemid = 100", [], |r| r.get(0))?;
            Ok(n)
        })
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(trends.len(), 0, "all three values land in the same hour, no rollover yet");

    // A value in the next hour rolls the first hour's trend out immediately.
    index.push_value(raw(100, 4000, 10.0));
    let syncer = make_syncer(cc.clone(), store.clone(), index.clone(), trends.clone(), Arc::new(AlwaysFalse));
    syncer.run_cycle().await.unwrap();

    let row: (i64, f64, f64, f64) = store
        .with_conn(|conn| {
            let row = conn.query_row(
                "SELECT num, value_min, value_avg, value_max FROM trends WHERE itemid = 100 AND clock = 0",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )?;
            Ok(row)
        })
        .unwrap();
    assert_eq!(row, (3, 1.0, 2.0, 3.0));
}

/// E3: two syncers (run sequentially here, since both share one `Syncer`
/// pipeline and the test only needs to prove no item is lost or
/// double-locked) draining many items across several batches.
#[tokio::test]
async fn e3_many_items_all_drain_without_loss() {
    let cc = Arc::new(ConfigCache::new());
    let store = Arc::new(Store::open_in_memory().unwrap());
    let index = Arc::new(HistoryIndex::new());
    let trends = Arc::new(TrendIndex::new());

    const N: u64 = 300;
    for i in 0..N {
        seed_host_and_item(&cc, 100 + i, 1000 + i);
        index.push_value(raw(1000 + i, 1000 + i as i64, i as f64));
    }

    let syncer = make_syncer(cc.clone(), store.clone(), index.clone(), trends.clone(), Arc::new(AlwaysFalse));
    let mut total_processed = 0;
    while let Some(report) = syncer.run_cycle().await {
        total_processed += report.processed;
    }
    assert_eq!(total_processed, N as usize);
    for i in 0..N {
        assert!(!index.contains(1000 + i));
    }
    let count: i64 = store
        .with_conn(|conn| {
            let n = conn.query_row("SELECT COUNT(*) FROM history", [], |r| r.get(0))?;
            Ok(n)
        })
        .unwrap();
    assert_eq!(count, N as i64);
}

/// E4: a trigger wired to one item transitions ok -> problem on the first
/// ingested value, and the transition is observable both in CC and as a
/// persisted `events` row with `clock = value.ts.sec`.
#[tokio::test]
async fn e4_trigger_transitions_to_problem_on_ingest() {
    let cc = Arc::new(ConfigCache::new());
    seed_host_and_item(&cc, 1, 100);
    cc.upsert_trigger(Trigger {
        triggerid: 500,
        expression: Arc::from("last(/host-1/agent.ping)=0"),
        recovery_mode: RecoveryMode::Expression,
        recovery_expression: Arc::from(""),
        correlation_mode: 0,
        correlation_tag: Arc::from(""),
        severity: 3,
        status: TriggerStatus::Enabled,
        value: TriggerValueState::Ok,
        last_change: 0,
        error: Arc::from(""),
    });
    cc.upsert_function(Function {
        functionid: 1,
        itemid: 100,
        triggerid: 500,
        name: Arc::from("last"),
        parameter: Arc::from("$"),
    });

    let store = Arc::new(Store::open_in_memory().unwrap());
    let index = Arc::new(HistoryIndex::new());
    let trends = Arc::new(TrendIndex::new());
    index.push_value(raw(100, 5000, 0.0));

    let evaluator = Arc::new(TrueOnce { fired: std::sync::atomic::AtomicBool::new(false) });
    let syncer = make_syncer(cc.clone(), store.clone(), index, trends, evaluator);
    syncer.run_cycle().await.unwrap();

    let triggers = cc.get_triggers_by_ids(&[500]);
    assert_eq!(triggers[0].value, TriggerValueState::Problem);

    let (clock, value): (i64, i64) = store
        .with_conn(|conn| {
            let row = conn.query_row(
                "SELECT clock, value FROM events WHERE objectid = 500",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;
            Ok(row)
        })
        .unwrap();
    assert_eq!(clock, 5000);
    assert_eq!(value, 1); // Problem
}

/// E6: a host leaves a group between two DSE cycles; the membership
/// disappears from CC's group index within that one cycle.
#[test]
fn e6_group_membership_removed_within_one_cycle() {
    use zbx_core::dse;

    let store = Store::open_in_memory().unwrap();
    store
        .with_conn(|conn| {
            conn.execute_batch(
                "INSERT INTO hstgrp (groupid, name) VALUES (1, 'Linux servers');
                 INSERT INTO hosts (hostid, host) VALUES (10, 'web01');
                 INSERT INTO hosts_groups (hostgroupid, hostid, groupid) VALUES (1, 10, 1);",
            )?;
            Ok(())
        })
        .unwrap();

    let cc = ConfigCache::new();
    dse::full_sync(&cc, &store).unwrap();
    assert_eq!(cc.hosts_in_group(1), vec![10]);

    store
        .with_conn(|conn| {
            conn.execute("DELETE FROM hosts_groups WHERE hostgroupid = 1", [])?;
            Ok(())
        })
        .unwrap();
    dse::full_sync(&cc, &store).unwrap();
    assert!(cc.hosts_in_group(1).is_empty());
}
