//! History Cache & Syncer (spec §4.5): the hot path. `ingest` is the
//! collector-facing entry point, `index` is the shared dispatch structure,
//! `syncer` is the batch pipeline that drains it, `trends`/`normalize`/
//! `triggers_eval`/`exporter` are its supporting pieces.

pub mod exporter;
pub mod ingest;
pub mod index;
pub mod normalize;
pub mod syncer;
pub mod trends;
pub mod triggers_eval;
pub mod value;

use crate::cc::ConfigCache;
use crate::config::CoreConfig;
use crate::events::EventBus;
use crate::sa::{Region, RegionKind};
use crate::store::Store;
use exporter::{Exporter, FileExporter, NullExporter};
use index::HistoryIndex;
use std::sync::Arc;
use syncer::Syncer;
use trends::TrendIndex;
use triggers_eval::TriggerEvaluator;

/// Everything the ingest path and the syncer workers share, built once at
/// startup (spec §4.1 regions, §4.5.2 index, §4.5.5 trends).
pub struct HcsHandles {
    pub index: Arc<HistoryIndex>,
    pub trends: Arc<TrendIndex>,
    pub history_region: Arc<Region>,
    pub buffer: Arc<ingest::HistoryBuffer>,
}

pub fn build(config: &CoreConfig) -> HcsHandles {
    let index = Arc::new(HistoryIndex::new());
    let trends = Arc::new(TrendIndex::new());
    let history_region = Arc::new(Region::new(
        RegionKind::HistoryValues,
        config.cache.history_cache_size,
    ));
    let buffer = Arc::new(ingest::HistoryBuffer::new(history_region.clone(), index.clone()));
    HcsHandles {
        index,
        trends,
        history_region,
        buffer,
    }
}

fn build_exporter(config: &CoreConfig) -> anyhow::Result<Arc<dyn Exporter>> {
    if config.exporter.enabled {
        Ok(Arc::new(FileExporter::open(&config.exporter.path)?))
    } else {
        Ok(Arc::new(NullExporter))
    }
}

/// Spawn `StartDBSyncers` syncer workers sharing one `Syncer` pipeline
/// (spec §5 "configurable number of syncer workers").
pub fn spawn_syncers(
    config: &CoreConfig,
    cc: Arc<ConfigCache>,
    store: Arc<Store>,
    handles: &HcsHandles,
    evaluator: Arc<dyn TriggerEvaluator>,
    events: EventBus,
) -> anyhow::Result<()> {
    let exporter = build_exporter(config)?;
    let syncer = Arc::new(Syncer {
        cc,
        store,
        index: handles.index.clone(),
        trends: handles.trends.clone(),
        region: handles.history_region.clone(),
        exporter,
        evaluator,
        events,
        config: config.syncer.clone(),
        program_type: config.program_type,
    });
    syncer::spawn(syncer, config.syncer.start_db_syncers);
    Ok(())
}

/// Shutdown full-sync variant (spec §4.5.3 last paragraph): drain whatever
/// remains in the index through one uncapped cycle, ignoring the
/// `SYNC_TIME_MAX`/`SYNC_MIN_PCNT` early-exit so nothing is left behind.
pub async fn drain_on_shutdown(syncer: &Syncer) {
    while syncer.run_cycle().await.is_some() {}
    let remaining = syncer.region.stats().used;
    if remaining > 0 {
        syncer.region.free(remaining as usize);
    }
}
