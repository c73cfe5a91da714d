use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use zbx_core::cc::ConfigCache;
use zbx_core::collector::{Collector, DirectCollector};
use zbx_core::config::CoreConfig;
use zbx_core::dse;
use zbx_core::events::EventBus;
use zbx_core::hcs::{self, triggers_eval::EvalResult, triggers_eval::TriggerEvaluator};
use zbx_core::sa::{Region, RegionKind};
use zbx_core::stats::{self, StatsState};
use zbx_core::store::Store;

/// No real expression parser ships with this core (spec §1 Non-goal); this
/// stand-in always reports UNKNOWN so the recovery-mode state machine has a
/// harmless default until a real evaluator is wired in.
struct UnimplementedEvaluator;

#[async_trait::async_trait]
impl TriggerEvaluator for UnimplementedEvaluator {
    async fn eval_expression(&self, _expression: &str) -> EvalResult {
        EvalResult::Unknown("no expression evaluator configured".to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("zbx_core=info,tower_http=info")
        }))
        .init();

    let config_path = std::env::var("ZBX_CORE_CONFIG").unwrap_or_else(|_| "./zbx_core.toml".to_string());
    let config = CoreConfig::load(&config_path)?;
    tracing::info!(program_type = ?config.program_type, "starting zbx-core");

    let store = Arc::new(Store::open(&config.store_path)?);
    let cc = Arc::new(ConfigCache::new());

    tracing::info!("running initial full configuration sync");
    let applied = dse::full_sync(&cc, &store)?;
    tracing::info!(applied, "initial sync complete");

    dse::spawn(cc.clone(), store.clone(), 60);

    let handles = hcs::build(&config);

    // Trapper-style values (pushed rather than polled) feed the history
    // buffer through this in-process collector; a real probe-protocol
    // collector would be wired the same way (spec §1 Non-goal).
    let (trapper, _trapper_tx) = DirectCollector::new();
    let trapper_buffer = handles.buffer.clone();
    tokio::spawn(async move {
        if let Err(e) = trapper.run(trapper_buffer).await {
            tracing::error!("trapper collector stopped: {e}");
        }
    });

    let (events, _events_rx) = EventBus::new();
    hcs::spawn_syncers(
        &config,
        cc.clone(),
        store.clone(),
        &handles,
        Arc::new(UnimplementedEvaluator),
        events,
    )?;

    let history_index_region = Arc::new(Region::new(
        RegionKind::HistoryIndex,
        config.cache.history_index_cache_size,
    ));
    let trends_region = Arc::new(Region::new(RegionKind::Trends, config.cache.trend_cache_size));

    let stats_state = StatsState {
        cc,
        history_index: handles.index.clone(),
        trends: handles.trends.clone(),
        history_region: handles.history_region.clone(),
        history_index_region,
        trends_region,
    };
    let app = stats::router(stats_state);

    let addr: SocketAddr = std::env::var("ZBX_CORE_LISTEN")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 10051)));
    tracing::info!("stats surface listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
