//! Operator-facing stats surface (spec §9: "the `stats` surface must
//! remain" even though SA's regions are plain counters here, not real
//! shared memory). Mirrors the teacher's `AppState` + `Router` shape, scaled
//! down to the handful of read-only routes this core exposes.

use crate::cc::{CacheCounts, ConfigCache};
use crate::hcs::index::HistoryIndex;
use crate::hcs::trends::TrendIndex;
use crate::sa::{Region, RegionStats};
use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct StatsState {
    pub cc: Arc<ConfigCache>,
    pub history_index: Arc<HistoryIndex>,
    pub trends: Arc<TrendIndex>,
    pub history_region: Arc<Region>,
    pub history_index_region: Arc<Region>,
    pub trends_region: Arc<Region>,
}

#[derive(Serialize)]
struct StatsResponse {
    cache: CacheCounts,
    history_index_items: usize,
    history_dispatch_heap_len: usize,
    trend_items: usize,
    regions: RegionsResponse,
}

#[derive(Serialize)]
struct RegionsResponse {
    history_values: RegionStats,
    history_index: RegionStats,
    trends: RegionStats,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn stats(State(state): State<StatsState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.cc.counts(),
        history_index_items: state.history_index.item_count(),
        history_dispatch_heap_len: state.history_index.heap_len(),
        trend_items: state.trends.len(),
        regions: RegionsResponse {
            history_values: state.history_region.stats(),
            history_index: state.history_index_region.stats(),
            trends: state.trends_region.stats(),
        },
    })
}

pub fn router(state: StatsState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
