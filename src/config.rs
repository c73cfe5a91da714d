use serde::Deserialize;
use std::path::Path;

/// Top-level config loaded from `zbx_core.toml`. Mirrors the flags spec.md §6
/// says the core consumes; defaults must survive a missing config file.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub program_type: ProgramType,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub syncer: SyncerConfig,
    #[serde(default)]
    pub exporter: ExporterConfig,
    #[serde(default = "default_db_path")]
    pub store_path: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            program_type: ProgramType::default(),
            cache: CacheConfig::default(),
            syncer: SyncerConfig::default(),
            exporter: ExporterConfig::default(),
            store_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "./zbx_core.db".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgramType {
    #[default]
    Server,
    ProxyActive,
    ProxyPassive,
}

impl ProgramType {
    pub fn is_server(self) -> bool {
        matches!(self, ProgramType::Server)
    }

    pub fn is_proxy(self) -> bool {
        !self.is_server()
    }
}

/// `HistoryCacheSize` / `HistoryIndexCacheSize` / `TrendCacheSize` /
/// `ValueCacheSize`, expressed as region byte budgets (spec §4.1).
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_history_cache_size")]
    pub history_cache_size: usize,
    #[serde(default = "default_history_index_cache_size")]
    pub history_index_cache_size: usize,
    #[serde(default = "default_trend_cache_size")]
    pub trend_cache_size: usize,
    #[serde(default = "default_value_cache_size")]
    pub value_cache_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            history_cache_size: default_history_cache_size(),
            history_index_cache_size: default_history_index_cache_size(),
            trend_cache_size: default_trend_cache_size(),
            value_cache_size: default_value_cache_size(),
        }
    }
}

fn default_history_cache_size() -> usize {
    16 * 1024 * 1024
}
fn default_history_index_cache_size() -> usize {
    4 * 1024 * 1024
}
fn default_trend_cache_size() -> usize {
    4 * 1024 * 1024
}
fn default_value_cache_size() -> usize {
    8 * 1024 * 1024
}

/// `StartDBSyncers` and the tunables from spec §4.5.3/§5.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncerConfig {
    #[serde(default = "default_start_db_syncers")]
    pub start_db_syncers: usize,
    #[serde(default = "default_batch_max")]
    pub batch_max: usize,
    #[serde(default = "default_sync_time_max_secs")]
    pub sync_time_max_secs: u64,
    #[serde(default = "default_sync_min_pcnt")]
    pub sync_min_pcnt: f64,
    /// Minute-of-hour at which trend cleanup is allowed to run even if the
    /// hour hasn't rolled over yet (`TRENDS_CLEANUP_TIME`, spec §4.5.5).
    #[serde(default = "default_trends_cleanup_minute")]
    pub trends_cleanup_minute: u32,
}

impl Default for SyncerConfig {
    fn default() -> Self {
        Self {
            start_db_syncers: default_start_db_syncers(),
            batch_max: default_batch_max(),
            sync_time_max_secs: default_sync_time_max_secs(),
            sync_min_pcnt: default_sync_min_pcnt(),
            trends_cleanup_minute: default_trends_cleanup_minute(),
        }
    }
}

fn default_start_db_syncers() -> usize {
    4
}
fn default_batch_max() -> usize {
    256
}
fn default_sync_time_max_secs() -> u64 {
    10
}
fn default_sync_min_pcnt() -> f64 {
    0.10
}
fn default_trends_cleanup_minute() -> u32 {
    55
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_exporter_path")]
    pub path: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_exporter_path(),
        }
    }
}

fn default_exporter_path() -> String {
    "./export".to_string()
}

impl CoreConfig {
    /// Load config from a TOML file. Returns defaults if the file doesn't exist,
    /// same contract as the teacher's `WideConfig::load`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: CoreConfig = toml::from_str(&contents)?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }
}
