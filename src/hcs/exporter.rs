//! History/trend export (spec §4.5.6). The external sink is a collaborator
//! behind a trait, same shape as `triggers_eval::TriggerEvaluator`; this
//! crate ships a null sink and a newline-delimited-JSON file sink as the
//! two reference implementations.

use crate::cc::model::Id;
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    pub itemid: Id,
    pub clock: i64,
    pub ns: i64,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendRecord {
    pub itemid: Id,
    pub clock: i64,
    pub num: i64,
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export_history(&self, record: HistoryRecord) -> anyhow::Result<()>;
    async fn export_trend(&self, record: TrendRecord) -> anyhow::Result<()>;
    /// Called once per syncer cycle after a batch has been committed (spec
    /// §4.5.3 step 8); sinks that buffer writes should flush here.
    async fn flush(&self) -> anyhow::Result<()>;
}

pub struct NullExporter;

#[async_trait]
impl Exporter for NullExporter {
    async fn export_history(&self, _record: HistoryRecord) -> anyhow::Result<()> {
        Ok(())
    }

    async fn export_trend(&self, _record: TrendRecord) -> anyhow::Result<()> {
        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Appends one JSON object per line to a file, the same record shape the
/// reference's file-export feature documents (spec §4.5.6). `file` is
/// behind a blocking `Mutex` since export volume here is orders of
/// magnitude below the ingest hot path.
pub struct FileExporter {
    file: Mutex<std::fs::File>,
}

impl FileExporter {
    pub fn open(path: &str) -> anyhow::Result<Self> {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }

    fn write_line(&self, line: &str) -> anyhow::Result<()> {
        let mut f = self.file.lock().unwrap();
        f.write_all(line.as_bytes())?;
        f.write_all(b"\n")?;
        Ok(())
    }
}

#[async_trait]
impl Exporter for FileExporter {
    async fn export_history(&self, record: HistoryRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(&record)?;
        self.write_line(&line)
    }

    async fn export_trend(&self, record: TrendRecord) -> anyhow::Result<()> {
        let line = serde_json::to_string(&record)?;
        self.write_line(&line)
    }

    async fn flush(&self) -> anyhow::Result<()> {
        self.file.lock().unwrap().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_exporter_appends_newline_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.ndjson");
        let exporter = FileExporter::open(path.to_str().unwrap()).unwrap();
        exporter
            .export_history(HistoryRecord {
                itemid: 1,
                clock: 100,
                ns: 0,
                value: serde_json::json!(1.5),
            })
            .await
            .unwrap();
        exporter.flush().await.unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("\"itemid\":1"));
    }

    #[tokio::test]
    async fn null_exporter_never_fails() {
        let exporter = NullExporter;
        exporter
            .export_trend(TrendRecord {
                itemid: 1,
                clock: 0,
                num: 1,
                min: 0.0,
                avg: 0.0,
                max: 0.0,
            })
            .await
            .unwrap();
    }
}
