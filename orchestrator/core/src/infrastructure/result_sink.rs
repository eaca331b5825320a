// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
// Result Sink - Durable output of the analysis verdicts
//
// Verdicts are flushed once, after analysis has completed. The file sink
// writes one verdict per line; the memory sink keeps them for inspection.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write results to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn flush(&self, results: &[String]) -> Result<(), SinkError>;
}

/// Writes every verdict on its own line, replacing any previous file.
#[derive(Debug, Clone)]
pub struct FileResultSink {
    path: PathBuf,
}

impl FileResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl ResultSink for FileResultSink {
    async fn flush(&self, results: &[String]) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let mut file = tokio::fs::File::create(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;

        let mut content = String::with_capacity(results.iter().map(|r| r.len() + 1).sum());
        for result in results {
            content.push_str(result);
            content.push('\n');
        }
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;

        info!("Wrote {} results to {:?}", results.len(), self.path);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryResultSink {
    flushed: Mutex<Vec<String>>,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<String> {
        self.flushed.lock().clone()
    }
}

#[async_trait]
impl ResultSink for MemoryResultSink {
    async fn flush(&self, results: &[String]) -> Result<(), SinkError> {
        let mut flushed = self.flushed.lock();
        flushed.clear();
        flushed.extend_from_slice(results);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_sink_writes_one_line_per_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("analysis_results.txt");
        let sink = FileResultSink::new(&path);

        let results = vec![
            "Optimal soil moisture at position (0, 1)".to_string(),
            "Critical: Too wet at position (1, 1)".to_string(),
        ];
        sink.flush(&results).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().collect::<Vec<_>>(), results);
        assert!(written.ends_with('\n'));
    }

    #[tokio::test]
    async fn file_sink_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileResultSink::new(dir.path());
        assert!(matches!(sink.flush(&[]).await, Err(SinkError::Io { .. })));
    }

    #[tokio::test]
    async fn memory_sink_keeps_last_flush() {
        let sink = MemoryResultSink::new();
        sink.flush(&["a".to_string()]).await.unwrap();
        sink.flush(&["b".to_string(), "c".to_string()]).await.unwrap();
        assert_eq!(sink.results(), vec!["b", "c"]);
    }
}
