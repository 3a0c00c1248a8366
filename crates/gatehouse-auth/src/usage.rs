//! Append-only usage log
//!
//! Every tool call produces one record. Records queue in a bounded
//! in-memory buffer and a background task appends them to a JSONL
//! file; when the buffer is full the oldest record is dropped so a
//! stalled disk never blocks request handling.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jiff::Timestamp;
use serde::Serialize;
use tokio::io::AsyncWriteExt as _;
use tracing::warn;

use gatehouse_config::UsageLogConfig;

/// One logged tool call
#[derive(Debug, Clone, Serialize)]
pub struct UsageRecord {
    pub timestamp: Timestamp,
    pub api_key_id: i64,
    pub api_key_name: String,
    pub member_id: i64,
    /// Server slug the call resolved to
    pub server: String,
    pub tool: String,
    /// JSON-RPC method that carried the call
    pub method: String,
    pub session_id: Option<String>,
    pub duration_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handle for recording usage events
#[derive(Clone)]
pub struct UsageLogger {
    buffer: Arc<Mutex<VecDeque<UsageRecord>>>,
    capacity: usize,
}

impl UsageLogger {
    /// Spawn the background flusher and return the recording handle
    #[must_use]
    pub fn spawn(config: &UsageLogConfig) -> Self {
        let logger = Self::bounded(config.buffer);
        tokio::spawn(flush_loop(
            logger.clone(),
            config.path.clone(),
            Duration::from_secs(config.flush_interval),
        ));
        logger
    }

    fn bounded(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    /// Queue a record, evicting the oldest if the buffer is full
    pub fn record(&self, record: UsageRecord) {
        let mut buffer = self.buffer.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(record);
    }

    /// Take everything queued so far
    fn drain(&self) -> Vec<UsageRecord> {
        let mut buffer = self.buffer.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        buffer.drain(..).collect()
    }
}

async fn flush_loop(logger: UsageLogger, path: PathBuf, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let records = logger.drain();
        if records.is_empty() {
            continue;
        }

        let count = records.len();
        if let Err(e) = append_jsonl(&path, records).await {
            warn!(error = %e, count, path = %path.display(), "failed to flush usage log");
        }
    }
}

async fn append_jsonl(path: &Path, records: Vec<UsageRecord>) -> std::io::Result<()> {
    let mut lines = String::new();
    for record in records {
        // Serializing our own struct cannot fail
        lines.push_str(&serde_json::to_string(&record).unwrap_or_default());
        lines.push('\n');
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(lines.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tool: &str) -> UsageRecord {
        UsageRecord {
            timestamp: Timestamp::now(),
            api_key_id: 1,
            api_key_name: "test".to_string(),
            member_id: 7,
            server: "gatehouse".to_string(),
            tool: tool.to_string(),
            method: "tools/call".to_string(),
            session_id: None,
            duration_ms: 3,
            success: true,
            error: None,
        }
    }

    #[test]
    fn full_buffer_drops_the_oldest_record() {
        let logger = UsageLogger::bounded(2);
        logger.record(record("first"));
        logger.record(record("second"));
        logger.record(record("third"));

        let drained = logger.drain();
        let tools: Vec<&str> = drained.iter().map(|r| r.tool.as_str()).collect();
        assert_eq!(tools, vec!["second", "third"]);
    }

    #[test]
    fn drain_empties_the_buffer() {
        let logger = UsageLogger::bounded(8);
        logger.record(record("only"));
        assert_eq!(logger.drain().len(), 1);
        assert!(logger.drain().is_empty());
    }

    #[tokio::test]
    async fn records_land_in_the_file_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.jsonl");

        append_jsonl(&path, vec![record("a"), record("b")]).await.unwrap();
        append_jsonl(&path, vec![record("c")]).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        let parsed: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(parsed["tool"], "c");
    }
}
