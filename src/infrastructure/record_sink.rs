//! Record sinks: JSON Lines to a file or stdout, and an in-memory collector

use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::debug;

use crate::domain::{GameRecord, RecordSink, SinkError};

/// One JSON object per line, written as records arrive
pub struct JsonLinesSink {
    writer: BufWriter<Box<dyn AsyncWrite + Send + Unpin>>,
    written: u64,
}

impl JsonLinesSink {
    pub fn new(writer: Box<dyn AsyncWrite + Send + Unpin>) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(tokio::io::stdout()))
    }

    /// Create or truncate the file at `path`
    pub async fn create(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(path).await?;
        debug!(path = %path.display(), "writing records to file");
        Ok(Self::new(Box::new(file)))
    }

    pub const fn written(&self) -> u64 {
        self.written
    }
}

#[async_trait]
impl RecordSink for JsonLinesSink {
    async fn accept(&mut self, record: &GameRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record).map_err(|source| SinkError::Serialization {
            id: record.id,
            source,
        })?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.written += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Keeps every accepted record in memory
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    records: Vec<GameRecord>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<GameRecord> {
        self.records
    }
}

#[async_trait]
impl RecordSink for MemoryRecordSink {
    async fn accept(&mut self, record: &GameRecord) -> Result<(), SinkError> {
        self.records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, title: &str) -> GameRecord {
        GameRecord {
            id,
            title: title.to_string(),
            description: String::new(),
            num_reviews: None,
            release_date: None,
            specs: Vec::new(),
            tags: vec!["Puzzle".to_string()],
            price: 0,
            system_requirements: None,
        }
    }

    #[tokio::test]
    async fn writes_one_json_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("games.jsonl");

        let mut sink = JsonLinesSink::create(&path).await.unwrap();
        sink.accept(&record(620, "Portal 2")).await.unwrap();
        sink.accept(&record(400, "Portal")).await.unwrap();
        sink.flush().await.unwrap();
        assert_eq!(sink.written(), 2);

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], 620);
        assert_eq!(first["title"], "Portal 2");
        assert!(first["numReviews"].is_null());
        assert_eq!(first["tags"][0], "Puzzle");

        let second: GameRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second, record(400, "Portal"));
    }

    #[tokio::test]
    async fn stdout_sink_starts_empty() {
        let mut sink = JsonLinesSink::stdout();
        sink.flush().await.unwrap();
        assert_eq!(sink.written(), 0);
    }

    #[tokio::test]
    async fn memory_sink_keeps_order() {
        let mut sink = MemoryRecordSink::new();
        sink.accept(&record(2, "b")).await.unwrap();
        sink.accept(&record(1, "a")).await.unwrap();
        sink.flush().await.unwrap();

        let ids: Vec<u64> = sink.records().iter().map(|r| r.id).collect();
        assert_eq!(ids, [2, 1]);
    }
}
