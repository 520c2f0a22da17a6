//! Output port for accepted records

use async_trait::async_trait;
use thiserror::Error;

use super::game::GameRecord;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("I/O error while writing record: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record {id}: {source}")]
    Serialization {
        id: u64,
        #[source]
        source: serde_json::Error,
    },
}

/// Receives accepted records one at a time, as they are assembled
#[async_trait]
pub trait RecordSink: Send {
    async fn accept(&mut self, record: &GameRecord) -> Result<(), SinkError>;

    /// Flush buffered output. Called once when the harvest ends.
    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
