// Provider seams: lyrics writers and job status sources

use async_trait::async_trait;
use serde_json::Value;

use super::errors::GenerationError;
use super::models::{JobKind, Lyrics, LyricsRequest};

/// Trait for lyrics generator implementations
#[async_trait]
pub trait LyricsWriter: Send + Sync {
    /// Name of the writer (for logging)
    fn name(&self) -> &'static str;

    async fn write_lyrics(&self, request: &LyricsRequest) -> Result<Lyrics, GenerationError>;
}

/// Trait for anything that can report a job's raw status document
#[async_trait]
pub trait StatusSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Job kind whose status vocabulary applies to the returned documents
    fn kind(&self) -> JobKind;

    /// Fetch the current status document for `task_id`.
    ///
    /// The poller retries errors that report `is_transient()` and stops on the rest.
    async fn check_status(&self, task_id: &str) -> Result<Value, GenerationError>;
}
