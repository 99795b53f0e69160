// Generator module - lyrics, music and video job pipeline

pub mod client;
pub mod download;
pub mod errors;
pub mod extract;
pub mod lyrics;
pub mod models;
pub mod orchestrator;
pub mod poller;
pub mod status;
pub mod store;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{build_http_client, MusicClient};
pub use download::{Downloader, RetryPolicy};
pub use errors::GenerationError;
pub use lyrics::AnthropicLyricsWriter;
pub use models::{
    AudioOptions, DownloadResult, GenerationJob, JobKind, MusicModel, PipelineReport,
    PollSettings, SongRequest, VideoOutcome, VideoRequest, VisualMode,
};
pub use orchestrator::Orchestrator;
pub use store::TaskStore;
pub use traits::{LyricsWriter, StatusSource};
