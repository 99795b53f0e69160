// Common data models for the generation pipeline

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Which provider job chain a task belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    Audio,
    Video,
}

impl JobKind {
    /// Sidecar file holding the most recent task id of this kind
    pub fn sidecar_file(&self) -> &'static str {
        match self {
            Self::Audio => "last_task_id.txt",
            Self::Video => "last_mp4_task_id.txt",
        }
    }

    /// CLI flag that resumes polling for this kind
    pub fn resume_flag(&self) -> &'static str {
        match self {
            Self::Audio => "--check-task",
            Self::Video => "--check-mp4-task",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "MP4"),
        }
    }
}

/// A submitted (or resumed) provider job. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub task_id: String,
    pub kind: JobKind,
    pub created_at: OffsetDateTime,
}

impl GenerationJob {
    pub fn new(task_id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            task_id: task_id.into(),
            kind,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Downloadable output located in a status response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedArtifact {
    pub url: String,
    /// Provider id needed to request a dependent job (audio id -> video job)
    pub id: Option<String>,
}

/// Outcome of a streamed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub success: bool,
    pub path: PathBuf,
    pub bytes: u64,
    pub attempts: u32,
}

/// Music model version accepted by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum MusicModel {
    #[default]
    #[serde(rename = "V3_5")]
    #[value(name = "V3_5")]
    V3_5,
    #[serde(rename = "V4")]
    #[value(name = "V4")]
    V4,
}

impl MusicModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V3_5 => "V3_5",
            Self::V4 => "V4",
        }
    }
}

impl fmt::Display for MusicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `POST /generate`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioJobRequest {
    pub prompt: String,
    pub style: String,
    pub title: String,
    pub custom_mode: bool,
    pub instrumental: bool,
    pub model: MusicModel,
    pub call_back_url: String,
}

impl AudioJobRequest {
    /// Non-custom mode leaves style and title to the provider.
    pub fn new(
        title: &str,
        lyrics: &str,
        style: &str,
        options: &AudioOptions,
        call_back_url: &str,
    ) -> Self {
        let (style, title) = if options.custom_mode {
            (style.to_string(), title.to_string())
        } else {
            (String::new(), String::new())
        };
        Self {
            prompt: lyrics.to_string(),
            style,
            title,
            custom_mode: options.custom_mode,
            instrumental: options.instrumental,
            model: options.model,
            call_back_url: call_back_url.to_string(),
        }
    }
}

/// Body of `POST /mp4/generate`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoJobRequest {
    pub task_id: String,
    pub audio_id: String,
    pub call_back_url: String,
}

/// Submission switches for an audio job
#[derive(Debug, Clone, Copy)]
pub struct AudioOptions {
    pub custom_mode: bool,
    pub instrumental: bool,
    pub model: MusicModel,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            custom_mode: true,
            instrumental: false,
            model: MusicModel::V3_5,
        }
    }
}

/// Generated lyrics split into title and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lyrics {
    pub title: String,
    pub content: String,
    pub full_text: String,
}

/// Input to the lyrics writer
#[derive(Debug, Clone)]
pub struct LyricsRequest {
    pub theme: String,
    pub style: Option<String>,
    pub verses: u32,
    pub chorus: bool,
}

/// Bounds for one polling loop
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(10),
        }
    }
}

/// Network settings shared by every provider client
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// SOCKS5 or HTTP proxy URL (e.g., "socks5://127.0.0.1:1080")
    pub proxy: Option<String>,

    /// Whole-request timeout for API calls
    pub timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Visualisation style for the local MP4 fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VisualMode {
    Waveform,
    Spectrum,
}

impl fmt::Display for VisualMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waveform => write!(f, "waveform"),
            Self::Spectrum => write!(f, "spectrum"),
        }
    }
}

/// Video stage switches
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub output: PathBuf,
    /// Render locally when the provider export fails
    pub fallback: Option<VisualMode>,
}

/// Everything needed for one "theme in, song out" run
#[derive(Debug, Clone)]
pub struct SongRequest {
    pub theme: String,
    pub style: String,
    pub verses: u32,
    pub chorus: bool,
    pub options: AudioOptions,
    pub audio_output: PathBuf,
    pub video: Option<VideoRequest>,
}

impl SongRequest {
    pub fn lyrics_request(&self) -> LyricsRequest {
        LyricsRequest {
            theme: self.theme.clone(),
            style: Some(self.style.clone()).filter(|s| !s.is_empty()),
            verses: self.verses,
            chorus: self.chorus,
        }
    }
}

/// How the video stage ended
#[derive(Debug)]
pub enum VideoOutcome {
    /// Provider MP4 downloaded
    Downloaded(DownloadResult),
    /// Provider export failed, rendered locally instead
    Rendered {
        path: PathBuf,
        mode: VisualMode,
        cause: super::errors::GenerationError,
    },
    Failed(super::errors::GenerationError),
    /// No audio id was recovered, so no video job could be requested
    Skipped,
}

/// Summary of a completed chain
#[derive(Debug)]
pub struct PipelineReport {
    /// Song title; unknown when resuming a task
    pub title: Option<String>,
    pub audio_job: GenerationJob,
    pub audio: DownloadResult,
    pub audio_id: Option<String>,
    pub video: Option<VideoOutcome>,
}
