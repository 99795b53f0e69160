// Command-line surface

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::generator::models::{
    AudioOptions, MusicModel, PollSettings, SongRequest, VideoRequest, VisualMode,
};
use crate::render::{RenderRequest, DEFAULT_FPS};

/// Default output for `--check-mp4-task` when `--mp4-output` is not given
pub const DEFAULT_MP4_OUTPUT: &str = "output.mp4";

#[derive(Debug, Parser)]
#[command(
    name = "songforge",
    version,
    about = "Generate lyrics and music with AI, then optionally export an MP4"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Theme or idea for the song
    #[arg(long)]
    pub theme: Option<String>,

    /// Music style (e.g., rock, pop, rap)
    #[arg(long, default_value = "pop")]
    pub style: String,

    /// Number of verses
    #[arg(long, default_value_t = 2)]
    pub verses: u32,

    /// Include a chorus
    #[arg(long)]
    pub chorus: bool,

    /// Let the provider pick style and title
    #[arg(long)]
    pub no_custom: bool,

    /// Generate instrumental music (no lyrics)
    #[arg(long)]
    pub instrumental: bool,

    #[arg(long, value_enum, default_value_t = MusicModel::V3_5)]
    pub model: MusicModel,

    /// Output file path
    #[arg(long, default_value = "output.mp3")]
    pub output: PathBuf,

    /// Verbose logging
    #[arg(long)]
    pub debug: bool,

    /// Maximum number of status checks
    #[arg(long, default_value_t = 30)]
    pub checks: u32,

    /// Seconds between status checks
    #[arg(long, default_value_t = 10)]
    pub interval: u64,

    /// Resume an audio task; without an id the last saved one is used
    #[arg(long, value_name = "TASK_ID", num_args = 0..=1)]
    pub check_task: Option<Option<String>>,

    /// Export an MP4 after the audio is ready
    #[arg(long)]
    pub generate_mp4: bool,

    /// MP4 path (defaults to the audio path with an .mp4 extension)
    #[arg(long)]
    pub mp4_output: Option<PathBuf>,

    /// Resume an MP4 task; without an id the last saved one is used
    #[arg(long, value_name = "TASK_ID", num_args = 0..=1)]
    pub check_mp4_task: Option<Option<String>>,

    /// Render a local visualisation if the provider MP4 export fails
    #[arg(long, value_enum)]
    pub fallback_visual: Option<VisualMode>,

    /// Directory holding the last task id files
    #[arg(long, env = "SONGFORGE_STATE_DIR", default_value = ".")]
    pub state_dir: PathBuf,

    /// SOCKS5 or HTTP proxy URL
    #[arg(long)]
    pub proxy: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a waveform or spectrum MP4 from a local audio file
    Visualize(VisualizeArgs),
}

#[derive(Debug, clap::Args)]
pub struct VisualizeArgs {
    #[arg(long)]
    pub audio: PathBuf,

    /// Defaults to the audio path with an .mp4 extension
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub style: Option<String>,

    #[arg(long = "type", value_enum, default_value_t = VisualMode::Spectrum)]
    pub mode: VisualMode,

    #[arg(long, default_value_t = DEFAULT_FPS)]
    pub fps: u32,
}

impl VisualizeArgs {
    pub fn render_request(&self) -> RenderRequest {
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| mp4_path_for(&self.audio));
        RenderRequest::new(&self.audio, output, self.mode)
            .with_title(self.title.clone())
            .with_style(self.style.clone())
            .with_fps(self.fps)
    }
}

/// `song.mp3` -> `song.mp4`
pub fn mp4_path_for(audio: &Path) -> PathBuf {
    audio.with_extension("mp4")
}

impl Cli {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            max_attempts: self.checks,
            interval: Duration::from_secs(self.interval),
        }
    }

    pub fn audio_options(&self) -> AudioOptions {
        AudioOptions {
            custom_mode: !self.no_custom,
            instrumental: self.instrumental,
            model: self.model,
        }
    }

    /// Video stage for an audio run, if `--generate-mp4` was given
    pub fn video_request(&self) -> Option<VideoRequest> {
        if !self.generate_mp4 {
            return None;
        }
        Some(VideoRequest {
            output: self
                .mp4_output
                .clone()
                .unwrap_or_else(|| mp4_path_for(&self.output)),
            fallback: self.fallback_visual,
        })
    }

    /// Output for `--check-mp4-task`
    pub fn resume_video_output(&self) -> PathBuf {
        self.mp4_output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MP4_OUTPUT))
    }

    /// Lyrics are only needed for a fresh, non-instrumental run
    pub fn needs_lyrics(&self) -> bool {
        self.command.is_none()
            && self.check_task.is_none()
            && self.check_mp4_task.is_none()
            && !self.instrumental
    }

    pub fn song_request(&self, theme: String) -> SongRequest {
        SongRequest {
            theme,
            style: self.style.clone(),
            verses: self.verses,
            chorus: self.chorus,
            options: self.audio_options(),
            audio_output: self.output.clone(),
            video: self.video_request(),
        }
    }

    /// Explicit `RUST_LOG` takes precedence over this
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "songforge=debug,songforge_lib=debug"
        } else {
            "info"
        }
    }
}
