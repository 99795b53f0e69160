// Fallback renderer - local waveform/spectrum MP4 built with ffmpeg
//
// ffmpeg decodes the audio to mono f32 PCM on stdout; frames are drawn
// in-process and piped back to a second ffmpeg that muxes the original
// audio track.

pub mod frames;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread;

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use tracing::{debug, info, warn};

use crate::generator::errors::GenerationError;
pub use crate::generator::models::VisualMode;

/// Decode sample rate for analysis
pub const SAMPLE_RATE: u32 = 22_050;
pub const DEFAULT_FPS: u32 = 30;

/// Input to [`render_visualization`]
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub audio: PathBuf,
    pub output: PathBuf,
    pub mode: VisualMode,
    pub title: Option<String>,
    pub style: Option<String>,
    pub fps: u32,
}

impl RenderRequest {
    pub fn new(audio: impl Into<PathBuf>, output: impl Into<PathBuf>, mode: VisualMode) -> Self {
        Self {
            audio: audio.into(),
            output: output.into(),
            mode,
            title: None,
            style: None,
            fps: DEFAULT_FPS,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_style(mut self, style: Option<String>) -> Self {
        self.style = style.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// `"<title> (<style> style)"`, or just the title
    pub fn display_title(&self) -> Option<String> {
        let title = self.title.as_deref()?;
        Some(match self.style.as_deref() {
            Some(style) => format!("{} ({} style)", title, style),
            None => title.to_string(),
        })
    }
}

/// Frame layout derived from the decoded audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePlan {
    pub frames: usize,
    pub segment: usize,
}

impl FramePlan {
    /// `frames = floor(duration * fps)`, `segment = samples / frames`
    pub fn new(samples: usize, sample_rate: u32, fps: u32) -> Result<Self, GenerationError> {
        if samples == 0 {
            return Err(GenerationError::Render("audio decoded to zero samples".to_string()));
        }
        if fps == 0 {
            return Err(GenerationError::Render("fps must be positive".to_string()));
        }
        let frames = (samples as u64 * fps as u64 / sample_rate as u64) as usize;
        if frames == 0 {
            return Err(GenerationError::Render(format!(
                "audio too short for one frame at {} fps",
                fps
            )));
        }
        Ok(Self {
            frames,
            segment: samples / frames,
        })
    }
}

/// Render `request` on the blocking pool
pub async fn render_visualization(request: &RenderRequest) -> Result<PathBuf, GenerationError> {
    let request = request.clone();
    tokio::task::spawn_blocking(move || render_blocking(&request))
        .await
        .map_err(|e| GenerationError::Render(format!("render task failed: {}", e)))?
}

fn render_blocking(request: &RenderRequest) -> Result<PathBuf, GenerationError> {
    if !request.audio.is_file() {
        return Err(GenerationError::Render(format!(
            "audio file not found: {}",
            request.audio.display()
        )));
    }
    info!(
        "[Render] Building {} video for {}",
        request.mode,
        request.audio.display()
    );

    let samples = decode_mono(&request.audio)?;
    let plan = FramePlan::new(samples.len(), SAMPLE_RATE, request.fps)?;
    info!(
        "[Render] {} samples -> {} frames at {} fps",
        samples.len(),
        plan.frames,
        request.fps
    );

    if let Some(parent) = request.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    match encode(request, &samples, plan, true) {
        Ok(()) => {}
        Err(e) if request.display_title().is_some() => {
            warn!("[Render] Caption could not be drawn ({}); encoding without it", e);
            encode(request, &samples, plan, false)?;
        }
        Err(e) => return Err(e),
    }

    info!("[Render] ✓ MP4 written to {}", request.output.display());
    Ok(request.output.clone())
}

/// Decode any audio file to mono f32le at [`SAMPLE_RATE`]
fn decode_mono(audio: &Path) -> Result<Vec<f32>, GenerationError> {
    let mut child = FfmpegCommand::new()
        .hide_banner()
        .args(["-loglevel", "error", "-nostats"])
        .input(audio)
        .args(["-vn", "-f", "f32le", "-acodec", "pcm_f32le", "-ac", "1", "-ar"])
        .arg(SAMPLE_RATE.to_string())
        .output("-")
        .spawn()
        .map_err(|e| GenerationError::Render(format!("failed to start ffmpeg: {}", e)))?;

    let stderr = drain_stderr(&mut child);
    let mut stdout = child
        .take_stdout()
        .ok_or_else(|| GenerationError::Render("ffmpeg stdout unavailable".to_string()))?;

    let mut raw = Vec::new();
    stdout.read_to_end(&mut raw)?;
    finish(child, stderr, "decode")?;

    Ok(raw
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// `captioned` draws the display title across the top of every frame
fn encode(
    request: &RenderRequest,
    samples: &[f32],
    plan: FramePlan,
    captioned: bool,
) -> Result<(), GenerationError> {
    let size = format!("{}x{}", frames::WIDTH, frames::HEIGHT);
    let fps = request.fps.to_string();

    let mut command = FfmpegCommand::new();
    command
        .hide_banner()
        .overwrite()
        .args(["-loglevel", "error", "-nostats"])
        .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s", size.as_str(), "-r", fps.as_str()])
        .input("-")
        .input(&request.audio)
        .args(["-map", "0:v:0", "-map", "1:a:0"])
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-c:a", "aac", "-shortest"]);
    if let Some(title) = request.display_title() {
        if captioned {
            command.args(["-vf".to_string(), caption_filter(&title)]);
        }
        command.args(["-metadata".to_string(), format!("title={}", title)]);
    }
    command.output(&request.output);

    let mut child = command
        .spawn()
        .map_err(|e| GenerationError::Render(format!("failed to start ffmpeg: {}", e)))?;
    let stderr = drain_stderr(&mut child);
    let mut stdin = child
        .take_stdin()
        .ok_or_else(|| GenerationError::Render("ffmpeg stdin unavailable".to_string()))?;

    for index in 0..plan.frames {
        let frame = match request.mode {
            VisualMode::Waveform => frames::draw_waveform_frame(samples, index, plan.segment),
            VisualMode::Spectrum => frames::draw_spectrum_frame(samples, index, plan.segment),
        };
        if let Err(e) = stdin.write_all(frame.as_raw()) {
            drop(stdin);
            let _ = finish(child, stderr, "encode");
            return Err(GenerationError::Render(format!(
                "ffmpeg stopped accepting frames at {}/{}: {}",
                index, plan.frames, e
            )));
        }
        if index % (request.fps as usize * 10).max(1) == 0 {
            debug!("[Render] frame {}/{}", index, plan.frames);
        }
    }
    drop(stdin);
    finish(child, stderr, "encode")
}

/// `drawtext` filter centring `caption` near the top edge
fn caption_filter(caption: &str) -> String {
    format!(
        "drawtext=expansion=none:text={}:fontcolor=white:fontsize=32:x=(w-text_w)/2:y=36",
        escape_filter_text(caption)
    )
}

/// Escape for the option parser, then again for the filtergraph parser
fn escape_filter_text(text: &str) -> String {
    fn escape(input: &str, special: &[char]) -> String {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            if special.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }
    let option_level = escape(text, &['\\', '\'', ':']);
    escape(&option_level, &['\\', '\'', '[', ']', ',', ';'])
}

/// Read stderr on a thread so ffmpeg never blocks on a full pipe
fn drain_stderr(child: &mut FfmpegChild) -> Option<thread::JoinHandle<String>> {
    let mut stderr = child.take_stderr()?;
    Some(thread::spawn(move || {
        let mut text = String::new();
        let _ = stderr.read_to_string(&mut text);
        text
    }))
}

fn finish(
    mut child: FfmpegChild,
    stderr: Option<thread::JoinHandle<String>>,
    stage: &str,
) -> Result<(), GenerationError> {
    let status = child.wait()?;
    let log = stderr
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    if status.success() {
        return Ok(());
    }
    Err(GenerationError::Render(format!(
        "ffmpeg {} exited with {}: {}",
        stage,
        status,
        log.trim()
    )))
}
