// Orchestrator - sequences lyrics, audio and video stages with recovery

use std::path::Path;

use tracing::{info, warn};

use super::client::MusicClient;
use super::download::Downloader;
use super::errors::GenerationError;
use super::lyrics::capitalize_theme;
use super::models::{
    AudioJobRequest, DownloadResult, ExtractedArtifact, GenerationJob, JobKind, PipelineReport,
    PollSettings, SongRequest, VideoOutcome, VideoRequest,
};
use super::poller::{JobPoller, PollOutcome};
use super::store::TaskStore;
use super::traits::{LyricsWriter, StatusSource};
use crate::render::{render_visualization, RenderRequest};

pub struct Orchestrator {
    lyrics: Option<Box<dyn LyricsWriter>>,
    music: MusicClient,
    audio_status: Box<dyn StatusSource>,
    video_status: Box<dyn StatusSource>,
    downloader: Downloader,
    store: TaskStore,
    poller: JobPoller,
}

/// Title and style carried into the local render
struct SongLabel<'a> {
    title: Option<&'a str>,
    style: Option<&'a str>,
}

impl Orchestrator {
    pub fn new(music: MusicClient, downloader: Downloader, store: TaskStore) -> Self {
        let poller = JobPoller::new(PollSettings::default(), music.settings().file_host.clone());
        Self {
            lyrics: None,
            audio_status: Box::new(music.status_source(JobKind::Audio)),
            video_status: Box::new(music.status_source(JobKind::Video)),
            music,
            downloader,
            store,
            poller,
        }
    }

    pub fn with_lyrics_writer(mut self, writer: Box<dyn LyricsWriter>) -> Self {
        self.lyrics = Some(writer);
        self
    }

    pub fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.poller = JobPoller::new(settings, self.music.settings().file_host.clone());
        self
    }

    /// Run the whole chain for a new song.
    ///
    /// Stops at the first failing stage before the video stage; a failing
    /// video stage is reported in the result and never retries audio.
    pub async fn run(&self, request: SongRequest) -> Result<PipelineReport, GenerationError> {
        let (title, content) = if request.options.instrumental {
            info!("[Orchestrator] Instrumental requested, theme used as prompt");
            (capitalize_theme(&request.theme), request.theme.clone())
        } else {
            let writer = self.lyrics.as_ref().ok_or(GenerationError::LyricsUnavailable)?;
            info!(
                "[Orchestrator] Generating lyrics about '{}' in {} style via {}",
                request.theme,
                request.style,
                writer.name()
            );
            let lyrics = writer.write_lyrics(&request.lyrics_request()).await?;
            println!("\nGenerated title: {}", lyrics.title);
            println!("Generated lyrics:");
            println!("{}", "-".repeat(40));
            println!("{}", lyrics.content);
            println!("{}", "-".repeat(40));
            (lyrics.title, lyrics.content)
        };

        let submit = AudioJobRequest::new(
            &title,
            &content,
            &request.style,
            &request.options,
            &self.music.settings().callback_url,
        );
        let job = self.music.submit_audio_job(&submit).await?;
        self.persist(&job);

        let label = SongLabel {
            title: Some(&title),
            style: Some(&request.style),
        };
        self.finish_audio(job, &request.audio_output, request.video.as_ref(), &label)
            .await
    }

    /// Resume an audio task by explicit id or from the audio sidecar
    pub async fn resume_audio(
        &self,
        task_id: Option<String>,
        audio_output: &Path,
        video: Option<&VideoRequest>,
    ) -> Result<PipelineReport, GenerationError> {
        let job = self.resolve_job(JobKind::Audio, task_id)?;
        info!("[Orchestrator] Checking existing task: {}", job.task_id);
        self.persist(&job);

        let label = SongLabel {
            title: None,
            style: None,
        };
        self.finish_audio(job, audio_output, video, &label).await
    }

    /// Resume an MP4 task by explicit id or from the video sidecar
    pub async fn resume_video(
        &self,
        task_id: Option<String>,
        video_output: &Path,
    ) -> Result<DownloadResult, GenerationError> {
        let job = self.resolve_job(JobKind::Video, task_id)?;
        info!("[Orchestrator] Checking existing MP4 task: {}", job.task_id);
        self.persist(&job);

        let artifact = self.await_artifact(&job).await?;
        self.downloader.download(&artifact.url, video_output).await
    }

    fn resolve_job(
        &self,
        kind: JobKind,
        task_id: Option<String>,
    ) -> Result<GenerationJob, GenerationError> {
        match task_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => Ok(GenerationJob::new(id.trim(), kind)),
            None => {
                let job = self.store.load(kind).ok_or(GenerationError::MissingTaskId(kind))?;
                info!(
                    "[Orchestrator] Using {} task id from {}",
                    kind,
                    kind.sidecar_file()
                );
                Ok(job)
            }
        }
    }

    /// Saving is best effort; a failed write only loses resumability.
    fn persist(&self, job: &GenerationJob) {
        if let Err(e) = self.store.save(job) {
            warn!("[Orchestrator] Could not save {} task id: {}", job.kind, e);
        }
    }

    async fn await_artifact(
        &self,
        job: &GenerationJob,
    ) -> Result<ExtractedArtifact, GenerationError> {
        let source = match job.kind {
            JobKind::Audio => self.audio_status.as_ref(),
            JobKind::Video => self.video_status.as_ref(),
        };
        match self.poller.poll(source, job).await {
            PollOutcome::Succeeded(artifact) => Ok(artifact),
            PollOutcome::Failed(e) => Err(e),
            PollOutcome::Exhausted { attempts } => Err(GenerationError::Exhausted {
                kind: job.kind,
                task_id: job.task_id.clone(),
                attempts,
            }),
        }
    }

    async fn finish_audio(
        &self,
        job: GenerationJob,
        audio_output: &Path,
        video: Option<&VideoRequest>,
        label: &SongLabel<'_>,
    ) -> Result<PipelineReport, GenerationError> {
        let artifact = self.await_artifact(&job).await?;
        info!("[Orchestrator] Audio ready at {}", artifact.url);
        let audio = self.downloader.download(&artifact.url, audio_output).await?;

        let video = match video {
            None => None,
            Some(video) => Some(match artifact.id.as_deref() {
                Some(audio_id) => {
                    self.video_stage(&job.task_id, audio_id, audio_output, video, label)
                        .await
                }
                None => {
                    warn!("[Orchestrator] No audio id recovered; skipping MP4 export");
                    VideoOutcome::Skipped
                }
            }),
        };

        Ok(PipelineReport {
            title: label.title.map(str::to_string),
            audio_job: job,
            audio,
            audio_id: artifact.id,
            video,
        })
    }

    async fn video_stage(
        &self,
        task_id: &str,
        audio_id: &str,
        audio_path: &Path,
        video: &VideoRequest,
        label: &SongLabel<'_>,
    ) -> VideoOutcome {
        let cause = match self.provider_video(task_id, audio_id, &video.output).await {
            Ok(result) => return VideoOutcome::Downloaded(result),
            Err(e) => e,
        };
        warn!("[Orchestrator] ✗ MP4 export failed: {}", cause);

        let Some(mode) = video.fallback else {
            return VideoOutcome::Failed(cause);
        };
        info!("[Orchestrator] Falling back to local {} render", mode);
        let render = RenderRequest::new(audio_path, &video.output, mode)
            .with_title(label.title.map(str::to_string))
            .with_style(label.style.map(str::to_string));
        match render_visualization(&render).await {
            Ok(path) => VideoOutcome::Rendered { path, mode, cause },
            Err(render_err) => {
                warn!("[Orchestrator] ✗ Local render failed: {}", render_err);
                VideoOutcome::Failed(render_err)
            }
        }
    }

    async fn provider_video(
        &self,
        task_id: &str,
        audio_id: &str,
        output: &Path,
    ) -> Result<DownloadResult, GenerationError> {
        let job = self.music.submit_video_job(task_id, audio_id).await?;
        self.persist(&job);
        let artifact = self.await_artifact(&job).await?;
        self.downloader.download(&artifact.url, output).await
    }
}
