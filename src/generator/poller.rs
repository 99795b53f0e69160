// Job poller - bounded status polling with terminal-state detection

use serde_json::Value;
use tracing::{debug, info, warn};

use super::errors::GenerationError;
use super::extract::{extract, resolve_video_url, FieldKind};
use super::models::{ExtractedArtifact, GenerationJob, JobKind, PollSettings};
use super::status::{self, ApiCode, StatusClass};
use super::traits::StatusSource;

/// How a polling loop ended
#[derive(Debug)]
pub enum PollOutcome {
    Succeeded(ExtractedArtifact),
    Failed(GenerationError),
    Exhausted { attempts: u32 },
}

pub struct JobPoller {
    settings: PollSettings,
    file_host: String,
}

impl JobPoller {
    pub fn new(settings: PollSettings, file_host: impl Into<String>) -> Self {
        Self {
            settings,
            file_host: file_host.into(),
        }
    }

    /// Poll `job` until it reaches a terminal status or the budget runs out.
    ///
    /// Sleeps `interval` between checks, never after the last one.
    pub async fn poll(&self, source: &dyn StatusSource, job: &GenerationJob) -> PollOutcome {
        let max = self.settings.max_attempts;
        let kind = source.kind();
        if kind != job.kind {
            warn!(
                "[Poller] {} reports {} status for {} task {}",
                source.name(),
                kind,
                job.kind,
                job.task_id
            );
        }

        for attempt in 1..=max {
            info!(
                "[Poller] {} task {}: check {}/{}",
                job.kind, job.task_id, attempt, max
            );

            match source.check_status(&job.task_id).await {
                Ok(doc) => {
                    if let Some(outcome) = self.inspect(kind, &doc) {
                        return outcome;
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        "[Poller] Could not retrieve status from {}: {}",
                        source.name(),
                        e
                    );
                }
                Err(e) => {
                    warn!("[Poller] ✗ {} rejected the status check: {}", source.name(), e);
                    return PollOutcome::Failed(e);
                }
            }

            if attempt < max {
                tokio::time::sleep(self.settings.interval).await;
            }
        }

        warn!(
            "[Poller] {} task {} not finished after {} checks",
            job.kind, job.task_id, max
        );
        PollOutcome::Exhausted { attempts: max }
    }

    /// Interpret one status document. `None` means keep polling.
    pub fn inspect(&self, kind: JobKind, doc: &Value) -> Option<PollOutcome> {
        if let Some(code) = doc.get("code").and_then(Value::as_i64) {
            if code != 200 {
                let api = ApiCode::from_code(code);
                let message = doc["msg"].as_str().unwrap_or("Unknown error");
                warn!("[Poller] API error: {} - {} ({})", code, message, api.description());
                if !api.is_transient() {
                    return Some(PollOutcome::Failed(GenerationError::from_api_code(
                        code, message,
                    )));
                }
            }
        }

        let raw_status = extract(doc, FieldKind::Status).or_else(|| {
            (kind == JobKind::Video && has_complete_time(doc)).then(|| "complete".to_string())
        });

        let Some(raw_status) = raw_status else {
            debug!("[Poller] {} status: processing (no status field)", kind);
            return None;
        };

        match status::classify(kind, &raw_status) {
            StatusClass::Succeeded => {
                info!("[Poller] ✓ {} status: {}", kind, raw_status);
                Some(match self.artifact(kind, doc) {
                    Ok(artifact) => PollOutcome::Succeeded(artifact),
                    Err(e) => PollOutcome::Failed(e),
                })
            }
            StatusClass::Failed => {
                let reason = extract(doc, FieldKind::FailureReason);
                warn!(
                    "[Poller] ✗ {} status: {} ({})",
                    kind,
                    raw_status,
                    reason.as_deref().unwrap_or("no reason given")
                );
                Some(PollOutcome::Failed(GenerationError::JobFailed {
                    status: raw_status,
                    reason,
                }))
            }
            StatusClass::Pending => {
                let desc = extract(doc, FieldKind::StatusDescription)
                    .unwrap_or_else(|| status::describe(kind, &raw_status).to_string());
                info!("[Poller] Current {} status: {} - {}", kind, raw_status, desc);
                None
            }
        }
    }

    fn artifact(&self, kind: JobKind, doc: &Value) -> Result<ExtractedArtifact, GenerationError> {
        match kind {
            JobKind::Audio => {
                let url = extract(doc, FieldKind::AudioUrl).ok_or_else(|| {
                    GenerationError::ArtifactNotFound(
                        "audio URL missing from successful status response".to_string(),
                    )
                })?;
                let id = extract(doc, FieldKind::AudioId);
                if id.is_none() {
                    warn!("[Poller] No audio id in response; MP4 export will be unavailable");
                }
                Ok(ExtractedArtifact { url, id })
            }
            JobKind::Video => {
                let raw = extract(doc, FieldKind::VideoUrl).ok_or_else(|| {
                    GenerationError::ArtifactNotFound(
                        "video URL missing from successful status response".to_string(),
                    )
                })?;
                Ok(ExtractedArtifact {
                    url: resolve_video_url(&raw, &self.file_host),
                    id: None,
                })
            }
        }
    }
}

fn has_complete_time(doc: &Value) -> bool {
    [&doc["completeTime"], &doc["data"]["completeTime"]]
        .iter()
        .any(|v| !v.is_null() && v.as_str() != Some(""))
}
