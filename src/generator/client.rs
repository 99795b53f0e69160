// Music provider client - job submission and status endpoint resolution

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::GenerationError;
use super::extract::{extract, FieldKind};
use super::models::{AudioJobRequest, GenerationJob, JobKind, NetworkConfig, VideoJobRequest};
use super::traits::StatusSource;
use crate::config::{ApiKey, MusicApiSettings};

/// Build a reqwest client honouring the proxy setting.
///
/// `total_timeout` bounds the whole request; streamed downloads pass `None`
/// and rely on per-read timeouts instead.
pub fn build_http_client(
    network: &NetworkConfig,
    total_timeout: Option<Duration>,
) -> Result<reqwest::Client, GenerationError> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(network.timeout)
        .user_agent(concat!("songforge/", env!("CARGO_PKG_VERSION")));

    if let Some(timeout) = total_timeout {
        builder = builder.timeout(timeout);
    }

    if let Some(proxy_url) = network.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url).map_err(|e| {
            GenerationError::Transport(format!("Invalid proxy URL {}: {}", proxy_url, e))
        })?;
        debug!("[Http] Using proxy {}", proxy_url);
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| GenerationError::Transport(format!("Failed to build HTTP client: {}", e)))
}

/// Client for the music generation provider
#[derive(Clone)]
pub struct MusicClient {
    http: reqwest::Client,
    api_key: ApiKey,
    settings: MusicApiSettings,
}

impl MusicClient {
    pub fn new(http: reqwest::Client, api_key: ApiKey, settings: MusicApiSettings) -> Self {
        Self {
            http,
            api_key,
            settings,
        }
    }

    pub fn settings(&self) -> &MusicApiSettings {
        &self.settings
    }

    /// Submit lyrics for audio generation and return the new job
    pub async fn submit_audio_job(
        &self,
        request: &AudioJobRequest,
    ) -> Result<GenerationJob, GenerationError> {
        let url = format!("{}/generate", self.settings.base_url);
        info!(
            "[MusicClient] Submitting audio job (model {}, custom mode {})",
            request.model, request.custom_mode
        );
        debug!("[MusicClient] POST {} payload: {:?}", url, request);

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("[MusicClient] Audio submit HTTP {}: {}", status, body);

        if status != StatusCode::OK {
            return Err(classify_failure(status, &body));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedResponse(format!("audio submit: {}", e)))?;

        match extract(&json, FieldKind::TaskId) {
            Some(task_id) => {
                info!("[MusicClient] Audio task id: {}", task_id);
                Ok(GenerationJob::new(task_id, JobKind::Audio))
            }
            None => match envelope_error(&json) {
                Some(err) => Err(err),
                None => Err(GenerationError::MalformedResponse(
                    "no taskId in audio submit response".to_string(),
                )),
            },
        }
    }

    /// Request an MP4 export for a finished audio track
    pub async fn submit_video_job(
        &self,
        task_id: &str,
        audio_id: &str,
    ) -> Result<GenerationJob, GenerationError> {
        let url = format!("{}/mp4/generate", self.settings.base_url);
        let request = VideoJobRequest {
            task_id: task_id.to_string(),
            audio_id: audio_id.to_string(),
            call_back_url: self.settings.callback_url.clone(),
        };
        info!(
            "[MusicClient] Requesting MP4 for task {} (audio {})",
            task_id, audio_id
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("[MusicClient] MP4 submit HTTP {}: {}", status, body);

        let json: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(_) if status == StatusCode::OK => {
                return Err(GenerationError::MalformedResponse(format!(
                    "MP4 submit returned non-JSON body: {}",
                    snippet(&body)
                )))
            }
            Err(_) => return Err(classify_failure(status, &body)),
        };

        if status != StatusCode::OK {
            return Err(classify_failure(status, &body));
        }
        // Accepted transport-wise but refused by the provider: keep its own code
        if let Some(code) = json.get("code").and_then(Value::as_i64).filter(|c| *c != 200) {
            let message = json["msg"].as_str().unwrap_or("Unknown error").to_string();
            return Err(GenerationError::ApiRejected { code, message });
        }

        let mp4_task_id = extract(&json, FieldKind::TaskId).ok_or_else(|| {
            GenerationError::MalformedResponse("no taskId in MP4 submit response".to_string())
        })?;
        info!("[MusicClient] MP4 task id: {}", mp4_task_id);
        Ok(GenerationJob::new(mp4_task_id, JobKind::Video))
    }

    /// Fetch the status document for a job, trying every known endpoint
    pub async fn fetch_status(
        &self,
        kind: JobKind,
        task_id: &str,
    ) -> Result<Value, GenerationError> {
        EndpointResolver::for_job(&self.settings.base_url, kind, task_id)
            .resolve(&self.http, &self.api_key)
            .await
    }

    /// Status source bound to one job kind
    pub fn status_source(&self, kind: JobKind) -> ProviderStatusSource {
        ProviderStatusSource {
            client: self.clone(),
            kind,
        }
    }
}

/// Ordered status endpoints for one job
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    endpoints: Vec<String>,
}

impl EndpointResolver {
    pub fn for_job(base_url: &str, kind: JobKind, task_id: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let endpoints = match kind {
            JobKind::Audio => vec![
                format!("{}/generate/record-info?taskId={}", base, task_id),
                format!("{}/generate/status?taskId={}", base, task_id),
                format!("{}/generate/result?taskId={}", base, task_id),
                format!("{}/task/{}", base, task_id),
                format!("{}/generate/{}", base, task_id),
            ],
            JobKind::Video => vec![
                format!("{}/mp4/record-info?taskId={}", base, task_id),
                format!("{}/mp4/generate/record-info?taskId={}", base, task_id),
                format!("{}/mp4/status?taskId={}", base, task_id),
            ],
        };
        Self { endpoints }
    }

    /// Try endpoints in order.
    ///
    /// 200 returns the body; 404 and transport errors fall through; any other
    /// status stops resolution, returning its JSON envelope when it has a `code`.
    /// A bare 401/403 is `Unauthorized`, which ends polling.
    pub async fn resolve(
        &self,
        http: &reqwest::Client,
        api_key: &ApiKey,
    ) -> Result<Value, GenerationError> {
        for endpoint in &self.endpoints {
            debug!("[Resolver] Checking status at: {}", endpoint);

            let response = match http
                .get(endpoint)
                .bearer_auth(api_key.expose())
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!("[Resolver] ✗ {} unreachable: {}", endpoint, e);
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                debug!("[Resolver] {} returned 404, trying next", endpoint);
                continue;
            }

            let body = response.text().await?;
            if status == StatusCode::OK {
                debug!("[Resolver] ✓ {}", endpoint);
                return serde_json::from_str(&body).map_err(|e| {
                    GenerationError::MalformedResponse(format!("status body: {}", e))
                });
            }

            warn!(
                "[Resolver] {} returned HTTP {}: {}",
                endpoint,
                status.as_u16(),
                snippet(&body)
            );
            return match serde_json::from_str::<Value>(&body) {
                Ok(json) if json.get("code").is_some() => Ok(json),
                _ if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                    Err(GenerationError::Unauthorized {
                        code: status.as_u16() as i64,
                        message: snippet(&body),
                    })
                }
                _ => Err(GenerationError::EndpointRejected {
                    status: status.as_u16(),
                }),
            };
        }

        warn!("[Resolver] All status endpoints returned 404 or failed");
        Err(GenerationError::NoEndpoint)
    }
}

/// [`StatusSource`] backed by the provider's HTTP endpoints
pub struct ProviderStatusSource {
    client: MusicClient,
    kind: JobKind,
}

#[async_trait]
impl StatusSource for ProviderStatusSource {
    fn name(&self) -> &'static str {
        match self.kind {
            JobKind::Audio => "audio-status",
            JobKind::Video => "mp4-status",
        }
    }

    fn kind(&self) -> JobKind {
        self.kind
    }

    async fn check_status(&self, task_id: &str) -> Result<Value, GenerationError> {
        self.client.fetch_status(self.kind, task_id).await
    }
}

/// Error carried by a JSON envelope whose `code` is present and not 200
pub fn envelope_error(json: &Value) -> Option<GenerationError> {
    let code = json.get("code")?.as_i64()?;
    if code == 200 {
        return None;
    }
    let message = json["msg"].as_str().unwrap_or("Unknown error");
    Some(GenerationError::from_api_code(code, message))
}

/// Map a non-200 HTTP response to an error, preferring an embedded envelope.
fn classify_failure(status: StatusCode, body: &str) -> GenerationError {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(code) = json["code"].as_i64() {
            let message = json["msg"].as_str().unwrap_or("Unknown error");
            return GenerationError::from_api_code(code, message);
        }
    }

    let message = snippet(body);
    match status.as_u16() {
        code @ (401 | 413 | 429) => GenerationError::from_api_code(code as i64, message),
        code => GenerationError::Http {
            status: code,
            message,
        },
    }
}

fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
