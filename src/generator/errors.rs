// Error types for the generation pipeline

use thiserror::Error;

use super::models::JobKind;
use super::status::ApiCode;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Network failure or timeout talking to a provider
    #[error("Network error: {0}")]
    Transport(String),

    /// Provider refused the API key (code 401)
    #[error("Authentication failed ({code}): {message}")]
    Unauthorized { code: i64, message: String },

    /// Account is out of credits (code 429)
    #[error("Insufficient credits ({code}): {message}")]
    InsufficientCredits { code: i64, message: String },

    /// Theme, lyrics or payload too long (code 413)
    #[error("Payload too large ({code}): {message}")]
    PayloadTooLarge { code: i64, message: String },

    /// Well-formed error envelope with a provider code
    #[error("API rejected request ({code}): {message}")]
    ApiRejected { code: i64, message: String },

    /// Non-success HTTP status without a usable envelope
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Status endpoint answered with a non-404 error; resolution stopped there
    #[error("Status endpoint returned HTTP {status}")]
    EndpointRejected { status: u16 },

    /// Every known status endpoint returned 404 or was unreachable
    #[error("No status endpoint answered; the API layout may have changed")]
    NoEndpoint,

    /// Response was not JSON or had an unexpected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Job reported success but no URL/id could be located
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// Job reached a failure status
    #[error("Job failed with status {status}{}", .reason.as_deref().map(|r| format!(": {}", r)).unwrap_or_default())]
    JobFailed { status: String, reason: Option<String> },

    /// Poll budget spent without a terminal status
    #[error(
        "{kind} task {task_id} still processing after {attempts} checks. \
         Check again later with: songforge {} {task_id}",
        .kind.resume_flag()
    )]
    Exhausted { kind: JobKind, task_id: String, attempts: u32 },

    /// Every download attempt failed
    #[error("Download failed after {attempts} attempts: {last_error}")]
    DownloadFailed { attempts: u32, last_error: String },

    /// Resume requested without an id and no sidecar file exists
    #[error("No {} task id provided and no {} file found", .0, .0.sidecar_file())]
    MissingTaskId(JobKind),

    /// Lyrics were requested but no writer is configured
    #[error("No lyrics writer configured; set ANTHROPIC_API_KEY or use --instrumental")]
    LyricsUnavailable,

    /// Local visualisation fallback failed
    #[error("Render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    /// Build the error matching a provider code found in an error envelope.
    pub fn from_api_code(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match ApiCode::from_code(code) {
            ApiCode::Unauthorized => Self::Unauthorized { code, message },
            ApiCode::InsufficientCredits => Self::InsufficientCredits { code, message },
            ApiCode::PayloadTooLarge => Self::PayloadTooLarge { code, message },
            _ => Self::ApiRejected { code, message },
        }
    }

    /// Whether a later attempt might succeed without user action
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_)
            | Self::EndpointRejected { .. }
            | Self::NoEndpoint
            | Self::MalformedResponse(_) => true,
            Self::ApiRejected { code, .. } => ApiCode::from_code(*code).is_transient(),
            _ => false,
        }
    }

    /// Actionable follow-up for the user, when there is one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized { code, .. }
            | Self::InsufficientCredits { code, .. }
            | Self::PayloadTooLarge { code, .. }
            | Self::ApiRejected { code, .. } => ApiCode::from_code(*code).hint(),
            Self::Transport(_) => Some("Check your connection or set SONGFORGE_PROXY."),
            Self::NoEndpoint => Some("The provider may have moved its status API; retry later."),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Transport(format!("request timed out: {}", e));
        }
        if e.is_decode() {
            return Self::MalformedResponse(e.to_string());
        }
        Self::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_api_code_maps_known_codes() {
        assert!(matches!(
            GenerationError::from_api_code(401, "bad key"),
            GenerationError::Unauthorized { code: 401, .. }
        ));
        assert!(matches!(
            GenerationError::from_api_code(429, "no credits"),
            GenerationError::InsufficientCredits { .. }
        ));
        assert!(matches!(
            GenerationError::from_api_code(413, "too long"),
            GenerationError::PayloadTooLarge { .. }
        ));
        assert!(matches!(
            GenerationError::from_api_code(455, "maintenance"),
            GenerationError::ApiRejected { code: 455, .. }
        ));
    }

    #[test]
    fn test_exhausted_message_names_resume_flag() {
        let err = GenerationError::Exhausted {
            kind: JobKind::Video,
            task_id: "mp4-1".to_string(),
            attempts: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("--check-mp4-task mp4-1"));
        assert!(msg.contains("3 checks"));
    }

    #[test]
    fn test_job_failed_message_includes_reason() {
        let err = GenerationError::JobFailed {
            status: "SENSITIVE_WORD_ERROR".to_string(),
            reason: Some("lyrics rejected".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Job failed with status SENSITIVE_WORD_ERROR: lyrics rejected"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(GenerationError::Transport("reset".into()).is_transient());
        assert!(GenerationError::NoEndpoint.is_transient());
        assert!(!GenerationError::ArtifactNotFound("audio url".into()).is_transient());
        assert!(!GenerationError::from_api_code(429, "").is_transient());
    }

    #[test]
    fn test_missing_task_id_names_sidecar() {
        assert_eq!(
            GenerationError::MissingTaskId(JobKind::Audio).to_string(),
            "No audio task id provided and no last_task_id.txt file found"
        );
        assert_eq!(
            GenerationError::MissingTaskId(JobKind::Video).to_string(),
            "No MP4 task id provided and no last_mp4_task_id.txt file found"
        );
    }

    #[test]
    fn test_io_errors_convert() {
        let err: GenerationError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, GenerationError::Io(_)));
        assert!(!err.is_transient());
    }
}
