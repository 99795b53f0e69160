// Job status vocabularies and provider API codes
//
// Classifies what the music provider reports about a job:
// - Audio job status strings (PENDING, SUCCESS, SENSITIVE_WORD_ERROR, ...)
// - Video job status strings (processing/complete/failed and upper-case variants)
// - Application `code` values found in JSON envelopes

use serde::{Deserialize, Serialize};

use super::models::JobKind;

/// Where a status string places a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusClass {
    Pending,
    Succeeded,
    Failed,
}

/// Audio generation status vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioStatus {
    Pending,
    /// Lyrics accepted, audio not rendered yet
    TextSuccess,
    /// First of the two tracks is ready
    FirstSuccess,
    Success,
    CreateTaskFailed,
    GenerateAudioFailed,
    CallbackException,
    SensitiveWordError,
    Unknown(String),
}

impl AudioStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PENDING" => Self::Pending,
            "TEXT_SUCCESS" => Self::TextSuccess,
            "FIRST_SUCCESS" => Self::FirstSuccess,
            "SUCCESS" => Self::Success,
            "CREATE_TASK_FAILED" => Self::CreateTaskFailed,
            "GENERATE_AUDIO_FAILED" => Self::GenerateAudioFailed,
            "CALLBACK_EXCEPTION" => Self::CallbackException,
            "SENSITIVE_WORD_ERROR" => Self::SensitiveWordError,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn class(&self) -> StatusClass {
        match self {
            Self::Success | Self::FirstSuccess => StatusClass::Succeeded,
            Self::CreateTaskFailed
            | Self::GenerateAudioFailed
            | Self::CallbackException
            | Self::SensitiveWordError => StatusClass::Failed,
            Self::Pending | Self::TextSuccess | Self::Unknown(_) => StatusClass::Pending,
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Pending => "Pending execution",
            Self::TextSuccess => "Text generation successful",
            Self::FirstSuccess => "First song generation successful",
            Self::Success => "Generation successful",
            Self::CreateTaskFailed => "Task creation failed",
            Self::GenerateAudioFailed => "Song generation failed",
            Self::CallbackException => "Callback exception",
            Self::SensitiveWordError => "Sensitive word error",
            Self::Unknown(_) => "Unknown status",
        }
    }
}

/// Video export status vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoStatus {
    Processing,
    Complete,
    Failed,
    Unknown(String),
}

impl VideoStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "complete" | "SUCCESS" | "FIRST_SUCCESS" => Self::Complete,
            "failed" | "FAILED" | "ERROR" => Self::Failed,
            "processing" | "PENDING" => Self::Processing,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn class(&self) -> StatusClass {
        match self {
            Self::Complete => StatusClass::Succeeded,
            Self::Failed => StatusClass::Failed,
            Self::Processing | Self::Unknown(_) => StatusClass::Pending,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Processing => "MP4 generation in progress",
            Self::Complete => "MP4 generation complete",
            Self::Failed => "MP4 generation failed",
            Self::Unknown(_) => "Unknown status",
        }
    }
}

/// Classify a raw status string for the given job kind.
/// Unknown strings are treated as still pending.
pub fn classify(kind: JobKind, raw: &str) -> StatusClass {
    match kind {
        JobKind::Audio => AudioStatus::parse(raw).class(),
        JobKind::Video => VideoStatus::parse(raw).class(),
    }
}

/// Description for a raw status string of the given kind
pub fn describe(kind: JobKind, raw: &str) -> &'static str {
    match kind {
        JobKind::Audio => AudioStatus::parse(raw).description(),
        JobKind::Video => VideoStatus::parse(raw).description(),
    }
}

/// Application-level `code` carried in provider JSON envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiCode {
    Success,
    Unauthorized,
    PayloadTooLarge,
    /// Task not visible yet
    NotFound,
    InsufficientCredits,
    Maintenance,
    Other(i64),
}

impl ApiCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            200 => Self::Success,
            401 => Self::Unauthorized,
            404 => Self::NotFound,
            413 => Self::PayloadTooLarge,
            429 => Self::InsufficientCredits,
            455 => Self::Maintenance,
            other => Self::Other(other),
        }
    }

    /// Only "not found yet" is worth polling through
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unauthorized => "Unauthorized",
            Self::PayloadTooLarge => "Theme or prompt too long",
            Self::NotFound => "Task not found",
            Self::InsufficientCredits => "Insufficient credits",
            Self::Maintenance => "System under maintenance",
            Self::Other(_) => "Unexpected API code",
        }
    }

    /// Get user-facing advice for codes that need action
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Unauthorized => {
                Some("Check SUNO_API_KEY / ANTHROPIC_API_KEY and that the key has access to this endpoint.")
            }
            Self::InsufficientCredits => Some("Add credits to your account and retry."),
            Self::PayloadTooLarge => Some("Use a shorter theme or shorter lyrics."),
            Self::Maintenance => Some("The provider is under maintenance. Try again later."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_success_statuses() {
        assert_eq!(classify(JobKind::Audio, "SUCCESS"), StatusClass::Succeeded);
        assert_eq!(classify(JobKind::Audio, "FIRST_SUCCESS"), StatusClass::Succeeded);
    }

    #[test]
    fn test_audio_text_success_is_pending() {
        assert_eq!(classify(JobKind::Audio, "TEXT_SUCCESS"), StatusClass::Pending);
    }

    #[test]
    fn test_audio_failure_statuses() {
        for raw in [
            "CREATE_TASK_FAILED",
            "GENERATE_AUDIO_FAILED",
            "CALLBACK_EXCEPTION",
            "SENSITIVE_WORD_ERROR",
        ] {
            assert_eq!(classify(JobKind::Audio, raw), StatusClass::Failed, "{}", raw);
        }
    }

    #[test]
    fn test_unknown_status_is_pending() {
        assert_eq!(classify(JobKind::Audio, "QUEUED"), StatusClass::Pending);
        assert_eq!(classify(JobKind::Video, "rendering"), StatusClass::Pending);
        assert_eq!(describe(JobKind::Audio, "QUEUED"), "Unknown status");
    }

    #[test]
    fn test_video_mixed_case_vocabulary() {
        assert_eq!(classify(JobKind::Video, "complete"), StatusClass::Succeeded);
        assert_eq!(classify(JobKind::Video, "SUCCESS"), StatusClass::Succeeded);
        assert_eq!(classify(JobKind::Video, "ERROR"), StatusClass::Failed);
        assert_eq!(classify(JobKind::Video, "failed"), StatusClass::Failed);
        assert_eq!(classify(JobKind::Video, "processing"), StatusClass::Pending);
    }

    #[test]
    fn test_api_code_classification() {
        assert_eq!(ApiCode::from_code(401), ApiCode::Unauthorized);
        assert_eq!(ApiCode::from_code(429), ApiCode::InsufficientCredits);
        assert_eq!(ApiCode::from_code(455), ApiCode::Maintenance);
        assert_eq!(ApiCode::from_code(500), ApiCode::Other(500));
        assert!(ApiCode::from_code(404).is_transient());
        assert!(!ApiCode::from_code(429).is_transient());
        assert!(!ApiCode::from_code(455).is_transient());
    }

    #[test]
    fn test_api_code_hints() {
        assert!(ApiCode::Maintenance.hint().is_some());
        assert!(ApiCode::InsufficientCredits.hint().is_some());
        assert!(ApiCode::Other(500).hint().is_none());
    }
}
