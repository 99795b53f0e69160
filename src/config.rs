// Runtime configuration, loaded from the environment (and `.env`) at startup

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::generator::models::NetworkConfig;

pub const DEFAULT_MUSIC_API_BASE_URL: &str = "https://apibox.erweima.ai/api/v1";
pub const DEFAULT_MUSIC_FILE_HOST: &str = "https://apiboxfiles.erweima.ai";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_LYRICS_MODEL: &str = "claude-3-opus-20240229";
/// Nothing listens here; the provider requires the field.
pub const DEFAULT_CALLBACK_URL: &str = "https://example.com/callback";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set. Add it to your environment or .env file")]
    MissingKey(&'static str),

    #[error("{0} is set but empty")]
    EmptyKey(&'static str),

    #[error("Invalid proxy URL {url}: {reason}")]
    InvalidProxy { url: String, reason: String },
}

/// A validated, non-empty API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(var: &'static str, raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyKey(var));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(4).collect();
        write!(f, "ApiKey({}…)", prefix)
    }
}

/// Music provider location and fixed request fields
#[derive(Debug, Clone)]
pub struct MusicApiSettings {
    pub base_url: String,
    /// Host that serves relative video paths
    pub file_host: String,
    pub callback_url: String,
}

impl Default for MusicApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MUSIC_API_BASE_URL.to_string(),
            file_host: DEFAULT_MUSIC_FILE_HOST.to_string(),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
        }
    }
}

/// Lyrics provider location and model
#[derive(Debug, Clone)]
pub struct LyricsApiSettings {
    pub base_url: String,
    pub model: String,
}

impl Default for LyricsApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            model: DEFAULT_LYRICS_MODEL.to_string(),
        }
    }
}

/// Everything read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub music_key: ApiKey,
    /// Only required when lyrics are generated
    pub anthropic_key: Option<ApiKey>,
    pub music: MusicApiSettings,
    pub lyrics: LyricsApiSettings,
    pub network: NetworkConfig,
}

impl AppConfig {
    /// Build [`AppConfig`] from `.env` plus process environment.
    ///
    /// A missing `.env` file is not an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (tests use a map)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let music_key = match lookup("SUNO_API_KEY") {
            Some(raw) => ApiKey::new("SUNO_API_KEY", &raw)?,
            None => return Err(ConfigError::MissingKey("SUNO_API_KEY")),
        };
        let anthropic_key = lookup("ANTHROPIC_API_KEY")
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| ApiKey::new("ANTHROPIC_API_KEY", &raw))
            .transpose()?;

        let env_or = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        let proxy = lookup("SONGFORGE_PROXY").filter(|p| !p.trim().is_empty());
        if let Some(url) = proxy.as_deref() {
            validate_proxy(url)?;
        }
        let timeout_secs = lookup("SONGFORGE_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(30);

        Ok(Self {
            music_key,
            anthropic_key,
            music: MusicApiSettings {
                base_url: env_or("MUSIC_API_BASE_URL", DEFAULT_MUSIC_API_BASE_URL),
                file_host: env_or("MUSIC_FILE_HOST", DEFAULT_MUSIC_FILE_HOST),
                callback_url: env_or("MUSIC_CALLBACK_URL", DEFAULT_CALLBACK_URL),
            },
            lyrics: LyricsApiSettings {
                base_url: env_or("ANTHROPIC_BASE_URL", DEFAULT_ANTHROPIC_BASE_URL),
                model: env_or("LYRICS_MODEL", DEFAULT_LYRICS_MODEL),
            },
            network: NetworkConfig {
                proxy,
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }

    /// Override the proxy from the command line
    pub fn with_proxy(mut self, proxy: Option<String>) -> Result<Self, ConfigError> {
        if let Some(url) = proxy.filter(|p| !p.trim().is_empty()) {
            validate_proxy(&url)?;
            self.network.proxy = Some(url);
        }
        Ok(self)
    }
}

fn validate_proxy(url: &str) -> Result<(), ConfigError> {
    reqwest::Proxy::all(url)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidProxy {
            url: url.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_music_key_fails_fast() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err, ConfigError::MissingKey("SUNO_API_KEY"));
    }

    #[test]
    fn test_blank_music_key_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("SUNO_API_KEY", "   ")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyKey("SUNO_API_KEY"));
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[("SUNO_API_KEY", "sk-music")])).unwrap();
        assert_eq!(cfg.music.base_url, DEFAULT_MUSIC_API_BASE_URL);
        assert_eq!(cfg.music.file_host, DEFAULT_MUSIC_FILE_HOST);
        assert_eq!(cfg.lyrics.model, DEFAULT_LYRICS_MODEL);
        assert_eq!(cfg.network.timeout, Duration::from_secs(30));
        assert!(cfg.anthropic_key.is_none());
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("SUNO_API_KEY", "sk-music"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("MUSIC_API_BASE_URL", "http://127.0.0.1:9000/api/v1/"),
            ("SONGFORGE_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.music.base_url, "http://127.0.0.1:9000/api/v1");
        assert_eq!(cfg.network.timeout, Duration::from_secs(5));
        assert_eq!(cfg.anthropic_key.unwrap().expose(), "sk-ant");
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("SUNO_API_KEY", "sk-music"),
            ("SONGFORGE_PROXY", "not a url"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidProxy { .. }));
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("SUNO_API_KEY", "sk-secret-value").unwrap();
        let shown = format!("{:?}", key);
        assert!(!shown.contains("secret"));
        assert!(shown.starts_with("ApiKey(sk-s"));
    }
}
