// Lyrics writer backed by the Anthropic Messages API

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::errors::GenerationError;
use super::models::{Lyrics, LyricsRequest};
use super::traits::LyricsWriter;
use crate::config::{ApiKey, LyricsApiSettings};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1000;

const SYSTEM_PROMPT: &str = "You are a professional songwriter with expertise in many musical styles. \
Create original, creative, and emotionally resonant lyrics that feel authentic to the requested style. \
Structure the lyrics properly and ensure they have a cohesive theme.";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct AnthropicLyricsWriter {
    http: reqwest::Client,
    api_key: ApiKey,
    settings: LyricsApiSettings,
}

impl AnthropicLyricsWriter {
    pub fn new(http: reqwest::Client, api_key: ApiKey, settings: LyricsApiSettings) -> Self {
        Self {
            http,
            api_key,
            settings,
        }
    }
}

#[async_trait]
impl LyricsWriter for AnthropicLyricsWriter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn write_lyrics(&self, request: &LyricsRequest) -> Result<Lyrics, GenerationError> {
        let url = format!("{}/v1/messages", self.settings.base_url);
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: build_prompt(request),
            }],
        };
        info!(
            "[Lyrics] Writing lyrics about '{}' with {}",
            request.theme, self.settings.model
        );
        debug!("[Lyrics] Prompt: {}", body.messages[0].content);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            return Err(match status.as_u16() {
                401 | 403 => GenerationError::Unauthorized {
                    code: status.as_u16() as i64,
                    message,
                },
                code => GenerationError::Http {
                    status: code,
                    message,
                },
            });
        }

        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::MalformedResponse(format!("lyrics response: {}", e)))?;
        let full_text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .find_map(|block| block.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::MalformedResponse("lyrics response had no text".to_string())
            })?;

        Ok(parse_lyrics(&full_text))
    }
}

/// User prompt: style, verse count, chorus toggle, title at the top
pub fn build_prompt(request: &LyricsRequest) -> String {
    let style = request
        .style
        .as_deref()
        .map(|s| format!("Write in {} style. ", s))
        .unwrap_or_default();
    let chorus = if request.chorus {
        " and a chorus that repeats."
    } else {
        "."
    };
    format!(
        "{}Write lyrics for a song about: {}. Include {} verses{} \
         Include a title at the top. Format the output so verses and chorus are clearly separated.",
        style, request.theme, request.verses, chorus
    )
}

/// Split model output into title (first line) and body
pub fn parse_lyrics(text: &str) -> Lyrics {
    lazy_static::lazy_static! {
        static ref TITLE_PREFIX: Regex = Regex::new(r"(?i)^title\s*:\s*").unwrap();
    }

    let trimmed = text.trim();
    let (first, rest) = trimmed.split_once('\n').unwrap_or((trimmed, ""));
    let stripped = first.replace('#', "").replace("**", "");
    let title = TITLE_PREFIX.replace(stripped.trim(), "").trim().to_string();

    Lyrics {
        title,
        content: rest.trim().to_string(),
        full_text: text.to_string(),
    }
}

/// Title used for instrumentals: first letter upper-cased, the rest lower-cased
pub fn capitalize_theme(theme: &str) -> String {
    let mut chars = theme.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
