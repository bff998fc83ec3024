//! Core data models for the video vault application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Models offered on the settings page
pub const MODEL_CHOICES: [(&str, &str); 4] = [
    ("mistral-tiny", "Mistral Tiny"),
    ("mistral-small", "Mistral Small"),
    ("mistral-medium", "Mistral Medium"),
    ("mistral-large-latest", "Mistral Large"),
];

pub const DEFAULT_MODEL: &str = "mistral-tiny";

/// OAuth token bundle issued by the identity provider.
///
/// Every field is optional so the same shape doubles as the partial
/// response of a refresh and as the `authStore` mirrored into settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenSet {
    /// A non-empty access token means the holder is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.access_token
            .as_deref()
            .map(|token| !token.is_empty())
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        *self == TokenSet::default()
    }

    /// Shallow overwrite: fields present in `update` replace ours, absent ones are kept.
    pub fn merge(&mut self, update: TokenSet) {
        if update.access_token.is_some() {
            self.access_token = update.access_token;
        }
        if update.refresh_token.is_some() {
            self.refresh_token = update.refresh_token;
        }
        if update.id_token.is_some() {
            self.id_token = update.id_token;
        }
        if update.token_type.is_some() {
            self.token_type = update.token_type;
        }
        if update.scopes.is_some() {
            self.scopes = update.scopes;
        }
        if update.expires_in.is_some() {
            self.expires_in = update.expires_in;
        }
        if update.issued_at.is_some() {
            self.issued_at = update.issued_at;
        }
        if update.expires_at.is_some() {
            self.expires_at = update.expires_at;
        }
    }
}

/// Decoded subset of the ID token payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,

    /// Any other claim carried by the token (sub, iss, aud, exp, ...)
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

/// Singleton settings record kept in the `settings` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub auth_store: TokenSet,

    pub model_provider_token: String,

    pub model_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auth_store: TokenSet::default(),
            model_provider_token: String::new(),
            model_name: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> AppResult<()> {
        if !MODEL_CHOICES
            .iter()
            .any(|(value, _)| *value == self.model_name)
        {
            return Err(AppError::Validation(format!(
                "Unknown model: {}",
                self.model_name
            )));
        }
        Ok(())
    }
}

/// One caption line in playback order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionEntry {
    pub text: String,

    pub start_offset_ms: u64,

    pub duration_ms: u64,
}

/// Metadata projection stored with a saved video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecordMetadata {
    pub title: String,

    pub channel_name: String,

    pub view_count: u64,

    pub like_count: u64,

    pub published_date: String,
}

/// A saved video: metadata, captions and flattened transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub source_url: String,

    pub transcription_text: String,

    pub caption_sequence: Vec<CaptionEntry>,

    pub embed_player_url: String,

    pub metadata: VideoRecordMetadata,
}

impl VideoRecord {
    /// Build the record saved for a looked-up video.
    pub fn from_lookup(
        source_url: &str,
        video: &VideoMetadataView,
        captions: Vec<CaptionEntry>,
    ) -> Self {
        let transcription_text = captions
            .iter()
            .map(|caption| caption.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            source_url: source_url.to_string(),
            transcription_text,
            caption_sequence: captions,
            embed_player_url: crate::utils::embed_url(&video.video_id),
            metadata: VideoRecordMetadata {
                title: video.title.clone(),
                channel_name: video.channel_name.clone(),
                view_count: parse_count(&video.view_count),
                like_count: parse_count(&video.like_count),
                published_date: video.publish_date.clone(),
            },
        }
    }
}

/// Lenient count parsing: keeps the digits, "1,234 likes" -> 1234, junk -> 0
pub fn parse_count(raw: &str) -> u64 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == ' ')
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Video metadata as shown on the dashboard card

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadataView {
    pub title: String,

    pub description: String,

    pub thumbnail: String,

    /// Seconds, string-encoded
    pub duration: String,

    pub view_count: String,

    pub video_id: String,

    pub publish_date: String,

    pub channel_name: String,

    pub channel_url: String,

    pub channel_avatar: String,

    pub subscriber_count: String,

    pub is_verified: bool,

    pub like_count: String,
}

/// Raw timed-text payload (YouTube json3 layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTranscript {
    #[serde(default)]
    pub events: Option<Vec<RawCaptionEvent>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCaptionEvent {
    #[serde(rename = "tStartMs", default)]
    pub t_start_ms: u64,

    #[serde(rename = "dDurationMs", default)]
    pub d_duration_ms: u64,

    #[serde(default)]
    pub segs: Option<Vec<RawCaptionSegment>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCaptionSegment {
    #[serde(default)]
    pub utf8: Option<String>,
}

/// Application error types

#[derive(Debug, thiserror::Error)]

pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("{0}")]
    Cancelled(String),

    #[error("Datastore error: {0}")]
    Datastore(String),

    #[error("YouTube error: {0}")]
    Youtube(String),

    #[error("Model provider error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parsing error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for application operations

pub type AppResult<T> = Result<T, AppError>;
