//! HTTP backend for video metadata and captions
//!
//! Reads the public watch page, pulls the embedded `ytInitialPlayerResponse`
//! and `ytInitialData` blobs out of it and projects them into the dashboard
//! view. Captions come from the timed-text track URL listed in the player
//! response, requested in the `json3` layout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::core::config::LookupConfig;
use crate::core::models::{AppError, AppResult, RawTranscript, VideoMetadataView};
use crate::core::youtube::YoutubeBackend;
use crate::utils::{build_http_client, canonical_watch_url, ensure_success, extract_video_id};

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse";
const INITIAL_DATA_MARKER: &str = "ytInitialData";
const VERIFIED_BADGE: &str = "BADGE_STYLE_TYPE_VERIFIED";

static NULL: Value = Value::Null;

pub struct HttpYoutubeBackend {
    client: reqwest::Client,
    caption_language: Option<String>,
}

impl HttpYoutubeBackend {
    pub fn new(config: &LookupConfig) -> AppResult<Self> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.request_timeout_seconds),
        )?;
        Ok(Self {
            client,
            caption_language: config.caption_language.clone(),
        })
    }

    async fn fetch_watch_page(&self, url: &str) -> AppResult<String> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        // Skips the EU consent interstitial
        headers.insert(COOKIE, HeaderValue::from_static("CONSENT=YES+1"));

        let response = self.client.get(url).headers(headers).send().await?;
        let response = ensure_success(response, AppError::Youtube).await?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl YoutubeBackend for HttpYoutubeBackend {
    async fn fetch_video_data(&self, url: &str) -> AppResult<VideoMetadataView> {
        info!("📺 Fetching watch page: {}", url);
        let html = self.fetch_watch_page(url).await?;

        let player_response = parse_embedded_json(&html, PLAYER_RESPONSE_MARKER)?;
        // The channel block is a nicety; a page without it still yields metadata
        let initial_data = parse_embedded_json(&html, INITIAL_DATA_MARKER).unwrap_or_else(|e| {
            warn!("No ytInitialData on watch page: {}", e);
            Value::Null
        });

        project_metadata(&player_response, &initial_data)
    }

    async fn fetch_captions(&self, video_id: &str) -> AppResult<RawTranscript> {
        let video_id = extract_video_id(video_id)
            .ok_or_else(|| AppError::Validation(format!("Invalid video id: {}", video_id)))?;

        let html = self.fetch_watch_page(&canonical_watch_url(&video_id)).await?;
        let player_response = parse_embedded_json(&html, PLAYER_RESPONSE_MARKER)?;

        let Some(track_url) = select_caption_track(&player_response, self.caption_language.as_deref())
        else {
            info!("No caption tracks for {}", video_id);
            return Ok(RawTranscript::default());
        };

        debug!("Fetching caption track for {}", video_id);
        let response = self
            .client
            .get(format!("{}&fmt=json3", track_url))
            .send()
            .await?;
        let body = ensure_success(response, AppError::Youtube)
            .await?
            .text()
            .await?;

        if body.trim().is_empty() {
            return Ok(RawTranscript::default());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Slice the first balanced JSON object that follows `marker` in `html`.
///
/// Braces inside string literals (and escaped quotes) are skipped.
pub fn extract_json_object<'a>(html: &'a str, marker: &str) -> Option<&'a str> {
    let marker_at = html.find(marker)?;
    let start = marker_at + html[marker_at..].find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in html.as_bytes()[start..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&html[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_embedded_json(html: &str, marker: &str) -> AppResult<Value> {
    let raw = extract_json_object(html, marker)
        .ok_or_else(|| AppError::Youtube(format!("{} not found on page", marker)))?;
    serde_json::from_str(raw).map_err(|e| AppError::Parse(format!("{}: {}", marker, e)))
}

/// Depth-first search for the first value stored under `key`
pub fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|v| find_key(v, key))),
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

/// Text of a `{simpleText}` or `{runs:[{text}]}` node
fn text_of(value: &Value) -> Option<String> {
    if let Some(text) = value.get("simpleText").and_then(Value::as_str) {
        return Some(text.to_string());
    }
    let runs = value.get("runs")?.as_array()?;
    Some(
        runs.iter()
            .filter_map(|run| run.get("text").and_then(Value::as_str))
            .collect(),
    )
}

fn string_at(value: &Value, pointer: &str) -> String {
    match value.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => text_of(other).unwrap_or_default(),
        None => String::new(),
    }
}

/// Widest thumbnail in a `thumbnails` list
fn best_thumbnail(value: Option<&Value>) -> String {
    value
        .and_then(|v| v.get("thumbnails"))
        .and_then(Value::as_array)
        .and_then(|thumbs| {
            thumbs
                .iter()
                .max_by_key(|t| t.get("width").and_then(Value::as_u64).unwrap_or(0))
        })
        .and_then(|t| t.get("url"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Build the dashboard view from the two embedded page blobs
pub fn project_metadata(player_response: &Value, initial_data: &Value) -> AppResult<VideoMetadataView> {
    let details = player_response.get("videoDetails").ok_or_else(|| {
        let reason = string_at(player_response, "/playabilityStatus/reason");
        AppError::Youtube(if reason.is_empty() {
            "Video not found or unavailable".to_string()
        } else {
            reason
        })
    })?;
    let microformat = player_response
        .pointer("/microformat/playerMicroformatRenderer")
        .unwrap_or(&NULL);
    let owner = find_key(initial_data, "videoOwnerRenderer").unwrap_or(&NULL);

    let channel_url = match owner.pointer("/navigationEndpoint/browseEndpoint/canonicalBaseUrl") {
        Some(Value::String(path)) => format!("https://www.youtube.com{}", path),
        _ => string_at(microformat, "/ownerProfileUrl"),
    };

    let is_verified = owner
        .get("badges")
        .and_then(Value::as_array)
        .map(|badges| {
            badges.iter().any(|badge| {
                badge.pointer("/metadataBadgeRenderer/style").and_then(Value::as_str)
                    == Some(VERIFIED_BADGE)
            })
        })
        .unwrap_or(false);

    let like_count = match microformat.get("likeCount") {
        Some(Value::String(count)) => count.clone(),
        _ => find_key(initial_data, "likeCount")
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .unwrap_or_default(),
    };

    let mut description = string_at(details, "/shortDescription");
    if description.is_empty() {
        description = string_at(microformat, "/description");
    }

    Ok(VideoMetadataView {
        title: string_at(details, "/title"),
        description,
        thumbnail: best_thumbnail(details.get("thumbnail")),
        duration: string_at(details, "/lengthSeconds"),
        view_count: string_at(details, "/viewCount"),
        video_id: string_at(details, "/videoId"),
        publish_date: string_at(microformat, "/publishDate"),
        channel_name: string_at(details, "/author"),
        channel_url,
        channel_avatar: best_thumbnail(owner.get("thumbnail")),
        subscriber_count: owner
            .get("subscriberCountText")
            .and_then(text_of)
            .unwrap_or_default(),
        is_verified,
        like_count,
    })
}

/// Caption track URL for the preferred language, else the first track
pub fn select_caption_track(player_response: &Value, language: Option<&str>) -> Option<String> {
    let tracks = player_response
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")?
        .as_array()?;

    let preferred = language.and_then(|lang| {
        tracks.iter().find(|track| {
            track
                .get("languageCode")
                .and_then(Value::as_str)
                .map(|code| code == lang || code.starts_with(&format!("{}-", lang)))
                .unwrap_or(false)
        })
    });

    preferred
        .or_else(|| tracks.first())
        .and_then(|track| track.get("baseUrl"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
