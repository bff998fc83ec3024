//! URL and input validation utilities

use anyhow::{anyhow, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Validate if URL is well formed
pub fn validate_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| anyhow!("Invalid URL format: {}", e))
}

fn youtube_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:https?://)?(?:www\.|m\.|music\.)?(?:youtube\.com|youtu\.?be)/.+$")
            .expect("static regex")
    })
}

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9A-Za-z_-]{11}$").expect("static regex"))
}

/// Check if input is a bare 11-character video id
pub fn is_video_id(input: &str) -> bool {
    video_id_regex().is_match(input)
}

/// Accepts a YouTube watch/share URL carrying a video id, or a bare video id
pub fn is_valid_youtube_url(input: &str) -> bool {
    let input = input.trim();
    is_video_id(input) || (youtube_url_regex().is_match(input) && extract_video_id(input).is_some())
}

/// Extract the 11-character video id from any supported URL form or a bare id
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if is_video_id(input) {
        return Some(input.to_string());
    }
    if !youtube_url_regex().is_match(input) {
        return None;
    }

    let with_scheme = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };
    let parsed = Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.");

    let candidate = if host == "youtu.be" || host == "youtube.be" {
        parsed.path_segments()?.next().map(str::to_string)
    } else {
        let mut segments = parsed.path_segments()?;
        match segments.next() {
            Some("watch") => parsed
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some("embed") | Some("shorts") | Some("live") | Some("v") => {
                segments.next().map(str::to_string)
            }
            _ => None,
        }
    };

    candidate.filter(|id| is_video_id(id))
}

/// Canonical watch URL for a video id
pub fn canonical_watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Embeddable player URL for a video id
pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}
