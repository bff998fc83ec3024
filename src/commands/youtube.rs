//! YouTube command handlers
//!
//! Direct metadata and caption lookups plus the debounced URL field. Values
//! typed into the field go through [`LookupDebouncer`]; results come back as
//! `video-lookup` events.

use std::time::Duration;

use serde::Serialize;
use tauri::{AppHandle, Manager, State};
use tracing::{debug, error, info};

use crate::core::debounce::Debouncer;
use crate::core::models::{CaptionEntry, VideoMetadataView};
use crate::core::youtube::LookupOutcome;
use crate::utils::is_valid_youtube_url;
use crate::AppState;

pub const VIDEO_LOOKUP_EVENT: &str = "video-lookup";

/// Payload of the `video-lookup` event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupEvent {
    pub generation: u64,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<VideoMetadataView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Debouncer behind the URL field, managed as Tauri state
pub struct LookupDebouncer(Debouncer<String>);

impl LookupDebouncer {
    /// Must be called from within the async runtime.
    pub fn spawn(app: AppHandle, delay: Duration) -> Self {
        Self(Debouncer::spawn(delay, move |input: String| {
            let app = app.clone();
            async move {
                let state = app.state::<AppState>();
                let event = match state.lookup.lookup(&input).await {
                    Ok(LookupOutcome::Stale { generation }) => {
                        debug!("Dropping stale lookup #{}", generation);
                        return;
                    }
                    Ok(LookupOutcome::Empty { generation }) => LookupEvent {
                        generation,
                        status: "empty",
                        data: None,
                        error: None,
                    },
                    Ok(LookupOutcome::Ready { generation, video }) => LookupEvent {
                        generation,
                        status: "ready",
                        data: Some(video),
                        error: None,
                    },
                    Err(e) => LookupEvent {
                        generation: state.lookup.latest_generation(),
                        status: "error",
                        data: None,
                        error: Some(e.to_string()),
                    },
                };

                if let Err(e) = app.emit_all(VIDEO_LOOKUP_EVENT, &event) {
                    error!("Failed to emit {} event: {}", VIDEO_LOOKUP_EVENT, e);
                }
            }
        }))
    }
}

/// Feed the URL field into the debounced lookup
#[tauri::command]
pub fn submit_video_url(debouncer: State<'_, LookupDebouncer>, input: String) -> Result<(), String> {
    if debouncer.0.submit(input) {
        Ok(())
    } else {
        Err("Video lookup is not running".to_string())
    }
}

/// Get metadata for a YouTube URL or id
#[tauri::command]
pub async fn get_youtube_videodata(
    state: State<'_, AppState>,
    url: String,
) -> Result<VideoMetadataView, String> {
    info!("📺 Getting YouTube video data for: {}", url);

    match state.lookup.get_video_data(&url).await {
        Ok(video) => {
            info!("✅ Retrieved video data: {}", video.title);
            Ok(video)
        }
        Err(e) => {
            error!("❌ Failed to get YouTube video data: {}", e);
            Err(e.to_string())
        }
    }
}

/// Get normalized captions for a YouTube video id or URL
#[tauri::command]
pub async fn get_youtube_captions(
    state: State<'_, AppState>,
    video_id: String,
) -> Result<Vec<CaptionEntry>, String> {
    info!("📝 Getting captions for: {}", video_id);

    match state.lookup.get_transcripts(&video_id).await {
        Ok(captions) => {
            info!("✅ Retrieved {} caption entries", captions.len());
            Ok(captions)
        }
        Err(e) => {
            error!("❌ Failed to get captions: {}", e);
            Err(e.to_string())
        }
    }
}

/// Check whether a string is a YouTube video URL or id
#[tauri::command]
pub fn validate_youtube_url(url: String) -> bool {
    is_valid_youtube_url(url.trim())
}
