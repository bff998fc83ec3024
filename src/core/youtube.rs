//! Video lookup coordinator
//!
//! Validates user input, normalizes it to a canonical watch URL and asks a
//! [`YoutubeBackend`] for metadata and captions. Each lookup takes a
//! generation ticket so a slow response for an old input can be recognized
//! and dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::core::models::{AppError, AppResult, CaptionEntry, RawTranscript, VideoMetadataView};
use crate::utils::{canonical_watch_url, extract_video_id, is_valid_youtube_url};

/// Backend that talks to YouTube
#[async_trait]
pub trait YoutubeBackend: Send + Sync {
    /// Metadata for a canonical watch URL
    async fn fetch_video_data(&self, url: &str) -> AppResult<VideoMetadataView>;

    /// Raw timed-text payload for an 11-character video id
    async fn fetch_captions(&self, video_id: &str) -> AppResult<RawTranscript>;
}

/// Result of a generation-tagged lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LookupOutcome {
    /// Input was blank; the card should be cleared
    Empty { generation: u64 },
    Ready {
        generation: u64,
        video: VideoMetadataView,
    },
    /// A newer lookup was issued while this one was in flight
    Stale { generation: u64 },
}

impl LookupOutcome {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Empty { generation }
            | Self::Ready { generation, .. }
            | Self::Stale { generation } => *generation,
        }
    }
}

/// Flatten a raw timed-text payload into caption entries.
///
/// One entry per event in order; segment texts are concatenated and an
/// event without segments yields an empty text.
pub fn normalize_captions(raw: &RawTranscript) -> Vec<CaptionEntry> {
    let Some(events) = raw.events.as_ref() else {
        return Vec::new();
    };

    events
        .iter()
        .map(|event| CaptionEntry {
            text: event
                .segs
                .as_ref()
                .map(|segs| {
                    segs.iter()
                        .filter_map(|seg| seg.utf8.as_deref())
                        .collect::<String>()
                })
                .unwrap_or_default(),
            start_offset_ms: event.t_start_ms,
            duration_ms: event.d_duration_ms,
        })
        .collect()
}

pub struct VideoLookup {
    backend: Arc<dyn YoutubeBackend>,
    generation: AtomicU64,
}

impl VideoLookup {
    pub fn new(backend: Arc<dyn YoutubeBackend>) -> Self {
        Self {
            backend,
            generation: AtomicU64::new(0),
        }
    }

    /// Generation of the most recently issued lookup
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Validate input and resolve its canonical watch URL without any network call
    pub fn normalize(input: &str) -> AppResult<String> {
        let trimmed = input.trim();
        if !is_valid_youtube_url(trimmed) {
            return Err(AppError::Validation(format!(
                "Not a YouTube video URL or id: {}",
                input
            )));
        }

        extract_video_id(trimmed)
            .map(|id| canonical_watch_url(&id))
            .ok_or_else(|| AppError::Validation(format!("No video id in: {}", input)))
    }

    /// Fetch metadata for a URL or bare id.
    pub async fn get_video_data(&self, input: &str) -> AppResult<VideoMetadataView> {
        let url = Self::normalize(input)?;
        debug!("Fetching video data for {}", url);

        self.backend.fetch_video_data(&url).await.map_err(|e| {
            error!("Error fetching video data: {}", e);
            e
        })
    }

    /// Fetch and normalize captions. Accepts a bare id or any supported URL form.
    pub async fn get_transcripts(&self, input: &str) -> AppResult<Vec<CaptionEntry>> {
        let video_id = extract_video_id(input.trim()).ok_or_else(|| {
            AppError::Validation(format!("Not a YouTube video URL or id: {}", input))
        })?;

        let raw = self.backend.fetch_captions(&video_id).await.map_err(|e| {
            error!("Error fetching transcripts: {}", e);
            e
        })?;

        let captions = normalize_captions(&raw);
        debug!("{} caption entries for {}", captions.len(), video_id);
        Ok(captions)
    }

    /// Generation-tagged metadata lookup for the dashboard.
    ///
    /// Every call takes a new ticket, so even blank or invalid input makes
    /// older in-flight lookups stale. Invalid input fails before any network
    /// call. The fetched view is returned only if no newer lookup started in
    /// the meantime.
    pub async fn lookup(&self, input: &str) -> AppResult<LookupOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if input.trim().is_empty() {
            return Ok(LookupOutcome::Empty { generation });
        }

        let url = Self::normalize(input)?;
        info!("🔎 Lookup #{} for {}", generation, url);

        let result = self.backend.fetch_video_data(&url).await;

        if generation != self.latest_generation() {
            debug!("Discarding stale lookup #{}", generation);
            return Ok(LookupOutcome::Stale { generation });
        }

        let video = result.map_err(|e| {
            error!("Error fetching video data: {}", e);
            e
        })?;
        Ok(LookupOutcome::Ready { generation, video })
    }
}
