//! Saved-video command handlers

use tauri::State;
use tracing::{error, info};

use crate::core::models::{VideoMetadataView, VideoRecord};
use crate::AppState;

/// Fetch captions for a looked-up video and save it
#[tauri::command]
pub async fn save_video(
    state: State<'_, AppState>,
    source_url: String,
    video: VideoMetadataView,
) -> Result<VideoRecord, String> {
    info!("💾 Saving video: {} ({})", video.title, video.video_id);

    match state.save_video_from_lookup(&source_url, &video).await {
        Ok(record) => {
            info!(
                "✅ Saved video {} with {} caption entries",
                video.video_id,
                record.caption_sequence.len()
            );
            Ok(record)
        }
        Err(e) => {
            error!("❌ Failed to save video: {}", e);
            Err(e.to_string())
        }
    }
}

/// All saved videos, ordered by record id
#[tauri::command]
pub async fn get_videos(state: State<'_, AppState>) -> Result<Vec<VideoRecord>, String> {
    info!("📚 Listing saved videos");

    state.persistence.get_videos().await.map_err(|e| {
        error!("❌ Failed to list videos: {}", e);
        e.to_string()
    })
}
