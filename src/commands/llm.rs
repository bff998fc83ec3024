//! Model provider command handlers
//!
//! The provider token and chat model come from the saved settings record.

use tauri::State;
use tracing::{error, info};

use crate::core::models::{AppError, AppResult, CaptionEntry, Settings};
use crate::AppState;

async fn current_settings(state: &State<'_, AppState>) -> AppResult<Settings> {
    let settings = state.persistence.get_settings().await?.unwrap_or_default();
    if settings.model_provider_token.trim().is_empty() {
        return Err(AppError::Llm(
            "Add a model provider token on the settings page first".to_string(),
        ));
    }
    Ok(settings)
}

/// Rewrite a video's captions into dense context chunks
#[tauri::command]
pub async fn generate_context_chunks(
    state: State<'_, AppState>,
    captions: Vec<CaptionEntry>,
) -> Result<Vec<String>, String> {
    info!("🧠 Generating context chunks from {} captions", captions.len());

    let result = async {
        let settings = current_settings(&state).await?;
        state
            .llm
            .generate_context_chunks(&settings.model_provider_token, &captions)
            .await
    }
    .await;

    result.map_err(|e| {
        error!("❌ Failed to generate context chunks: {}", e);
        e.to_string()
    })
}

/// Embed text chunks with the provider's embedding model
#[tauri::command]
pub async fn generate_embedding(
    state: State<'_, AppState>,
    chunks: Vec<String>,
) -> Result<Vec<Vec<f32>>, String> {
    info!("📐 Embedding {} chunks", chunks.len());

    let result = async {
        let settings = current_settings(&state).await?;
        state
            .llm
            .generate_embedding(&settings.model_provider_token, &chunks)
            .await
    }
    .await;

    result.map_err(|e| {
        error!("❌ Failed to generate embeddings: {}", e);
        e.to_string()
    })
}

/// Answer a question about a video using the given context
#[tauri::command]
pub async fn generate_chatbot_answer(
    state: State<'_, AppState>,
    question: String,
    context: String,
) -> Result<String, String> {
    let result = async {
        let settings = current_settings(&state).await?;
        state
            .llm
            .generate_chatbot_answer(
                &settings.model_provider_token,
                &settings.model_name,
                &question,
                &context,
            )
            .await
    }
    .await;

    result.map_err(|e| {
        error!("❌ Failed to answer question: {}", e);
        e.to_string()
    })
}
