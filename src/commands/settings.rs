//! Settings command handlers

use serde::Serialize;
use tauri::State;
use tracing::{error, info};

use crate::core::models::{Settings, MODEL_CHOICES};
use crate::AppState;

/// One entry of the model picker
#[derive(Debug, Clone, Serialize)]
pub struct ModelChoice {
    pub value: String,
    pub label: String,
}

/// Read the settings record. `None` when it has not been written yet.
#[tauri::command]
pub async fn get_settings(state: State<'_, AppState>) -> Result<Option<Settings>, String> {
    info!("⚙️ Getting settings");

    match state.persistence.get_settings().await {
        Ok(settings) => Ok(settings),
        Err(e) => {
            error!("❌ Failed to read settings: {}", e);
            Err(e.to_string())
        }
    }
}

/// Save the model-provider fields of the settings form
#[tauri::command]
pub async fn save_settings(
    state: State<'_, AppState>,
    model_provider_token: String,
    model_name: String,
) -> Result<Settings, String> {
    info!("💾 Saving settings (model: {})", model_name);

    match state
        .persistence
        .update_model_settings(model_provider_token, model_name)
        .await
    {
        Ok(settings) => {
            info!("✅ Settings saved");
            Ok(settings)
        }
        Err(e) => {
            error!("❌ Failed to save settings: {}", e);
            Err(e.to_string())
        }
    }
}

/// Models offered on the settings page
#[tauri::command]
pub fn get_model_choices() -> Vec<ModelChoice> {
    MODEL_CHOICES
        .iter()
        .map(|(value, label)| ModelChoice {
            value: value.to_string(),
            label: label.to_string(),
        })
        .collect()
}
