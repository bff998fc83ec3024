//! Configuration command handlers
//!
//! This module provides commands for managing the application configuration
//! file: getting, updating, resetting, and importing/exporting it.

use tauri::{AppHandle, State};
use tracing::{error, info, warn};

use crate::core::{
    config::AppConfig,
    models::{AppError, AppResult},
};
use crate::AppState;

/// Get current application configuration
#[tauri::command]
pub async fn get_config(_app: AppHandle, state: State<'_, AppState>) -> Result<AppConfig, String> {
    info!("⚙️ Getting application configuration");

    let config = state.config.read().await;
    Ok(config.clone())
}

/// Update application configuration
#[tauri::command]
pub async fn update_config(
    _app: AppHandle,
    state: State<'_, AppState>,
    new_config: AppConfig,
) -> Result<(), String> {
    info!("🔧 Updating application configuration");

    match update_config_impl(&state, new_config).await {
        Ok(()) => {
            info!("✅ Configuration updated successfully");
            Ok(())
        }
        Err(e) => {
            error!("❌ Failed to update configuration: {}", e);
            Err(e.to_string())
        }
    }
}

/// Reset configuration to default values
#[tauri::command]
pub async fn reset_config(
    _app: AppHandle,
    state: State<'_, AppState>,
) -> Result<AppConfig, String> {
    info!("🔄 Resetting configuration to defaults");

    match reset_config_impl(&state).await {
        Ok(config) => {
            info!("✅ Configuration reset successfully");
            Ok(config)
        }
        Err(e) => {
            error!("❌ Failed to reset configuration: {}", e);
            Err(e.to_string())
        }
    }
}

/// Export configuration to file
#[tauri::command]
pub async fn export_config(
    _app: AppHandle,
    state: State<'_, AppState>,
    file_path: String,
) -> Result<(), String> {
    info!("💾 Exporting configuration to: {}", file_path);

    match export_config_impl(&state, &file_path).await {
        Ok(()) => {
            info!("✅ Configuration exported successfully");
            Ok(())
        }
        Err(e) => {
            error!("❌ Failed to export configuration: {}", e);
            Err(e.to_string())
        }
    }
}

/// Import configuration from file
#[tauri::command]
pub async fn import_config(
    _app: AppHandle,
    state: State<'_, AppState>,
    file_path: String,
) -> Result<AppConfig, String> {
    info!("📂 Importing configuration from: {}", file_path);

    match import_config_impl(&state, &file_path).await {
        Ok(config) => {
            info!("✅ Configuration imported successfully");
            Ok(config)
        }
        Err(e) => {
            error!("❌ Failed to import configuration: {}", e);
            Err(e.to_string())
        }
    }
}

// Implementation functions

/// Swap the in-memory config for one that is already on disk
async fn apply_config(state: &State<'_, AppState>, new_config: AppConfig) {
    let mut config = state.config.write().await;
    if config.auth.client_id != new_config.auth.client_id
        || config.datastore.data_dir != new_config.datastore.data_dir
    {
        warn!("⚠️ Sign-in and datastore changes take effect on next launch");
    }
    *config = new_config;
}

async fn update_config_impl(state: &State<'_, AppState>, new_config: AppConfig) -> AppResult<()> {
    new_config
        .validate()
        .map_err(|e| AppError::Config(e.to_string()))?;
    new_config
        .save()
        .map_err(|e| AppError::Config(format!("Failed to save configuration: {}", e)))?;

    apply_config(state, new_config).await;
    Ok(())
}

async fn reset_config_impl(state: &State<'_, AppState>) -> AppResult<AppConfig> {
    let default_config =
        AppConfig::reset().map_err(|e| AppError::Config(format!("{:#}", e)))?;

    apply_config(state, default_config.clone()).await;
    Ok(default_config)
}

async fn export_config_impl(state: &State<'_, AppState>, file_path: &str) -> AppResult<()> {
    let json_data = {
        let config = state.config.read().await;
        config
            .export()
            .map_err(|e| AppError::Config(format!("Failed to serialize configuration: {}", e)))?
    };

    tokio::fs::write(file_path, json_data).await?;
    Ok(())
}

async fn import_config_impl(state: &State<'_, AppState>, file_path: &str) -> AppResult<AppConfig> {
    if !tokio::fs::try_exists(file_path).await? {
        return Err(AppError::Config(format!(
            "Configuration file not found: {}",
            file_path
        )));
    }

    let content = tokio::fs::read_to_string(file_path).await?;
    let imported_config =
        AppConfig::import(&content).map_err(|e| AppError::Config(format!("{:#}", e)))?;

    apply_config(state, imported_config.clone()).await;
    Ok(imported_config)
}
