//! Sign-in command handlers
//!
//! Every command answers with the session snapshot after the operation and
//! broadcasts it as the `session-changed` event.

use tauri::{AppHandle, Manager, State};
use tracing::{error, info};

use crate::core::session::SessionSnapshot;
use crate::AppState;

pub const SESSION_CHANGED_EVENT: &str = "session-changed";

fn broadcast(app: &AppHandle, snapshot: &SessionSnapshot) {
    if let Err(e) = app.emit_all(SESSION_CHANGED_EVENT, snapshot) {
        error!("Failed to emit {} event: {}", SESSION_CHANGED_EVENT, e);
    }
}

/// Current session state
#[tauri::command]
pub async fn get_session(state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    Ok(state.session.snapshot())
}

/// Run the Google consent flow
#[tauri::command]
pub async fn sign_in(app: AppHandle, state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    info!("🔐 Sign-in requested");

    let result = state.session.sign_in().await;
    let snapshot = state.session.snapshot();
    broadcast(&app, &snapshot);

    match result {
        Ok(()) => {
            info!("✅ Signed in");
            Ok(snapshot)
        }
        Err(e) => {
            error!("❌ Sign-in failed: {}", e);
            Err(snapshot.error.unwrap_or_else(|| e.to_string()))
        }
    }
}

/// Revoke the access token and clear the session
#[tauri::command]
pub async fn sign_out(app: AppHandle, state: State<'_, AppState>) -> Result<SessionSnapshot, String> {
    info!("🚪 Sign-out requested");

    let result = state.session.sign_out().await;
    let snapshot = state.session.snapshot();
    broadcast(&app, &snapshot);

    if let Err(e) = result {
        // Local state is already cleared; the UI only needs to know
        error!("⚠️ Sign-out revoke failed: {}", e);
    }
    Ok(snapshot)
}

/// Exchange the refresh token for a new access token
#[tauri::command]
pub async fn refresh_session(
    app: AppHandle,
    state: State<'_, AppState>,
) -> Result<SessionSnapshot, String> {
    info!("🔄 Session refresh requested");

    let result = state.session.refresh().await;
    let snapshot = state.session.snapshot();
    broadcast(&app, &snapshot);

    match result {
        Ok(()) => Ok(snapshot),
        Err(e) => {
            error!("❌ Session refresh failed: {}", e);
            Err(e.to_string())
        }
    }
}
