//! Session state holder
//!
//! Owns the current OAuth token set and the identity decoded from its ID
//! token. The interactive work (consent screen, token issuance, revocation)
//! is delegated to an [`OAuthProvider`]. Every token change is published on a
//! watch channel so other services can mirror it.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::core::config::AuthConfig;
use crate::core::models::{AppError, AppResult, IdentityClaims, TokenSet};
use crate::utils::decode_token_payload;

pub const CANCELLED_MESSAGE: &str = "User cancelled the sign-in process";
pub const NO_REFRESH_TOKEN_MESSAGE: &str = "No refresh token available";

/// Identity provider operations the session relies on
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Run the interactive sign-in. User abort is `AppError::Cancelled`.
    async fn sign_in(&self, config: &AuthConfig) -> AppResult<TokenSet>;

    /// Revoke the given access token
    async fn sign_out(&self, access_token: &str) -> AppResult<()>;

    /// Exchange a refresh token; the response may omit unchanged fields
    async fn refresh_token(&self, refresh_token: &str, config: &AuthConfig)
        -> AppResult<TokenSet>;
}

/// Point-in-time view of the session for the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub tokens: Option<TokenSet>,
    pub user: Option<IdentityClaims>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    tokens: Option<TokenSet>,
    user: Option<IdentityClaims>,
    loading: bool,
    error: Option<String>,
}

pub struct SessionStore {
    provider: Arc<dyn OAuthProvider>,
    config: AuthConfig,
    state: RwLock<SessionState>,
    tokens_tx: watch::Sender<Option<TokenSet>>,
}

/// Clears the loading flag on every exit path
struct LoadingGuard<'a> {
    state: &'a RwLock<SessionState>,
}

impl<'a> LoadingGuard<'a> {
    fn enter(state: &'a RwLock<SessionState>) -> Self {
        let mut guard = state.write();
        guard.loading = true;
        guard.error = None;
        Self { state }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.write().loading = false;
    }
}

impl SessionStore {
    pub fn new(provider: Arc<dyn OAuthProvider>, config: AuthConfig) -> Self {
        let (tokens_tx, _) = watch::channel(None);
        Self {
            provider,
            config,
            state: RwLock::new(SessionState::default()),
            tokens_tx,
        }
    }

    /// Subscribe to token changes. The receiver starts with the current value marked seen.
    pub fn subscribe(&self) -> watch::Receiver<Option<TokenSet>> {
        self.tokens_tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .tokens
            .as_ref()
            .map(TokenSet::is_authenticated)
            .unwrap_or(false)
    }

    pub fn tokens(&self) -> Option<TokenSet> {
        self.state.read().tokens.clone()
    }

    pub fn user(&self) -> Option<IdentityClaims> {
        self.state.read().user.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        SessionSnapshot {
            is_authenticated: state
                .tokens
                .as_ref()
                .map(TokenSet::is_authenticated)
                .unwrap_or(false),
            tokens: state.tokens.clone(),
            user: state.user.clone(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    /// Interactive sign-in. On failure the previous session is left as it was.
    pub async fn sign_in(&self) -> AppResult<()> {
        let _loading = LoadingGuard::enter(&self.state);
        info!("🔐 Starting sign-in");

        match self.provider.sign_in(&self.config).await {
            Ok(tokens) => {
                let user = tokens.id_token.as_deref().map(decode_identity);
                {
                    let mut state = self.state.write();
                    state.tokens = Some(tokens.clone());
                    state.user = user;
                }
                self.publish(Some(tokens));
                info!("✅ Sign-in successful");
                Ok(())
            }
            Err(e) => {
                let message = match &e {
                    AppError::Cancelled(_) => CANCELLED_MESSAGE.to_string(),
                    other => other.to_string(),
                };
                error!("❌ Sign in failed: {}", message);
                self.record_error(message);
                Err(e)
            }
        }
    }

    /// Best-effort logout: revoke remotely, then always clear local state.
    pub async fn sign_out(&self) -> AppResult<()> {
        let _loading = LoadingGuard::enter(&self.state);
        info!("🚪 Signing out");

        let access_token = self
            .state
            .read()
            .tokens
            .as_ref()
            .and_then(|t| t.access_token.clone())
            .filter(|t| !t.is_empty());

        let revoke_result = match access_token {
            Some(token) => self.provider.sign_out(&token).await,
            None => {
                debug!("No access token held, skipping revoke");
                Ok(())
            }
        };

        {
            let mut state = self.state.write();
            state.tokens = None;
            state.user = None;
        }
        self.publish(None);

        if let Err(ref e) = revoke_result {
            warn!("Token revoke failed, local session cleared anyway: {}", e);
            self.record_error(e.to_string());
        } else {
            info!("✅ User signed out");
        }
        revoke_result
    }

    /// Refresh the access token, keeping fields the provider does not resend.
    pub async fn refresh(&self) -> AppResult<()> {
        let _loading = LoadingGuard::enter(&self.state);

        let refresh_token = self
            .state
            .read()
            .tokens
            .as_ref()
            .and_then(|t| t.refresh_token.clone())
            .filter(|t| !t.is_empty());

        let Some(refresh_token) = refresh_token else {
            self.record_error(NO_REFRESH_TOKEN_MESSAGE.to_string());
            return Err(AppError::Auth(NO_REFRESH_TOKEN_MESSAGE.to_string()));
        };

        info!("🔄 Refreshing access token");
        match self
            .provider
            .refresh_token(&refresh_token, &self.config)
            .await
        {
            Ok(update) => {
                let merged = {
                    let mut state = self.state.write();
                    let refreshed_user = update.id_token.as_deref().map(decode_identity);
                    let mut tokens = state.tokens.take().unwrap_or_default();
                    tokens.merge(update);
                    state.tokens = Some(tokens.clone());
                    if refreshed_user.is_some() {
                        state.user = refreshed_user;
                    }
                    tokens
                };
                self.publish(Some(merged));
                info!("✅ Tokens refreshed");
                Ok(())
            }
            Err(e) => {
                error!("❌ Token refresh failed: {}", e);
                self.record_error(e.to_string());
                Err(e)
            }
        }
    }

    /// Replace the token set with a persisted one. No validation, no refresh.
    pub fn restore_session(&self, tokens: TokenSet) {
        let _loading = LoadingGuard::enter(&self.state);
        debug!("Restoring persisted session");

        let user = tokens.id_token.as_deref().map(decode_identity);
        {
            let mut state = self.state.write();
            state.tokens = Some(tokens.clone());
            state.user = user;
        }
        self.publish(Some(tokens));
    }

    fn record_error(&self, message: String) {
        self.state.write().error = Some(message);
    }

    fn publish(&self, tokens: Option<TokenSet>) {
        self.tokens_tx.send_replace(tokens);
    }
}

/// Decode identity claims from an ID token; unreadable tokens yield empty claims.
pub fn decode_identity(id_token: &str) -> IdentityClaims {
    match decode_token_payload(id_token) {
        Some(payload) => serde_json::from_value(payload).unwrap_or_else(|e| {
            warn!("ID token payload is not a claims object: {}", e);
            IdentityClaims::default()
        }),
        None => {
            warn!("Failed to parse ID token");
            IdentityClaims::default()
        }
    }
}
