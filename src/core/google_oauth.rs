//! Google OAuth client for the desktop sign-in flow
//!
//! Authorization code flow with PKCE: the consent page is opened in the
//! system browser and the redirect is caught by a one-shot HTTP listener on
//! the loopback interface.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::config::AuthConfig;
use crate::core::models::{AppError, AppResult, TokenSet};
use crate::core::session::OAuthProvider;
use crate::utils::{build_http_client, ensure_success, get_user_agent, DEFAULT_TIMEOUT};

pub const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const REVOKE_ENDPOINT: &str = "https://oauth2.googleapis.com/revoke";

const CALLBACK_PATH: &str = "/callback";
const MAX_REQUEST_BYTES: usize = 16 * 1024;

const SUCCESS_PAGE: &str = "<html><body><h3>Signed in. You can close this window.</h3></body></html>";
const FAILURE_PAGE: &str = "<html><body><h3>Sign-in was not completed. You can close this window.</h3></body></html>";

/// Opens a URL for the user
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self, url: &str) -> AppResult<()>;
}

/// Platform default browser
pub struct SystemBrowser;

#[async_trait]
impl BrowserLauncher for SystemBrowser {
    async fn open(&self, url: &str) -> AppResult<()> {
        #[cfg(target_os = "windows")]
        let mut command = {
            let mut c = tokio::process::Command::new("rundll32");
            c.arg("url.dll,FileProtocolHandler").arg(url);
            c
        };

        #[cfg(target_os = "macos")]
        let mut command = {
            let mut c = tokio::process::Command::new("open");
            c.arg(url);
            c
        };

        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        let mut command = {
            let mut c = tokio::process::Command::new("xdg-open");
            c.arg(url);
            c
        };

        let output = command
            .output()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to open browser: {}", e)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Auth(format!("Browser command failed: {}", error)));
        }
        Ok(())
    }
}

/// Random 43-character PKCE code verifier
pub fn generate_code_verifier() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";
    let mut rng = rand::thread_rng();
    (0..43)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// S256 challenge: base64url(SHA-256(verifier)), no padding
pub fn generate_code_challenge(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

pub fn build_authorization_url(
    config: &AuthConfig,
    redirect_uri: &str,
    state: &str,
    code_challenge: &str,
) -> AppResult<Url> {
    let scope = config.scopes.join(" ");
    Url::parse_with_params(
        AUTHORIZATION_ENDPOINT,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("state", state),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| AppError::Config(format!("Invalid authorization URL: {}", e)))
}

/// Query parameters delivered to the loopback redirect
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    fn is_empty(&self) -> bool {
        self.code.is_none() && self.error.is_none()
    }
}

/// Parse the request line of the redirect (`GET /callback?code=..&state=.. HTTP/1.1`)
pub fn parse_callback_request(request: &str) -> AppResult<CallbackParams> {
    let request_line = request.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (Some(_method), Some(target)) = (parts.next(), parts.next()) else {
        return Err(AppError::Parse(format!(
            "Malformed callback request: {}",
            request_line
        )));
    };

    let url = Url::parse(&format!("http://127.0.0.1{}", target))
        .map_err(|e| AppError::Parse(format!("Malformed callback target: {}", e)))?;

    let mut params = CallbackParams::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(params)
}

/// Token endpoint response to a TokenSet. Absent fields stay `None`.
pub fn token_set_from_response(data: &Value) -> AppResult<TokenSet> {
    if let Some(error) = data.get("error").and_then(Value::as_str) {
        let description = data
            .get("error_description")
            .and_then(Value::as_str)
            .unwrap_or(error);
        return Err(AppError::Auth(description.to_string()));
    }

    let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
    let now = Utc::now();
    let expires_in = data.get("expires_in").and_then(Value::as_i64);

    Ok(TokenSet {
        access_token: text("access_token"),
        refresh_token: text("refresh_token"),
        id_token: text("id_token"),
        token_type: text("token_type"),
        scopes: text("scope").map(|s| s.split(' ').map(String::from).collect()),
        expires_in,
        issued_at: Some(now),
        expires_at: expires_in.map(|secs| now + chrono::Duration::seconds(secs)),
    })
}

/// Accept connections until one carries the OAuth redirect, answer it and return its params
pub async fn wait_for_callback(listener: &TcpListener) -> AppResult<CallbackParams> {
    'accept: loop {
        let (mut stream, peer) = listener.accept().await?;
        debug!("Callback connection from {}", peer);

        let mut buffer = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];
        loop {
            let read = match stream.read(&mut chunk).await {
                Ok(read) => read,
                Err(e) => {
                    // A broken connection is not the redirect; keep listening
                    debug!("Dropping callback connection from {}: {}", peer, e);
                    continue 'accept;
                }
            };
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
            if buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.len() >= MAX_REQUEST_BYTES {
                break;
            }
        }

        let request = String::from_utf8_lossy(&buffer);
        let params = match parse_callback_request(&request) {
            Ok(params) if !params.is_empty() => params,
            _ => {
                // Favicon and other stray requests
                let _ = stream
                    .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await;
                continue;
            }
        };

        let page = if params.code.is_some() {
            SUCCESS_PAGE
        } else {
            FAILURE_PAGE
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            page.len(),
            page
        );
        if let Err(e) = stream.write_all(response.as_bytes()).await {
            warn!("Failed to answer OAuth redirect: {}", e);
        }
        let _ = stream.shutdown().await;
        return Ok(params);
    }
}

pub struct GoogleOAuthClient {
    client: reqwest::Client,
    browser: Arc<dyn BrowserLauncher>,
}

impl GoogleOAuthClient {
    pub fn new(browser: Arc<dyn BrowserLauncher>) -> AppResult<Self> {
        Ok(Self {
            client: build_http_client(get_user_agent(), DEFAULT_TIMEOUT)?,
            browser,
        })
    }

    /// Bind the redirect listener and return it with the redirect URI to register
    async fn bind_redirect(config: &AuthConfig) -> AppResult<(TcpListener, String)> {
        match &config.redirect_uri {
            Some(uri) => {
                let parsed = Url::parse(uri)
                    .map_err(|e| AppError::Config(format!("Invalid redirect URI: {}", e)))?;
                let host = parsed.host_str().unwrap_or("127.0.0.1").to_string();
                let port = parsed.port_or_known_default().unwrap_or(80);
                let listener = TcpListener::bind((host.as_str(), port)).await?;
                Ok((listener, uri.clone()))
            }
            None => {
                let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
                let port = listener.local_addr()?.port();
                Ok((listener, format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH)))
            }
        }
    }

    async fn post_token_request(&self, form: &[(&str, &str)]) -> AppResult<TokenSet> {
        let response = self.client.post(TOKEN_ENDPOINT).form(form).send().await?;
        let status = response.status();
        let body: Value = response.json().await?;

        if !status.is_success() && body.get("error").is_none() {
            return Err(AppError::Auth(format!("Token endpoint returned HTTP {}", status)));
        }
        token_set_from_response(&body)
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuthClient {
    async fn sign_in(&self, config: &AuthConfig) -> AppResult<TokenSet> {
        if config.client_id.is_empty() {
            return Err(AppError::Config(
                "Google client id is not configured".to_string(),
            ));
        }

        let (listener, redirect_uri) = Self::bind_redirect(config).await?;
        let verifier = generate_code_verifier();
        let state = uuid::Uuid::new_v4().to_string();
        let url = build_authorization_url(
            config,
            &redirect_uri,
            &state,
            &generate_code_challenge(&verifier),
        )?;

        info!("🌐 Opening Google consent page");
        self.browser.open(url.as_str()).await?;

        let wait = Duration::from_secs(config.sign_in_timeout_seconds);
        let params = tokio::time::timeout(wait, wait_for_callback(&listener))
            .await
            .map_err(|_| AppError::Cancelled("Sign-in timed out".to_string()))??;

        if let Some(error) = params.error {
            return Err(if error == "access_denied" {
                AppError::Cancelled("Consent was denied".to_string())
            } else {
                AppError::Auth(format!("Authorization failed: {}", error))
            });
        }
        if params.state.as_deref() != Some(state.as_str()) {
            return Err(AppError::Auth("OAuth state mismatch".to_string()));
        }
        let code = params
            .code
            .ok_or_else(|| AppError::Auth("Authorization code missing".to_string()))?;

        debug!("Exchanging authorization code");
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("code_verifier", verifier.as_str()),
        ];
        if let Some(secret) = config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        self.post_token_request(&form).await
    }

    async fn sign_out(&self, access_token: &str) -> AppResult<()> {
        let response = self
            .client
            .post(REVOKE_ENDPOINT)
            .form(&[("token", access_token)])
            .send()
            .await?;
        ensure_success(response, AppError::Auth).await?;
        debug!("Access token revoked");
        Ok(())
    }

    async fn refresh_token(&self, refresh_token: &str, config: &AuthConfig) -> AppResult<TokenSet> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
        ];
        if let Some(secret) = config.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        self.post_token_request(&form).await
    }
}
