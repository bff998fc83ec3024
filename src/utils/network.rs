//! Network utilities and helpers

use std::time::Duration;

use crate::core::models::{AppError, AppResult};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Get user agent string
pub fn get_user_agent() -> &'static str {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
}

/// Build the shared HTTP client used by the collaborators
pub fn build_http_client(user_agent: &str, timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success response into an error carrying status and body
pub async fn ensure_success(
    response: reqwest::Response,
    describe: impl Fn(String) -> AppError,
) -> AppResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(describe(format!("HTTP {}: {}", status, body)))
}
