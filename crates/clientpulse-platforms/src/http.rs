//! Shared HTTP plumbing: the one `reqwest::Client` every fetcher borrows, and
//! per-platform endpoint settings.

use std::time::Duration;

use clientpulse_core::{AppConfig, Platform};
use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::PlatformError;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "clientpulse/0.1 (report-fetch)";

/// Builds the HTTP client shared by token refresh and all fetchers.
///
/// # Errors
///
/// Returns [`reqwest::Error`] if the client cannot be constructed.
pub fn build_http_client(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
}

/// Where a platform lives and how long to wait after it rate-limits us.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub rate_limit_cooldown: Duration,
}

impl ApiSettings {
    #[must_use]
    pub fn new(base_url: &str, rate_limit_cooldown: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limit_cooldown,
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig, platform: Platform) -> Self {
        let (base_url, cooldown_secs) = match platform {
            Platform::Ga4 => (&config.ga4_api_base_url, config.ga4_rate_limit_cooldown_secs),
            Platform::Meta => (
                &config.meta_api_base_url,
                config.meta_rate_limit_cooldown_secs,
            ),
            Platform::LinkedIn => (
                &config.linkedin_api_base_url,
                config.linkedin_rate_limit_cooldown_secs,
            ),
        };
        Self::new(base_url, Duration::from_secs(cooldown_secs))
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Whether `url` lives under the configured base URL, so it is safe to
    /// send credentials to.
    pub(crate) fn owns(&self, url: &str) -> bool {
        url.strip_prefix(&self.base_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?']))
    }
}

/// Reads a successful response body and parses it as `T`.
pub(crate) async fn read_json<T: DeserializeOwned>(
    platform: Platform,
    context: &str,
    response: reqwest::Response,
) -> Result<T, PlatformError> {
    let body = response
        .text()
        .await
        .map_err(|e| PlatformError::http(platform, e))?;
    serde_json::from_str(&body).map_err(|source| PlatformError::Deserialize {
        platform,
        context: context.to_string(),
        source,
    })
}

/// Truncates an upstream error body so it stays readable in the UI.
pub(crate) fn summarize_body(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        return trimmed.to_string();
    }
    let mut short: String = trimmed.chars().take(MAX_CHARS).collect();
    short.push_str("...");
    short
}
