use clientpulse_core::{CryptoError, Platform};
use clientpulse_db::DbError;
use thiserror::Error;
use uuid::Uuid;

/// Everything that can stop a platform fetch.
///
/// The `Display` text is what the agency user sees next to the failed
/// platform, so every variant names the platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Token expired, revoked, undecryptable, or refused upstream.
    #[error("{platform} access has expired or been revoked. Please reconnect {platform}.")]
    Credentials { platform: Platform, reason: String },

    /// Rate limited even after the single retry.
    #[error("{platform} rate limit reached. Please try again later.")]
    RateLimited { platform: Platform },

    #[error("{platform} API error (HTTP {status}): {message}")]
    Upstream {
        platform: Platform,
        status: u16,
        message: String,
    },

    #[error("{platform} returned an unexpected response for {context}: {source}")]
    Deserialize {
        platform: Platform,
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{platform} returned an invalid {field} value \"{value}\" for {context}")]
    InvalidField {
        platform: Platform,
        context: String,
        field: String,
        value: String,
    },

    /// Network failure or timeout. The URL is stripped before storing since
    /// some platforms take the access token as a query parameter.
    #[error("{platform} request failed: {source}")]
    Http {
        platform: Platform,
        #[source]
        source: reqwest::Error,
    },

    #[error("{platform} connection {connection_id} not found")]
    ConnectionNotFound {
        platform: Platform,
        connection_id: Uuid,
    },

    #[error("{platform} connection could not be loaded: {source}")]
    Store {
        platform: Platform,
        #[source]
        source: DbError,
    },
}

impl PlatformError {
    pub(crate) fn http(platform: Platform, source: reqwest::Error) -> Self {
        Self::Http {
            platform,
            source: source.without_url(),
        }
    }

    pub(crate) fn credentials(platform: Platform, reason: impl Into<String>) -> Self {
        Self::Credentials {
            platform,
            reason: reason.into(),
        }
    }

    pub(crate) fn decryption(platform: Platform, err: &CryptoError) -> Self {
        Self::credentials(platform, err.to_string())
    }

    pub(crate) fn invalid_field(
        platform: Platform,
        context: &str,
        field: &str,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            platform,
            context: context.to_string(),
            field: field.to_string(),
            value: value.into(),
        }
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        match self {
            Self::Credentials { platform, .. }
            | Self::RateLimited { platform }
            | Self::Upstream { platform, .. }
            | Self::Deserialize { platform, .. }
            | Self::InvalidField { platform, .. }
            | Self::Http { platform, .. }
            | Self::ConnectionNotFound { platform, .. }
            | Self::Store { platform, .. } => *platform,
        }
    }

    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    #[must_use]
    pub fn is_credentials(&self) -> bool {
        matches!(self, Self::Credentials { .. })
    }
}
