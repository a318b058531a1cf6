//! Access-token resolution.
//!
//! GA4 tokens live about an hour and are rotated here via the OAuth
//! refresh-token grant. Meta and LinkedIn tokens are long-lived and only ever
//! decrypted. Fetchers never rotate tokens themselves.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use clientpulse_core::{AppConfig, Connection, Platform, TokenCipher};
use clientpulse_db::{ConnectionStore, ConnectionUpdate};
use reqwest::Client;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::PlatformError;
use crate::http::{read_json, summarize_body};

/// Tokens expiring within this window are refreshed before use.
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// The OAuth client used for the Google refresh-token grant.
#[derive(Clone, Default)]
pub struct GoogleOAuthClient {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: String,
}

impl std::fmt::Debug for GoogleOAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleOAuthClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[redacted]"))
            .field("token_url", &self.token_url)
            .finish()
    }
}

impl GoogleOAuthClient {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            token_url: config.google_token_url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
}

/// Reads connections and hands fetchers a usable plaintext access token.
pub struct TokenProvider {
    store: Arc<dyn ConnectionStore>,
    cipher: TokenCipher,
    http: Client,
    google: GoogleOAuthClient,
}

impl TokenProvider {
    #[must_use]
    pub fn new(
        store: Arc<dyn ConnectionStore>,
        cipher: TokenCipher,
        http: Client,
        google: GoogleOAuthClient,
    ) -> Self {
        Self {
            store,
            cipher,
            http,
            google,
        }
    }

    /// Loads a connection, failing if it is missing or belongs to another platform.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Store`] if the lookup fails and
    /// [`PlatformError::ConnectionNotFound`] if there is no matching row.
    pub async fn connection(
        &self,
        platform: Platform,
        connection_id: Uuid,
    ) -> Result<Connection, PlatformError> {
        let connection = self
            .store
            .get_connection(connection_id)
            .await
            .map_err(|source| PlatformError::Store { platform, source })?;

        match connection {
            Some(c) if c.platform == platform => Ok(c),
            _ => Err(PlatformError::ConnectionNotFound {
                platform,
                connection_id,
            }),
        }
    }

    /// Returns a GA4 access token valid for at least the next few minutes,
    /// refreshing and persisting it first if needed.
    ///
    /// `None` means the platform cannot be fetched this cycle: the connection
    /// is gone, the stored token cannot be decrypted, or the refresh failed.
    pub async fn ensure_valid_token(&self, connection_id: Uuid) -> Option<String> {
        let result = match self.connection(Platform::Ga4, connection_id).await {
            Ok(connection) => self.refresh_if_needed(&connection, Utc::now()).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(token) => Some(token),
            Err(err) => {
                tracing::warn!(
                    platform = %Platform::Ga4,
                    connection_id = %connection_id,
                    error = %err,
                    "could not obtain a valid access token"
                );
                None
            }
        }
    }

    async fn refresh_if_needed(
        &self,
        connection: &Connection,
        now: DateTime<Utc>,
    ) -> Result<String, PlatformError> {
        if !needs_refresh(connection.token_expires_at, now) {
            return self
                .cipher
                .decrypt(&connection.access_token_encrypted)
                .map_err(|e| PlatformError::decryption(Platform::Ga4, &e));
        }

        tracing::info!(
            platform = %Platform::Ga4,
            connection_id = %connection.id,
            "access token expired or expiring; refreshing"
        );

        let refresh_token = connection
            .refresh_token_encrypted
            .as_deref()
            .ok_or_else(|| PlatformError::credentials(Platform::Ga4, "no refresh token stored"))?;
        let refresh_token = self
            .cipher
            .decrypt(refresh_token)
            .map_err(|e| PlatformError::decryption(Platform::Ga4, &e))?;

        let refreshed = self.exchange_refresh_token(&refresh_token).await?;
        let expires_at = expiry_after(now, refreshed.expires_in)
            .ok_or_else(|| PlatformError::credentials(Platform::Ga4, "invalid expires_in"))?;
        let sealed = self
            .cipher
            .encrypt(&refreshed.access_token)
            .map_err(|e| PlatformError::credentials(Platform::Ga4, e.to_string()))?;

        self.store
            .update_connection(
                connection.id,
                ConnectionUpdate::refreshed_token(sealed, expires_at),
            )
            .await
            .map_err(|source| PlatformError::Store {
                platform: Platform::Ga4,
                source,
            })?;

        tracing::debug!(
            connection_id = %connection.id,
            expires_at = %expires_at,
            "persisted refreshed access token"
        );

        Ok(refreshed.access_token)
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshResponse, PlatformError> {
        let (Some(client_id), Some(client_secret)) =
            (&self.google.client_id, &self.google.client_secret)
        else {
            return Err(PlatformError::credentials(
                Platform::Ga4,
                "Google OAuth client is not configured",
            ));
        };

        let response = self
            .http
            .post(&self.google.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PlatformError::http(Platform::Ga4, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::credentials(
                Platform::Ga4,
                format!("token endpoint returned {status}: {}", summarize_body(&body)),
            ));
        }

        read_json(Platform::Ga4, "token refresh", response).await
    }

    /// Decrypts a long-lived (Meta, LinkedIn) access token.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::Credentials`] without touching the network if
    /// the stored expiry has passed, or if the token cannot be decrypted.
    pub fn long_lived_token(&self, connection: &Connection) -> Result<String, PlatformError> {
        if let Some(expires_at) = connection.token_expires_at {
            if expires_at <= Utc::now() {
                return Err(PlatformError::credentials(
                    connection.platform,
                    format!("token expired at {expires_at}"),
                ));
            }
        }
        self.cipher
            .decrypt(&connection.access_token_encrypted)
            .map_err(|e| PlatformError::decryption(connection.platform, &e))
    }
}

/// `None` when `expires_in` is not a representable offset from `now`.
fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> Option<DateTime<Utc>> {
    Duration::try_seconds(expires_in).and_then(|delta| now.checked_add_signed(delta))
}

fn needs_refresh(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        None => true,
        Some(at) => at - now <= Duration::minutes(REFRESH_MARGIN_MINUTES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_expiry_needs_refresh() {
        assert!(needs_refresh(None, Utc::now()));
    }

    #[test]
    fn expiry_inside_margin_needs_refresh() {
        let now = Utc::now();
        assert!(needs_refresh(Some(now + Duration::minutes(4)), now));
        assert!(needs_refresh(Some(now - Duration::hours(1)), now));
    }

    #[test]
    fn expiry_outside_margin_is_used_as_is() {
        let now = Utc::now();
        assert!(!needs_refresh(Some(now + Duration::minutes(30)), now));
    }

    #[test]
    fn expiry_after_rejects_out_of_range_lifetimes() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, 3600), Some(now + Duration::hours(1)));
        assert!(expiry_after(now, i64::MAX).is_none());
        assert!(expiry_after(now, i64::MIN).is_none());
    }

    #[test]
    fn oauth_client_debug_redacts_secret() {
        let client = GoogleOAuthClient {
            client_id: Some("id".to_string()),
            client_secret: Some("very-secret".to_string()),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        };
        assert!(!format!("{client:?}").contains("very-secret"));
    }
}
