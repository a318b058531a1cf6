//! Fixtures shared by the platform integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clientpulse_core::{Connection, ConnectionStatus, DateRange, Platform, TokenCipher};
use clientpulse_db::MemoryStore;
use clientpulse_platforms::{build_http_client, ApiSettings, GoogleOAuthClient, TokenProvider};
use uuid::Uuid;

pub fn cipher() -> TokenCipher {
    TokenCipher::from_key_bytes(&[7u8; 32])
}

pub fn january() -> DateRange {
    DateRange::parse("2026-01-01", "2026-01-31").expect("valid range")
}

pub fn december() -> DateRange {
    DateRange::parse("2025-12-01", "2025-12-31").expect("valid range")
}

/// A connected record whose access token encrypts `access_token`.
pub fn connection(
    platform: Platform,
    external_account_id: &str,
    access_token: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Connection {
    let cipher = cipher();
    Connection {
        id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        agency_id: Uuid::new_v4(),
        platform,
        external_account_id: external_account_id.to_string(),
        display_name: "Acme".to_string(),
        access_token_encrypted: cipher.encrypt(access_token).expect("encrypt"),
        refresh_token_encrypted: None,
        token_expires_at: expires_at,
        scopes: vec![],
        status: ConnectionStatus::Connected,
        last_synced_at: None,
        error_message: None,
    }
}

pub fn token_provider(store: Arc<MemoryStore>, token_url: &str) -> Arc<TokenProvider> {
    Arc::new(TokenProvider::new(
        store,
        cipher(),
        build_http_client(5).expect("http client"),
        GoogleOAuthClient {
            client_id: Some("test-client".to_string()),
            client_secret: Some("test-secret".to_string()),
            token_url: token_url.to_string(),
        },
    ))
}

/// Settings pointed at a mock server with no cooldown between retries.
pub fn settings(base_url: &str) -> ApiSettings {
    ApiSettings::new(base_url, Duration::ZERO)
}
