//! Client-to-platform connection records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// An external system a client can connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "ga4")]
    Ga4,
    #[serde(rename = "meta")]
    Meta,
    #[serde(rename = "linkedin")]
    LinkedIn,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Ga4, Platform::Meta, Platform::LinkedIn];

    /// Stable identifier used in storage and JSON.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Ga4 => "ga4",
            Platform::Meta => "meta",
            Platform::LinkedIn => "linkedin",
        }
    }

    /// Name shown to agency users in error messages.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Platform::Ga4 => "Google Analytics",
            Platform::Meta => "Meta Ads",
            Platform::LinkedIn => "LinkedIn Ads",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ga4" => Ok(Platform::Ga4),
            "meta" => Ok(Platform::Meta),
            "linkedin" => Ok(Platform::LinkedIn),
            other => Err(CoreError::InvalidPlatform(other.to_string())),
        }
    }
}

/// Health of a connection as last observed by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Error,
    Expired,
}

impl ConnectionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
            ConnectionStatus::Expired => "expired",
        }
    }
}

impl FromStr for ConnectionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "connected" => Ok(ConnectionStatus::Connected),
            "error" => Ok(ConnectionStatus::Error),
            "expired" => Ok(ConnectionStatus::Expired),
            other => Err(CoreError::InvalidConnectionStatus(other.to_string())),
        }
    }
}

/// One authorized link between a client and a platform account.
///
/// Tokens are stored encrypted; see [`crate::TokenCipher`].
#[derive(Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub client_id: Uuid,
    pub agency_id: Uuid,
    pub platform: Platform,
    pub external_account_id: String,
    pub display_name: String,
    pub access_token_encrypted: String,
    pub refresh_token_encrypted: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
    pub status: ConnectionStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("client_id", &self.client_id)
            .field("agency_id", &self.agency_id)
            .field("platform", &self.platform)
            .field("external_account_id", &self.external_account_id)
            .field("display_name", &self.display_name)
            .field("access_token_encrypted", &"[redacted]")
            .field(
                "refresh_token_encrypted",
                &self.refresh_token_encrypted.as_ref().map(|_| "[redacted]"),
            )
            .field("token_expires_at", &self.token_expires_at)
            .field("scopes", &self.scopes)
            .field("status", &self.status)
            .field("last_synced_at", &self.last_synced_at)
            .field("error_message", &self.error_message)
            .finish()
    }
}

/// The slice of a client record the report core needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn platform_serializes_to_slot_name() {
        assert_eq!(
            serde_json::to_string(&Platform::LinkedIn).unwrap(),
            "\"linkedin\""
        );
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "paused".parse::<ConnectionStatus>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidConnectionStatus(ref s) if s == "paused"));
    }

    #[test]
    fn debug_output_redacts_tokens() {
        let connection = Connection {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            agency_id: Uuid::new_v4(),
            platform: Platform::Meta,
            external_account_id: "act_1".to_string(),
            display_name: "Acme".to_string(),
            access_token_encrypted: "secret-ciphertext".to_string(),
            refresh_token_encrypted: Some("other-secret".to_string()),
            token_expires_at: None,
            scopes: vec![],
            status: ConnectionStatus::Connected,
            last_synced_at: None,
            error_message: None,
        };
        let debug = format!("{connection:?}");
        assert!(!debug.contains("secret-ciphertext"));
        assert!(!debug.contains("other-secret"));
    }
}
