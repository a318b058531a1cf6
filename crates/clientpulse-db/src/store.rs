//! The persistence interface consumed by token refresh and the orchestrator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clientpulse_core::{ClientRecord, Connection, ConnectionStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A partial update to a connection record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionUpdate {
    pub status: Option<ConnectionStatus>,
    pub last_synced_at: Option<DateTime<Utc>>,
    /// `Some(None)` clears the stored message.
    pub error_message: Option<Option<String>>,
    pub access_token_encrypted: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
}

impl ConnectionUpdate {
    /// A successful fetch: healthy, freshly synced, no error.
    #[must_use]
    pub fn synced(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(ConnectionStatus::Connected),
            last_synced_at: Some(at),
            error_message: Some(None),
            ..Self::default()
        }
    }

    /// A failed fetch, with the message shown to the user.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(ConnectionStatus::Error),
            error_message: Some(Some(message.into())),
            ..Self::default()
        }
    }

    /// A rotated access token; the connection is healthy again.
    #[must_use]
    pub fn refreshed_token(access_token_encrypted: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token_encrypted: Some(access_token_encrypted),
            token_expires_at: Some(expires_at),
            status: Some(ConnectionStatus::Connected),
            error_message: Some(None),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, connection: &mut Connection) {
        if let Some(status) = self.status {
            connection.status = status;
        }
        if let Some(at) = self.last_synced_at {
            connection.last_synced_at = Some(at);
        }
        if let Some(message) = &self.error_message {
            connection.error_message.clone_from(message);
        }
        if let Some(token) = &self.access_token_encrypted {
            connection.access_token_encrypted.clone_from(token);
        }
        if let Some(expires_at) = self.token_expires_at {
            connection.token_expires_at = Some(expires_at);
        }
    }
}

/// Row-level access to clients and their platform connections.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn get_connection(&self, id: Uuid) -> Result<Option<Connection>, DbError>;

    /// All connections for a client, regardless of status.
    async fn list_client_connections(&self, client_id: Uuid) -> Result<Vec<Connection>, DbError>;

    /// # Errors
    ///
    /// Implementations return [`DbError::NotFound`] when no row has `id`.
    async fn update_connection(&self, id: Uuid, update: ConnectionUpdate) -> Result<(), DbError>;

    async fn get_client(&self, id: Uuid) -> Result<Option<ClientRecord>, DbError>;
}

/// [`ConnectionStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionStore for PgStore {
    async fn get_connection(&self, id: Uuid) -> Result<Option<Connection>, DbError> {
        crate::connections::get_connection(&self.pool, id)
            .await?
            .map(Connection::try_from)
            .transpose()
    }

    async fn list_client_connections(&self, client_id: Uuid) -> Result<Vec<Connection>, DbError> {
        crate::connections::list_connections_for_client(&self.pool, client_id)
            .await?
            .into_iter()
            .map(Connection::try_from)
            .collect()
    }

    async fn update_connection(&self, id: Uuid, update: ConnectionUpdate) -> Result<(), DbError> {
        crate::connections::update_connection(&self.pool, id, &update).await
    }

    async fn get_client(&self, id: Uuid) -> Result<Option<ClientRecord>, DbError> {
        Ok(crate::clients::get_client(&self.pool, id)
            .await?
            .map(ClientRecord::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clientpulse_core::Platform;

    fn connection() -> Connection {
        Connection {
            id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            agency_id: Uuid::new_v4(),
            platform: Platform::Ga4,
            external_account_id: "properties/1".to_string(),
            display_name: "Acme site".to_string(),
            access_token_encrypted: "old".to_string(),
            refresh_token_encrypted: Some("refresh".to_string()),
            token_expires_at: None,
            scopes: vec![],
            status: ConnectionStatus::Error,
            last_synced_at: None,
            error_message: Some("previous failure".to_string()),
        }
    }

    #[test]
    fn synced_update_clears_error_and_marks_connected() {
        let mut c = connection();
        let now = Utc::now();
        ConnectionUpdate::synced(now).apply_to(&mut c);
        assert_eq!(c.status, ConnectionStatus::Connected);
        assert_eq!(c.last_synced_at, Some(now));
        assert!(c.error_message.is_none());
        assert_eq!(c.access_token_encrypted, "old");
    }

    #[test]
    fn failed_update_keeps_last_synced_at() {
        let mut c = connection();
        let earlier = Utc::now();
        c.last_synced_at = Some(earlier);
        ConnectionUpdate::failed("Meta Ads rate limit reached").apply_to(&mut c);
        assert_eq!(c.status, ConnectionStatus::Error);
        assert_eq!(c.last_synced_at, Some(earlier));
        assert_eq!(
            c.error_message.as_deref(),
            Some("Meta Ads rate limit reached")
        );
    }

    #[test]
    fn refreshed_token_clears_error_status() {
        let mut c = connection();
        let expiry = Utc::now();
        ConnectionUpdate::refreshed_token("new".to_string(), expiry).apply_to(&mut c);
        assert_eq!(c.access_token_encrypted, "new");
        assert_eq!(c.token_expires_at, Some(expiry));
        assert_eq!(c.status, ConnectionStatus::Connected);
        assert!(c.error_message.is_none());
    }
}
