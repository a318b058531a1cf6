//! Database operations for the `platform_connections` table.

use chrono::{DateTime, Utc};
use clientpulse_core::Connection;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::store::ConnectionUpdate;
use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `platform_connections` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConnectionRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub agency_id: Uuid,
    pub platform: String,
    pub external_account_id: String,
    pub display_name: String,
    pub access_token_encrypted: String,
    pub refresh_token_encrypted: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
    pub status: String,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ConnectionRow> for Connection {
    type Error = DbError;

    fn try_from(row: ConnectionRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let invalid = |reason: String| DbError::InvalidRow {
            table: "platform_connections",
            id,
            reason,
        };
        let platform = row.platform.parse().map_err(|e| invalid(format!("{e}")))?;
        let status = row.status.parse().map_err(|e| invalid(format!("{e}")))?;

        Ok(Connection {
            id: row.id,
            client_id: row.client_id,
            agency_id: row.agency_id,
            platform,
            external_account_id: row.external_account_id,
            display_name: row.display_name,
            access_token_encrypted: row.access_token_encrypted,
            refresh_token_encrypted: row.refresh_token_encrypted,
            token_expires_at: row.token_expires_at,
            scopes: row.scopes,
            status,
            last_synced_at: row.last_synced_at,
            error_message: row.error_message,
        })
    }
}

const CONNECTION_COLUMNS: &str = "id, client_id, agency_id, platform, external_account_id, \
     display_name, access_token_encrypted, refresh_token_encrypted, token_expires_at, scopes, \
     status, last_synced_at, error_message, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns a single connection by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_connection(pool: &PgPool, id: Uuid) -> Result<Option<ConnectionRow>, DbError> {
    let row = sqlx::query_as::<_, ConnectionRow>(&format!(
        "SELECT {CONNECTION_COLUMNS} FROM platform_connections WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns every connection belonging to a client, ordered by platform.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_connections_for_client(
    pool: &PgPool,
    client_id: Uuid,
) -> Result<Vec<ConnectionRow>, DbError> {
    let rows = sqlx::query_as::<_, ConnectionRow>(&format!(
        "SELECT {CONNECTION_COLUMNS} FROM platform_connections \
         WHERE client_id = $1 \
         ORDER BY platform, created_at"
    ))
    .bind(client_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Applies the populated fields of `update` and bumps `updated_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`] if
/// the update fails.
pub async fn update_connection(
    pool: &PgPool,
    id: Uuid,
    update: &ConnectionUpdate,
) -> Result<(), DbError> {
    let mut query: QueryBuilder<'_, Postgres> =
        QueryBuilder::new("UPDATE platform_connections SET updated_at = NOW()");

    if let Some(status) = update.status {
        query.push(", status = ").push_bind(status.as_str());
    }
    if let Some(at) = update.last_synced_at {
        query.push(", last_synced_at = ").push_bind(at);
    }
    if let Some(message) = &update.error_message {
        query.push(", error_message = ").push_bind(message.clone());
    }
    if let Some(token) = &update.access_token_encrypted {
        query
            .push(", access_token_encrypted = ")
            .push_bind(token.clone());
    }
    if let Some(expires_at) = update.token_expires_at {
        query.push(", token_expires_at = ").push_bind(expires_at);
    }
    query.push(" WHERE id = ").push_bind(id);

    let result = query.build().execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
