//! Database operations for the `clients` table.

use chrono::{DateTime, Utc};
use clientpulse_core::ClientRecord;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `clients` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClientRow {
    pub id: Uuid,
    pub agency_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClientRow> for ClientRecord {
    fn from(row: ClientRow) -> Self {
        Self {
            id: row.id,
            agency_id: row.agency_id,
            name: row.name,
        }
    }
}

/// Returns a single client by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_client(pool: &PgPool, id: Uuid) -> Result<Option<ClientRow>, DbError> {
    let row = sqlx::query_as::<_, ClientRow>(
        "SELECT id, agency_id, name, created_at, updated_at FROM clients WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
