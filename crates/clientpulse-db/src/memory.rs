//! In-process [`ConnectionStore`] used by tests and local runs without Postgres.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use clientpulse_core::{ClientRecord, Connection};
use uuid::Uuid;

use crate::store::{ConnectionStore, ConnectionUpdate};
use crate::DbError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    clients: Mutex<HashMap<Uuid, ClientRecord>>,
    /// Insertion order stands in for `created_at`.
    connections: Mutex<Vec<Connection>>,
    fail_client_lookup: Mutex<bool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_client(&self, client: ClientRecord) {
        lock(&self.clients).insert(client.id, client);
    }

    /// Adds a connection, or replaces the one with the same id in place.
    pub fn insert_connection(&self, connection: Connection) {
        let mut connections = lock(&self.connections);
        match connections.iter_mut().find(|c| c.id == connection.id) {
            Some(existing) => *existing = connection,
            None => connections.push(connection),
        }
    }

    /// Current state of a connection, as the last update left it.
    #[must_use]
    pub fn connection(&self, id: Uuid) -> Option<Connection> {
        lock(&self.connections).iter().find(|c| c.id == id).cloned()
    }

    /// Makes every subsequent [`ConnectionStore::get_client`] call fail.
    pub fn fail_client_lookups(&self) {
        *lock(&self.fail_client_lookup) = true;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn get_connection(&self, id: Uuid) -> Result<Option<Connection>, DbError> {
        Ok(self.connection(id))
    }

    async fn list_client_connections(&self, client_id: Uuid) -> Result<Vec<Connection>, DbError> {
        let mut connections: Vec<Connection> = lock(&self.connections)
            .iter()
            .filter(|c| c.client_id == client_id)
            .cloned()
            .collect();
        // Stable sort: ties keep creation order.
        connections.sort_by_key(|c| c.platform.as_str());
        Ok(connections)
    }

    async fn update_connection(&self, id: Uuid, update: ConnectionUpdate) -> Result<(), DbError> {
        let mut connections = lock(&self.connections);
        let connection = connections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(DbError::NotFound)?;
        update.apply_to(connection);
        Ok(())
    }

    async fn get_client(&self, id: Uuid) -> Result<Option<ClientRecord>, DbError> {
        if *lock(&self.fail_client_lookup) {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(lock(&self.clients).get(&id).cloned())
    }
}
