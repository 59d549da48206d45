//! Caller-owned cache of open connections keyed by `(driver, name)`.

use crate::connection::Connection;
use crate::error::WeaveResult;
use std::collections::HashMap;
use std::sync::Arc;

/// Open connections keyed by driver and connection name.
///
/// The registry is a plain value: own one per application (or per test) and
/// pass it where connections are looked up.
#[derive(Debug)]
pub struct ConnectionRegistry<C: Connection> {
    connections: HashMap<(String, String), Arc<C>>,
}

impl<C: Connection> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }
}

impl<C: Connection> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, returning the one it replaced.
    pub fn insert(&mut self, driver: &str, name: &str, connection: C) -> Option<Arc<C>> {
        self.connections
            .insert(key(driver, name), Arc::new(connection))
    }

    pub fn get(&self, driver: &str, name: &str) -> Option<Arc<C>> {
        self.connections.get(&key(driver, name)).cloned()
    }

    pub fn remove(&mut self, driver: &str, name: &str) -> Option<Arc<C>> {
        self.connections.remove(&key(driver, name))
    }

    pub fn contains(&self, driver: &str, name: &str) -> bool {
        self.connections.contains_key(&key(driver, name))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Return the registered connection, or open one with `connect` and
    /// register it. A failed `connect` leaves the registry unchanged.
    pub async fn get_or_try_insert_with<F, Fut>(
        &mut self,
        driver: &str,
        name: &str,
        connect: F,
    ) -> WeaveResult<Arc<C>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = WeaveResult<C>>,
    {
        if let Some(existing) = self.get(driver, name) {
            return Ok(existing);
        }
        let connection = Arc::new(connect().await?);
        tracing::debug!(target: "sqlweave.sql", driver, name, id = connection.id(), "connection registered");
        self.connections
            .insert(key(driver, name), Arc::clone(&connection));
        Ok(connection)
    }
}

fn key(driver: &str, name: &str) -> (String, String) {
    (driver.to_string(), name.to_string())
}
