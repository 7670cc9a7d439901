//! Client registry
//!
//! Thread-safe store of currently connected participants. Every mutation and
//! snapshot goes through one lock; snapshots copy `Arc`s so delivery happens
//! after the lock is released.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::debug;
use tokio::sync::Mutex;

use crate::client::{Client, SessionId};
use crate::error::RegistryError;

/// Registry for tracking live sessions, ordered by session id.
#[derive(Clone)]
pub struct ClientRegistry {
    clients: Arc<Mutex<BTreeMap<SessionId, Arc<Client>>>>,
    max_clients: usize,
}

impl ClientRegistry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: Arc::new(Mutex::new(BTreeMap::new())),
            max_clients,
        }
    }

    /// Registers a client. Fails on a reused session id or when the registry is full.
    pub async fn add(&self, client: Arc<Client>) -> Result<(), RegistryError> {
        let mut clients = self.clients.lock().await;

        if clients.contains_key(&client.id()) {
            return Err(RegistryError::DuplicateSession(client.id()));
        }
        if clients.len() >= self.max_clients {
            return Err(RegistryError::Full(self.max_clients));
        }

        debug!(
            "Registered session {} ({}/{} sessions)",
            client.id(),
            clients.len() + 1,
            self.max_clients
        );
        clients.insert(client.id(), client);
        Ok(())
    }

    /// Removes a client and closes its outbound path. Absent ids are ignored.
    ///
    /// The outbound path is closed before this returns, so no routing that
    /// completes afterwards can enqueue anything for the removed session.
    pub async fn remove(&self, id: SessionId) -> Option<Arc<Client>> {
        let mut clients = self.clients.lock().await;
        let removed = clients.remove(&id);
        if let Some(client) = &removed {
            client.outbound().close();
            debug!("Removed session {} ({} remaining)", id, clients.len());
        }
        removed
    }

    /// All registered clients except `excluding`, in session-id order.
    pub async fn snapshot(&self, excluding: SessionId) -> Vec<Arc<Client>> {
        let clients = self.clients.lock().await;
        clients
            .iter()
            .filter(|(id, _)| **id != excluding)
            .map(|(_, client)| Arc::clone(client))
            .collect()
    }

    pub async fn contains(&self, id: SessionId) -> bool {
        self.clients.lock().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }
}
