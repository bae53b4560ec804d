//! Subscription registry and event broadcast.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Identifies one live client connection.
pub type ConnectionId = Uuid;

/// Registry state behind the broker's lock.
///
/// A connection subscribes to at most one board at a time, so `current` is
/// a plain map; `subscribers` is its inverse, maintained together with it
/// under the same lock so broadcasts always observe a consistent snapshot.
#[derive(Default)]
struct Registry {
    /// Outbound sender handles, one per registered connection.
    connections: HashMap<ConnectionId, mpsc::Sender<String>>,
    /// board id → connections subscribed to it.
    subscribers: HashMap<u64, HashSet<ConnectionId>>,
    /// connection → the board it is currently subscribed to.
    current: HashMap<ConnectionId, u64>,
}

impl Registry {
    /// Detaches a connection from whatever board it is subscribed to.
    fn detach(&mut self, connection: ConnectionId) {
        if let Some(board_id) = self.current.remove(&connection) {
            if let Some(listeners) = self.subscribers.get_mut(&board_id) {
                listeners.remove(&connection);
                if listeners.is_empty() {
                    self.subscribers.remove(&board_id);
                }
            }
        }
    }
}

/// Routes serialized board events to the connections subscribed to the
/// affected board.
///
/// All operations are internally synchronized; delivery to an individual
/// connection is a non-blocking `try_send` into its bounded channel and
/// never happens while the registry lock is held, so one slow consumer
/// cannot stall mutation or delivery to others.
#[derive(Clone, Default)]
pub struct Broker {
    registry: Arc<RwLock<Registry>>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a connection's outbound sender handle. Must be called
    /// before the connection can subscribe.
    pub async fn register(&self, connection: ConnectionId, sender: mpsc::Sender<String>) {
        let mut registry = self.registry.write().await;
        registry.connections.insert(connection, sender);
    }

    /// Subscribes a connection to a board, replacing any prior
    /// subscription. Subscribing with the 0 sentinel leaves the connection
    /// subscribed to nothing.
    pub async fn subscribe(&self, connection: ConnectionId, board_id: u64) {
        let mut registry = self.registry.write().await;
        if !registry.connections.contains_key(&connection) {
            tracing::debug!(%connection, board_id, "ignoring subscribe from unregistered connection");
            return;
        }
        registry.detach(connection);
        if board_id != plank_types::NIL_ID {
            registry
                .subscribers
                .entry(board_id)
                .or_default()
                .insert(connection);
            registry.current.insert(connection, board_id);
        }
    }

    /// Removes a connection from whatever board it is subscribed to.
    pub async fn unsubscribe(&self, connection: ConnectionId) {
        let mut registry = self.registry.write().await;
        registry.detach(connection);
    }

    /// Detaches a connection and drops its sender handle. Called exactly
    /// once when a session's underlying transport closes.
    pub async fn remove_connection(&self, connection: ConnectionId) {
        let mut registry = self.registry.write().await;
        registry.detach(connection);
        registry.connections.remove(&connection);
    }

    /// Number of connections currently subscribed to a board.
    pub async fn subscriber_count(&self, board_id: u64) -> usize {
        let registry = self.registry.read().await;
        registry
            .subscribers
            .get(&board_id)
            .map_or(0, |listeners| listeners.len())
    }

    /// Delivers a serialized event to every connection subscribed to
    /// `board_id` as of the moment of the call.
    ///
    /// A failed delivery — the connection's channel is closed, or full
    /// after its bounded budget — is logged and the connection is
    /// proactively removed; it never aborts delivery to the remaining
    /// subscribers and never surfaces to the mutation path.
    pub async fn broadcast(&self, board_id: u64, payload: String) {
        let targets: Vec<(ConnectionId, mpsc::Sender<String>)> = {
            let registry = self.registry.read().await;
            match registry.subscribers.get(&board_id) {
                Some(listeners) => listeners
                    .iter()
                    .filter_map(|connection| {
                        registry
                            .connections
                            .get(connection)
                            .map(|sender| (*connection, sender.clone()))
                    })
                    .collect(),
                None => return,
            }
        };

        let mut failed = Vec::new();
        for (connection, sender) in targets {
            if let Err(e) = sender.try_send(payload.clone()) {
                tracing::warn!(
                    %connection,
                    board_id,
                    "dropping connection after failed delivery: {}",
                    e
                );
                failed.push(connection);
            }
        }

        if !failed.is_empty() {
            let mut registry = self.registry.write().await;
            for connection in failed {
                registry.detach(connection);
                registry.connections.remove(&connection);
            }
        }
    }
}
