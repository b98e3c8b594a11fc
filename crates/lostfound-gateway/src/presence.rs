use std::collections::HashMap;

use tokio::sync::mpsc;
use uuid::Uuid;

use lostfound_types::events::GatewayEvent;

pub type ConnectionId = Uuid;

/// Outbound half of a live gateway connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

impl ConnectionHandle {
    /// Creates a handle with a fresh connection id and the receiver its
    /// writer task drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GatewayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: Uuid::new_v4(),
            tx,
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue an event for this connection. Returns false if the writer is gone.
    pub fn send(&self, event: GatewayEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Which connection is the live push route for each user.
///
/// At most one connection per user; the last registration wins. A reverse
/// index keeps `unregister` O(1) and lets a stale connection disconnect
/// without evicting the connection that replaced it.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    by_user: HashMap<Uuid, ConnectionHandle>,
    by_connection: HashMap<ConnectionId, Uuid>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the route for `user_id`.
    pub fn register(&mut self, user_id: Uuid, connection: ConnectionHandle) {
        let conn_id = connection.id();

        // The connection was bound to someone else before
        if let Some(previous_user) = self.by_connection.insert(conn_id, user_id) {
            if previous_user != user_id {
                self.by_user.remove(&previous_user);
            }
        }

        // The user was routed through another connection before
        if let Some(previous) = self.by_user.insert(user_id, connection) {
            if previous.id() != conn_id {
                self.by_connection.remove(&previous.id());
            }
        }
    }

    pub fn lookup(&self, user_id: Uuid) -> Option<&ConnectionHandle> {
        self.by_user.get(&user_id)
    }

    /// Remove whatever entry `conn_id` owns. Returns the user it was routing.
    pub fn unregister(&mut self, conn_id: ConnectionId) -> Option<Uuid> {
        let user_id = self.by_connection.remove(&conn_id)?;
        self.by_user.remove(&user_id);
        Some(user_id)
    }

    pub fn user_of(&self, conn_id: ConnectionId) -> Option<Uuid> {
        self.by_connection.get(&conn_id).copied()
    }

    pub fn online_users(&self) -> Vec<Uuid> {
        self.by_user.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }
}
