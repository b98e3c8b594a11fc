use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info};
use uuid::Uuid;

use lostfound_types::events::GatewayEvent;
use lostfound_types::models::Message;

use crate::presence::{ConnectionHandle, ConnectionId, PresenceRegistry};

/// Lifecycle of one gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, not yet bound to a user
    Connected,
    /// Live route for this user
    Registered(Uuid),
    /// Terminal
    Disconnected,
}

/// Relay-side view of one connection.
#[derive(Debug)]
pub struct RelayConnection {
    handle: ConnectionHandle,
    state: ConnectionState,
}

impl RelayConnection {
    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Queue an event on this connection's own writer.
    pub fn reply(&self, event: GatewayEvent) -> bool {
        self.handle.send(event)
    }
}

/// Outcome of a live delivery attempt. Informational only: the relay never
/// retries and callers never treat any of these as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Forwarded,
    RecipientOffline,
    SenderDisconnected,
}

/// Routes pushed messages to the recipient's live connection.
/// Owns the presence registry; nothing else writes to it.
#[derive(Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

struct RelayInner {
    presence: RwLock<PresenceRegistry>,
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl Relay {
    pub fn new() -> Self {
        Self::with_registry(PresenceRegistry::new())
    }

    pub fn with_registry(registry: PresenceRegistry) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                presence: RwLock::new(registry),
            }),
        }
    }

    /// Accept a connection. Returns it with the receiver its writer drains.
    pub fn on_connect(&self) -> (RelayConnection, mpsc::UnboundedReceiver<GatewayEvent>) {
        let (handle, rx) = ConnectionHandle::new();
        debug!("Connection {} accepted", handle.id());
        let conn = RelayConnection {
            handle,
            state: ConnectionState::Connected,
        };
        (conn, rx)
    }

    /// Bind `conn` to `user_id`. Returns false if the connection already ended.
    pub async fn on_register(&self, conn: &mut RelayConnection, user_id: Uuid) -> bool {
        if conn.state == ConnectionState::Disconnected {
            return false;
        }

        self.inner
            .presence
            .write()
            .await
            .register(user_id, conn.handle.clone());
        conn.state = ConnectionState::Registered(user_id);

        info!("User {} registered on connection {}", user_id, conn.id());
        true
    }

    /// Forward `message` verbatim to its recipient, if online.
    pub async fn on_send(&self, conn: &RelayConnection, message: Message) -> Delivery {
        if conn.state == ConnectionState::Disconnected {
            return Delivery::SenderDisconnected;
        }

        let recipient_id = message.recipient.id;
        let message_id = message.id;

        let presence = self.inner.presence.read().await;
        let delivered = presence
            .lookup(recipient_id)
            .is_some_and(|route| route.send(GatewayEvent::ReceiveMessage(message)));

        if delivered {
            debug!("Message {} forwarded to {}", message_id, recipient_id);
            Delivery::Forwarded
        } else {
            debug!("Message {} not pushed: {} is offline", message_id, recipient_id);
            Delivery::RecipientOffline
        }
    }

    /// End the connection and drop whatever presence entry it owns.
    pub async fn on_disconnect(&self, conn: &mut RelayConnection) {
        if conn.state == ConnectionState::Disconnected {
            return;
        }
        conn.state = ConnectionState::Disconnected;

        let removed = self.inner.presence.write().await.unregister(conn.id());
        match removed {
            Some(user_id) => info!("User {} went offline (connection {})", user_id, conn.id()),
            None => debug!("Connection {} closed without a live route", conn.id()),
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.presence.read().await.lookup(user_id).is_some()
    }

    /// Connection currently routing `user_id`, if any.
    pub async fn route_of(&self, user_id: Uuid) -> Option<ConnectionId> {
        self.inner
            .presence
            .read()
            .await
            .lookup(user_id)
            .map(ConnectionHandle::id)
    }

    pub async fn online_count(&self) -> usize {
        self.inner.presence.read().await.len()
    }
}
