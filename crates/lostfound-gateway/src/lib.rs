//! Live message relay: presence tracking and push delivery over WebSocket.

pub mod connection;
pub mod presence;
pub mod relay;

pub use presence::{ConnectionHandle, ConnectionId, PresenceRegistry};
pub use relay::{ConnectionState, Delivery, Relay, RelayConnection};
