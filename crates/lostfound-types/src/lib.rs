//! Types shared by the server, the gateway and the client library.

pub mod api;
pub mod events;
pub mod models;
