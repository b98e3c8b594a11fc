//! Headless client for the Lost & Found service: REST calls, the live
//! gateway socket, listing search and the conversation inbox model.

pub mod api_client;
pub mod error;
pub mod inbox;
pub mod live;
pub mod search;
pub mod session;

pub use api_client::ApiClient;
pub use error::{ClientError, ClientResult};
pub use inbox::{Conversation, ConversationKey, InboxEvent, InboxState, reduce};
pub use live::LiveClient;
pub use session::Identity;
