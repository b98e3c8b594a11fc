use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lostfound_types::api::AuthResponse;
use lostfound_types::models::UserSummary;

/// The logged-in viewer, as verified by the server at login or register.
/// Handed to whatever needs to know who "me" is; never decoded from the
/// token on the client side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<UserSummary> for Identity {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

impl From<&AuthResponse> for Identity {
    fn from(auth: &AuthResponse) -> Self {
        auth.user.clone().into()
    }
}
