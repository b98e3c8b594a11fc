use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::Deserialize;

use lostfound_gateway::connection;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::verify_token;

#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    /// Browsers cannot set headers on a WebSocket handshake.
    pub token: Option<String>,
}

/// GET /gateway: authenticate at the HTTP upgrade, then hand the socket
/// to the relay.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ws: WebSocketUpgrade,
) -> ApiResult<impl IntoResponse> {
    let token = bearer
        .map(|TypedHeader(auth)| auth.token().to_string())
        .or(query.token)
        .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

    let claims = verify_token(&state.jwt_secret, &token)?;
    let relay = state.relay.clone();

    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, relay, claims.sub, claims.name)
    }))
}
