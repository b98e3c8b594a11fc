pub mod auth;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod items;
pub mod messages;
pub mod middleware;
pub mod rows;
pub mod uploads;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;
use tracing::error;

use lostfound_db::Database;
use lostfound_gateway::Relay;
use lostfound_types::api::HealthResponse;

use crate::error::ApiError;
use crate::middleware::require_auth;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub relay: Relay,
    pub upload_dir: PathBuf,
}

/// Run a store call off the async runtime.
pub(crate) async fn db_call<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal("blocking task failed")
        })?
        .map_err(ApiError::Store)
}

/// Full HTTP surface: REST under `/api`, the gateway socket, uploaded images.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/items", get(items::list_items))
        .route("/items/{id}", get(items::get_item));

    let protected_routes = Router::new()
        .route("/items", post(items::create_item))
        .route("/items/{id}", put(items::update_item).delete(items::delete_item))
        .route("/items/{id}/mark-found", put(items::mark_found))
        .route("/messages", post(messages::send_message))
        .route("/messages/inbox", get(messages::inbox))
        .route("/messages/sent", get(messages::sent))
        .route(
            "/uploads",
            post(uploads::upload_image).layer(DefaultBodyLimit::max(uploads::BODY_LIMIT)),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .route("/gateway", get(gateway::ws_upgrade))
        .route("/health", get(health))
        .nest_service("/uploads", ServeDir::new(&state.upload_dir))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
