//! Test utilities and common setup.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use lostfound_api::{AppState, AppStateInner};
use lostfound_db::Database;
use lostfound_gateway::Relay;

pub const TEST_SECRET: &str = "test-secret-for-integration-tests";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    // Keeps the upload dir alive for the test's duration
    _uploads: TempDir,
}

/// Fresh app over an in-memory store.
pub fn test_app() -> TestApp {
    let uploads = tempfile::tempdir().unwrap();
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: TEST_SECRET.to_string(),
        relay: Relay::new(),
        upload_dir: uploads.path().to_path_buf(),
    });

    TestApp {
        router: lostfound_api::router(state.clone()),
        state,
        _uploads: uploads,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri).method(method);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        read_json(response).await
    }

    /// Registers a user; returns (token, user id).
    pub async fn register(&self, name: &str, email: &str) -> (String, String) {
        let (status, json) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", json);

        (
            json["token"].as_str().unwrap().to_string(),
            json["user"]["_id"].as_str().unwrap().to_string(),
        )
    }

    /// Posts a Lost item; returns its id.
    pub async fn post_item(&self, token: &str, title: &str) -> String {
        let (status, json) = self
            .request(
                Method::POST,
                "/api/items",
                Some(token),
                Some(json!({
                    "title": title,
                    "description": "Navy, two straps, laptop sleeve",
                    "category": "Bags",
                    "location": "Terminal B"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create item failed: {}", json);
        json["_id"].as_str().unwrap().to_string()
    }
}

pub async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}
