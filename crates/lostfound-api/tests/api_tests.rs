//! API integration tests.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use lostfound_gateway::Delivery;
use lostfound_types::events::GatewayEvent;
use lostfound_types::models::Message;

mod common;
use common::{read_json, test_app};

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let (status, json) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_register_then_login() {
    let app = test_app();
    let (_, user_id) = app.register("Ann", "Ann@Example.com").await;

    let (status, json) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@example.com", "password": "secret123" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["token"].is_string());
    assert_eq!(json["user"]["_id"], user_id);
    assert_eq!(json["user"]["email"], "ann@example.com");
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_short_passwords() {
    let app = test_app();
    app.register("Ann", "ann@example.com").await;

    let (status, json) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ann 2", "email": "ann@example.com", "password": "secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");

    let (status, json) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "Bea", "email": "bea@example.com", "password": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_registrations_same_email() {
    let app = test_app();
    let body = || Some(json!({ "name": "Ann", "email": "ann@example.com", "password": "secret123" }));

    let (first, second) = tokio::join!(
        app.request(Method::POST, "/api/auth/register", None, body()),
        app.request(Method::POST, "/api/auth/register", None, body()),
    );

    let mut statuses = [first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);
    let loser = if first.0 == StatusCode::CONFLICT { &first.1 } else { &second.1 };
    assert_eq!(loser["code"], "CONFLICT");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = test_app();
    app.register("Ann", "ann@example.com").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let app = test_app();

    let (status, json) = app.request(Method::GET, "/api/messages/inbox", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");

    let (status, _) = app
        .request(Method::GET, "/api/messages/inbox", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::POST, "/api/items", None, Some(json!({ "title": "Keys" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_item_listing_is_public() {
    let app = test_app();
    let (token, ann_id) = app.register("Ann", "ann@example.com").await;
    let item_id = app.post_item(&token, "Blue Backpack").await;

    let (status, json) = app.request(Method::GET, "/api/items", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["_id"], item_id);
    assert_eq!(items[0]["status"], "Lost");
    assert_eq!(items[0]["postedBy"]["_id"], ann_id);
    assert_eq!(items[0]["postedBy"]["name"], "Ann");
    assert!(items[0]["imageUrl"].is_null());

    let (status, json) = app
        .request(Method::GET, &format!("/api/items/{}", item_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Blue Backpack");
}

#[tokio::test]
async fn test_item_lookup_errors() {
    let app = test_app();

    let (status, json) = app
        .request(Method::GET, &format!("/api/items/{}", Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Item not found");

    let (status, json) = app.request(Method::GET, "/api/items/not-an-id", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_malformed_json_gets_error_body() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/login")
                .method(Method::POST)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"email\": "))
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, json) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (token, _) = app.register("Ann", "ann@example.com").await;
    let (status, json) = app
        .request(Method::POST, "/api/items", Some(&token), Some(json!({ "title": 7 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_create_item_requires_fields() {
    let app = test_app();
    let (token, _) = app.register("Ann", "ann@example.com").await;

    let (status, json) = app
        .request(
            Method::POST,
            "/api/items",
            Some(&token),
            Some(json!({ "title": "Keys", "description": "  ", "location": "Library" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_only_owner_may_modify_item() {
    let app = test_app();
    let (ann, _) = app.register("Ann", "ann@example.com").await;
    let (bea, _) = app.register("Bea", "bea@example.com").await;
    let item_id = app.post_item(&ann, "Blue Backpack").await;
    let uri = format!("/api/items/{}", item_id);

    let (status, json) = app
        .request(Method::PUT, &uri, Some(&bea), Some(json!({ "title": "Mine now" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");

    let (status, _) = app.request(Method::DELETE, &uri, Some(&bea), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::PUT, &format!("{}/mark-found", uri), Some(&bea), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, json) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(json["title"], "Blue Backpack");
    assert_eq!(json["status"], "Lost");
}

#[tokio::test]
async fn test_owner_partial_update_and_delete() {
    let app = test_app();
    let (ann, _) = app.register("Ann", "ann@example.com").await;
    let item_id = app.post_item(&ann, "Blue Backpack").await;
    let uri = format!("/api/items/{}", item_id);

    let (status, json) = app
        .request(
            Method::PUT,
            &uri,
            Some(&ann),
            Some(json!({ "title": "Navy Backpack", "description": "", "status": "Returned" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Navy Backpack");
    assert_eq!(json["description"], "Navy, two straps, laptop sleeve");
    assert_eq!(json["status"], "Returned");

    let (status, json) = app.request(Method::DELETE, &uri, Some(&ann), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Item deleted successfully");

    let (status, _) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mark_found_is_idempotent() {
    let app = test_app();
    let (ann, _) = app.register("Ann", "ann@example.com").await;
    let item_id = app.post_item(&ann, "Blue Backpack").await;
    let uri = format!("/api/items/{}/mark-found", item_id);

    for _ in 0..2 {
        let (status, json) = app.request(Method::PUT, &uri, Some(&ann), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "Found");
    }

    let (_, json) = app
        .request(Method::GET, &format!("/api/items/{}", item_id), None, None)
        .await;
    assert_eq!(json["status"], "Found");
}

#[tokio::test]
async fn test_send_message_validation() {
    let app = test_app();
    let (ann, ann_id) = app.register("Ann", "ann@example.com").await;
    let (bea, _) = app.register("Bea", "bea@example.com").await;
    let item_id = app.post_item(&ann, "Blue Backpack").await;

    let (status, json) = app
        .request(
            Method::POST,
            "/api/messages",
            Some(&bea),
            Some(json!({ "itemId": item_id, "recipientId": ann_id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "All fields required");

    for blank in [
        json!({ "itemId": "", "recipientId": ann_id, "text": "hi" }),
        json!({ "itemId": item_id, "recipientId": "  ", "text": "hi" }),
        json!({ "itemId": item_id, "recipientId": ann_id, "text": "" }),
    ] {
        let (status, json) = app
            .request(Method::POST, "/api/messages", Some(&bea), Some(blank))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "All fields required");
    }

    let (status, json) = app
        .request(
            Method::POST,
            "/api/messages",
            Some(&bea),
            Some(json!({ "itemId": "item-42", "recipientId": ann_id, "text": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/messages",
            Some(&bea),
            Some(json!({ "itemId": Uuid::new_v4(), "recipientId": ann_id, "text": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = app
        .request(
            Method::POST,
            "/api/messages",
            Some(&bea),
            Some(json!({ "itemId": item_id, "recipientId": Uuid::new_v4(), "text": "hi" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Recipient not found");
}

#[tokio::test]
async fn test_messages_land_in_inbox_and_sent() {
    let app = test_app();
    let (ann, ann_id) = app.register("Ann", "ann@example.com").await;
    let (bea, bea_id) = app.register("Bea", "bea@example.com").await;
    let item_id = app.post_item(&ann, "Blue Backpack").await;

    let (status, sent) = app
        .request(
            Method::POST,
            "/api/messages",
            Some(&bea),
            Some(json!({ "itemId": item_id, "recipientId": ann_id, "text": "Found it near gate 3" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["item"]["_id"], item_id);
    assert_eq!(sent["item"]["title"], "Blue Backpack");
    assert_eq!(sent["sender"]["_id"], bea_id);
    assert_eq!(sent["recipient"]["name"], "Ann");
    assert!(sent["createdAt"].is_string());

    let (status, inbox) = app
        .request(Method::GET, "/api/messages/inbox", Some(&ann), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0], sent);

    let (_, bea_sent) = app
        .request(Method::GET, "/api/messages/sent", Some(&bea), None)
        .await;
    assert_eq!(bea_sent[0], sent);

    let (_, bea_inbox) = app
        .request(Method::GET, "/api/messages/inbox", Some(&bea), None)
        .await;
    assert!(bea_inbox.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_rest_write_then_live_push() {
    let app = test_app();
    let (ann, ann_id) = app.register("Ann", "ann@example.com").await;
    let (bea, _) = app.register("Bea", "bea@example.com").await;
    let item_id = app.post_item(&ann, "Blue Backpack").await;

    let relay = app.state.relay.clone();
    let (mut ann_conn, mut ann_rx) = relay.on_connect();
    relay.on_register(&mut ann_conn, ann_id.parse().unwrap()).await;

    let (_, written) = app
        .request(
            Method::POST,
            "/api/messages",
            Some(&bea),
            Some(json!({ "itemId": item_id, "recipientId": ann_id, "text": "Found it near gate 3" })),
        )
        .await;
    let message: Message = serde_json::from_value(written).unwrap();

    let (bea_conn, _bea_rx) = relay.on_connect();
    assert_eq!(relay.on_send(&bea_conn, message.clone()).await, Delivery::Forwarded);

    match ann_rx.recv().await {
        Some(GatewayEvent::ReceiveMessage(pushed)) => {
            assert_eq!(pushed.text, "Found it near gate 3");
            assert_eq!(pushed, message);
        }
        other => panic!("expected a pushed message, got {:?}", other),
    }
}

#[tokio::test]
async fn test_gateway_requires_token() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/gateway")
                .method(Method::GET)
                .header(header::CONNECTION, "upgrade")
                .header(header::UPGRADE, "websocket")
                .header(header::SEC_WEBSOCKET_VERSION, "13")
                .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_ne!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
}

#[tokio::test]
async fn test_image_upload_and_serve() {
    let app = test_app();
    let (ann, _) = app.register("Ann", "ann@example.com").await;
    let png = b"\x89PNG\r\n\x1a\nnot really a png".to_vec();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/uploads")
                .method(Method::POST)
                .header(header::AUTHORIZATION, format!("Bearer {}", ann))
                .header(header::CONTENT_TYPE, "image/png")
                .body(Body::from(png.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, json) = read_json(response).await;
    assert_eq!(status, StatusCode::CREATED);
    let url = json["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".png"));

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let served = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(served.as_ref(), png.as_slice());
}

#[tokio::test]
async fn test_image_upload_limits() {
    let app = test_app();
    let (ann, _) = app.register("Ann", "ann@example.com").await;

    let upload = |content_type: &'static str, body: Vec<u8>| {
        Request::builder()
            .uri("/api/uploads")
            .method(Method::POST)
            .header(header::AUTHORIZATION, format!("Bearer {}", ann))
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap()
    };

    let response = app
        .router
        .clone()
        .oneshot(upload("text/plain", b"hello".to_vec()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let too_big = vec![0u8; lostfound_api::uploads::MAX_IMAGE_SIZE + 1];
    let response = app
        .router
        .clone()
        .oneshot(upload("image/jpeg", too_big))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
