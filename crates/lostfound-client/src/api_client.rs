use reqwest::{Client, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use lostfound_types::api::{
    AuthResponse, CreateItemRequest, ErrorBody, LoginRequest, RegisterRequest, SendMessageRequest,
    StatusMessage, UpdateItemRequest,
};
use lostfound_types::models::{ImageRef, Item, Message};

use crate::error::{ClientError, ClientResult};
use crate::session::Identity;

/// REST client. Holds the bearer token once logged in.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:5000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    // -- Auth --

    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> ClientResult<Identity> {
        let body = RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        };
        let auth: AuthResponse = self.send(self.http.post(self.url("/api/auth/register")).json(&body)).await?;
        Ok(self.adopt(auth))
    }

    pub async fn login(&mut self, email: &str, password: &str) -> ClientResult<Identity> {
        let body = LoginRequest {
            email: email.into(),
            password: password.into(),
        };
        let auth: AuthResponse = self.send(self.http.post(self.url("/api/auth/login")).json(&body)).await?;
        Ok(self.adopt(auth))
    }

    pub fn logout(&mut self) {
        self.token = None;
    }

    fn adopt(&mut self, auth: AuthResponse) -> Identity {
        let identity = Identity::from(&auth);
        debug!("Logged in as {} ({})", identity.name, identity.id);
        self.token = Some(auth.token);
        identity
    }

    // -- Items --

    pub async fn list_items(&self) -> ClientResult<Vec<Item>> {
        self.send(self.http.get(self.url("/api/items"))).await
    }

    pub async fn get_item(&self, id: Uuid) -> ClientResult<Item> {
        self.send(self.http.get(self.url(&format!("/api/items/{}", id)))).await
    }

    pub async fn create_item(&self, req: &CreateItemRequest) -> ClientResult<Item> {
        let builder = self.http.post(self.url("/api/items")).json(req);
        self.send(self.authed(builder)?).await
    }

    pub async fn update_item(&self, id: Uuid, req: &UpdateItemRequest) -> ClientResult<Item> {
        let builder = self.http.put(self.url(&format!("/api/items/{}", id))).json(req);
        self.send(self.authed(builder)?).await
    }

    pub async fn delete_item(&self, id: Uuid) -> ClientResult<StatusMessage> {
        let builder = self.http.delete(self.url(&format!("/api/items/{}", id)));
        self.send(self.authed(builder)?).await
    }

    pub async fn mark_found(&self, id: Uuid) -> ClientResult<Item> {
        let builder = self.http.put(self.url(&format!("/api/items/{}/mark-found", id)));
        self.send(self.authed(builder)?).await
    }

    /// Upload an image for use as an item's `imageUrl`.
    pub async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> ClientResult<ImageRef> {
        let builder = self
            .http
            .post(self.url("/api/uploads"))
            .header(header::CONTENT_TYPE, content_type)
            .body(bytes);
        self.send(self.authed(builder)?).await
    }

    // -- Messages --

    /// Durable write. The returned payload is what to emit on the gateway.
    pub async fn send_message(&self, item_id: Uuid, recipient_id: Uuid, text: &str) -> ClientResult<Message> {
        let body = SendMessageRequest {
            item_id: Some(item_id.to_string()),
            recipient_id: Some(recipient_id.to_string()),
            text: Some(text.into()),
        };
        let builder = self.http.post(self.url("/api/messages")).json(&body);
        self.send(self.authed(builder)?).await
    }

    pub async fn inbox(&self) -> ClientResult<Vec<Message>> {
        let builder = self.http.get(self.url("/api/messages/inbox"));
        self.send(self.authed(builder)?).await
    }

    pub async fn sent(&self) -> ClientResult<Vec<Message>> {
        let builder = self.http.get(self.url("/api/messages/sent"));
        self.send(self.authed(builder)?).await
    }

    /// Inbox and sent together, for `InboxEvent::HistoryLoaded`.
    pub async fn fetch_history(&self) -> ClientResult<Vec<Message>> {
        let (inbox, sent) = tokio::try_join!(self.inbox(), self.sent())?;
        let mut history = inbox;
        history.extend(sent);
        Ok(history)
    }

    // -- Plumbing --

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, builder: RequestBuilder) -> ClientResult<RequestBuilder> {
        let token = self.token.as_ref().ok_or(ClientError::NotAuthenticated)?;
        Ok(builder.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let resp = builder.send().await?;
        if resp.status().is_success() {
            Ok(resp.json().await?)
        } else {
            Err(error_from(resp).await)
        }
    }
}

async fn error_from(resp: Response) -> ClientError {
    let status = resp.status().as_u16();
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => ClientError::Api {
            status,
            code: body.code,
            message: body.error,
        },
        Err(_) => ClientError::Api {
            status,
            code: "UNKNOWN".into(),
            message: text,
        },
    }
}
