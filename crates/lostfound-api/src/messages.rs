use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;
use uuid::Uuid;

use lostfound_types::api::{Claims, SendMessageRequest};
use lostfound_types::models::{Message, timestamp_now};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::items::fetch_item;
use crate::rows::{format_time, message_from_row};
use crate::{AppState, db_call};

/// Durable write of a message. Live delivery is the sender's job: it emits
/// the returned payload on the gateway as `sendMessage`.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let item_id = required(req.item_id.as_deref());
    let recipient_id = required(req.recipient_id.as_deref());
    let text = required(req.text.as_deref());
    let (Some(item_id), Some(recipient_id), Some(text)) = (item_id, recipient_id, text) else {
        return Err(ApiError::validation("All fields required"));
    };
    let item_id = parse_id(item_id, "itemId")?;
    let recipient_id = parse_id(recipient_id, "recipientId")?;
    let text = text.to_string();
    if recipient_id == claims.sub {
        return Err(ApiError::validation("Cannot send a message to yourself"));
    }

    fetch_item(&state, item_id).await?;

    let recipient = recipient_id.to_string();
    if db_call(&state, move |db| db.get_user_by_id(&recipient)).await?.is_none() {
        return Err(ApiError::not_found("Recipient not found"));
    }

    let message_id = Uuid::new_v4().to_string();
    let sender = claims.sub.to_string();
    let created_at = format_time(&timestamp_now());

    let row = db_call(&state, move |db| {
        db.insert_message(
            &message_id,
            &item_id.to_string(),
            &sender,
            &recipient_id.to_string(),
            &text,
            &created_at,
        )?;
        db.get_message(&message_id)
    })
    .await?
    .ok_or_else(|| ApiError::internal("message vanished after insert"))?;

    info!("{} -> {} message {} about item {}", claims.sub, recipient_id, row.id, item_id);
    Ok((StatusCode::CREATED, Json(message_from_row(row))))
}

/// Trimmed value, or None when absent or blank.
fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_id(raw: &str, field: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation(format!("Invalid {}", field)))
}

/// Messages the caller received.
pub async fn inbox(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Message>>> {
    let user = claims.sub.to_string();
    let rows = db_call(&state, move |db| db.get_inbox(&user)).await?;
    Ok(Json(rows.into_iter().map(message_from_row).collect()))
}

/// Messages the caller sent.
pub async fn sent(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Message>>> {
    let user = claims.sub.to_string();
    let rows = db_call(&state, move |db| db.get_sent(&user)).await?;
    Ok(Json(rows.into_iter().map(message_from_row).collect()))
}
