use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::info;
use uuid::Uuid;

use lostfound_db::models::{ItemRecord, ItemRow};
use lostfound_types::api::{Claims, CreateItemRequest, StatusMessage, UpdateItemRequest};
use lostfound_types::models::{Item, ItemStatus, timestamp_now};

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::rows::{format_time, item_from_row};
use crate::{AppState, db_call};

pub async fn list_items(State(state): State<AppState>) -> ApiResult<Json<Vec<Item>>> {
    let rows = db_call(&state, |db| db.list_items()).await?;
    Ok(Json(rows.into_iter().map(item_from_row).collect()))
}

pub async fn get_item(
    State(state): State<AppState>,
    WithRejection(Path(item_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<Item>> {
    let row = fetch_item(&state, item_id).await?;
    Ok(Json(item_from_row(row)))
}

pub async fn create_item(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<CreateItemRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = req.title.trim().to_string();
    let description = req.description.trim().to_string();
    let location = req.location.trim().to_string();
    if title.is_empty() || description.is_empty() || location.is_empty() {
        return Err(ApiError::validation("Title, description and location are required"));
    }

    let id = Uuid::new_v4().to_string();
    let category = req.category.map(|c| c.trim().to_string()).unwrap_or_default();
    let status = req.status.unwrap_or_default();
    let date = format_time(&timestamp_now());
    let owner = claims.sub.to_string();
    let image = req.image_url;

    let row = db_call(&state, move |db| {
        db.insert_item(&ItemRecord {
            id: &id,
            title: &title,
            description: &description,
            category: &category,
            status: status.as_str(),
            location: &location,
            date: &date,
            image_url: image.as_ref().map(|i| i.url.as_str()),
            image_filename: image.as_ref().map(|i| i.filename.as_str()),
            posted_by: &owner,
        })?;
        db.get_item(&id)
    })
    .await?
    .ok_or_else(|| ApiError::internal("item vanished after insert"))?;

    info!("{} posted item {} ({})", claims.name, row.id, row.title);
    Ok((StatusCode::CREATED, Json(item_from_row(row))))
}

pub async fn update_item(
    State(state): State<AppState>,
    WithRejection(Path(item_id), _): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<UpdateItemRequest>,
) -> ApiResult<Json<Item>> {
    let current = fetch_owned_item(&state, item_id, &claims).await?;

    let title = pick(req.title, current.title);
    let description = pick(req.description, current.description);
    let category = pick(req.category, current.category);
    let location = pick(req.location, current.location);
    let status = match req.status {
        Some(status) => status.as_str().to_string(),
        None => current.status,
    };
    let (image_url, image_filename) = match req.image_url {
        Some(image) => (Some(image.url), Some(image.filename)),
        None => (current.image_url, current.image_filename),
    };

    let id = current.id;
    let row = db_call(&state, move |db| {
        db.update_item(&ItemRecord {
            id: &id,
            title: &title,
            description: &description,
            category: &category,
            status: &status,
            location: &location,
            date: &current.date,
            image_url: image_url.as_deref(),
            image_filename: image_filename.as_deref(),
            posted_by: &current.posted_by,
        })?;
        db.get_item(&id)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Item not found"))?;

    Ok(Json(item_from_row(row)))
}

pub async fn delete_item(
    State(state): State<AppState>,
    WithRejection(Path(item_id), _): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<StatusMessage>> {
    let current = fetch_owned_item(&state, item_id, &claims).await?;

    let removed = db_call(&state, move |db| db.delete_item(&current.id)).await?;
    if !removed {
        return Err(ApiError::not_found("Item not found"));
    }

    info!("{} deleted item {}", claims.name, item_id);
    Ok(Json(StatusMessage {
        message: "Item deleted successfully".into(),
    }))
}

/// Idempotent: an item that is already Found stays Found.
pub async fn mark_found(
    State(state): State<AppState>,
    WithRejection(Path(item_id), _): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Item>> {
    let current = fetch_owned_item(&state, item_id, &claims).await?;

    let row = db_call(&state, move |db| {
        db.set_item_status(&current.id, ItemStatus::Found.as_str())?;
        db.get_item(&current.id)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Item not found"))?;

    Ok(Json(item_from_row(row)))
}

pub(crate) async fn fetch_item(state: &AppState, item_id: Uuid) -> ApiResult<ItemRow> {
    let id = item_id.to_string();
    db_call(state, move |db| db.get_item(&id))
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))
}

async fn fetch_owned_item(state: &AppState, item_id: Uuid, claims: &Claims) -> ApiResult<ItemRow> {
    let row = fetch_item(state, item_id).await?;
    if row.posted_by != claims.sub.to_string() {
        return Err(ApiError::forbidden("Not authorized"));
    }
    Ok(row)
}

/// New value unless absent or blank.
fn pick(new: Option<String>, old: String) -> String {
    match new {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => old,
    }
}
