use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use lostfound_types::api::Claims;
use lostfound_types::models::ImageRef;

use crate::AppState;
use crate::error::{ApiError, ApiResult};

/// 5 MB limit for item images
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Body limit for the upload route. Slightly above the image limit so
/// oversize images get our own 413 body rather than the extractor's.
pub const BODY_LIMIT: usize = MAX_IMAGE_SIZE + 64 * 1024;

/// POST /api/uploads: raw image bytes with an `image/*` content type.
/// Stored content-addressed under the upload dir; the returned reference
/// goes into an item's `imageUrl`.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    bytes: Bytes,
) -> ApiResult<impl IntoResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let extension = image_extension(content_type)
        .ok_or_else(|| ApiError::validation("Only png, jpeg, gif or webp images are accepted"))?;

    if bytes.is_empty() {
        return Err(ApiError::validation("Empty upload"));
    }
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::PayloadTooLarge("Image exceeds 5 MB".into()));
    }

    let digest = hex::encode(Sha256::digest(&bytes));
    let filename = format!("{}.{}", &digest[..32], extension);

    tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
        error!("Failed to create upload directory {}: {}", state.upload_dir.display(), e);
        ApiError::internal("upload directory unavailable")
    })?;

    let path = state.upload_dir.join(&filename);
    let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
        error!("Failed to create file {}: {}", path.display(), e);
        ApiError::internal("upload failed")
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", path.display(), e);
        ApiError::internal("upload failed")
    })?;

    info!("{} uploaded {} ({} bytes)", claims.sub, filename, bytes.len());

    Ok((
        StatusCode::CREATED,
        Json(ImageRef {
            url: format!("/uploads/{}", filename),
            filename,
        }),
    ))
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or_default().trim();
    match mime {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_known_image_types_are_accepted() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("image/jpeg; charset=binary"), Some("jpg"));
        assert_eq!(image_extension("application/octet-stream"), None);
        assert_eq!(image_extension(""), None);
    }
}
