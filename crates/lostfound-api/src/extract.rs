//! Extractors whose rejections carry the structured `{error, code}` body.

use axum::{Json, extract::Path};
use axum_extra::extract::WithRejection;

use crate::error::ApiError;

pub type ApiJson<T> = WithRejection<Json<T>, ApiError>;

pub type ApiPath<T> = WithRejection<Path<T>, ApiError>;
