use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use lostfound_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use lostfound_types::models::{UserSummary, timestamp_now};

use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::rows::{format_time, parse_uuid};
use crate::{AppState, db_call};

const MIN_PASSWORD_LEN: usize = 6;
const TOKEN_LIFETIME_DAYS: i64 = 30;

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    // Validate input
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    if !email.contains('@') {
        return Err(ApiError::validation("A valid email is required"));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    // Check if email is taken
    let lookup = email.clone();
    if db_call(&state, move |db| db.get_user_by_email(&lookup)).await?.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    // Hash password with Argon2id
    let password_hash = hash_password(&req.password)?;

    let user = UserSummary {
        id: Uuid::new_v4(),
        name,
        email,
    };

    let row = user.clone();
    let created = db_call(&state, move |db| {
        db.create_user(
            &row.id.to_string(),
            &row.name,
            &row.email,
            &password_hash,
            &format_time(&timestamp_now()),
        )
    })
    .await?;
    // Lost a race with a concurrent registration for the same email
    if !created {
        return Err(ApiError::conflict("Email already registered"));
    }

    info!("Registered user {} ({})", user.name, user.id);

    let token = create_token(&state.jwt_secret, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = req.email.trim().to_lowercase();
    let row = db_call(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&row.password)
        .map_err(|e| ApiError::internal(format!("corrupt password hash for {}: {}", row.id, e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::unauthorized("Invalid credentials"))?;

    let user = UserSummary {
        id: parse_uuid(&row.id, "user id"),
        name: row.name,
        email: row.email,
    };

    let token = create_token(&state.jwt_secret, &user)?;
    Ok(Json(AuthResponse { token, user }))
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(format!("password hashing failed: {}", e)))
}

pub fn create_token(secret: &str, user: &UserSummary) -> ApiResult<String> {
    let claims = Claims {
        sub: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp()
            as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::internal(format!("token encoding failed: {}", e)))
}
