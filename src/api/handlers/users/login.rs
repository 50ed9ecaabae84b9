//! Login endpoint: credential check, token pair issuance, auth cookies.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use super::session;
use super::state::AuthState;
use super::storage;
use super::tokens;
use super::types::{LoginData, LoginRequest};
use super::utils::{normalize_email, verify_password};
use crate::api::error::ApiError;
use crate::api::response::ApiResponse;

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, cookies set", body = LoginData),
        (status = 400, description = "Username or email missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 404, description = "No matching user")
    ),
    tag = "users"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload".to_string()));
    };

    let username = request
        .username
        .as_deref()
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty());
    let email = request
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|value| !value.is_empty());
    if username.is_none() && email.is_none() {
        return Err(ApiError::BadRequest(
            "Username or email is required".to_string(),
        ));
    }

    let record = storage::lookup_credentials(&pool, username.as_deref(), email.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !verify_password(&request.password, &record.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Invalid user credentials".to_string(),
        ));
    }

    let user = storage::lookup_public(&pool, record.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let config = auth_state.config();
    let pair = tokens::issue_token_pair(&pool, config, &user).await?;
    let cookies = session::token_pair_cookies(config, &pair)?;

    let data = LoginData {
        user,
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((
        cookies,
        ApiResponse::new(StatusCode::OK, data, "User logged in successfully"),
    )
        .into_response())
}
