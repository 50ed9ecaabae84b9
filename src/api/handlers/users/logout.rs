//! Logout endpoint: revoke the stored refresh token and expire both cookies.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use super::session;
use super::state::AuthState;
use super::tokens;
use crate::api::error::ApiError;
use crate::api::response::{ApiResponse, Empty};

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session revoked, cookies cleared"),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "users"
)]
pub async fn logout(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let config = auth_state.config();
    let user = session::require_auth(&headers, &pool, config).await?;

    // Revoking twice is a no-op; the cookies are cleared either way.
    tokens::revoke(&pool, user.id).await?;

    let cookies = session::clear_token_cookies(config)?;
    Ok((
        cookies,
        ApiResponse::new(StatusCode::OK, Empty {}, "User logged out successfully"),
    )
        .into_response())
}
