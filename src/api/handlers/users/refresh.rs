//! Refresh endpoint: rotate the refresh token and reset both cookies.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use super::session::{self, REFRESH_COOKIE_NAME};
use super::state::AuthState;
use super::tokens;
use super::types::{RefreshRequest, TokenPairData};
use crate::api::error::ApiError;
use crate::api::response::ApiResponse;

#[utoipa::path(
    post,
    path = "/refresh-token",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair issued", body = TokenPairData),
        (status = 401, description = "Missing, invalid, or already-used refresh token")
    ),
    tag = "users"
)]
pub async fn refresh_token(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RefreshRequest>>,
) -> Result<Response, ApiError> {
    let presented = session::cookie_value(&headers, REFRESH_COOKIE_NAME)
        .or_else(|| payload.and_then(|Json(request)| request.refresh_token))
        .filter(|token| !token.trim().is_empty());

    let Some(presented) = presented else {
        return Err(ApiError::Unauthorized(
            "No refresh token provided".to_string(),
        ));
    };

    let config = auth_state.config();
    let (_user, pair) = tokens::rotate_refresh_token(&pool, config, &presented).await?;
    let cookies = session::token_pair_cookies(config, &pair)?;

    let data = TokenPairData {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    };

    Ok((
        cookies,
        ApiResponse::new(StatusCode::OK, data, "Access token refreshed successfully"),
    )
        .into_response())
}
