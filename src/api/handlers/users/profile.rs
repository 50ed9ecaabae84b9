//! Profile endpoints: current user, account details, avatar and cover image.

use anyhow::Context;
use axum::{
    extract::{Extension, Multipart},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use super::register::spool_named_field;
use super::session;
use super::state::AuthState;
use super::storage::{self, UpdateOutcome};
use super::types::{PublicUser, UpdateAccountRequest};
use super::utils::{normalize_email, valid_email};
use crate::api::error::ApiError;
use crate::api::response::ApiResponse;
use crate::media::MediaStore;

#[utoipa::path(
    get,
    path = "/current-user",
    responses(
        (status = 200, description = "Authenticated user profile", body = PublicUser),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "users"
)]
pub async fn current_user(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Response, ApiError> {
    let user = session::require_auth(&headers, &pool, auth_state.config()).await?;
    Ok(
        ApiResponse::new(StatusCode::OK, user, "Current user fetched successfully")
            .into_response(),
    )
}

#[utoipa::path(
    patch,
    path = "/update-account",
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account details updated", body = PublicUser),
        (status = 400, description = "Missing or invalid fields"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 409, description = "Email already in use")
    ),
    tag = "users"
)]
pub async fn update_account(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<UpdateAccountRequest>>,
) -> Result<Response, ApiError> {
    let user = session::require_auth(&headers, &pool, auth_state.config()).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload".to_string()));
    };

    let full_name = request.full_name.trim().to_string();
    let email = normalize_email(&request.email);
    if full_name.is_empty() || email.is_empty() {
        return Err(ApiError::BadRequest(
            "Full name and email are required".to_string(),
        ));
    }
    if !valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email".to_string()));
    }

    let updated = match storage::update_account(&pool, user.id, &full_name, &email).await? {
        UpdateOutcome::Updated(updated) => updated,
        UpdateOutcome::EmailTaken => {
            return Err(ApiError::Conflict("Email already in use".to_string()));
        }
    };

    Ok(ApiResponse::new(
        StatusCode::OK,
        updated,
        "Account details updated successfully",
    )
    .into_response())
}

#[utoipa::path(
    patch,
    path = "/avatar",
    responses(
        (status = 200, description = "Avatar updated", body = PublicUser),
        (status = 400, description = "Avatar file missing"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 500, description = "Upload failure")
    ),
    tag = "users"
)]
pub async fn update_avatar(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    media: Extension<Arc<dyn MediaStore>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let user = session::require_auth(&headers, &pool, auth_state.config()).await?;

    let Some(file) = spool_named_field(multipart, "avatar").await? else {
        return Err(ApiError::BadRequest("Avatar file is missing".to_string()));
    };

    let uploaded = media.upload(&file).await.context("avatar upload failed")?;
    let updated = storage::update_avatar(&pool, user.id, &uploaded.url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ApiResponse::new(StatusCode::OK, updated, "Avatar updated successfully").into_response())
}

#[utoipa::path(
    patch,
    path = "/cover-image",
    responses(
        (status = 200, description = "Cover image updated", body = PublicUser),
        (status = 400, description = "Cover image file missing"),
        (status = 401, description = "Missing or invalid access token"),
        (status = 500, description = "Upload failure")
    ),
    tag = "users"
)]
pub async fn update_cover_image(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    media: Extension<Arc<dyn MediaStore>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let user = session::require_auth(&headers, &pool, auth_state.config()).await?;

    let Some(file) = spool_named_field(multipart, "coverImage").await? else {
        return Err(ApiError::BadRequest(
            "Cover image file is missing".to_string(),
        ));
    };

    let uploaded = media.upload(&file).await.context("cover upload failed")?;
    let updated = storage::update_cover_image(&pool, user.id, &uploaded.url)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(
        ApiResponse::new(StatusCode::OK, updated, "Cover image updated successfully")
            .into_response(),
    )
}
