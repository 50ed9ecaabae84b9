//! Password change endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use super::session;
use super::state::AuthState;
use super::storage;
use super::types::ChangePasswordRequest;
use super::utils::{hash_password, verify_password};
use crate::api::error::ApiError;
use crate::api::response::{ApiResponse, Empty};

#[utoipa::path(
    post,
    path = "/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Old password does not match"),
        (status = 401, description = "Missing or invalid access token")
    ),
    tag = "users"
)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ChangePasswordRequest>>,
) -> Result<Response, ApiError> {
    let user = session::require_auth(&headers, &pool, auth_state.config()).await?;

    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload".to_string()));
    };

    let stored_hash = storage::lookup_password_hash(&pool, user.id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid access token".to_string()))?;

    // On mismatch the stored hash is left untouched.
    if !verify_password(&request.old_password, &stored_hash)? {
        return Err(ApiError::BadRequest("Old password is invalid".to_string()));
    }

    let new_hash = hash_password(&request.new_password)?;
    storage::update_password_hash(&pool, user.id, &new_hash).await?;

    Ok(
        ApiResponse::new(StatusCode::OK, Empty {}, "Password changed successfully")
            .into_response(),
    )
}

#[cfg(test)]
mod tests {
    use super::change_password;
    use crate::api::handlers::users::state::{AuthConfig, AuthState};
    use anyhow::Result;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    #[tokio::test]
    async fn change_password_requires_session() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let state = Arc::new(AuthState::new(AuthConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
            "http://localhost:5173".to_string(),
        )));
        let response = change_password(HeaderMap::new(), Extension(pool), Extension(state), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }
}
