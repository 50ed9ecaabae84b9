//! Registration endpoint: multipart form with avatar/cover uploads.

use anyhow::Context;
use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use std::sync::Arc;

use super::storage::{self, InsertOutcome, NewUser};
use super::types::PublicUser;
use super::utils::{hash_password, normalize_email, valid_email};
use crate::api::error::ApiError;
use crate::api::response::ApiResponse;
use crate::media::{MediaStore, SpooledFile};

struct RegisterForm {
    full_name: String,
    username: String,
    email: String,
    password: String,
    avatar: Option<SpooledFile>,
    cover_image: Option<SpooledFile>,
}

async fn read_form(mut multipart: Multipart) -> Result<RegisterForm, ApiError> {
    let mut form = RegisterForm {
        full_name: String::new(),
        username: String::new(),
        email: String::new(),
        password: String::new(),
        avatar: None,
        cover_image: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Invalid multipart payload: {err}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "fullName" => form.full_name = field_text(field).await?,
            "username" => form.username = field_text(field).await?,
            "email" => form.email = field_text(field).await?,
            "password" => form.password = field_text(field).await?,
            "avatar" => form.avatar = Some(spool_field(field).await?),
            "coverImage" => form.cover_image = Some(spool_field(field).await?),
            _ => {}
        }
    }

    Ok(form)
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Invalid multipart payload: {err}")))
}

/// Spool an uploaded file field to disk; removal happens on drop, covering
/// both the success and the failure path.
pub(super) async fn spool_field(
    field: axum::extract::multipart::Field<'_>,
) -> Result<SpooledFile, ApiError> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Invalid multipart payload: {err}")))?;
    Ok(SpooledFile::write(&file_name, &bytes).await?)
}

/// Find and spool a single named file field, ignoring everything else.
pub(super) async fn spool_named_field(
    mut multipart: Multipart,
    name: &str,
) -> Result<Option<SpooledFile>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("Invalid multipart payload: {err}")))?
    {
        if field.name() == Some(name) {
            return Ok(Some(spool_field(field).await?));
        }
    }
    Ok(None)
}

#[utoipa::path(
    post,
    path = "/register",
    responses(
        (status = 201, description = "User registered", body = PublicUser),
        (status = 400, description = "Missing fields or avatar"),
        (status = 409, description = "Username or email already exists"),
        (status = 500, description = "Store or upload failure")
    ),
    tag = "users"
)]
pub async fn register(
    pool: Extension<PgPool>,
    media: Extension<Arc<dyn MediaStore>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(multipart).await?;

    let full_name = form.full_name.trim().to_string();
    let username = form.username.trim().to_lowercase();
    let email = normalize_email(&form.email);
    // The password is validated trimmed but hashed as sent.
    if full_name.is_empty()
        || username.is_empty()
        || email.is_empty()
        || form.password.trim().is_empty()
    {
        return Err(ApiError::BadRequest("All fields are required".to_string()));
    }
    if !valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email".to_string()));
    }

    if storage::username_or_email_taken(&pool, &username, &email).await? {
        return Err(ApiError::Conflict(
            "Username or email already exists".to_string(),
        ));
    }

    let Some(avatar) = form.avatar.as_ref() else {
        return Err(ApiError::BadRequest("Avatar file is required".to_string()));
    };

    // Upload failures abort the whole registration; no partial user row.
    let avatar_url = media
        .upload(avatar)
        .await
        .context("avatar upload failed")?
        .url;
    let cover_image_url = match form.cover_image.as_ref() {
        Some(file) => media.upload(file).await.context("cover upload failed")?.url,
        None => String::new(),
    };

    let password_hash = hash_password(&form.password)?;

    // The uniqueness pre-check above is advisory; the insert settles races.
    match storage::insert_user(
        &pool,
        NewUser {
            username: &username,
            email: &email,
            full_name: &full_name,
            password_hash: &password_hash,
            avatar_url: &avatar_url,
            cover_image_url: &cover_image_url,
        },
    )
    .await?
    {
        InsertOutcome::Created(user) => Ok(ApiResponse::new(
            StatusCode::CREATED,
            user,
            "User registered successfully",
        )
        .into_response()),
        InsertOutcome::Conflict => Err(ApiError::Conflict(
            "Username or email already exists".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::register;
    use crate::media::{MediaStore, SpooledFile, UploadedMedia};
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::{Extension, FromRequest, Multipart};
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    struct StaticMediaStore;

    #[async_trait]
    impl MediaStore for StaticMediaStore {
        async fn upload(&self, _file: &SpooledFile) -> Result<UploadedMedia> {
            Ok(UploadedMedia {
                url: "https://media.test/upload.png".to_string(),
            })
        }
    }

    const BOUNDARY: &str = "test-boundary";

    fn form_body(fields: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    async fn multipart_from(fields: &[(&str, &str)]) -> Result<Multipart> {
        let request = Request::builder()
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form_body(fields)))?;
        Multipart::from_request(request, &())
            .await
            .map_err(|err| anyhow::anyhow!("{err}"))
    }

    async fn register_status(fields: &[(&str, &str)]) -> Result<StatusCode> {
        // Validation fails before any query, so a lazy pool never connects.
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let media: Arc<dyn MediaStore> = Arc::new(StaticMediaStore);
        let multipart = multipart_from(fields).await?;
        let response = register(Extension(pool), Extension(media), multipart)
            .await
            .into_response();
        Ok(response.status())
    }

    #[tokio::test]
    async fn register_rejects_blank_password() -> Result<()> {
        // Whitespace-only counts as blank, same as the empty string.
        for password in ["", "   "] {
            let status = register_status(&[
                ("fullName", "Chai Aur Code"),
                ("username", "chai"),
                ("email", "chai@example.com"),
                ("password", password),
            ])
            .await?;
            assert_eq!(status, StatusCode::BAD_REQUEST, "password {password:?}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_missing_fields() -> Result<()> {
        let status = register_status(&[("username", "chai"), ("password", "hunter2")]).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() -> Result<()> {
        let status = register_status(&[
            ("fullName", "Chai Aur Code"),
            ("username", "chai"),
            ("email", "not-an-email"),
            ("password", "hunter2"),
        ])
        .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }
}
