//! Database helpers for credential records and profile fields.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::types::PublicUser;
use super::utils::is_unique_violation;

/// Outcome when attempting to create a new user record.
#[derive(Debug)]
pub(super) enum InsertOutcome {
    Created(PublicUser),
    Conflict,
}

/// Outcome for account-detail updates, where the new email may collide.
#[derive(Debug)]
pub(super) enum UpdateOutcome {
    Updated(PublicUser),
    EmailTaken,
}

/// Fields needed to verify a login attempt.
pub(super) struct CredentialRecord {
    pub(super) id: Uuid,
    pub(super) password_hash: String,
}

/// User plus the currently stored refresh token, loaded during rotation.
pub(crate) struct RefreshRecord {
    pub(crate) user: PublicUser,
    pub(crate) refresh_token: Option<String>,
}

const PUBLIC_COLUMNS: &str =
    "id, username, email, full_name, avatar_url, cover_image_url";

fn public_user(row: &sqlx::postgres::PgRow) -> PublicUser {
    PublicUser {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        avatar: row.get("avatar_url"),
        cover_image: row.get("cover_image_url"),
    }
}

/// Create the schema on startup so a fresh database is usable immediately.
pub(crate) async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let query = r"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            refresh_token TEXT,
            avatar_url TEXT NOT NULL,
            cover_image_url TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "CREATE",
        db.statement = query
    );
    sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to create users table")?;
    Ok(())
}

pub(super) struct NewUser<'a> {
    pub(super) username: &'a str,
    pub(super) email: &'a str,
    pub(super) full_name: &'a str,
    pub(super) password_hash: &'a str,
    pub(super) avatar_url: &'a str,
    pub(super) cover_image_url: &'a str,
}

/// Insert a user, mapping the unique-violation race to a conflict outcome so
/// concurrent registrations never create two rows.
pub(super) async fn insert_user(pool: &PgPool, user: NewUser<'_>) -> Result<InsertOutcome> {
    let query = format!(
        r"
        INSERT INTO users
            (username, email, full_name, password_hash, avatar_url, cover_image_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {PUBLIC_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user.username)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.password_hash)
        .bind(user.avatar_url)
        .bind(user.cover_image_url)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(InsertOutcome::Created(public_user(&row))),
        Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(super) async fn username_or_email_taken(
    pool: &PgPool,
    username: &str,
    email: &str,
) -> Result<bool> {
    let query = "SELECT 1 FROM users WHERE username = $1 OR email = $2 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check username/email uniqueness")?;
    Ok(row.is_some())
}

/// Look up login credentials by username or email, whichever was provided.
pub(super) async fn lookup_credentials(
    pool: &PgPool,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<Option<CredentialRecord>> {
    let query = r"
        SELECT id, password_hash
        FROM users
        WHERE ($1::text IS NOT NULL AND username = $1)
           OR ($2::text IS NOT NULL AND email = $2)
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup credentials")?;

    Ok(row.map(|row| CredentialRecord {
        id: row.get("id"),
        password_hash: row.get("password_hash"),
    }))
}

/// Public profile view: password and refresh token are never selected.
pub(crate) async fn lookup_public(pool: &PgPool, user_id: Uuid) -> Result<Option<PublicUser>> {
    let query = format!("SELECT {PUBLIC_COLUMNS} FROM users WHERE id = $1 LIMIT 1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user")?;
    Ok(row.map(|row| public_user(&row)))
}

pub(crate) async fn lookup_refresh_record(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<RefreshRecord>> {
    let query = format!("SELECT {PUBLIC_COLUMNS}, refresh_token FROM users WHERE id = $1 LIMIT 1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup refresh record")?;

    Ok(row.map(|row| RefreshRecord {
        user: public_user(&row),
        refresh_token: row.get("refresh_token"),
    }))
}

/// Updates keyed on `id` must touch exactly one row; zero means the user row
/// vanished underneath the request.
fn ensure_single_row(rows_affected: u64, operation: &str) -> Result<()> {
    anyhow::ensure!(rows_affected == 1, "{operation} matched no user");
    Ok(())
}

/// Overwrite the stored refresh token: at most one live value per user.
pub(crate) async fn store_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    refresh_token: &str,
) -> Result<()> {
    let query = "UPDATE users SET refresh_token = $2, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(refresh_token)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store refresh token")?;

    ensure_single_row(result.rows_affected(), "refresh token update")
}

/// Logout is idempotent; clearing an already-cleared token still matches the
/// row and is a no-op. Only a missing user row is an error.
pub(crate) async fn clear_refresh_token(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = "UPDATE users SET refresh_token = NULL, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear refresh token")?;

    ensure_single_row(result.rows_affected(), "refresh token clear")
}

pub(super) async fn lookup_password_hash(pool: &PgPool, user_id: Uuid) -> Result<Option<String>> {
    let query = "SELECT password_hash FROM users WHERE id = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup password hash")?;
    Ok(row.map(|row| row.get("password_hash")))
}

/// Narrow-scope update: only the hash changes, nothing else is revalidated.
pub(super) async fn update_password_hash(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let query = "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password hash")?;

    ensure_single_row(result.rows_affected(), "password hash update")
}

pub(super) async fn update_account(
    pool: &PgPool,
    user_id: Uuid,
    full_name: &str,
    email: &str,
) -> Result<UpdateOutcome> {
    let query = format!(
        r"
        UPDATE users
        SET full_name = $2, email = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {PUBLIC_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .bind(full_name)
        .bind(email)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(UpdateOutcome::Updated(public_user(&row))),
        Err(err) if is_unique_violation(&err) => Ok(UpdateOutcome::EmailTaken),
        Err(err) => Err(err).context("failed to update account details"),
    }
}

pub(super) async fn update_avatar(
    pool: &PgPool,
    user_id: Uuid,
    avatar_url: &str,
) -> Result<Option<PublicUser>> {
    update_image_column(pool, user_id, "avatar_url", avatar_url).await
}

pub(super) async fn update_cover_image(
    pool: &PgPool,
    user_id: Uuid,
    cover_image_url: &str,
) -> Result<Option<PublicUser>> {
    update_image_column(pool, user_id, "cover_image_url", cover_image_url).await
}

async fn update_image_column(
    pool: &PgPool,
    user_id: Uuid,
    column: &str,
    url: &str,
) -> Result<Option<PublicUser>> {
    // `column` is one of two compile-time literals, never user input.
    let query = format!(
        r"
        UPDATE users
        SET {column} = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {PUBLIC_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .bind(url)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .with_context(|| format!("failed to update {column}"))?;
    Ok(row.map(|row| public_user(&row)))
}

#[cfg(test)]
mod tests {
    use super::{InsertOutcome, UpdateOutcome};
    use crate::api::handlers::users::types::PublicUser;
    use uuid::Uuid;

    fn user() -> PublicUser {
        PublicUser {
            id: Uuid::nil(),
            username: "chai".to_string(),
            email: "chai@example.com".to_string(),
            full_name: "Chai Aur Code".to_string(),
            avatar: "https://media.test/avatar.png".to_string(),
            cover_image: String::new(),
        }
    }

    #[test]
    fn insert_outcome_debug_names() {
        assert!(format!("{:?}", InsertOutcome::Created(user())).starts_with("Created"));
        assert_eq!(format!("{:?}", InsertOutcome::Conflict), "Conflict");
    }

    #[test]
    fn update_outcome_debug_names() {
        assert!(format!("{:?}", UpdateOutcome::Updated(user())).starts_with("Updated"));
        assert_eq!(format!("{:?}", UpdateOutcome::EmailTaken), "EmailTaken");
    }

    #[test]
    fn single_row_guard_rejects_zero_matches() {
        assert!(super::ensure_single_row(1, "password hash update").is_ok());
        assert!(super::ensure_single_row(0, "password hash update").is_err());
    }
}
