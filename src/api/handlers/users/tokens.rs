//! Access/refresh token lifecycle: issuance, verification, rotation, revocation.
//!
//! Access tokens are self-contained and never persisted. Refresh tokens are
//! signed with a distinct secret and stored verbatim on the user row; a
//! presented refresh token is valid only when its signature checks out *and*
//! it byte-equals the stored value. Overwriting on every issue and comparing
//! on every rotation is what makes logout and rotation effective revocation
//! despite the tokens being stateless by signature alone.

use anyhow::Context;
use jsonwebtoken::{
    decode, encode, get_current_timestamp, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::state::AuthConfig;
use super::storage;
use super::types::PublicUser;
use crate::api::error::ApiError;

#[derive(Debug)]
pub(crate) struct TokenPair {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
}

/// Claims embedded in the short-lived access token.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AccessClaims {
    pub(crate) sub: Uuid,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) iat: u64,
    pub(crate) exp: u64,
}

/// Refresh tokens only need to point back at the user.
#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: Uuid,
    iat: u64,
    exp: u64,
}

fn mint_access_token(config: &AuthConfig, user: &PublicUser) -> Result<String, ApiError> {
    let now = get_current_timestamp();
    let claims = AccessClaims {
        sub: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        iat: now,
        exp: now + config.access_token_ttl_seconds(),
    };
    let key = EncodingKey::from_secret(config.access_token_secret().expose_secret().as_bytes());
    Ok(encode(&Header::default(), &claims, &key).context("failed to sign access token")?)
}

fn mint_refresh_token(config: &AuthConfig, user_id: Uuid) -> Result<String, ApiError> {
    let now = get_current_timestamp();
    let claims = RefreshClaims {
        sub: user_id,
        iat: now,
        exp: now + config.refresh_token_ttl_seconds(),
    };
    let key = EncodingKey::from_secret(config.refresh_token_secret().expose_secret().as_bytes());
    Ok(encode(&Header::default(), &claims, &key).context("failed to sign refresh token")?)
}

/// Check signature and expiry; any failure is an unauthorized request.
pub(crate) fn verify_access_token(
    config: &AuthConfig,
    token: &str,
) -> Result<AccessClaims, ApiError> {
    let key = DecodingKey::from_secret(config.access_token_secret().expose_secret().as_bytes());
    decode::<AccessClaims>(token, &key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized("Invalid access token".to_string()))
}

fn decode_refresh_token(config: &AuthConfig, token: &str) -> Result<RefreshClaims, ApiError> {
    let key = DecodingKey::from_secret(config.refresh_token_secret().expose_secret().as_bytes());
    decode::<RefreshClaims>(token, &key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| ApiError::Unauthorized("Invalid refresh token".to_string()))
}

/// Mint a new pair and persist the refresh token, overwriting any prior value.
/// The overwrite is the single-session-per-user policy: issuing here silently
/// invalidates every previously issued refresh token.
pub(crate) async fn issue_token_pair(
    pool: &PgPool,
    config: &AuthConfig,
    user: &PublicUser,
) -> Result<TokenPair, ApiError> {
    let access_token = mint_access_token(config, user)?;
    let refresh_token = mint_refresh_token(config, user.id)?;

    storage::store_refresh_token(pool, user.id, &refresh_token).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// A signature-valid refresh token is still rejected unless it byte-equals
/// the value currently stored for the user: a rotated-away token mismatches
/// and a revoked (logged-out) user has nothing stored.
fn check_stored_refresh_token(stored: Option<&str>, presented: &str) -> Result<(), ApiError> {
    match stored {
        Some(stored) if stored == presented => Ok(()),
        _ => Err(ApiError::Unauthorized(
            "Refresh token expired or used".to_string(),
        )),
    }
}

/// Classic refresh rotation: verify, compare against the stored value, then
/// consume the presented token by issuing a replacement. A replayed token
/// fails the stored-value comparison and is rejected.
pub(crate) async fn rotate_refresh_token(
    pool: &PgPool,
    config: &AuthConfig,
    presented: &str,
) -> Result<(PublicUser, TokenPair), ApiError> {
    let claims = decode_refresh_token(config, presented)?;

    let record = storage::lookup_refresh_record(pool, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    check_stored_refresh_token(record.refresh_token.as_deref(), presented)?;

    let pair = issue_token_pair(pool, config, &record.user).await?;
    Ok((record.user, pair))
}

/// Clear the stored refresh token (logout). Idempotent by design of the store.
pub(crate) async fn revoke(pool: &PgPool, user_id: Uuid) -> Result<(), ApiError> {
    storage::clear_refresh_token(pool, user_id).await?;
    Ok(())
}
