//! Per-request session resolution and auth cookie handling.
//!
//! Request flow: extract the access token (cookie first, then bearer header),
//! verify it, then load the public profile. Any failure short-circuits with
//! `Unauthorized` before the handler body runs.

use anyhow::Context;
use axum::http::{
    header::{InvalidHeaderValue, AUTHORIZATION, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use sqlx::PgPool;

use super::state::AuthConfig;
use super::storage;
use super::tokens::{self, TokenPair};
use super::types::PublicUser;
use crate::api::error::ApiError;

pub(crate) const ACCESS_COOKIE_NAME: &str = "accessToken";
pub(crate) const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Resolve the request to an authenticated user or reject with 401.
pub(crate) async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<PublicUser, ApiError> {
    let Some(token) = extract_access_token(headers) else {
        return Err(ApiError::Unauthorized("No token provided".to_string()));
    };

    let claims = tokens::verify_access_token(config, &token)?;

    storage::lookup_public(pool, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid access token".to_string()))
}

/// Cookie takes precedence over the `Authorization: Bearer` header.
fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ACCESS_COOKIE_NAME).or_else(|| extract_bearer_token(headers))
}

pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        // Segments without `=` (malformed or flag-style) are skipped, not fatal.
        let Some((key, val)) = pair.trim().split_once('=') else {
            continue;
        };
        if key.trim() == name && !val.trim().is_empty() {
            return Some(val.trim().to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Build a secure `HttpOnly` cookie for one token.
fn build_cookie(
    config: &AuthConfig,
    name: &str,
    value: &str,
    max_age_seconds: u64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// `Set-Cookie` headers carrying a freshly issued token pair.
pub(super) fn token_pair_cookies(
    config: &AuthConfig,
    pair: &TokenPair,
) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let access = build_cookie(
        config,
        ACCESS_COOKIE_NAME,
        &pair.access_token,
        config.access_token_ttl_seconds(),
    )
    .context("failed to build access token cookie")?;
    let refresh = build_cookie(
        config,
        REFRESH_COOKIE_NAME,
        &pair.refresh_token,
        config.refresh_token_ttl_seconds(),
    )
    .context("failed to build refresh token cookie")?;
    headers.append(SET_COOKIE, access);
    headers.append(SET_COOKIE, refresh);
    Ok(headers)
}

/// Expire both cookies, used by logout regardless of store state.
pub(super) fn clear_token_cookies(config: &AuthConfig) -> Result<HeaderMap, ApiError> {
    let mut headers = HeaderMap::new();
    let access = build_cookie(config, ACCESS_COOKIE_NAME, "", 0)
        .context("failed to build cleared access cookie")?;
    let refresh = build_cookie(config, REFRESH_COOKIE_NAME, "", 0)
        .context("failed to build cleared refresh cookie")?;
    headers.append(SET_COOKIE, access);
    headers.append(SET_COOKIE, refresh);
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};
    use secrecy::SecretString;
    use serde::Serialize;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
            "http://localhost:5173".to_string(),
        )
    }

    #[derive(Serialize)]
    struct Claims {
        sub: Uuid,
        username: String,
        email: String,
        iat: u64,
        exp: u64,
    }

    fn signed_access_token(secret: &str, exp: u64) -> Result<String> {
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "chai".to_string(),
            email: "chai@example.com".to_string(),
            iat: get_current_timestamp(),
            exp,
        };
        let key = EncodingKey::from_secret(secret.as_bytes());
        Ok(encode(&Header::default(), &claims, &key)?)
    }

    #[test]
    fn cookie_takes_precedence_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("accessToken=from-cookie; other=x"),
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(
            extract_access_token(&headers),
            Some("from-cookie".to_string())
        );
    }

    #[test]
    fn bearer_is_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(
            extract_access_token(&headers),
            Some("from-header".to_string())
        );

        let mut lowercase = HeaderMap::new();
        lowercase.insert(AUTHORIZATION, HeaderValue::from_static("bearer token"));
        assert_eq!(extract_access_token(&lowercase), Some("token".to_string()));
    }

    #[test]
    fn cookie_value_skips_malformed_segments() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("flag; accessToken=from-cookie"),
        );
        assert_eq!(
            cookie_value(&headers, ACCESS_COOKIE_NAME),
            Some("from-cookie".to_string())
        );
    }

    #[test]
    fn missing_and_empty_tokens_yield_none() {
        assert_eq!(extract_access_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("accessToken="));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_access_token(&headers), None);
    }

    #[test]
    fn token_cookies_carry_attributes() -> Result<()> {
        let pair = TokenPair {
            access_token: "access-jwt".to_string(),
            refresh_token: "refresh-jwt".to_string(),
        };
        let headers = token_pair_cookies(&config(), &pair).map_err(|err| anyhow::anyhow!("{err}"))?;
        let cookies: Vec<&str> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();

        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("accessToken=access-jwt;"));
        assert!(cookies[1].starts_with("refreshToken=refresh-jwt;"));
        for cookie in cookies {
            assert!(cookie.contains("HttpOnly"));
            assert!(cookie.contains("Secure"));
            assert!(cookie.contains("SameSite=Lax"));
        }
        Ok(())
    }

    #[test]
    fn cleared_cookies_expire_immediately() -> Result<()> {
        let headers = clear_token_cookies(&config()).map_err(|err| anyhow::anyhow!("{err}"))?;
        for value in headers.get_all(SET_COOKIE) {
            let cookie = value.to_str()?;
            assert!(cookie.contains("Max-Age=0"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn expired_token_is_rejected_without_identity() -> Result<()> {
        // Verification fails before the profile lookup, so a lazy pool never connects.
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let token = signed_access_token("access-secret", get_current_timestamp() - 3600)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );

        let err = require_auth(&headers, &pool, &config())
            .await
            .expect_err("expired token must fail");
        assert!(matches!(err, ApiError::Unauthorized(_)));
        Ok(())
    }

    #[tokio::test]
    async fn missing_token_is_rejected() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let err = require_auth(&HeaderMap::new(), &pool, &config())
            .await
            .expect_err("missing token must fail");
        assert!(matches!(err, ApiError::Unauthorized(_)));
        Ok(())
    }
}
