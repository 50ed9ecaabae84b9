//! Request/response types for the user endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User record view with password and refresh-token fields excluded.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// Body fallback for clients that do not send the refresh cookie.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub full_name: String,
    pub email: String,
}

/// Login response data: profile plus both tokens for non-cookie clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh response data: the freshly rotated pair.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairData {
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn public_user_serializes_camel_case() -> Result<()> {
        let user = PublicUser {
            id: Uuid::nil(),
            username: "chai".to_string(),
            email: "chai@example.com".to_string(),
            full_name: "Chai Aur Code".to_string(),
            avatar: "https://media.test/avatar.png".to_string(),
            cover_image: String::new(),
        };
        let value = serde_json::to_value(&user)?;
        assert_eq!(
            value
                .get("fullName")
                .and_then(serde_json::Value::as_str)
                .context("missing fullName")?,
            "Chai Aur Code"
        );
        assert_eq!(
            value.get("coverImage").and_then(serde_json::Value::as_str),
            Some("")
        );
        assert!(value.get("password").is_none());
        assert!(value.get("refreshToken").is_none());
        Ok(())
    }

    #[test]
    fn login_request_accepts_username_or_email() -> Result<()> {
        let by_username: LoginRequest =
            serde_json::from_value(serde_json::json!({"username": "chai", "password": "pw"}))?;
        assert_eq!(by_username.username.as_deref(), Some("chai"));
        assert!(by_username.email.is_none());

        let by_email: LoginRequest = serde_json::from_value(
            serde_json::json!({"email": "chai@example.com", "password": "pw"}),
        )?;
        assert_eq!(by_email.email.as_deref(), Some("chai@example.com"));
        Ok(())
    }

    #[test]
    fn refresh_request_token_is_optional() -> Result<()> {
        let empty: RefreshRequest = serde_json::from_value(serde_json::json!({}))?;
        assert!(empty.refresh_token.is_none());

        let with_token: RefreshRequest =
            serde_json::from_value(serde_json::json!({"refreshToken": "jwt"}))?;
        assert_eq!(with_token.refresh_token.as_deref(), Some("jwt"));
        Ok(())
    }

    #[test]
    fn change_password_request_round_trips() -> Result<()> {
        let request: ChangePasswordRequest = serde_json::from_value(
            serde_json::json!({"oldPassword": "old", "newPassword": "new"}),
        )?;
        assert_eq!(request.old_password, "old");
        assert_eq!(request.new_password, "new");
        Ok(())
    }
}
