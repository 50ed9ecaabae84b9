//! JSON response envelope shared by every route.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

/// Success envelope: `{statusCode, data, message, success}`.
#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    status_code: u16,
    data: T,
    message: String,
    #[serde(skip)]
    status: StatusCode,
    success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            status,
            success: status.as_u16() < 400,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(&self)).into_response()
    }
}

/// Payload for routes that return no data, keeping `data` an empty object.
#[derive(Serialize, ToSchema, Debug, Default)]
pub struct Empty {}

#[cfg(test)]
mod tests {
    use super::{ApiResponse, Empty};
    use anyhow::{Context, Result};
    use axum::http::StatusCode;

    #[test]
    fn success_envelope_shape() -> Result<()> {
        let envelope = ApiResponse::new(StatusCode::CREATED, Empty {}, "User registered");
        let value = serde_json::to_value(&envelope)?;

        assert_eq!(
            value
                .get("statusCode")
                .and_then(serde_json::Value::as_u64)
                .context("missing statusCode")?,
            201
        );
        assert_eq!(
            value.get("success").and_then(serde_json::Value::as_bool),
            Some(true)
        );
        assert_eq!(
            value.get("message").and_then(serde_json::Value::as_str),
            Some("User registered")
        );
        assert_eq!(value.get("data"), Some(&serde_json::json!({})));
        Ok(())
    }

    #[test]
    fn envelope_success_tracks_status_code() -> Result<()> {
        let envelope = ApiResponse::new(StatusCode::CONFLICT, Empty {}, "duplicate");
        let value = serde_json::to_value(&envelope)?;
        assert_eq!(
            value.get("success").and_then(serde_json::Value::as_bool),
            Some(false)
        );
        Ok(())
    }
}
