//! HTTP-facing error types
//!
//! Every failed public request renders as
//! `{"error": {"type": "...", "message": "..."}}`. Messages are fixed strings
//! chosen per failure; internal detail goes to the log, not the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use auth_token::RenewError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "invalid_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<RenewError> for ApiError {
    fn from(err: RenewError) -> Self {
        match err {
            RenewError::MalformedCredential(_) => {
                ApiError::Unauthorized("Invalid access token structure")
            }
            RenewError::SessionInactive => ApiError::Unauthorized("Session expired or revoked"),
            RenewError::RenewalMismatch => ApiError::Unauthorized("Invalid refresh token"),
            RenewError::InternalError(_) => ApiError::Internal("Server error checking session"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        });
        (
            self.status(),
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn renders_error_envelope() {
        let response = ApiError::Conflict("Email already registered").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["type"], "conflict");
        assert_eq!(json["error"]["message"], "Email already registered");
    }

    #[test]
    fn renewal_rejections_are_unauthorized() {
        for err in [
            RenewError::MalformedCredential("bad base64".into()),
            RenewError::SessionInactive,
            RenewError::RenewalMismatch,
        ] {
            assert_eq!(ApiError::from(err).status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn renewal_internal_error_is_500_without_detail() {
        let err = ApiError::from(RenewError::InternalError("redis: connection reset".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            !err.to_string().contains("redis"),
            "infrastructure detail must not reach the client, got: {err}"
        );
    }
}
