// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::storage::StoreError;
use crate::webhooks::WebhookError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub error_code: Option<&'static str>,
}

/// JSON body of every non-2xx response.
#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    /// Reason phrase of the status ("Bad Request", "Forbidden", ...)
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self
                .status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message: self.message,
            error_code: self.error_code.map(str::to_string),
        });
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if let AuthError::Internal(detail) = &err {
            tracing::error!(error = %detail, "Authentication failure");
        }
        Self {
            status: err.status_code(),
            message: err.public_message(),
            error_code: Some(err.error_code()),
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(err: WebhookError) -> Self {
        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!(error = %err, "Webhook operation failed");
            let message = match status {
                StatusCode::BAD_GATEWAY => "Webhook endpoint could not be reached",
                _ => "Webhook operation failed",
            };
            return Self::new(status, message);
        }
        Self::new(status, err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::not_found("API key not found"),
            StoreError::AlreadyExists(_) => Self::conflict("API key already exists"),
            other => {
                tracing::error!(error = %other, "API key store failure");
                Self::internal("Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"Bad Request","message":"bad data"}"#);
    }

    #[tokio::test]
    async fn auth_errors_keep_their_code() {
        let err = ApiError::from(AuthError::PlatformNotAllowed("hostsblue".into()));
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let response = err.into_response();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error"], "Forbidden");
        assert_eq!(
            body["message"],
            "API key is not authorized for platform: hostsblue"
        );
        assert_eq!(body["error_code"], "platform_not_allowed");
    }

    #[test]
    fn webhook_validation_errors_are_passed_through() {
        let err = ApiError::from(WebhookError::NoEvents);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "At least one event type must be specified");

        let err = ApiError::from(WebhookError::EndpointNotFound);
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn store_internals_are_hidden() {
        let err = ApiError::from(StoreError::Poisoned);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "Internal server error");

        let err = ApiError::from(StoreError::NotFound("key-1".into()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }
}
