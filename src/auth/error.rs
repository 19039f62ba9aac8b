// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication and authorization failure.
///
/// Expected failures (missing key, bad signature) are ordinary values of
/// this type; only `Internal` represents a fault the caller did not cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential in the Authorization header or `api_key` query parameter
    MissingApiKey,
    /// Credential does not match any stored key
    InvalidApiKey,
    /// Credential matched a key that has been soft-disabled
    ApiKeyDeactivated,
    /// Key lacks the named permission
    MissingPermission(String),
    /// Key is not scoped to the named platform
    PlatformNotAllowed(String),
    /// A gate ran before any key was authenticated
    MissingAuthContext,
    /// Webhook HMAC signature did not verify
    InvalidSignature,
    /// Credential store failed or timed out
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
    message: String,
    error_code: &'static str,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingApiKey => "missing_api_key",
            AuthError::InvalidApiKey => "invalid_api_key",
            AuthError::ApiKeyDeactivated => "api_key_deactivated",
            AuthError::MissingPermission(_) => "missing_permission",
            AuthError::PlatformNotAllowed(_) => "platform_not_allowed",
            AuthError::MissingAuthContext => "missing_auth_context",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingApiKey
            | AuthError::InvalidApiKey
            | AuthError::MissingAuthContext
            | AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AuthError::ApiKeyDeactivated
            | AuthError::MissingPermission(_)
            | AuthError::PlatformNotAllowed(_) => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classification shown in the `error` field of the response body.
    pub fn classification(&self) -> &'static str {
        match self.status_code() {
            StatusCode::UNAUTHORIZED => "Unauthorized",
            StatusCode::FORBIDDEN => "Forbidden",
            _ => "Internal Server Error",
        }
    }

    /// Message safe to return to the caller.
    ///
    /// Identical to `Display` except for `Internal`, whose detail is logged
    /// but never sent over the wire.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "Failed to authenticate API key".to_string(),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingApiKey => write!(
                f,
                "API key is required. Provide via Authorization header or api_key query parameter."
            ),
            AuthError::InvalidApiKey => write!(f, "Invalid API key"),
            AuthError::ApiKeyDeactivated => write!(f, "API key has been deactivated"),
            AuthError::MissingPermission(permission) => {
                write!(f, "API key does not have permission: {permission}")
            }
            AuthError::PlatformNotAllowed(platform) => {
                write!(f, "API key is not authorized for platform: {platform}")
            }
            AuthError::MissingAuthContext => write!(f, "API key authentication required"),
            AuthError::InvalidSignature => write!(f, "Invalid webhook signature"),
            AuthError::Internal(msg) => write!(f, "Internal authentication error: {msg}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Internal(detail) = &self {
            tracing::error!(error = %detail, "API authentication error");
        }

        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.classification(),
            message: self.public_message(),
            error_code: self.error_code(),
        });
        (status, body).into_response()
    }
}
