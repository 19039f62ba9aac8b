// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Error types for webhook registration and delivery.

use axum::http::StatusCode;

use crate::auth::AuthError;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid event types: {}", .0.join(", "))]
    InvalidEventTypes(Vec<String>),

    #[error("At least one event type must be specified")]
    NoEvents,

    #[error("Webhook endpoint not found")]
    EndpointNotFound,

    #[error("failed to generate webhook secret: {0}")]
    Secret(#[from] AuthError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to serialize webhook payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl WebhookError {
    /// HTTP status for API responses.
    ///
    /// Caller mistakes are 400/404, subscriber failures 502.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidUrl(_) | Self::InvalidEventTypes(_) | Self::NoEvents => {
                StatusCode::BAD_REQUEST
            }
            Self::EndpointNotFound => StatusCode::NOT_FOUND,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Secret(_) | Self::Client(_) | Self::Serialize(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_partner_docs() {
        let err = WebhookError::InvalidEventTypes(vec!["order.shipped".into(), "x".into()]);
        assert_eq!(err.to_string(), "Invalid event types: order.shipped, x");
        assert_eq!(
            WebhookError::NoEvents.to_string(),
            "At least one event type must be specified"
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            WebhookError::InvalidUrl("nope".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::EndpointNotFound.status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            WebhookError::Secret(AuthError::Internal("rng".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
