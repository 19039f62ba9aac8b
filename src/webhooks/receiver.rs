// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! # Partner Webhook Receiver
//!
//! `POST /webhooks/partner` accepts events pushed by partner platforms.
//!
//! 1. `X-Webhook-Signature` and `X-Webhook-Event` must be present (400)
//! 2. The signature is verified over the raw body bytes (401)
//! 3. The body must be a JSON envelope (400)
//! 4. The request is acknowledged with 200 before any processing
//! 5. Processing runs in a detached task: duplicates are skipped, known
//!    events go to the [`WebhookEventHandler`], unknown events are logged
//!    and ignored

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{error, info, warn};

use super::delivery::{EVENT_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use super::events::{InboundEnvelope, WebhookEventType};
use super::idempotency::{event_identity, ProcessedEventCache};
use crate::auth::{verify_signature, AuthError};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

/// Business reaction to a verified partner event.
pub trait WebhookEventHandler: Send + Sync + 'static {
    fn handle(&self, event: WebhookEventType, envelope: &InboundEnvelope) -> Result<(), HandlerError>;
}

/// Handler that records each event in the log.
pub struct LoggingEventHandler;

impl WebhookEventHandler for LoggingEventHandler {
    fn handle(&self, event: WebhookEventType, envelope: &InboundEnvelope) -> Result<(), HandlerError> {
        info!(
            %event,
            platform = %envelope.platform,
            subject = envelope.subject_id().as_deref().unwrap_or("unknown"),
            "Partner event handled"
        );
        Ok(())
    }
}

/// What happened to one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Handled,
    /// Unknown event type
    Ignored,
    /// In flight, or processed within the retention window
    Duplicate,
    /// Handler error; not marked processed so a redelivery is retried
    Failed,
}

/// Shared secret, dedup cache and handler for inbound partner webhooks.
#[derive(Clone)]
pub struct PartnerWebhookReceiver {
    secret: Option<String>,
    processed: Arc<ProcessedEventCache>,
    handler: Arc<dyn WebhookEventHandler>,
}

impl PartnerWebhookReceiver {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            processed: Arc::new(ProcessedEventCache::default()),
            handler: Arc::new(LoggingEventHandler),
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn WebhookEventHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Check `signature` over the raw `payload` bytes.
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<(), AuthError> {
        let Some(secret) = self.secret.as_deref() else {
            warn!("Partner webhook received but PARTNER_WEBHOOK_SECRET is not set");
            return Err(AuthError::InvalidSignature);
        };
        if verify_signature(payload, signature, secret) {
            Ok(())
        } else {
            Err(AuthError::InvalidSignature)
        }
    }

    /// Dedup and dispatch one verified event.
    pub fn process(&self, envelope: &InboundEnvelope, timestamp: Option<&str>) -> ProcessOutcome {
        let event_id = event_identity(envelope, timestamp);

        if !self.processed.try_claim(&event_id) {
            info!(%event_id, "Partner event already processed or in flight");
            return ProcessOutcome::Duplicate;
        }

        let outcome = match envelope.event_type() {
            Some(event) => match self.handler.handle(event, envelope) {
                Ok(()) => ProcessOutcome::Handled,
                Err(e) => {
                    error!(%event_id, error = %e, "Partner event handler failed");
                    self.processed.release(&event_id);
                    return ProcessOutcome::Failed;
                }
            },
            None => {
                warn!(event = %envelope.event, "Unknown partner event type");
                ProcessOutcome::Ignored
            }
        };

        self.processed.mark_processed(&event_id);
        info!(%event_id, ?outcome, "Partner event processed");
        outcome
    }
}

impl Default for PartnerWebhookReceiver {
    fn default() -> Self {
        Self::new(None)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// Receive a signed partner webhook
#[utoipa::path(
    post,
    path = "/webhooks/partner",
    tag = "Webhooks",
    request_body = InboundEnvelope,
    params(
        ("X-Webhook-Signature" = String, Header, description = "Hex HMAC-SHA256 of the raw body"),
        ("X-Webhook-Event" = String, Header, description = "Event type"),
        ("X-Webhook-Timestamp" = Option<String>, Header, description = "Event timestamp")
    ),
    responses(
        (status = 200, description = "Accepted for processing"),
        (status = 400, description = "Missing headers or invalid JSON"),
        (status = 401, description = "Invalid signature")
    )
)]
pub async fn receive_partner_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (Some(signature), Some(event_header)) = (
        header_str(&headers, SIGNATURE_HEADER),
        header_str(&headers, EVENT_HEADER),
    ) else {
        warn!("Partner webhook missing signature or event header");
        return ApiError::bad_request("Missing webhook headers").into_response();
    };

    let receiver = state.partner_webhooks.clone();
    if let Err(e) = receiver.verify(&body, signature) {
        warn!(event = event_header, "Partner webhook signature rejected");
        return e.into_response();
    }

    let envelope: InboundEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Partner webhook body is not a valid envelope");
            return ApiError::bad_request("Invalid webhook payload").into_response();
        }
    };

    let timestamp = header_str(&headers, TIMESTAMP_HEADER).map(str::to_string);
    info!(
        event = event_header,
        timestamp = timestamp.as_deref().unwrap_or_default(),
        platform = %envelope.platform,
        "Partner webhook received"
    );

    tokio::spawn(async move {
        receiver.process(&envelope, timestamp.as_deref());
    });

    (StatusCode::OK, "OK").into_response()
}
