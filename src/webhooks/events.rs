// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! Webhook event types and envelopes.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::WebhookError;

/// Events a partner platform can subscribe to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
pub enum WebhookEventType {
    #[serde(rename = "payment.success")]
    PaymentSuccess,
    #[serde(rename = "payment.failed")]
    PaymentFailed,
    #[serde(rename = "payment.refunded")]
    PaymentRefunded,
    #[serde(rename = "merchant.created")]
    MerchantCreated,
    #[serde(rename = "merchant.approved")]
    MerchantApproved,
    #[serde(rename = "merchant.suspended")]
    MerchantSuspended,
}

impl WebhookEventType {
    pub const ALL: [WebhookEventType; 6] = [
        WebhookEventType::PaymentSuccess,
        WebhookEventType::PaymentFailed,
        WebhookEventType::PaymentRefunded,
        WebhookEventType::MerchantCreated,
        WebhookEventType::MerchantApproved,
        WebhookEventType::MerchantSuspended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventType::PaymentSuccess => "payment.success",
            WebhookEventType::PaymentFailed => "payment.failed",
            WebhookEventType::PaymentRefunded => "payment.refunded",
            WebhookEventType::MerchantCreated => "merchant.created",
            WebhookEventType::MerchantApproved => "merchant.approved",
            WebhookEventType::MerchantSuspended => "merchant.suspended",
        }
    }

    /// Parse a subscription list, reporting every unknown name at once.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<BTreeSet<Self>, WebhookError> {
        let mut events = BTreeSet::new();
        let mut invalid = Vec::new();

        for name in names {
            match name.as_ref().parse::<WebhookEventType>() {
                Ok(event) => {
                    events.insert(event);
                }
                Err(_) => invalid.push(name.as_ref().to_string()),
            }
        }

        if !invalid.is_empty() {
            return Err(WebhookError::InvalidEventTypes(invalid));
        }
        if events.is_empty() {
            return Err(WebhookError::NoEvents);
        }
        Ok(events)
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name that matches no [`WebhookEventType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType(pub String);

impl FromStr for WebhookEventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event| event.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// Body POSTed to subscriber endpoints.
///
/// `timestamp` is kept pre-formatted so the `X-Webhook-Timestamp` header and
/// the body carry the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WebhookEventPayload {
    pub event: WebhookEventType,
    /// RFC 3339, millisecond precision, UTC
    pub timestamp: String,
    pub platform: String,
    #[schema(value_type = Object)]
    pub data: Value,
}

impl WebhookEventPayload {
    pub fn new(event: WebhookEventType, platform: impl Into<String>, data: Value) -> Self {
        Self {
            event,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            platform: platform.into(),
            data,
        }
    }
}

/// Body of an inbound partner webhook.
///
/// `event` stays a raw string so that unknown types can be logged and
/// skipped instead of rejected.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct InboundEnvelope {
    pub event: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
}

impl InboundEnvelope {
    pub fn event_type(&self) -> Option<WebhookEventType> {
        self.event.parse().ok()
    }

    /// Subject of the event: the transaction for payment events, the
    /// merchant otherwise.
    pub fn subject_id(&self) -> Option<String> {
        ["transactionId", "merchantId"]
            .iter()
            .find_map(|field| match self.data.get(field)? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}
