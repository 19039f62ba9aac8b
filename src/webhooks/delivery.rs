// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! # Outbound Webhook Delivery
//!
//! Registers partner endpoints and POSTs signed events to them.
//!
//! ## Delivery
//!
//! The payload is serialized once; the same bytes are signed and sent:
//!
//! ```text
//! POST <endpoint url>
//! Content-Type: application/json
//! X-Webhook-Signature: hex(HMAC-SHA256(secret, body))
//! X-Webhook-Event: payment.success
//! X-Webhook-Timestamp: 2026-01-01T00:00:00.000Z
//! User-Agent: SwipesBlue-Webhook/1.0
//! ```
//!
//! A 2xx response marks the delivery `success`. Anything else (non-2xx,
//! timeout, connection error) schedules a retry at
//! `min(initial * 2^(attempts - 1), max)` until `max_attempts` is reached,
//! after which the delivery is `failed`. Finished deliveries are kept for
//! `delivery_retention` (7 days by default) and then dropped by the retry
//! sweep.

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{CONTENT_TYPE, USER_AGENT};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use url::Url;
use utoipa::ToSchema;

use super::events::{WebhookEventPayload, WebhookEventType};
use super::repository::{DeliveryStatus, WebhookDelivery, WebhookEndpoint, WebhookRepository};
use super::WebhookError;
use crate::auth::{generate_webhook_secret, sign_payload};

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
pub const EVENT_HEADER: &str = "X-Webhook-Event";
pub const TIMESTAMP_HEADER: &str = "X-Webhook-Timestamp";
pub const WEBHOOK_USER_AGENT: &str = "SwipesBlue-Webhook/1.0";

/// Stored response bodies are cut to this many characters.
pub const MAX_RESPONSE_BODY_CHARS: usize = 10_000;

const ENDPOINT_GONE_MESSAGE: &str = "Webhook endpoint is inactive or was deleted";

/// Retry and timeout policy.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub max_attempts: u32,
    pub initial_retry_delay: Duration,
    pub max_retry_delay: Duration,
    /// Per-request timeout
    pub timeout: Duration,
    /// Succeeded and failed deliveries are dropped this long after their
    /// last update
    pub delivery_retention: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_retry_delay: Duration::from_secs(60),
            max_retry_delay: Duration::from_secs(60 * 60),
            timeout: Duration::from_secs(30),
            delivery_retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

impl DeliveryConfig {
    /// Backoff before the retry that follows attempt number `attempts`.
    pub fn retry_delay(&self, attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempts.saturating_sub(1));
        self.initial_retry_delay
            .saturating_mul(factor)
            .min(self.max_retry_delay)
    }
}

/// Result of a successful registration. The secret is not retrievable later.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisteredEndpoint {
    pub endpoint: WebhookEndpoint,
    pub secret: String,
}

/// Outcome of [`WebhookService::test_endpoint`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TestDeliveryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

/// Webhook registration, delivery and retry.
#[derive(Clone)]
pub struct WebhookService {
    repository: Arc<WebhookRepository>,
    http: reqwest::Client,
    config: DeliveryConfig,
}

impl WebhookService {
    pub fn new(config: DeliveryConfig) -> Result<Self, WebhookError> {
        Self::with_repository(Arc::new(WebhookRepository::new()), config)
    }

    pub fn with_repository(
        repository: Arc<WebhookRepository>,
        config: DeliveryConfig,
    ) -> Result<Self, WebhookError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(WebhookError::Client)?;

        Ok(Self {
            repository,
            http,
            config,
        })
    }

    pub fn repository(&self) -> &Arc<WebhookRepository> {
        &self.repository
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Register `url` for `platform`, subscribed to `events`.
    pub async fn register<S: AsRef<str>>(
        &self,
        platform: &str,
        url: &str,
        events: &[S],
    ) -> Result<RegisteredEndpoint, WebhookError> {
        validate_url(url)?;
        let events = WebhookEventType::parse_all(events)?;
        let secret = generate_webhook_secret()?;

        let endpoint = WebhookEndpoint::new(platform, url, events, secret.clone());
        self.repository.insert_endpoint(endpoint.clone()).await;

        info!(
            endpoint_id = %endpoint.id,
            platform = %endpoint.platform,
            url = %endpoint.url,
            events = endpoint.events.len(),
            "Webhook endpoint registered"
        );
        Ok(RegisteredEndpoint { endpoint, secret })
    }

    /// Fan `event` out to every active endpoint of `platform` subscribed to it.
    ///
    /// Deliveries run in detached tasks; returns how many were started.
    pub async fn send_event(&self, event: WebhookEventType, platform: &str, data: Value) -> usize {
        let endpoints: Vec<WebhookEndpoint> = self
            .repository
            .endpoints_for_platform(platform)
            .await
            .into_iter()
            .filter(|endpoint| endpoint.is_subscribed(event))
            .collect();

        if endpoints.is_empty() {
            info!(%event, platform, "No webhook endpoints subscribed");
            return 0;
        }

        let payload = WebhookEventPayload::new(event, platform, data);
        let count = endpoints.len();
        for endpoint in endpoints {
            let service = self.clone();
            let payload = payload.clone();
            tokio::spawn(async move {
                service.deliver(&endpoint, payload).await;
            });
        }
        count
    }

    /// Record a new delivery for `endpoint` and make the first attempt.
    pub async fn deliver(
        &self,
        endpoint: &WebhookEndpoint,
        payload: WebhookEventPayload,
    ) -> WebhookDelivery {
        let delivery = WebhookDelivery::pending(endpoint.id.clone(), payload);
        self.repository.insert_delivery(delivery.clone()).await;
        self.attempt_delivery(delivery, endpoint).await
    }

    /// One POST of `delivery.payload` to `endpoint`, recording the outcome.
    async fn attempt_delivery(
        &self,
        delivery: WebhookDelivery,
        endpoint: &WebhookEndpoint,
    ) -> WebhookDelivery {
        let attempts = delivery.attempts + 1;

        let response = match self.post_signed(endpoint, &delivery.payload).await {
            Ok(response) => response,
            Err(e) => {
                return self
                    .schedule_retry(delivery, attempts, None, None, e.to_string())
                    .await
            }
        };

        let status = response.status();
        let body = truncate_body(&response.text().await.unwrap_or_default());

        if status.is_success() {
            info!(
                delivery_id = %delivery.id,
                url = %endpoint.url,
                attempts,
                "Webhook delivered"
            );
            let id = delivery.id.clone();
            return self
                .repository
                .update_delivery(&id, |d| {
                    d.status = DeliveryStatus::Success;
                    d.attempts = attempts;
                    d.next_retry = None;
                    d.response_status = Some(status.as_u16());
                    d.response_body = Some(body);
                    d.error_message = None;
                })
                .await
                .unwrap_or(delivery);
        }

        let message = format!("Endpoint returned {status}");
        self.schedule_retry(delivery, attempts, Some(status.as_u16()), Some(body), message)
            .await
    }

    /// Mark a failed attempt: retry later, or give up after `max_attempts`.
    async fn schedule_retry(
        &self,
        delivery: WebhookDelivery,
        attempts: u32,
        response_status: Option<u16>,
        response_body: Option<String>,
        error_message: String,
    ) -> WebhookDelivery {
        let exhausted = attempts >= self.config.max_attempts;
        let next_retry = if exhausted {
            error!(
                delivery_id = %delivery.id,
                attempts,
                error = %error_message,
                "Webhook delivery failed permanently"
            );
            None
        } else {
            let delay = self.config.retry_delay(attempts);
            let at = Utc::now() + TimeDelta::from_std(delay).unwrap_or(TimeDelta::hours(1));
            warn!(
                delivery_id = %delivery.id,
                attempts,
                next_retry = %at,
                error = %error_message,
                "Webhook delivery failed, retry scheduled"
            );
            Some(at)
        };

        let id = delivery.id.clone();
        self.repository
            .update_delivery(&id, |d| {
                d.status = if exhausted {
                    DeliveryStatus::Failed
                } else {
                    DeliveryStatus::Pending
                };
                d.attempts = attempts;
                d.next_retry = next_retry;
                d.response_status = response_status;
                d.response_body = response_body;
                d.error_message = Some(error_message);
            })
            .await
            .unwrap_or(delivery)
    }

    /// Re-attempt every pending delivery whose retry time has passed, then
    /// drop finished deliveries older than the retention window.
    ///
    /// Returns the number of deliveries retried.
    pub async fn retry_due_deliveries(&self, now: DateTime<Utc>) -> usize {
        let retried = self.retry_due(now).await;
        self.prune_finished(now).await;
        retried
    }

    async fn prune_finished(&self, now: DateTime<Utc>) {
        let retention =
            TimeDelta::from_std(self.config.delivery_retention).unwrap_or(TimeDelta::MAX);
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return;
        };
        let pruned = self.repository.prune_finished_deliveries(cutoff).await;
        if pruned > 0 {
            info!(pruned, "Pruned finished webhook deliveries");
        }
    }

    async fn retry_due(&self, now: DateTime<Utc>) -> usize {
        let due = self.repository.due_deliveries(now).await;
        if due.is_empty() {
            return 0;
        }

        info!(count = due.len(), "Retrying pending webhook deliveries");

        for delivery in &due {
            match self.repository.endpoint(&delivery.endpoint_id).await {
                Some(endpoint) if endpoint.is_active => {
                    self.attempt_delivery(delivery.clone(), &endpoint).await;
                }
                _ => {
                    warn!(
                        delivery_id = %delivery.id,
                        endpoint_id = %delivery.endpoint_id,
                        "Webhook endpoint gone, abandoning delivery"
                    );
                    self.repository
                        .update_delivery(&delivery.id, |d| {
                            d.status = DeliveryStatus::Failed;
                            d.next_retry = None;
                            d.error_message = Some(ENDPOINT_GONE_MESSAGE.to_string());
                        })
                        .await;
                }
            }
        }
        due.len()
    }

    /// Send a signed test `payment.success` event to an endpoint.
    ///
    /// Delivery problems are reported in the result, not as errors; the
    /// attempt is not recorded as a delivery.
    pub async fn test_endpoint(&self, endpoint_id: &str) -> Result<TestDeliveryResult, WebhookError> {
        let endpoint = self
            .repository
            .endpoint(endpoint_id)
            .await
            .ok_or(WebhookError::EndpointNotFound)?;

        let payload = WebhookEventPayload::new(
            WebhookEventType::PaymentSuccess,
            endpoint.platform.clone(),
            json!({
                "test": true,
                "message": "This is a test webhook event",
            }),
        );

        let result = match self.post_signed(&endpoint, &payload).await {
            Ok(response) if response.status().is_success() => TestDeliveryResult {
                success: true,
                status: Some(response.status().as_u16()),
                message: "Test webhook delivered successfully".to_string(),
            },
            Ok(response) => {
                let status = response.status();
                TestDeliveryResult {
                    success: false,
                    status: Some(status.as_u16()),
                    message: format!(
                        "Webhook endpoint returned {} {}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or_default()
                    )
                    .trim_end()
                    .to_string(),
                }
            }
            Err(e) => TestDeliveryResult {
                success: false,
                status: None,
                message: format!("Failed to deliver test webhook: {e}"),
            },
        };

        info!(
            endpoint_id = %endpoint.id,
            success = result.success,
            status = ?result.status,
            "Webhook test sent"
        );
        Ok(result)
    }

    /// Serialize, sign and POST `payload` to `endpoint`.
    async fn post_signed(
        &self,
        endpoint: &WebhookEndpoint,
        payload: &WebhookEventPayload,
    ) -> Result<reqwest::Response, WebhookError> {
        let body = serde_json::to_vec(payload)?;
        let signature = sign_payload(&body, &endpoint.secret);

        let response = self
            .http
            .post(&endpoint.url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .header(EVENT_HEADER, payload.event.as_str())
            .header(TIMESTAMP_HEADER, payload.timestamp.as_str())
            .header(USER_AGENT, WEBHOOK_USER_AGENT)
            .body(body)
            .send()
            .await?;
        Ok(response)
    }
}

/// Accept only absolute http(s) URLs.
fn validate_url(url: &str) -> Result<(), WebhookError> {
    let parsed = Url::parse(url).map_err(|e| WebhookError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "https" => Ok(()),
        "http" => {
            warn!(url, "Webhook URL uses HTTP instead of HTTPS");
            Ok(())
        }
        _ => Err(WebhookError::InvalidUrl(
            "Webhook URL must use HTTP or HTTPS protocol".to_string(),
        )),
    }
}

fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_RESPONSE_BODY_CHARS).collect()
}
