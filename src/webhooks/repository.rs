// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! In-memory records of webhook endpoints and deliveries.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use super::events::{WebhookEventPayload, WebhookEventType};

/// A partner URL subscribed to a set of events.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookEndpoint {
    pub id: String,
    pub platform: String,
    pub url: String,
    pub events: BTreeSet<WebhookEventType>,
    /// HMAC key; only ever returned once, at registration
    #[serde(skip_serializing)]
    pub secret: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookEndpoint {
    pub fn new(
        platform: impl Into<String>,
        url: impl Into<String>,
        events: BTreeSet<WebhookEventType>,
        secret: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            platform: platform.into(),
            url: url.into(),
            events,
            secret: secret.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_subscribed(&self, event: WebhookEventType) -> bool {
        self.is_active && self.events.contains(&event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Failed,
}

/// One event sent (or to be sent) to one endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookDelivery {
    pub id: String,
    pub endpoint_id: String,
    pub event: WebhookEventType,
    pub payload: WebhookEventPayload,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub next_retry: Option<DateTime<Utc>>,
    pub response_status: Option<u16>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookDelivery {
    pub fn pending(endpoint_id: impl Into<String>, payload: WebhookEventPayload) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            endpoint_id: endpoint_id.into(),
            event: payload.event,
            payload,
            status: DeliveryStatus::Pending,
            attempts: 0,
            next_retry: None,
            response_status: None,
            response_body: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pending with a retry time at or before `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == DeliveryStatus::Pending && self.next_retry.is_some_and(|at| at <= now)
    }
}

#[derive(Default)]
pub struct WebhookRepository {
    endpoints: RwLock<HashMap<String, WebhookEndpoint>>,
    deliveries: RwLock<HashMap<String, WebhookDelivery>>,
}

impl WebhookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    pub async fn insert_endpoint(&self, endpoint: WebhookEndpoint) {
        self.endpoints
            .write()
            .await
            .insert(endpoint.id.clone(), endpoint);
    }

    pub async fn endpoint(&self, id: &str) -> Option<WebhookEndpoint> {
        self.endpoints.read().await.get(id).cloned()
    }

    /// Endpoints registered by `platform`, oldest first.
    pub async fn endpoints_for_platform(&self, platform: &str) -> Vec<WebhookEndpoint> {
        let mut endpoints: Vec<WebhookEndpoint> = self
            .endpoints
            .read()
            .await
            .values()
            .filter(|endpoint| endpoint.platform == platform)
            .cloned()
            .collect();
        endpoints.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        endpoints
    }

    /// Every endpoint, oldest first.
    pub async fn list_endpoints(&self) -> Vec<WebhookEndpoint> {
        let mut endpoints: Vec<WebhookEndpoint> =
            self.endpoints.read().await.values().cloned().collect();
        endpoints.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        endpoints
    }

    pub async fn set_endpoint_active(&self, id: &str, active: bool) -> Option<WebhookEndpoint> {
        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints.get_mut(id)?;
        endpoint.is_active = active;
        endpoint.updated_at = Utc::now();
        Some(endpoint.clone())
    }

    // =========================================================================
    // Deliveries
    // =========================================================================

    pub async fn insert_delivery(&self, delivery: WebhookDelivery) {
        self.deliveries
            .write()
            .await
            .insert(delivery.id.clone(), delivery);
    }

    pub async fn delivery(&self, id: &str) -> Option<WebhookDelivery> {
        self.deliveries.read().await.get(id).cloned()
    }

    /// Apply `mutate` to a delivery and return the result.
    pub async fn update_delivery<F>(&self, id: &str, mutate: F) -> Option<WebhookDelivery>
    where
        F: FnOnce(&mut WebhookDelivery),
    {
        let mut deliveries = self.deliveries.write().await;
        let delivery = deliveries.get_mut(id)?;
        mutate(delivery);
        delivery.updated_at = Utc::now();
        Some(delivery.clone())
    }

    /// Deliveries whose retry is due, oldest first.
    pub async fn due_deliveries(&self, now: DateTime<Utc>) -> Vec<WebhookDelivery> {
        let mut due: Vec<WebhookDelivery> = self
            .deliveries
            .read()
            .await
            .values()
            .filter(|delivery| delivery.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        due
    }

    /// Drop succeeded and failed deliveries last updated before `cutoff`.
    ///
    /// Returns the number removed. Pending deliveries are never pruned.
    pub async fn prune_finished_deliveries(&self, cutoff: DateTime<Utc>) -> usize {
        let mut deliveries = self.deliveries.write().await;
        let before = deliveries.len();
        deliveries.retain(|_, delivery| {
            delivery.status == DeliveryStatus::Pending || delivery.updated_at >= cutoff
        });
        before - deliveries.len()
    }

    pub async fn deliveries_for_endpoint(&self, endpoint_id: &str) -> Vec<WebhookDelivery> {
        let mut deliveries: Vec<WebhookDelivery> = self
            .deliveries
            .read()
            .await
            .values()
            .filter(|delivery| delivery.endpoint_id == endpoint_id)
            .cloned()
            .collect();
        deliveries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        deliveries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use serde_json::json;

    fn endpoint(platform: &str) -> WebhookEndpoint {
        WebhookEndpoint::new(
            platform,
            "https://partner.example/hooks",
            BTreeSet::from([WebhookEventType::PaymentSuccess]),
            "secret",
        )
    }

    #[tokio::test]
    async fn endpoints_filter_by_platform() {
        let repo = WebhookRepository::new();
        let hb = endpoint("hostsblue");
        repo.insert_endpoint(hb.clone()).await;
        repo.insert_endpoint(endpoint("businessblueprint")).await;

        let found = repo.endpoints_for_platform("hostsblue").await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, hb.id);
        assert_eq!(repo.list_endpoints().await.len(), 2);
    }

    #[tokio::test]
    async fn deactivated_endpoints_are_not_subscribed() {
        let repo = WebhookRepository::new();
        let hb = endpoint("hostsblue");
        assert!(hb.is_subscribed(WebhookEventType::PaymentSuccess));
        assert!(!hb.is_subscribed(WebhookEventType::PaymentFailed));
        repo.insert_endpoint(hb.clone()).await;

        let updated = repo.set_endpoint_active(&hb.id, false).await.unwrap();
        assert!(!updated.is_subscribed(WebhookEventType::PaymentSuccess));
        assert!(repo.set_endpoint_active("missing", false).await.is_none());
    }

    #[tokio::test]
    async fn only_pending_deliveries_with_elapsed_retry_are_due() {
        let repo = WebhookRepository::new();
        let now = Utc::now();
        let payload = WebhookEventPayload::new(WebhookEventType::PaymentSuccess, "hostsblue", json!({}));

        let fresh = WebhookDelivery::pending("ep", payload.clone());
        let mut due = WebhookDelivery::pending("ep", payload.clone());
        due.next_retry = Some(now - TimeDelta::seconds(1));
        let mut later = WebhookDelivery::pending("ep", payload.clone());
        later.next_retry = Some(now + TimeDelta::minutes(5));
        let mut failed = WebhookDelivery::pending("ep", payload);
        failed.status = DeliveryStatus::Failed;
        failed.next_retry = Some(now - TimeDelta::seconds(1));

        for delivery in [fresh, due.clone(), later, failed] {
            repo.insert_delivery(delivery).await;
        }

        let found = repo.due_deliveries(now).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, due.id);
        assert_eq!(repo.deliveries_for_endpoint("ep").await.len(), 4);
    }

    #[tokio::test]
    async fn update_delivery_applies_mutation() {
        let repo = WebhookRepository::new();
        let payload = WebhookEventPayload::new(WebhookEventType::MerchantCreated, "hostsblue", json!({}));
        let delivery = WebhookDelivery::pending("ep", payload);
        repo.insert_delivery(delivery.clone()).await;

        let updated = repo
            .update_delivery(&delivery.id, |d| {
                d.status = DeliveryStatus::Success;
                d.attempts = 1;
            })
            .await
            .unwrap();
        assert_eq!(updated.status, DeliveryStatus::Success);
        assert_eq!(repo.delivery(&delivery.id).await.unwrap().attempts, 1);
        assert!(repo.update_delivery("missing", |_| {}).await.is_none());
    }

    #[tokio::test]
    async fn prune_keeps_pending_and_recent_deliveries() {
        let repo = WebhookRepository::new();
        let now = Utc::now();
        let payload = WebhookEventPayload::new(WebhookEventType::PaymentFailed, "hostsblue", json!({}));

        let mut done = WebhookDelivery::pending("ep", payload.clone());
        done.status = DeliveryStatus::Success;
        done.updated_at = now - TimeDelta::days(8);
        let mut pending = WebhookDelivery::pending("ep", payload);
        pending.updated_at = now - TimeDelta::days(8);
        repo.insert_delivery(done.clone()).await;
        repo.insert_delivery(pending.clone()).await;

        assert_eq!(repo.prune_finished_deliveries(now - TimeDelta::days(7)).await, 1);
        assert!(repo.delivery(&done.id).await.is_none());
        assert!(repo.delivery(&pending.id).await.is_some());
        assert_eq!(repo.prune_finished_deliveries(now - TimeDelta::days(7)).await, 0);
    }

    #[test]
    fn secret_is_never_serialized() {
        let value = serde_json::to_value(endpoint("hostsblue")).unwrap();
        assert!(value.get("secret").is_none());
        assert_eq!(value["events"], json!(["payment.success"]));
    }
}
