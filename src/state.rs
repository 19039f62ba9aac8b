// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

use std::sync::Arc;
use std::time::Duration;

use crate::auth::ApiKeyAuthenticator;
use crate::storage::ApiKeyStore;
use crate::tiers::EntitlementMatrix;
use crate::webhooks::{PartnerWebhookReceiver, WebhookService};

#[derive(Clone)]
pub struct AppState {
    pub api_keys: Arc<dyn ApiKeyStore>,
    pub authenticator: ApiKeyAuthenticator,
    pub entitlements: Arc<EntitlementMatrix>,
    pub webhooks: WebhookService,
    pub partner_webhooks: PartnerWebhookReceiver,
}

impl AppState {
    /// State backed by `store`, the standard entitlement matrix and an
    /// unconfigured partner receiver.
    pub fn new(store: Arc<dyn ApiKeyStore>, webhooks: WebhookService) -> Self {
        Self {
            authenticator: ApiKeyAuthenticator::new(store.clone()),
            api_keys: store,
            entitlements: Arc::new(EntitlementMatrix::standard().clone()),
            webhooks,
            partner_webhooks: PartnerWebhookReceiver::default(),
        }
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.authenticator = self.authenticator.with_lookup_timeout(timeout);
        self
    }

    pub fn with_entitlements(mut self, entitlements: EntitlementMatrix) -> Self {
        self.entitlements = Arc::new(entitlements);
        self
    }

    pub fn with_partner_webhooks(mut self, receiver: PartnerWebhookReceiver) -> Self {
        self.partner_webhooks = receiver;
        self
    }
}

#[cfg(test)]
impl AppState {
    /// Default webhook service around `store`.
    pub(crate) fn for_store(store: Arc<dyn ApiKeyStore>) -> Self {
        let webhooks = WebhookService::new(crate::webhooks::DeliveryConfig::default())
            .expect("webhook client");
        Self::new(store, webhooks)
    }
}
