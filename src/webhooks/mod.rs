// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! # Webhooks
//!
//! - **Outbound**: partner platforms register endpoints and receive signed
//!   `payment.*` / `merchant.*` events ([`WebhookService`]). Failed
//!   deliveries are retried with exponential backoff by the
//!   [`WebhookRetryWorker`].
//! - **Inbound**: partners push signed events to `POST /webhooks/partner`
//!   ([`receiver`]), processed at most once per event identity.

pub mod delivery;
pub mod error;
pub mod events;
pub mod idempotency;
pub mod receiver;
pub mod repository;
pub mod retry_worker;

pub use delivery::{DeliveryConfig, RegisteredEndpoint, TestDeliveryResult, WebhookService};
pub use error::WebhookError;
pub use events::{InboundEnvelope, WebhookEventPayload, WebhookEventType};
pub use idempotency::ProcessedEventCache;
pub use receiver::{PartnerWebhookReceiver, WebhookEventHandler};
pub use repository::{DeliveryStatus, WebhookDelivery, WebhookEndpoint, WebhookRepository};
pub use retry_worker::WebhookRetryWorker;
