// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! # Webhook Retry Worker
//!
//! Background task that re-attempts webhook deliveries whose backoff has
//! elapsed. One sweep runs immediately on start, then one every
//! `retry_interval` (default 60 s).
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::WebhookService;

/// Default interval between retry sweeps.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(60);

pub struct WebhookRetryWorker {
    service: WebhookService,
    retry_interval: Duration,
}

impl WebhookRetryWorker {
    pub fn new(service: WebhookService) -> Self {
        Self {
            service,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }

    pub fn with_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }

    /// Run the worker loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(worker.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.retry_interval.as_secs(),
            "Webhook retry worker starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Webhook retry worker shutting down");
                return;
            }

            let processed = self.service.retry_due_deliveries(Utc::now()).await;
            debug!(processed, "Webhook retry sweep complete");

            tokio::select! {
                _ = tokio::time::sleep(self.retry_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Webhook retry worker shutting down");
                    return;
                }
            }
        }
    }
}
