// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

//! LRU record of processed inbound webhook events.
//!
//! Partners retry deliveries they did not see acknowledged, so the same
//! event can arrive more than once. An event is claimed before its handler
//! runs and remembered for [`DEFAULT_RETENTION`] after it has been
//! processed successfully.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::events::InboundEnvelope;

/// How long a processed event is remembered.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Maximum number of remembered events.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Identity of an inbound event: `<event>-<subject>-<timestamp>`.
///
/// The subject is the transaction id for payment events and the merchant id
/// otherwise; the timestamp is the `X-Webhook-Timestamp` header.
pub fn event_identity(envelope: &InboundEnvelope, timestamp: Option<&str>) -> String {
    format!(
        "{}-{}-{}",
        envelope.event,
        envelope.subject_id().as_deref().unwrap_or("unknown"),
        timestamp.unwrap_or_default()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    /// Claimed by a handler that has not finished yet
    InFlight,
    Processed,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    state: EntryState,
    at: Instant,
}

/// In-process set of claimed and processed event ids with per-entry expiry.
pub struct ProcessedEventCache {
    cache: Mutex<LruCache<String, Entry>>,
    retention: Duration,
}

impl ProcessedEventCache {
    /// Create a new cache with the given capacity and retention.
    pub fn new(capacity: usize, retention: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            retention,
        }
    }

    /// Claim `event_id` for processing.
    ///
    /// Returns false if the event is already in flight or was processed
    /// within the retention window. Check and insert happen under one lock,
    /// so concurrent deliveries of one event yield a single claim.
    pub fn try_claim(&self, event_id: &str) -> bool {
        let Ok(mut cache) = self.cache.lock() else {
            return true;
        };
        if let Some(entry) = cache.get(event_id) {
            if entry.at.elapsed() < self.retention {
                return false;
            }
        }
        cache.put(
            event_id.to_string(),
            Entry {
                state: EntryState::InFlight,
                at: Instant::now(),
            },
        );
        true
    }

    /// Drop a claim so a redelivery is processed again.
    pub fn release(&self, event_id: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(event_id);
        }
    }

    /// Whether `event_id` was processed within the retention window.
    pub fn is_processed(&self, event_id: &str) -> bool {
        let Ok(mut cache) = self.cache.lock() else {
            return false;
        };
        if let Some(entry) = cache.get(event_id) {
            if entry.at.elapsed() < self.retention {
                return entry.state == EntryState::Processed;
            }
            // Expired
            cache.pop(event_id);
        }
        false
    }

    pub fn mark_processed(&self, event_id: &str) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                event_id.to_string(),
                Entry {
                    state: EntryState::Processed,
                    at: Instant::now(),
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ProcessedEventCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_RETENTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event: &str, data: serde_json::Value) -> InboundEnvelope {
        InboundEnvelope {
            event: event.to_string(),
            platform: "hostsblue".to_string(),
            data,
        }
    }

    #[test]
    fn identity_uses_subject_and_timestamp() {
        let payment = envelope("payment.success", json!({"transactionId": "tx_1"}));
        assert_eq!(
            event_identity(&payment, Some("2026-01-01T00:00:00Z")),
            "payment.success-tx_1-2026-01-01T00:00:00Z"
        );

        let merchant = envelope("merchant.approved", json!({"merchantId": "m_7"}));
        assert_eq!(event_identity(&merchant, None), "merchant.approved-m_7-");

        let bare = envelope("payment.failed", json!({}));
        assert_eq!(event_identity(&bare, Some("t")), "payment.failed-unknown-t");
    }

    #[test]
    fn mark_then_seen() {
        let cache = ProcessedEventCache::default();
        assert!(!cache.is_processed("evt-1"));

        cache.mark_processed("evt-1");
        assert!(cache.is_processed("evt-1"));
        assert!(!cache.is_processed("evt-2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn claim_is_exclusive_until_released() {
        let cache = ProcessedEventCache::default();
        assert!(cache.try_claim("evt-1"));
        assert!(!cache.try_claim("evt-1"));
        assert!(!cache.is_processed("evt-1"));

        cache.release("evt-1");
        assert!(cache.try_claim("evt-1"));

        cache.mark_processed("evt-1");
        assert!(!cache.try_claim("evt-1"));
        assert!(cache.is_processed("evt-1"));
    }

    #[test]
    fn concurrent_claims_yield_one_winner() {
        let cache = ProcessedEventCache::default();
        let winners = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.try_claim("evt-race")))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|claimed| *claimed)
                .count()
        });
        assert_eq!(winners, 1);
    }

    #[test]
    fn entries_expire() {
        let cache = ProcessedEventCache::new(10, Duration::from_millis(1));
        cache.mark_processed("evt-1");

        std::thread::sleep(Duration::from_millis(5));

        assert!(!cache.is_processed("evt-1"));
        assert!(cache.is_empty());
    }

    #[test]
    fn least_recent_entries_are_evicted() {
        let cache = ProcessedEventCache::new(2, DEFAULT_RETENTION);
        cache.mark_processed("a");
        cache.mark_processed("b");
        cache.mark_processed("c");

        assert!(!cache.is_processed("a"));
        assert!(cache.is_processed("b"));
        assert!(cache.is_processed("c"));
    }
}
