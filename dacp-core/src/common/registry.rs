/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

//! The concurrent store of active subscriptions and the fan-out delivery path.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::message::WireEnvelope;
use crate::traits::WireListener;

/// Statistics for the delivery path.
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Total envelopes delivered into the registry.
    pub envelopes_delivered: AtomicUsize,
    /// Total listener dispatches across all envelopes (fan-out counted).
    pub dispatches: AtomicUsize,
    /// Envelopes that matched no subscription.
    pub unmatched: AtomicUsize,
}

impl RegistryStats {
    /// Get the number of envelopes delivered into the registry.
    #[must_use]
    pub fn envelopes_delivered(&self) -> usize {
        self.envelopes_delivered.load(Ordering::Relaxed)
    }

    /// Get the number of listener dispatches.
    #[must_use]
    pub fn dispatches(&self) -> usize {
        self.dispatches.load(Ordering::Relaxed)
    }

    /// Get the number of envelopes that matched no subscription.
    #[must_use]
    pub fn unmatched(&self) -> usize {
        self.unmatched.load(Ordering::Relaxed)
    }
}

/// A concurrent, identity-keyed store of active subscriptions.
///
/// Delivery fans an inbound envelope out to **every** registered subscription
/// whose filter matches. This is load-bearing for duplicate and overlapping
/// subscriptions and must not be reduced to first-match.
///
/// # Thread Safety
///
/// Insert, remove, and delivery may run concurrently. Matched listeners are
/// snapshotted before dispatch so no registry lock is held across a handler
/// invocation, and each matched id is re-checked for membership immediately
/// before its dispatch so a subscription removed mid-delivery is not
/// re-entered.
pub struct ListenerRegistry {
    listeners: DashMap<String, Arc<dyn WireListener>>,
    stats: RegistryStats,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listener_count", &self.listeners.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            stats: RegistryStats::default(),
        }
    }

    /// Returns a reference to the delivery statistics.
    #[must_use]
    pub const fn stats(&self) -> &RegistryStats {
        &self.stats
    }

    /// Adds a subscription under its own id.
    ///
    /// A later insert with the same id replaces the earlier entry; ids are
    /// generated uniquely so this only arises when a caller re-registers a
    /// listener it already owns.
    pub fn insert(&self, listener: Arc<dyn WireListener>) {
        trace!(listener_id = listener.id(), "Registering subscription");
        self.listeners.insert(listener.id().to_owned(), listener);
    }

    /// Removes a subscription, returning it if it was present.
    ///
    /// After removal no further delivery occurs for the id, including for
    /// envelopes already snapshotted by an in-flight delivery.
    pub fn remove(&self, id: &str) -> Option<Arc<dyn WireListener>> {
        trace!(listener_id = id, "Removing subscription");
        self.listeners.remove(id).map(|(_, listener)| listener)
    }

    /// Whether a subscription with the given id is live.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.listeners.contains_key(id)
    }

    /// The number of live subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether the registry holds no subscriptions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Fans an inbound envelope out to every matching subscription.
    pub fn deliver(&self, envelope: &WireEnvelope) {
        self.stats.envelopes_delivered.fetch_add(1, Ordering::Relaxed);

        // Snapshot matches first so no shard guard is held across dispatch.
        let matched: Vec<Arc<dyn WireListener>> = self
            .listeners
            .iter()
            .filter(|entry| entry.value().matches(envelope))
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        if matched.is_empty() {
            self.stats.unmatched.fetch_add(1, Ordering::Relaxed);
            trace!(
                msg_type = %envelope.msg_type,
                request_id = envelope.request_id(),
                "No subscription matched envelope"
            );
            return;
        }

        for listener in matched {
            // A subscription unsubscribed since the snapshot must not be
            // re-entered.
            if !self.listeners.contains_key(listener.id()) {
                trace!(
                    listener_id = listener.id(),
                    "Skipping dispatch to removed subscription"
                );
                continue;
            }
            self.stats.dispatches.fetch_add(1, Ordering::Relaxed);
            trace!(
                listener_id = listener.id(),
                msg_type = %envelope.msg_type,
                "Dispatching envelope"
            );
            listener.deliver(envelope);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    struct CountingListener {
        id: String,
        msg_type: String,
        hits: AtomicUsize,
    }

    impl CountingListener {
        fn new(id: &str, msg_type: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                msg_type: msg_type.to_string(),
                hits: AtomicUsize::new(0),
            })
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::Relaxed)
        }
    }

    impl WireListener for CountingListener {
        fn id(&self) -> &str {
            &self.id
        }

        fn matches(&self, envelope: &WireEnvelope) -> bool {
            envelope.msg_type == self.msg_type
        }

        fn deliver(&self, _envelope: &WireEnvelope) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn event(msg_type: &str) -> WireEnvelope {
        WireEnvelope::request(msg_type, serde_json::json!({}))
    }

    #[test]
    fn test_fan_out_delivers_to_all_matches() {
        let registry = ListenerRegistry::new();
        let a = CountingListener::new("a", "broadcastEvent");
        let b = CountingListener::new("b", "broadcastEvent");
        let c = CountingListener::new("c", "intentEvent");
        registry.insert(a.clone());
        registry.insert(b.clone());
        registry.insert(c.clone());

        registry.deliver(&event("broadcastEvent"));

        assert_eq!(a.hits(), 1);
        assert_eq!(b.hits(), 1);
        assert_eq!(c.hits(), 0);
        assert_eq!(registry.stats().dispatches(), 2);
    }

    #[test]
    fn test_no_delivery_after_remove() {
        let registry = ListenerRegistry::new();
        let listener = CountingListener::new("a", "broadcastEvent");
        registry.insert(listener.clone());

        registry.deliver(&event("broadcastEvent"));
        assert_eq!(listener.hits(), 1);

        assert!(registry.remove("a").is_some());
        registry.deliver(&event("broadcastEvent"));
        registry.deliver(&event("broadcastEvent"));
        assert_eq!(listener.hits(), 1);
        assert_eq!(registry.stats().unmatched(), 2);
    }

    #[test]
    fn test_unmatched_envelope_counted() {
        let registry = ListenerRegistry::new();
        registry.deliver(&event("somethingElseEvent"));
        assert_eq!(registry.stats().unmatched(), 1);
        assert_eq!(registry.stats().envelopes_delivered(), 1);
    }

    #[test]
    fn test_insert_same_id_replaces() {
        let registry = ListenerRegistry::new();
        let first = CountingListener::new("a", "broadcastEvent");
        let second = CountingListener::new("a", "broadcastEvent");
        registry.insert(first.clone());
        registry.insert(second.clone());
        assert_eq!(registry.len(), 1);

        registry.deliver(&event("broadcastEvent"));
        assert_eq!(first.hits(), 0);
        assert_eq!(second.hits(), 1);
    }
}
