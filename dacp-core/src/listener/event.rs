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

//! The generic API event listener kind.

use std::sync::Arc;

use crate::message::catalog::{
    is_event_type, wire_event_for, ADD_EVENT_LISTENER_REQUEST,
    EVENT_LISTENER_UNSUBSCRIBE_REQUEST,
};
use crate::message::{AgentError, WireEnvelope};
use crate::traits::{SubscribingListener, WireListener};

/// An API event delivered to a generic event listener.
#[derive(Debug, Clone)]
pub struct AgentEvent {
    /// The wire event message type, e.g. `channelChangedEvent`.
    pub event_type: String,
    /// The event payload, carried opaquely.
    pub details: serde_json::Value,
}

/// Application callback invoked with each matching API event.
pub type AgentEventHandler = Arc<dyn Fn(AgentEvent) + Send + Sync>;

/// A durable subscription to Desktop Agent API events.
///
/// Constructed with no event type it matches every event-suffixed message;
/// with an explicit type it matches only that type's exact wire event name.
/// A type outside the supported vocabulary fails construction synchronously,
/// before any wire interaction.
pub struct EventListener {
    id: String,
    api_type: Option<String>,
    wire_type: Option<&'static str>,
    handler: AgentEventHandler,
}

impl std::fmt::Debug for EventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListener")
            .field("id", &self.id)
            .field("api_type", &self.api_type)
            .field("wire_type", &self.wire_type)
            .finish()
    }
}

impl EventListener {
    /// Creates an event listener, validating the requested type against the
    /// supported vocabulary.
    ///
    /// # Errors
    ///
    /// [`AgentError::Protocol`] when `event_type` is not a recognized API
    /// event type. Nothing has been posted when this fails.
    pub fn new(
        event_type: Option<&str>,
        handler: AgentEventHandler,
    ) -> Result<Arc<Self>, AgentError> {
        use mti::prelude::*;
        let wire_type = match event_type {
            None => None,
            Some(api_type) => Some(wire_event_for(api_type).ok_or_else(|| {
                AgentError::Protocol(format!("unsupported event type: {api_type}"))
            })?),
        };
        Ok(Arc::new(Self {
            id: "listener".create_type_id::<V7>().to_string(),
            api_type: event_type.map(str::to_owned),
            wire_type,
            handler,
        }))
    }
}

impl WireListener for EventListener {
    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, envelope: &WireEnvelope) -> bool {
        match self.wire_type {
            None => is_event_type(&envelope.msg_type),
            Some(wire_type) => envelope.msg_type == wire_type,
        }
    }

    fn deliver(&self, envelope: &WireEnvelope) {
        (self.handler)(AgentEvent {
            event_type: envelope.msg_type.clone(),
            details: envelope.payload.clone(),
        });
    }
}

impl SubscribingListener for EventListener {
    fn subscribe_request(&self) -> WireEnvelope {
        WireEnvelope::request(
            ADD_EVENT_LISTENER_REQUEST,
            serde_json::json!({ "eventType": self.api_type }),
        )
    }

    fn unsubscribe_request(&self) -> WireEnvelope {
        WireEnvelope::request(
            EVENT_LISTENER_UNSUBSCRIBE_REQUEST,
            serde_json::json!({ "listenerUUID": self.id }),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::message::catalog::CHANNEL_CHANGED_EVENT;

    fn counting_handler() -> (AgentEventHandler, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let handler: AgentEventHandler = Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        (handler, hits)
    }

    #[test]
    fn test_untyped_listener_matches_any_event_suffix() {
        let (handler, _hits) = counting_handler();
        let listener = EventListener::new(None, handler).unwrap();

        assert!(listener.matches(&WireEnvelope::request(
            CHANNEL_CHANGED_EVENT,
            serde_json::json!({})
        )));
        assert!(listener.matches(&WireEnvelope::request(
            "broadcastEvent",
            serde_json::json!({})
        )));
        assert!(!listener.matches(&WireEnvelope::request(
            "getInfoResponse",
            serde_json::json!({})
        )));
    }

    #[test]
    fn test_typed_listener_matches_exact_wire_event() {
        let (handler, _hits) = counting_handler();
        let listener = EventListener::new(Some("userChannelChanged"), handler).unwrap();

        assert!(listener.matches(&WireEnvelope::request(
            CHANNEL_CHANGED_EVENT,
            serde_json::json!({})
        )));
        assert!(!listener.matches(&WireEnvelope::request(
            "broadcastEvent",
            serde_json::json!({})
        )));
    }

    #[test]
    fn test_unsupported_type_fails_synchronously() {
        let (handler, _hits) = counting_handler();
        let err = EventListener::new(Some("notARealType"), handler).unwrap_err();
        assert!(matches!(err, AgentError::Protocol(_)));
    }

    #[test]
    fn test_deliver_passes_type_and_payload() {
        let seen: Arc<parking_lot::Mutex<Vec<AgentEvent>>> =
            Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: AgentEventHandler = Arc::new(move |event| sink.lock().push(event));
        let listener = EventListener::new(None, handler).unwrap();

        listener.deliver(&WireEnvelope::request(
            CHANNEL_CHANGED_EVENT,
            serde_json::json!({ "newChannelId": "blue" }),
        ));

        let events = seen.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, CHANNEL_CHANGED_EVENT);
        assert_eq!(events[0].details["newChannelId"], "blue");
    }
}
