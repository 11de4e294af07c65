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

//! The private-channel peer-event listener kind.

use std::sync::Arc;

use crate::message::catalog::{
    PRIVATE_CHANNEL_ADD_EVENT_LISTENER_REQUEST, PRIVATE_CHANNEL_ON_ADD_CONTEXT_LISTENER_EVENT,
    PRIVATE_CHANNEL_ON_DISCONNECT_EVENT, PRIVATE_CHANNEL_ON_UNSUBSCRIBE_EVENT,
    PRIVATE_CHANNEL_UNSUBSCRIBE_EVENT_LISTENER_REQUEST,
};
use crate::message::WireEnvelope;
use crate::traits::{SubscribingListener, WireListener};

/// Application callback invoked with the event's optional context-type detail.
pub type PrivateChannelEventHandler = Arc<dyn Fn(Option<String>) + Send + Sync>;

/// The peer-lifecycle events observable on a private channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivateChannelEvent {
    /// The peer added a context listener.
    AddContextListener,
    /// The peer unsubscribed a context listener.
    Unsubscribe,
    /// The peer disconnected from the channel.
    Disconnect,
}

impl PrivateChannelEvent {
    /// The wire event message type for this event kind.
    #[must_use]
    pub const fn wire_type(self) -> &'static str {
        match self {
            Self::AddContextListener => PRIVATE_CHANNEL_ON_ADD_CONTEXT_LISTENER_EVENT,
            Self::Unsubscribe => PRIVATE_CHANNEL_ON_UNSUBSCRIBE_EVENT,
            Self::Disconnect => PRIVATE_CHANNEL_ON_DISCONNECT_EVENT,
        }
    }

    /// The listener-type discriminator carried in the subscribe request.
    #[must_use]
    pub const fn listener_type(self) -> &'static str {
        match self {
            Self::AddContextListener => "onAddContextListener",
            Self::Unsubscribe => "onUnsubscribe",
            Self::Disconnect => "onDisconnect",
        }
    }
}

/// A durable subscription to one peer-lifecycle event kind, scoped to one
/// private channel.
pub struct PrivateChannelEventListener {
    id: String,
    channel_id: String,
    event: PrivateChannelEvent,
    handler: PrivateChannelEventHandler,
}

impl std::fmt::Debug for PrivateChannelEventListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateChannelEventListener")
            .field("id", &self.id)
            .field("channel_id", &self.channel_id)
            .field("event", &self.event)
            .finish()
    }
}

impl PrivateChannelEventListener {
    /// Creates a listener for one event kind on one private channel.
    #[must_use]
    pub fn new(
        channel_id: impl Into<String>,
        event: PrivateChannelEvent,
        handler: PrivateChannelEventHandler,
    ) -> Arc<Self> {
        use mti::prelude::*;
        Arc::new(Self {
            id: "listener".create_type_id::<V7>().to_string(),
            channel_id: channel_id.into(),
            event,
            handler,
        })
    }
}

impl WireListener for PrivateChannelEventListener {
    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, envelope: &WireEnvelope) -> bool {
        envelope.msg_type == self.event.wire_type()
            && envelope.payload_str("privateChannelId") == Some(self.channel_id.as_str())
    }

    fn deliver(&self, envelope: &WireEnvelope) {
        let detail = envelope.payload_str("contextType").map(str::to_owned);
        (self.handler)(detail);
    }
}

impl SubscribingListener for PrivateChannelEventListener {
    fn subscribe_request(&self) -> WireEnvelope {
        WireEnvelope::request(
            PRIVATE_CHANNEL_ADD_EVENT_LISTENER_REQUEST,
            serde_json::json!({
                "privateChannelId": self.channel_id,
                "listenerType": self.event.listener_type(),
            }),
        )
    }

    fn unsubscribe_request(&self) -> WireEnvelope {
        WireEnvelope::request(
            PRIVATE_CHANNEL_UNSUBSCRIBE_EVENT_LISTENER_REQUEST,
            serde_json::json!({ "listenerUUID": self.id }),
        )
    }
}
