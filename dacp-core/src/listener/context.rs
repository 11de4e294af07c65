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

//! The context listener kind.
//!
//! A context listener receives `broadcastEvent` pushes whose channel and
//! context type pass its filter. The channel scope is interior-mutable so a
//! listener following the application's current user channel can be rebound
//! on channel change without changing its externally visible identity.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::common::Messaging;
use crate::message::catalog::{
    response_type_for, ADD_CONTEXT_LISTENER_REQUEST, BROADCAST_EVENT,
    CONTEXT_LISTENER_UNSUBSCRIBE_REQUEST,
};
use crate::message::{AgentError, AppIdentifier, Context, WireEnvelope};
use crate::traits::{SubscribingListener, WireListener};

/// Application callback invoked with each matching broadcast context.
pub type ContextHandler = Arc<dyn Fn(Context, Option<AppIdentifier>) + Send + Sync>;

/// The channel a context listener is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelScope {
    /// Matches broadcasts on any channel.
    Any,
    /// Matches broadcasts on one channel.
    Bound(String),
    /// Matches nothing; the dynamic scope while no user channel is joined.
    Unjoined,
}

impl ChannelScope {
    fn admits(&self, channel_id: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Bound(bound) => channel_id == Some(bound.as_str()),
            Self::Unjoined => false,
        }
    }

    fn channel_id(&self) -> Option<&str> {
        match self {
            Self::Bound(id) => Some(id.as_str()),
            Self::Any | Self::Unjoined => None,
        }
    }

    fn from_current(current: Option<String>) -> Self {
        current.map_or(Self::Unjoined, Self::Bound)
    }
}

/// A durable subscription to context broadcasts.
pub struct ContextListener {
    id: String,
    context_type: Option<String>,
    scope: RwLock<ChannelScope>,
    dynamic: bool,
    handler: ContextHandler,
}

impl std::fmt::Debug for ContextListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextListener")
            .field("id", &self.id)
            .field("context_type", &self.context_type)
            .field("scope", &*self.scope.read())
            .field("dynamic", &self.dynamic)
            .finish()
    }
}

impl ContextListener {
    fn with_scope(
        context_type: Option<String>,
        scope: ChannelScope,
        dynamic: bool,
        handler: ContextHandler,
    ) -> Arc<Self> {
        use mti::prelude::*;
        Arc::new(Self {
            id: "listener".create_type_id::<V7>().to_string(),
            context_type,
            scope: RwLock::new(scope),
            dynamic,
            handler,
        })
    }

    /// A listener pinned to one channel, as handed out by channel objects.
    #[must_use]
    pub fn scoped(
        channel_id: impl Into<String>,
        context_type: Option<String>,
        handler: ContextHandler,
    ) -> Arc<Self> {
        Self::with_scope(
            context_type,
            ChannelScope::Bound(channel_id.into()),
            false,
            handler,
        )
    }

    /// A listener following the application's current user channel.
    ///
    /// Starts bound to `current` (or matching nothing when no channel is
    /// joined) and is rebound by the channel-change path.
    #[must_use]
    pub fn dynamic(
        current: Option<String>,
        context_type: Option<String>,
        handler: ContextHandler,
    ) -> Arc<Self> {
        Self::with_scope(context_type, ChannelScope::from_current(current), true, handler)
    }

    /// A listener not bound to any channel: every broadcast matches.
    #[must_use]
    pub fn unscoped(context_type: Option<String>, handler: ContextHandler) -> Arc<Self> {
        Self::with_scope(context_type, ChannelScope::Any, false, handler)
    }

    /// Whether this listener follows the current user channel.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// The channel the listener is currently scoped to, if any.
    #[must_use]
    pub fn bound_channel(&self) -> Option<String> {
        self.scope.read().channel_id().map(str::to_owned)
    }

    /// Rebinds a dynamic listener to a new current channel.
    ///
    /// The local scope flips first, so a broadcast still arriving on the old
    /// channel no longer matches from this point on. The wire subscription
    /// against the old channel is then withdrawn (best effort) and a new one
    /// is announced against the new channel. The listener's id — and with it
    /// the handle the application holds — never changes.
    pub async fn rebind(
        &self,
        messaging: &Messaging,
        new_channel: Option<String>,
    ) -> Result<(), AgentError> {
        let old_scope = {
            let mut scope = self.scope.write();
            std::mem::replace(&mut *scope, ChannelScope::from_current(new_channel.clone()))
        };
        trace!(
            listener_id = %self.id,
            old = ?old_scope,
            new = ?new_channel,
            "Rebinding context listener"
        );

        // Withdraw the old wire subscription. The registry entry stays: the
        // subscription survives the rebind under the same identity.
        let withdrawal = self.unsubscribe_request();
        let expected = response_type_for(&withdrawal.msg_type);
        if let Err(e) = messaging.exchange(withdrawal, &expected).await {
            warn!(
                listener_id = %self.id,
                error = %e,
                "Failed to withdraw old channel subscription during rebind"
            );
        }

        let announcement = self.subscribe_request();
        let expected = response_type_for(&announcement.msg_type);
        messaging.exchange(announcement, &expected).await.map(|_ack| ())
    }
}

impl WireListener for ContextListener {
    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, envelope: &WireEnvelope) -> bool {
        if envelope.msg_type != BROADCAST_EVENT {
            return false;
        }
        if !self.scope.read().admits(envelope.payload_str("channelId")) {
            return false;
        }
        match &self.context_type {
            None => true,
            Some(wanted) => {
                envelope
                    .payload
                    .get("context")
                    .and_then(|c| c.get("type"))
                    .and_then(serde_json::Value::as_str)
                    == Some(wanted.as_str())
            }
        }
    }

    fn deliver(&self, envelope: &WireEnvelope) {
        let Some(raw) = envelope.payload.get("context") else {
            warn!(listener_id = %self.id, "Broadcast event without context payload");
            return;
        };
        match serde_json::from_value::<Context>(raw.clone()) {
            Ok(context) => (self.handler)(context, envelope.meta.source.clone()),
            Err(e) => warn!(
                listener_id = %self.id,
                error = %e,
                "Failed to decode broadcast context"
            ),
        }
    }
}

impl SubscribingListener for ContextListener {
    fn subscribe_request(&self) -> WireEnvelope {
        WireEnvelope::request(
            ADD_CONTEXT_LISTENER_REQUEST,
            serde_json::json!({
                "channelId": self.bound_channel(),
                "contextType": self.context_type,
            }),
        )
    }

    fn unsubscribe_request(&self) -> WireEnvelope {
        WireEnvelope::request(
            CONTEXT_LISTENER_UNSUBSCRIBE_REQUEST,
            serde_json::json!({ "listenerUUID": self.id }),
        )
    }
}
