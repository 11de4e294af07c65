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

//! Channel objects handed out by the Desktop Agent API.

use std::sync::Arc;

use dacp_core::common::Messaging;
use dacp_core::listener::{
    ContextHandler, ContextListener, PrivateChannelEvent, PrivateChannelEventHandler,
    PrivateChannelEventListener,
};
use dacp_core::message::catalog::{
    response_type_for, BROADCAST_REQUEST, GET_CURRENT_CONTEXT_REQUEST,
    PRIVATE_CHANNEL_DISCONNECT_REQUEST,
};
use dacp_core::message::{AgentError, Context, WireEnvelope};

use crate::handle::ListenerHandle;
use crate::types::{ChannelType, DisplayMetadata};

/// A named broadcast scope for context.
#[derive(Clone)]
pub struct Channel {
    id: String,
    channel_type: ChannelType,
    display_metadata: Option<DisplayMetadata>,
    messaging: Arc<Messaging>,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("channel_type", &self.channel_type)
            .finish()
    }
}

impl Channel {
    pub(crate) fn new(
        id: impl Into<String>,
        channel_type: ChannelType,
        display_metadata: Option<DisplayMetadata>,
        messaging: Arc<Messaging>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_type,
            display_metadata,
            messaging,
        }
    }

    /// Decodes a channel object from a response payload field.
    pub(crate) fn from_wire(
        value: &serde_json::Value,
        messaging: Arc<Messaging>,
    ) -> Result<Self, AgentError> {
        let id = value
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| AgentError::Serialization("channel missing id".to_string()))?;
        let channel_type: ChannelType = value
            .get("type")
            .cloned()
            .map_or(Ok(ChannelType::App), serde_json::from_value)?;
        let display_metadata = match value.get("displayMetadata") {
            Some(raw) if !raw.is_null() => Some(serde_json::from_value(raw.clone())?),
            _ => None,
        };
        Ok(Self::new(id, channel_type, display_metadata, messaging))
    }

    /// The channel id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The channel kind.
    #[must_use]
    pub const fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    /// Display hints for the channel, when the Desktop Agent provided any.
    #[must_use]
    pub const fn display_metadata(&self) -> Option<&DisplayMetadata> {
        self.display_metadata.as_ref()
    }

    /// Broadcasts a context on this channel.
    pub async fn broadcast(&self, context: Context) -> Result<(), AgentError> {
        let request = WireEnvelope::request(
            BROADCAST_REQUEST,
            serde_json::json!({ "channelId": self.id, "context": context }),
        );
        self.messaging
            .exchange(request, &response_type_for(BROADCAST_REQUEST))
            .await
            .map(|_ack| ())
    }

    /// Adds a context listener pinned to this channel.
    ///
    /// Unlike a listener added through the agent surface, a channel-pinned
    /// listener keeps its scope when the application's current user channel
    /// changes.
    pub async fn add_context_listener(
        &self,
        context_type: Option<&str>,
        handler: ContextHandler,
    ) -> Result<ListenerHandle, AgentError> {
        let listener = ContextListener::scoped(
            self.id.clone(),
            context_type.map(str::to_owned),
            handler,
        );
        self.messaging.register(listener.clone()).await?;
        Ok(ListenerHandle::new(listener, self.messaging.clone()))
    }

    /// Retrieves the most recent context broadcast on this channel, optionally
    /// of one specific type.
    pub async fn get_current_context(
        &self,
        context_type: Option<&str>,
    ) -> Result<Option<Context>, AgentError> {
        let request = WireEnvelope::request(
            GET_CURRENT_CONTEXT_REQUEST,
            serde_json::json!({ "channelId": self.id, "contextType": context_type }),
        );
        let response = self
            .messaging
            .exchange(request, &response_type_for(GET_CURRENT_CONTEXT_REQUEST))
            .await?;
        match response.payload.get("context") {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(raw) => Ok(Some(serde_json::from_value(raw.clone())?)),
        }
    }
}

/// A two-party scoped channel with peer-lifecycle events.
#[derive(Clone, Debug)]
pub struct PrivateChannel {
    channel: Channel,
}

impl PrivateChannel {
    pub(crate) const fn new(channel: Channel) -> Self {
        Self { channel }
    }

    /// The channel id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.channel.id()
    }

    /// The underlying channel, for broadcast and context listeners.
    #[must_use]
    pub const fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Broadcasts a context to the peer.
    pub async fn broadcast(&self, context: Context) -> Result<(), AgentError> {
        self.channel.broadcast(context).await
    }

    /// Adds a context listener scoped to this private channel.
    pub async fn add_context_listener(
        &self,
        context_type: Option<&str>,
        handler: ContextHandler,
    ) -> Result<ListenerHandle, AgentError> {
        self.channel.add_context_listener(context_type, handler).await
    }

    /// Observes the peer adding a context listener. The handler receives the
    /// context type the peer subscribed to, when stated.
    pub async fn on_add_context_listener(
        &self,
        handler: PrivateChannelEventHandler,
    ) -> Result<ListenerHandle, AgentError> {
        self.peer_event(PrivateChannelEvent::AddContextListener, handler)
            .await
    }

    /// Observes the peer unsubscribing a context listener.
    pub async fn on_unsubscribe(
        &self,
        handler: PrivateChannelEventHandler,
    ) -> Result<ListenerHandle, AgentError> {
        self.peer_event(PrivateChannelEvent::Unsubscribe, handler).await
    }

    /// Observes the peer disconnecting from the channel.
    pub async fn on_disconnect(
        &self,
        handler: PrivateChannelEventHandler,
    ) -> Result<ListenerHandle, AgentError> {
        self.peer_event(PrivateChannelEvent::Disconnect, handler).await
    }

    /// Disconnects from the private channel.
    ///
    /// Blocks the calling flow until the Desktop Agent acknowledges or the
    /// bounded disconnect wait elapses; any transport or timeout failure is
    /// translated into a single [`AgentError::Disconnect`].
    pub async fn disconnect(&self) -> Result<(), AgentError> {
        let messaging = &self.channel.messaging;
        let request = WireEnvelope::request(
            PRIVATE_CHANNEL_DISCONNECT_REQUEST,
            serde_json::json!({ "channelId": self.id() }),
        );
        messaging
            .exchange_with_timeout(
                request,
                &response_type_for(PRIVATE_CHANNEL_DISCONNECT_REQUEST),
                messaging.config().disconnect_timeout(),
            )
            .await
            .map(|_ack| ())
            .map_err(|e| AgentError::Disconnect(e.to_string()))
    }

    async fn peer_event(
        &self,
        event: PrivateChannelEvent,
        handler: PrivateChannelEventHandler,
    ) -> Result<ListenerHandle, AgentError> {
        let messaging = &self.channel.messaging;
        let listener = PrivateChannelEventListener::new(self.id(), event, handler);
        messaging.register(listener.clone()).await?;
        Ok(ListenerHandle::new(listener, messaging.clone()))
    }
}
