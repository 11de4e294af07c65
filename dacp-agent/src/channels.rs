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

//! User-channel state and the channel-scoped operations of the agent surface.
//!
//! The application has at most one current user channel. Context listeners
//! registered without an explicit channel follow it: on every channel change
//! — a local join/leave or a `channelChangedEvent` pushed by the Desktop
//! Agent — each tracked listener is rebound to the new channel while its
//! externally visible identity stays put.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use dacp_core::common::Messaging;
use dacp_core::listener::{ContextHandler, ContextListener};
use dacp_core::message::catalog::{
    response_type_for, BROADCAST_REQUEST, CREATE_PRIVATE_CHANNEL_REQUEST,
    GET_CURRENT_CHANNEL_REQUEST, GET_OR_CREATE_CHANNEL_REQUEST, JOIN_USER_CHANNEL_REQUEST,
    LEAVE_CURRENT_CHANNEL_REQUEST,
};
use dacp_core::message::{AgentError, Context, WireEnvelope};
use dacp_core::traits::WireListener;

use crate::agent::DesktopAgent;
use crate::channel::{Channel, PrivateChannel};
use crate::handle::ListenerHandle;
use crate::types::ChannelType;

/// The application's current user channel and the dynamically scoped
/// listeners that follow it.
pub(crate) struct ChannelBinding {
    current: RwLock<Option<String>>,
    dynamic: Mutex<HashMap<String, Arc<ContextListener>>>,
}

impl ChannelBinding {
    pub(crate) fn new() -> Self {
        Self {
            current: RwLock::new(None),
            dynamic: Mutex::new(HashMap::new()),
        }
    }

    /// The current user channel id.
    pub(crate) fn current(&self) -> Option<String> {
        self.current.read().clone()
    }

    /// Tracks a dynamically scoped listener for rebinding.
    fn track(&self, listener: Arc<ContextListener>) {
        self.dynamic.lock().insert(listener.id().to_owned(), listener);
    }

    /// Applies a channel change: update the binding, rebind every tracked
    /// listener. A listener that has been unsubscribed since it was tracked
    /// is dropped from tracking instead of being re-announced.
    pub(crate) async fn apply_change(&self, messaging: &Messaging, new_channel: Option<String>) {
        {
            let mut current = self.current.write();
            if *current == new_channel {
                trace!(channel = ?new_channel, "Channel unchanged, skipping rebind");
                return;
            }
            *current = new_channel.clone();
        }
        debug!(channel = ?new_channel, "Current user channel changed");

        let tracked: Vec<Arc<ContextListener>> =
            self.dynamic.lock().values().cloned().collect();
        for listener in tracked {
            if !messaging.registry().contains(listener.id()) {
                self.dynamic.lock().remove(listener.id());
                continue;
            }
            if let Err(e) = listener.rebind(messaging, new_channel.clone()).await {
                warn!(
                    listener_id = listener.id(),
                    error = %e,
                    "Failed to rebind context listener"
                );
            }
        }
    }
}

impl DesktopAgent {
    /// Joins a user channel.
    ///
    /// Dynamically scoped context listeners are rebound to the new channel.
    pub async fn join_user_channel(&self, channel_id: &str) -> Result<(), AgentError> {
        let request = WireEnvelope::request(
            JOIN_USER_CHANNEL_REQUEST,
            serde_json::json!({ "channelId": channel_id }),
        );
        self.messaging()
            .exchange(request, &response_type_for(JOIN_USER_CHANNEL_REQUEST))
            .await?;
        self.binding()
            .apply_change(self.messaging(), Some(channel_id.to_owned()))
            .await;
        Ok(())
    }

    /// Leaves the current user channel, if any.
    pub async fn leave_user_channel(&self) -> Result<(), AgentError> {
        let request =
            WireEnvelope::request(LEAVE_CURRENT_CHANNEL_REQUEST, serde_json::json!({}));
        self.messaging()
            .exchange(request, &response_type_for(LEAVE_CURRENT_CHANNEL_REQUEST))
            .await?;
        self.binding().apply_change(self.messaging(), None).await;
        Ok(())
    }

    /// The channel object for the current user channel, if one is joined.
    pub async fn get_current_channel(&self) -> Result<Option<Channel>, AgentError> {
        let request =
            WireEnvelope::request(GET_CURRENT_CHANNEL_REQUEST, serde_json::json!({}));
        let response = self
            .messaging()
            .exchange(request, &response_type_for(GET_CURRENT_CHANNEL_REQUEST))
            .await?;
        match response.payload.get("channel") {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(raw) => Ok(Some(Channel::from_wire(raw, self.messaging().clone())?)),
        }
    }

    /// Returns an app channel, creating it if it does not exist yet.
    pub async fn get_or_create_channel(&self, channel_id: &str) -> Result<Channel, AgentError> {
        let request = WireEnvelope::request(
            GET_OR_CREATE_CHANNEL_REQUEST,
            serde_json::json!({ "channelId": channel_id }),
        );
        let response = self
            .messaging()
            .exchange(request, &response_type_for(GET_OR_CREATE_CHANNEL_REQUEST))
            .await?;
        let raw = response.payload.get("channel").ok_or_else(|| {
            AgentError::Serialization("getOrCreateChannel response without channel".to_string())
        })?;
        Channel::from_wire(raw, self.messaging().clone())
    }

    /// Creates a private channel for a two-party exchange.
    pub async fn create_private_channel(&self) -> Result<PrivateChannel, AgentError> {
        let request =
            WireEnvelope::request(CREATE_PRIVATE_CHANNEL_REQUEST, serde_json::json!({}));
        let response = self
            .messaging()
            .exchange(request, &response_type_for(CREATE_PRIVATE_CHANNEL_REQUEST))
            .await?;
        let raw = response.payload.get("privateChannel").ok_or_else(|| {
            AgentError::Serialization(
                "createPrivateChannel response without channel".to_string(),
            )
        })?;
        let id = raw
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                AgentError::Serialization("private channel missing id".to_string())
            })?;
        Ok(PrivateChannel::new(Channel::new(
            id,
            ChannelType::Private,
            None,
            self.messaging().clone(),
        )))
    }

    /// Broadcasts a context on the current user channel.
    ///
    /// A no-op when no channel is joined.
    pub async fn broadcast(&self, context: Context) -> Result<(), AgentError> {
        let Some(channel_id) = self.binding().current() else {
            debug!("Broadcast with no current channel, dropping");
            return Ok(());
        };
        let request = WireEnvelope::request(
            BROADCAST_REQUEST,
            serde_json::json!({ "channelId": channel_id, "context": context }),
        );
        self.messaging()
            .exchange(request, &response_type_for(BROADCAST_REQUEST))
            .await
            .map(|_ack| ())
    }

    /// Adds a context listener scoped to the current user channel.
    ///
    /// The listener follows the current channel: joining another channel
    /// rebinds it without changing the returned handle. Pass `None` as
    /// `context_type` to receive every context type.
    pub async fn add_context_listener(
        &self,
        context_type: Option<&str>,
        handler: ContextHandler,
    ) -> Result<ListenerHandle, AgentError> {
        let listener = ContextListener::dynamic(
            self.binding().current(),
            context_type.map(str::to_owned),
            handler,
        );
        self.messaging().register(listener.clone()).await?;
        self.binding().track(listener.clone());
        Ok(ListenerHandle::new(listener, self.messaging().clone()))
    }
}
