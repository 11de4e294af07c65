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

//! The Desktop Agent client facade.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use dacp_core::common::{AgentConfig, Messaging};
use dacp_core::listener::{AgentEventHandler, EventListener};
use dacp_core::message::{AgentError, AppIdentifier, WireEnvelope};
use dacp_core::traits::TransportRef;

use crate::channels::ChannelBinding;
use crate::handle::ListenerHandle;

/// The client-side Desktop Agent surface.
///
/// One instance speaks to exactly one Desktop Agent over the injected
/// transport. The transport's receive path feeds inbound envelopes into
/// [`deliver`](DesktopAgent::deliver); everything else — correlation,
/// subscriptions, intent resolution, channel binding — happens inside.
pub struct DesktopAgent {
    messaging: Arc<Messaging>,
    binding: Arc<ChannelBinding>,
    hooked: AtomicBool,
}

impl std::fmt::Debug for DesktopAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopAgent")
            .field("messaging", &self.messaging)
            .field("current_channel", &self.binding.current())
            .finish()
    }
}

impl DesktopAgent {
    /// Creates an agent over the transport with an explicit configuration.
    #[must_use]
    pub fn new(transport: TransportRef, config: AgentConfig) -> Self {
        Self {
            messaging: Arc::new(Messaging::new(transport, config)),
            binding: Arc::new(ChannelBinding::new()),
            hooked: AtomicBool::new(false),
        }
    }

    /// Creates an agent with configuration loaded from the XDG config path.
    #[must_use]
    pub fn with_default_config(transport: TransportRef) -> Self {
        Self::new(transport, AgentConfig::load())
    }

    /// The shared messaging service, for wiring the transport's receive path
    /// and for embedders that need the registry or correlator directly.
    #[must_use]
    pub fn messaging(&self) -> &Arc<Messaging> {
        &self.messaging
    }

    pub(crate) fn binding(&self) -> &Arc<ChannelBinding> {
        &self.binding
    }

    /// Records this application's identity, stamped on outbound envelopes.
    ///
    /// The identity comes out of the transport's handshake, which happens
    /// before the runtime is handed the transport.
    pub fn set_source(&self, source: AppIdentifier) {
        self.messaging.set_source(source);
    }

    /// Brings the runtime up on the already-established transport.
    ///
    /// Installs the internal channel-change hook that keeps dynamically
    /// scoped context listeners bound to the current user channel. Calling
    /// it again is a no-op.
    pub async fn connect(&self) -> Result<(), AgentError> {
        if !self.messaging.is_connected() {
            return Err(AgentError::ConnectionClosed);
        }
        if self.hooked.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let messaging = self.messaging.clone();
        let binding = self.binding.clone();
        let handler: AgentEventHandler = Arc::new(move |event| {
            let new_channel = event
                .details
                .get("newChannelId")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned);
            let messaging = messaging.clone();
            let binding = binding.clone();
            // Rebinding performs wire exchanges; it must not run on the
            // delivery path.
            tokio::spawn(async move {
                binding.apply_change(&messaging, new_channel).await;
            });
        });
        // Local-only: the Desktop Agent announces channel changes unprompted.
        let hook = EventListener::new(Some("userChannelChanged"), handler)
            .expect("channel-change hook uses a vocabulary event type");
        self.messaging.register_local(hook);

        debug!("Desktop Agent client connected");
        Ok(())
    }

    /// Tears the connection down.
    ///
    /// Outstanding correlated waits fail with
    /// [`AgentError::ConnectionClosed`]; later posts are rejected. The
    /// instance cannot be reconnected.
    pub async fn disconnect(&self) -> Result<(), AgentError> {
        self.messaging.shutdown();
        Ok(())
    }

    /// The inbound delivery entry point for the transport's receive path.
    pub fn deliver(&self, envelope: &WireEnvelope) {
        self.messaging.deliver(envelope);
    }

    /// Registers a listener for Desktop Agent API events.
    ///
    /// `None` subscribes to every API event; a named type must be in the
    /// supported vocabulary or this fails synchronously, before anything is
    /// posted.
    pub async fn add_event_listener(
        &self,
        event_type: Option<&str>,
        handler: AgentEventHandler,
    ) -> Result<ListenerHandle, AgentError> {
        let listener = EventListener::new(event_type, handler)?;
        self.messaging.register(listener.clone()).await?;
        Ok(ListenerHandle::new(listener, self.messaging.clone()))
    }
}
