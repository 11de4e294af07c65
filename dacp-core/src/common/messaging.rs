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

//! The messaging service shared by every component of the runtime.
//!
//! [`Messaging`] owns the listener registry, the correlator, and the gated
//! transport. It is the single place that implements the subscription
//! lifecycle: [`register`](Messaging::register) inserts a listener into the
//! registry *before* awaiting the subscribe acknowledgement (a push the
//! acknowledgement implicitly unlocks must not be missed), and
//! [`unsubscribe`](Messaging::unsubscribe) removes it before best-effort
//! posting the withdrawal.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::common::{AgentConfig, Correlator, ListenerRegistry};
use crate::message::catalog::response_type_for;
use crate::message::{AgentError, AppIdentifier, WireEnvelope};
use crate::traits::{MessageTransport, SubscribingListener, TransportRef, WireListener};

/// Wraps the injected transport with the connection gate and source stamping.
///
/// Every outbound envelope — whether posted directly or through the
/// correlator — passes through here, so a disconnected runtime rejects posts
/// uniformly and the application's identity is stamped once.
#[derive(Debug)]
struct GatedTransport {
    inner: TransportRef,
    shutdown: CancellationToken,
    source: RwLock<Option<AppIdentifier>>,
}

#[async_trait]
impl MessageTransport for GatedTransport {
    async fn post(&self, mut envelope: WireEnvelope) -> Result<(), AgentError> {
        if self.shutdown.is_cancelled() {
            return Err(AgentError::NotConnected);
        }
        if envelope.meta.source.is_none() {
            envelope.meta.source = self.source.read().clone();
        }
        trace!(
            msg_type = %envelope.msg_type,
            request_id = envelope.request_id(),
            "Posting envelope"
        );
        self.inner.post(envelope).await
    }
}

/// The shared plumbing of the client runtime.
pub struct Messaging {
    transport: Arc<GatedTransport>,
    registry: Arc<ListenerRegistry>,
    correlator: Correlator,
    config: AgentConfig,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Messaging {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messaging")
            .field("listener_count", &self.registry.len())
            .field("pending_waits", &self.correlator.pending_count())
            .field("connected", &!self.shutdown.is_cancelled())
            .finish()
    }
}

impl Messaging {
    /// Creates the messaging service over the injected transport.
    #[must_use]
    pub fn new(transport: TransportRef, config: AgentConfig) -> Self {
        let registry = Arc::new(ListenerRegistry::new());
        let shutdown = CancellationToken::new();
        let gated = Arc::new(GatedTransport {
            inner: transport,
            shutdown: shutdown.clone(),
            source: RwLock::new(None),
        });
        let correlator = Correlator::new(registry.clone(), gated.clone() as TransportRef);
        Self {
            transport: gated,
            registry,
            correlator,
            config,
            shutdown,
        }
    }

    /// Returns the listener registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    /// Returns the correlator.
    #[must_use]
    pub const fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    /// Returns the runtime configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Records this application's identity, stamped as `meta.source` on every
    /// outbound envelope that does not carry one already.
    pub fn set_source(&self, source: AppIdentifier) {
        *self.transport.source.write() = Some(source);
    }

    /// Whether the runtime still has a live connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Posts an envelope without awaiting any response.
    pub async fn post(&self, envelope: WireEnvelope) -> Result<(), AgentError> {
        self.transport.post(envelope).await
    }

    /// Posts `message` and awaits its correlated response under the default
    /// exchange deadline.
    pub async fn exchange(
        &self,
        message: WireEnvelope,
        expected_type: &str,
    ) -> Result<WireEnvelope, AgentError> {
        self.correlator
            .exchange(message, expected_type, self.config.exchange_timeout())
            .await
    }

    /// Posts `message` and awaits its correlated response under an explicit
    /// deadline.
    pub async fn exchange_with_timeout(
        &self,
        message: WireEnvelope,
        expected_type: &str,
        timeout: Duration,
    ) -> Result<WireEnvelope, AgentError> {
        self.correlator.exchange(message, expected_type, timeout).await
    }

    /// Waits for any envelope matching `predicate` within `timeout`.
    pub async fn wait_for<F>(
        &self,
        predicate: F,
        timeout: Duration,
        label: &str,
    ) -> Result<WireEnvelope, AgentError>
    where
        F: Fn(&WireEnvelope) -> bool + Send + Sync + 'static,
    {
        self.correlator.wait_for(predicate, timeout, label).await
    }

    /// The inbound delivery entry point.
    ///
    /// The transport's receive path calls this for each envelope arriving
    /// from the Desktop Agent; the registry fans it out to every matching
    /// subscription.
    pub fn deliver(&self, envelope: &WireEnvelope) {
        if self.shutdown.is_cancelled() {
            trace!(
                msg_type = %envelope.msg_type,
                "Dropping inbound envelope after disconnect"
            );
            return;
        }
        self.registry.deliver(envelope);
    }

    /// Registers a subscription and awaits the Desktop Agent's acknowledgement.
    ///
    /// The listener is live in the registry before the acknowledgement
    /// exchange is awaited. If the acknowledgement fails the entry is removed
    /// again and the error surfaces.
    pub async fn register<L>(&self, listener: Arc<L>) -> Result<(), AgentError>
    where
        L: SubscribingListener + 'static,
    {
        let request = listener.subscribe_request();
        let expected = response_type_for(&request.msg_type);
        let id = listener.id().to_owned();

        let as_wire: Arc<dyn WireListener> = listener;
        self.registry.insert(as_wire);

        match self.exchange(request, &expected).await {
            Ok(_ack) => {
                debug!(listener_id = %id, "Subscription acknowledged");
                Ok(())
            }
            Err(e) => {
                self.registry.remove(&id);
                warn!(listener_id = %id, error = %e, "Subscription rejected");
                Err(e)
            }
        }
    }

    /// Adds a purely local subscription, never announced over the wire.
    ///
    /// Used for runtime-internal listeners such as the channel-change hook.
    pub fn register_local<L>(&self, listener: Arc<L>)
    where
        L: WireListener + 'static,
    {
        self.registry.insert(listener);
    }

    /// Removes a subscription and best-effort posts its withdrawal.
    ///
    /// Removal is immediate: after this call returns, no further delivery
    /// occurs for the listener's id. Failure to deliver the unsubscribe
    /// notice to the Desktop Agent is logged, not raised.
    pub async fn unsubscribe(&self, listener: &dyn SubscribingListener) {
        self.registry.remove(listener.id());

        let request = listener.unsubscribe_request();
        let expected = response_type_for(&request.msg_type);
        if let Err(e) = self.exchange(request, &expected).await {
            warn!(
                listener_id = listener.id(),
                error = %e,
                "Failed to deliver unsubscribe notice"
            );
        }
    }

    /// Tears the connection down.
    ///
    /// Every outstanding correlated wait is failed with
    /// [`AgentError::ConnectionClosed`] instead of being left to its timer,
    /// and subsequent posts are rejected.
    pub fn shutdown(&self) {
        debug!("Shutting down messaging");
        self.shutdown.cancel();
        self.correlator.fail_all_pending();
    }
}
