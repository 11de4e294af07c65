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

//! Request/response correlation over the multiplexed connection.
//!
//! The correlator turns the fire-and-forget transport into callable
//! request/response exchanges. Its two primitives are [`wait_for`] — a
//! one-shot wait for any envelope matching a predicate within a deadline —
//! and [`exchange`] — post a request, await the response sharing its
//! correlation id, and unwrap a counterparty-reported error.
//!
//! Each wait owns a settle-once token: a slot holding the result sender.
//! Whichever of {matching delivery, deadline} takes the slot first settles
//! the wait; the loser observes an empty slot and is a no-op. A deadline that
//! loses the race by a hair yields to the already-delivered response rather
//! than overwriting it.
//!
//! [`wait_for`]: Correlator::wait_for
//! [`exchange`]: Correlator::exchange

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::common::ListenerRegistry;
use crate::message::{AgentError, WireEnvelope};
use crate::traits::{TransportRef, WireListener};

/// Statistics for the correlator, kept for diagnostics.
#[derive(Debug, Default)]
pub struct CorrelatorStats {
    /// Total exchanges posted.
    pub exchanges_posted: AtomicUsize,
    /// Total waits settled by a matching delivery.
    pub responses_matched: AtomicUsize,
    /// Total waits settled by their deadline.
    pub timeouts: AtomicUsize,
    /// Total responses carrying a counterparty-reported error.
    pub remote_errors: AtomicUsize,
}

impl CorrelatorStats {
    /// Get the number of exchanges posted.
    #[must_use]
    pub fn exchanges_posted(&self) -> usize {
        self.exchanges_posted.load(Ordering::Relaxed)
    }

    /// Get the number of waits settled by a matching delivery.
    #[must_use]
    pub fn responses_matched(&self) -> usize {
        self.responses_matched.load(Ordering::Relaxed)
    }

    /// Get the number of waits settled by their deadline.
    #[must_use]
    pub fn timeouts(&self) -> usize {
        self.timeouts.load(Ordering::Relaxed)
    }

    /// Get the number of responses carrying a counterparty-reported error.
    #[must_use]
    pub fn remote_errors(&self) -> usize {
        self.remote_errors.load(Ordering::Relaxed)
    }
}

/// A one-shot correlated wait registered in the listener registry.
///
/// The slot holding the result sender doubles as the settle-once guard:
/// `take()` under the lock flips it exactly once, and the envelope is sent
/// inside the same critical section so a racing deadline that finds the slot
/// empty can rely on the result already being available.
struct CorrelatedWait {
    id: String,
    predicate: Box<dyn Fn(&WireEnvelope) -> bool + Send + Sync>,
    slot: Mutex<Option<oneshot::Sender<WireEnvelope>>>,
    registry: Weak<ListenerRegistry>,
}

impl CorrelatedWait {
    /// Claims the settle token without delivering.
    ///
    /// Returns `true` when the wait was still unsettled, i.e. the caller won
    /// the race and owns the outcome.
    fn cancel(&self) -> bool {
        self.slot.lock().take().is_some()
    }
}

impl WireListener for CorrelatedWait {
    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, envelope: &WireEnvelope) -> bool {
        (self.predicate)(envelope)
    }

    fn deliver(&self, envelope: &WireEnvelope) {
        if let Some(tx) = self.slot.lock().take() {
            let _ = tx.send(envelope.clone());
        }
        // One-shot: withdraw from the registry as soon as the wait settles.
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.id);
        }
    }
}

/// A correlated wait that has been registered but not yet awaited.
///
/// Returned by [`Correlator::open_wait`]; pass it back to
/// [`Correlator::settle_wait`] to await the outcome or to
/// [`Correlator::abandon_wait`] to withdraw it.
pub struct PendingWait {
    wait: Arc<CorrelatedWait>,
    rx: oneshot::Receiver<WireEnvelope>,
}

impl std::fmt::Debug for PendingWait {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingWait").field("id", &self.wait.id).finish()
    }
}

/// Generates correlation ids, posts requests, and pairs them with responses.
pub struct Correlator {
    registry: Arc<ListenerRegistry>,
    transport: TransportRef,
    pending: DashMap<String, Arc<CorrelatedWait>>,
    stats: CorrelatorStats,
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("pending", &self.pending.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Correlator {
    /// Creates a correlator over the given registry and transport.
    #[must_use]
    pub fn new(registry: Arc<ListenerRegistry>, transport: TransportRef) -> Self {
        Self {
            registry,
            transport,
            pending: DashMap::new(),
            stats: CorrelatorStats::default(),
        }
    }

    /// Returns a reference to the correlator statistics.
    #[must_use]
    pub const fn stats(&self) -> &CorrelatorStats {
        &self.stats
    }

    /// The number of correlated waits currently outstanding.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Waits for any envelope matching `predicate`.
    ///
    /// A zero `timeout` waits without a deadline. On expiry the wait fails
    /// with [`AgentError::Timeout`] carrying `label` — unless a matching
    /// delivery settled the wait first, in which case the delivery wins and
    /// the envelope is returned.
    pub async fn wait_for<F>(
        &self,
        predicate: F,
        timeout: Duration,
        label: &str,
    ) -> Result<WireEnvelope, AgentError>
    where
        F: Fn(&WireEnvelope) -> bool + Send + Sync + 'static,
    {
        let (wait, rx) = self.begin_wait(predicate);
        self.finish_wait(&wait, rx, timeout, None, label).await
    }

    /// Posts `message` and awaits the response correlated to it.
    ///
    /// The correlated wait is registered **before** the message is posted —
    /// a reply arriving faster than the post call returns must never race
    /// ahead of the subscription. The response must share the request's
    /// `meta.requestId` and carry `expected_type`; anything else is ignored
    /// by this wait. A response with `payload.error` fails the exchange with
    /// [`AgentError::Remote`], distinguishable from a timeout.
    pub async fn exchange(
        &self,
        message: WireEnvelope,
        expected_type: &str,
        timeout: Duration,
    ) -> Result<WireEnvelope, AgentError> {
        let request_id = message.request_id().to_owned();
        trace!(
            msg_type = %message.msg_type,
            request_id = %request_id,
            expected = expected_type,
            "Posting exchange"
        );
        self.stats.exchanges_posted.fetch_add(1, Ordering::Relaxed);

        let pred_type = expected_type.to_owned();
        let pred_id = request_id.clone();
        let (wait, rx) = self.begin_wait(move |envelope: &WireEnvelope| {
            envelope.msg_type == pred_type && envelope.request_id() == pred_id
        });

        if let Err(e) = self.transport.post(message).await {
            wait.cancel();
            self.discard(&wait);
            return Err(e);
        }

        let response = self
            .finish_wait(
                &wait,
                rx,
                timeout,
                Some(expected_type.to_owned()),
                expected_type,
            )
            .await?;

        if let Some(error) = response.payload_error() {
            self.stats.remote_errors.fetch_add(1, Ordering::Relaxed);
            warn!(
                request_id = %request_id,
                error,
                "Exchange rejected by Desktop Agent"
            );
            return Err(AgentError::Remote(error.to_owned()));
        }

        Ok(response)
    }

    /// Registers a correlated wait immediately, to be awaited later.
    ///
    /// Used when the wait must be in place before some other message is
    /// posted but the caller is not ready to await the outcome yet — the
    /// eagerly registered wait for a raised intent's result is the canonical
    /// case.
    pub fn open_wait<F>(&self, predicate: F) -> PendingWait
    where
        F: Fn(&WireEnvelope) -> bool + Send + Sync + 'static,
    {
        let (wait, rx) = self.begin_wait(predicate);
        PendingWait { wait, rx }
    }

    /// Awaits a previously opened wait under its deadline.
    ///
    /// Settle-once semantics are identical to [`wait_for`](Self::wait_for);
    /// a delivery that arrived between opening and settling is returned
    /// immediately.
    pub async fn settle_wait(
        &self,
        pending: PendingWait,
        timeout: Duration,
        expected: Option<String>,
        label: &str,
    ) -> Result<WireEnvelope, AgentError> {
        self.finish_wait(&pending.wait, pending.rx, timeout, expected, label)
            .await
    }

    /// Withdraws a previously opened wait without settling it.
    pub fn abandon_wait(&self, pending: PendingWait) {
        pending.wait.cancel();
        self.discard(&pending.wait);
    }

    /// Fails every outstanding correlated wait.
    ///
    /// Called when the connection closes so in-flight exchanges reject with
    /// [`AgentError::ConnectionClosed`] instead of running out their timers.
    /// Durable subscriptions are untouched.
    pub fn fail_all_pending(&self) {
        let ids: Vec<String> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        for id in ids {
            if let Some((_, wait)) = self.pending.remove(&id) {
                self.registry.remove(&id);
                // Dropping the sender settles the waiter with ConnectionClosed.
                wait.cancel();
            }
        }
    }

    /// Registers a one-shot correlated wait in the registry.
    fn begin_wait<F>(&self, predicate: F) -> (Arc<CorrelatedWait>, oneshot::Receiver<WireEnvelope>)
    where
        F: Fn(&WireEnvelope) -> bool + Send + Sync + 'static,
    {
        use mti::prelude::*;
        let (tx, rx) = oneshot::channel();
        let wait = Arc::new(CorrelatedWait {
            id: "wait".create_type_id::<V7>().to_string(),
            predicate: Box::new(predicate),
            slot: Mutex::new(Some(tx)),
            registry: Arc::downgrade(&self.registry),
        });
        self.pending.insert(wait.id.clone(), wait.clone());
        self.registry.insert(wait.clone());
        (wait, rx)
    }

    /// Races the wait against its deadline and cleans up the registration.
    async fn finish_wait(
        &self,
        wait: &Arc<CorrelatedWait>,
        mut rx: oneshot::Receiver<WireEnvelope>,
        timeout: Duration,
        expected: Option<String>,
        label: &str,
    ) -> Result<WireEnvelope, AgentError> {
        let outcome = if timeout.is_zero() {
            (&mut rx).await.map_err(|_| AgentError::ConnectionClosed)
        } else {
            match tokio::time::timeout(timeout, &mut rx).await {
                Ok(Ok(envelope)) => Ok(envelope),
                Ok(Err(_)) => Err(AgentError::ConnectionClosed),
                Err(_elapsed) => {
                    if wait.cancel() {
                        self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
                        trace!(wait_id = %wait.id, label, "Correlated wait timed out");
                        Err(AgentError::Timeout {
                            expected,
                            label: label.to_owned(),
                        })
                    } else {
                        // Delivery claimed the settle token first; the sent
                        // envelope is already in the channel.
                        rx.try_recv().map_err(|_| AgentError::ConnectionClosed)
                    }
                }
            }
        };

        self.discard(wait);
        if outcome.is_ok() {
            self.stats.responses_matched.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    fn discard(&self, wait: &Arc<CorrelatedWait>) {
        self.registry.remove(&wait.id);
        self.pending.remove(&wait.id);
    }
}
