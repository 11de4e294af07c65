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

use crate::message::WireEnvelope;

/// The registry-facing contract shared by every subscription.
///
/// The [`ListenerRegistry`](crate::common::ListenerRegistry) stores
/// implementors as a homogeneous collection of trait objects and fans each
/// inbound envelope out to every one whose [`matches`](WireListener::matches)
/// returns `true` — all matches fire, never just the first.
///
/// Implementations must keep [`deliver`](WireListener::deliver) non-blocking:
/// any follow-up asynchronous work (such as posting an intent result) is
/// spawned, never awaited inside the delivery path.
pub trait WireListener: Send + Sync {
    /// The unique identity of this subscription among live subscriptions.
    fn id(&self) -> &str;

    /// Whether this subscription wants the envelope.
    fn matches(&self, envelope: &WireEnvelope) -> bool;

    /// Dispatches a matched envelope to this subscription.
    fn deliver(&self, envelope: &WireEnvelope);
}

/// A subscription that is announced to the Desktop Agent over the wire.
///
/// Concrete listener kinds supply their subscribe and unsubscribe request
/// envelopes; the expected acknowledgement types are derived from the
/// request type names via the catalog's `Request` → `Response` convention.
/// One-shot correlated waits implement only [`WireListener`] — they are
/// purely local and never announced.
pub trait SubscribingListener: WireListener {
    /// Builds the subscribe request announcing this subscription.
    fn subscribe_request(&self) -> WireEnvelope;

    /// Builds the unsubscribe request withdrawing this subscription.
    fn unsubscribe_request(&self) -> WireEnvelope;
}
