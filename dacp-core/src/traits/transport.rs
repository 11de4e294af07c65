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

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::message::{AgentError, WireEnvelope};

/// The outbound half of the opaque transport to the Desktop Agent.
///
/// Implementations wrap whatever actually carries envelopes — a socket, an
/// embedding bridge, an in-memory loopback in tests. The runtime only ever
/// posts envelopes through this trait; inbound envelopes are pushed into the
/// runtime by calling [`Messaging::deliver`](crate::common::Messaging::deliver)
/// from the transport's receive path.
///
/// The transport's handshake and identity validation happen before the
/// runtime is handed the transport and are invisible to it.
#[async_trait]
pub trait MessageTransport: Send + Sync + Debug {
    /// Sends an envelope to the Desktop Agent.
    ///
    /// Resolves once the transport has accepted the envelope for delivery.
    /// Acceptance is not a delivery guarantee; the connection provides only
    /// the ordering of a single duplex channel.
    async fn post(&self, envelope: WireEnvelope) -> Result<(), AgentError>;
}

/// Shared handle to the transport implementation.
pub type TransportRef = Arc<dyn MessageTransport>;
