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

//! Defines the core traits that establish the fundamental contracts of the runtime.
//!
//! # Key Traits
//!
//! *   [`MessageTransport`]: The outbound seam to the opaque transport carrying
//!     envelopes to the Desktop Agent.
//! *   [`WireListener`]: The registry-facing contract shared by every
//!     subscription — identity, filter, and dispatch.
//! *   [`SubscribingListener`]: Extends [`WireListener`] with the subscribe and
//!     unsubscribe wire messages for subscriptions announced to the Desktop
//!     Agent.

// --- Public Re-exports ---
pub use transport::{MessageTransport, TransportRef};
pub use wire_listener::{SubscribingListener, WireListener};

// --- Submodules ---

/// Defines the [`MessageTransport`] trait for posting envelopes.
mod transport;
/// Defines the [`WireListener`] and [`SubscribingListener`] traits.
mod wire_listener;
