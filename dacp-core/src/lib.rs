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

#![forbid(unsafe_code)]
//! Dacp Core Library
//!
//! This library provides the core functionality for the Dacp client runtime:
//! the wire envelope model, the request/response correlator, the concurrent
//! listener registry with fan-out delivery, and the four subscription kinds
//! shared by the Desktop Agent API surface.

/// Common services used throughout the runtime.
pub mod common;

/// The four concrete subscription kinds.
pub mod listener;

/// The wire envelope model, message catalog, and error types.
pub mod message;
/// Trait definitions used in the runtime.
pub mod traits;

/// Prelude module for convenient imports.
///
/// This module re-exports commonly used items from the `common`, `message`,
/// `listener`, and `traits` modules, as well as the `async_trait` crate.
pub mod prelude {
    pub use async_trait;

    pub use crate::common::{AgentConfig, Correlator, ListenerRegistry, Messaging};
    pub use crate::listener::{
        AgentEvent, AgentEventHandler, ContextHandler, ContextListener, EventListener,
        IntentHandler, IntentListener, IntentResult, PrivateChannelEvent,
        PrivateChannelEventHandler, PrivateChannelEventListener,
    };
    pub use crate::message::{catalog, AgentError, AppIdentifier, Context, WireEnvelope, WireMeta};
    pub use crate::traits::{MessageTransport, SubscribingListener, TransportRef, WireListener};
}
