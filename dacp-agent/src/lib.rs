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
#![forbid(missing_docs)] // Keep this to enforce coverage

//! # Dacp Agent
//!
//! This crate provides the client-side runtime of the Desktop Agent
//! Communication Protocol: applications exchange structured context and raise
//! named intents through a Desktop Agent reached over an opaque asynchronous
//! transport.
//!
//! ## Key Concepts
//!
//! - **DesktopAgent**: The facade an application talks to — channels,
//!   context listeners, intents, events.
//! - **Transport**: Injected as a [`MessageTransport`] trait object; the
//!   transport's receive path feeds envelopes into
//!   [`DesktopAgent::deliver`].
//! - **Correlation**: Requests and responses are paired by `meta.requestId`
//!   over the single multiplexed connection, with timeout racing.
//! - **Listeners**: Durable subscriptions delivered by fan-out until
//!   explicitly unsubscribed; context listeners registered without a channel
//!   follow the current user channel across joins.
//! - **Intents**: Raising an intent settles in two phases — resolution
//!   first, the handler's result later — and the result settles even when
//!   the remote handler fails.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dacp_agent::prelude::*;
//!
//! let agent = DesktopAgent::with_default_config(transport);
//! agent.connect().await?;
//! agent.join_user_channel("red").await?;
//! let handle = agent
//!     .add_context_listener(Some("fdc3.instrument"), Arc::new(|ctx, _src| {
//!         println!("instrument: {:?}", ctx.name);
//!     }))
//!     .await?;
//! ```
//!
//! [`MessageTransport`]: dacp_core::traits::MessageTransport

/// The Desktop Agent client facade.
pub(crate) mod agent;

/// Application directory and metadata operations.
pub(crate) mod apps;

/// Channel objects handed out by the API.
pub(crate) mod channel;

/// User-channel state and channel-scoped operations.
pub(crate) mod channels;

/// Listener handles.
pub(crate) mod handle;

/// The raising side of intent resolution.
pub(crate) mod intents;

/// Metadata types decoded from responses.
pub(crate) mod types;

/// A prelude module for conveniently importing the most commonly used items.
///
/// Re-exports the agent surface together with the core types it hands out —
/// envelopes, errors, listeners, and the transport trait — so one import
/// covers typical use.
pub mod prelude {
    pub use async_trait::async_trait;

    pub use dacp_core::common::{AgentConfig, Messaging};
    pub use dacp_core::listener::{
        AgentEvent, AgentEventHandler, ContextHandler, ContextListener, IntentHandler,
        IntentResult, PrivateChannelEvent, PrivateChannelEventHandler,
    };
    pub use dacp_core::message::{
        catalog, AgentError, AppIdentifier, Context, WireEnvelope, WireMeta,
    };
    pub use dacp_core::traits::{MessageTransport, TransportRef};

    pub use crate::agent::DesktopAgent;
    pub use crate::channel::{Channel, PrivateChannel};
    pub use crate::handle::ListenerHandle;
    pub use crate::intents::IntentResolution;
    pub use crate::types::{
        AppIntent, AppMetadata, ChannelType, DisplayMetadata, ImplementationMetadata,
        IntentMetadata,
    };
}
