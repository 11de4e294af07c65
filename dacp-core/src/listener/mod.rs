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

//! The four concrete subscription kinds sharing the listener lifecycle.
//!
//! Each kind supplies its own subscribe/unsubscribe wire messages and its own
//! matching and dispatch logic; the lifecycle itself — registry insertion
//! before the acknowledgement exchange, immediate removal with a best-effort
//! withdrawal — lives in [`Messaging`](crate::common::Messaging) and is
//! identical for all of them.

pub use context::{ChannelScope, ContextHandler, ContextListener};
pub use event::{AgentEvent, AgentEventHandler, EventListener};
pub use intent::{IntentHandler, IntentListener, IntentResult};
pub use private_channel::{
    PrivateChannelEvent, PrivateChannelEventHandler, PrivateChannelEventListener,
};

mod context;
mod event;
mod intent;
mod private_channel;
