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

use std::sync::Arc;

use dacp_core::common::Messaging;
use dacp_core::traits::SubscribingListener;

/// The handle an application holds for a registered listener.
///
/// The handle's identity is stable for the listener's whole life, including
/// across current-channel rebinds of a dynamically scoped context listener.
#[derive(Clone)]
pub struct ListenerHandle {
    listener: Arc<dyn SubscribingListener>,
    messaging: Arc<Messaging>,
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.listener.id())
            .finish()
    }
}

impl ListenerHandle {
    pub(crate) fn new(listener: Arc<dyn SubscribingListener>, messaging: Arc<Messaging>) -> Self {
        Self { listener, messaging }
    }

    /// The listener's unique id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.listener.id()
    }

    /// Cancels the subscription.
    ///
    /// Delivery stops immediately — no handler invocation occurs for this
    /// listener after this call returns, even for messages already in flight.
    /// Failure to notify the Desktop Agent is logged, not raised.
    pub async fn unsubscribe(&self) {
        self.messaging.unsubscribe(self.listener.as_ref()).await;
    }
}
