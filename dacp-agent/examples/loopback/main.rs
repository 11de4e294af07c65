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

//! A self-contained demo against an in-process Desktop Agent double.
//!
//! The loopback transport acknowledges every request and, when the app
//! broadcasts, reflects the context back as a `broadcastEvent` — the shape a
//! second application's broadcast would take on a shared channel.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use dacp_agent::prelude::*;
use dacp_core::common::Messaging;
use dacp_core::message::catalog::response_type_for;

/// A Desktop Agent double living inside the process.
#[derive(Debug)]
struct LoopbackAgent {
    client: Mutex<Option<Weak<Messaging>>>,
}

impl LoopbackAgent {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            client: Mutex::new(None),
        })
    }

    fn attach(&self, agent: &DesktopAgent) {
        *self.client.lock() = Some(Arc::downgrade(agent.messaging()));
    }

    fn reply(&self, envelope: WireEnvelope) {
        if let Some(client) = self.client.lock().as_ref().and_then(Weak::upgrade) {
            client.deliver(&envelope);
        }
    }
}

#[async_trait]
impl MessageTransport for LoopbackAgent {
    async fn post(&self, envelope: WireEnvelope) -> Result<(), AgentError> {
        // Acknowledge the request.
        self.reply(WireEnvelope::with_request_id(
            response_type_for(&envelope.msg_type),
            envelope.request_id(),
            serde_json::json!({}),
        ));

        // Reflect broadcasts back as pushes on the same channel.
        if envelope.msg_type == catalog::BROADCAST_REQUEST {
            self.reply(WireEnvelope::request(
                catalog::BROADCAST_EVENT,
                envelope.payload.clone(),
            ));
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().compact().init();

    let desktop = LoopbackAgent::new();
    let agent = DesktopAgent::new(desktop.clone(), AgentConfig::default());
    desktop.attach(&agent);
    agent.connect().await?;

    agent.join_user_channel("red").await?;

    let handler: ContextHandler = Arc::new(|context, _source| {
        println!(
            "received {} ({})",
            context.context_type,
            context.name.as_deref().unwrap_or("unnamed")
        );
    });
    let listener = agent.add_context_listener(Some("fdc3.instrument"), handler).await?;

    agent
        .broadcast(Context::new("fdc3.instrument").with_name("Apple"))
        .await?;

    listener.unsubscribe().await;
    agent.disconnect().await?;
    Ok(())
}
