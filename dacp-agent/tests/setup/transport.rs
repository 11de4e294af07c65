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

//! An in-memory transport playing the Desktop Agent's part.
//!
//! Records every posted envelope and answers synchronously, *before* `post`
//! returns — deliberately the worst case for correlation: a runtime that
//! posted before registering its wait would miss every reply.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use dacp_agent::prelude::*;
use dacp_core::common::Messaging;
use dacp_core::message::catalog::response_type_for;

type Responder = Box<dyn Fn(&WireEnvelope) -> Option<Vec<WireEnvelope>> + Send + Sync>;

/// A scriptable Desktop Agent double.
///
/// By default every `…Request` is acknowledged with an empty `…Response`
/// sharing its request id. Scripts take precedence, and muted types get no
/// answer at all.
pub struct ScriptedTransport {
    posted: Mutex<Vec<WireEnvelope>>,
    responders: Mutex<Vec<Responder>>,
    muted: Mutex<HashSet<String>>,
    sink: Mutex<Option<Weak<Messaging>>>,
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("posted", &self.posted.lock().len())
            .finish()
    }
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            posted: Mutex::new(Vec::new()),
            responders: Mutex::new(Vec::new()),
            muted: Mutex::new(HashSet::new()),
            sink: Mutex::new(None),
        })
    }

    /// Wires the return path so scripted responses reach the runtime.
    pub fn attach(&self, agent: &DesktopAgent) {
        *self.sink.lock() = Some(Arc::downgrade(agent.messaging()));
    }

    /// Adds a scripted responder; the first script returning `Some` wins.
    pub fn script<F>(&self, responder: F)
    where
        F: Fn(&WireEnvelope) -> Option<Vec<WireEnvelope>> + Send + Sync + 'static,
    {
        self.responders.lock().push(Box::new(responder));
    }

    /// Suppresses any answer for the given request type.
    pub fn mute(&self, msg_type: &str) {
        self.muted.lock().insert(msg_type.to_owned());
    }

    /// Pushes an unsolicited envelope into the runtime, as the Desktop Agent
    /// does for broadcasts and events.
    pub fn push(&self, envelope: WireEnvelope) {
        if let Some(messaging) = self.sink.lock().as_ref().and_then(Weak::upgrade) {
            messaging.deliver(&envelope);
        }
    }

    /// Every envelope posted so far.
    pub fn posted(&self) -> Vec<WireEnvelope> {
        self.posted.lock().clone()
    }

    /// The posted envelopes of one type.
    pub fn posted_of(&self, msg_type: &str) -> Vec<WireEnvelope> {
        self.posted
            .lock()
            .iter()
            .filter(|e| e.msg_type == msg_type)
            .cloned()
            .collect()
    }

    /// How many envelopes of one type have been posted.
    pub fn count_of(&self, msg_type: &str) -> usize {
        self.posted.lock().iter().filter(|e| e.msg_type == msg_type).count()
    }
}

#[async_trait]
impl MessageTransport for ScriptedTransport {
    async fn post(&self, envelope: WireEnvelope) -> Result<(), AgentError> {
        let responses = {
            if self.muted.lock().contains(&envelope.msg_type) {
                Vec::new()
            } else {
                let scripted = self
                    .responders
                    .lock()
                    .iter()
                    .find_map(|responder| responder(&envelope));
                match scripted {
                    Some(responses) => responses,
                    None if envelope.msg_type.ends_with("Request") => {
                        vec![WireEnvelope::with_request_id(
                            response_type_for(&envelope.msg_type),
                            envelope.request_id(),
                            serde_json::json!({}),
                        )]
                    }
                    None => Vec::new(),
                }
            }
        };

        self.posted.lock().push(envelope);

        for response in responses {
            self.push(response);
        }
        Ok(())
    }
}
