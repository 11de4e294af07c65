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

//! The intent listener kind and the handling side of intent resolution.
//!
//! An intent listener receives `intentEvent` pushes for its registered intent
//! name, runs the application's handler, and **always** reports a result back
//! — whether the handler succeeded, failed, returned nothing, or panicked.
//! The raising side's pending resolution must settle; it is never left to
//! time out because of handler misbehavior.

use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use tracing::{error, trace, warn};

use crate::common::Messaging;
use crate::message::catalog::{
    response_type_for, ADD_INTENT_LISTENER_REQUEST, INTENT_EVENT,
    INTENT_LISTENER_UNSUBSCRIBE_REQUEST, INTENT_RESULT_REQUEST,
};
use crate::message::{AgentError, AppIdentifier, Context, WireEnvelope};
use crate::traits::{SubscribingListener, WireListener};

/// Application callback handling a raised intent.
///
/// The returned future runs in its own task, so it may perform I/O freely;
/// its outcome is normalized into an [`IntentResult`] report.
pub type IntentHandler = Arc<
    dyn Fn(Context, Option<AppIdentifier>) -> BoxFuture<'static, Result<IntentResult, AgentError>>
        + Send
        + Sync,
>;

/// The normalized outcome of an intent handler.
#[derive(Debug, Clone)]
pub enum IntentResult {
    /// The handler returned nothing.
    Void,
    /// The handler produced a context payload, inlined as-is.
    Context(Context),
    /// The handler produced a channel, reported as the minimal `{id, type}`
    /// reference. Channel display metadata is not part of the capability
    /// surface visible through this reference and is omitted.
    Channel {
        /// The channel id.
        id: String,
        /// The channel type (`user`, `app`, or `private`).
        channel_type: String,
    },
}

impl IntentResult {
    /// Encodes the result for an `intentResultRequest` payload.
    #[must_use]
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Self::Void => serde_json::json!({}),
            Self::Context(context) => serde_json::json!({ "context": context }),
            Self::Channel { id, channel_type } => serde_json::json!({
                "channel": { "id": id, "type": channel_type }
            }),
        }
    }

    /// Decodes a result from a `raiseIntentResultResponse` payload field.
    pub fn from_wire(value: &serde_json::Value) -> Result<Self, AgentError> {
        if let Some(raw) = value.get("context") {
            return Ok(Self::Context(serde_json::from_value(raw.clone())?));
        }
        if let Some(channel) = value.get("channel") {
            let id = channel
                .get("id")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| {
                    AgentError::Serialization("channel result missing id".to_string())
                })?;
            let channel_type = channel
                .get("type")
                .and_then(serde_json::Value::as_str)
                .ok_or_else(|| {
                    AgentError::Serialization("channel result missing type".to_string())
                })?;
            return Ok(Self::Channel {
                id: id.to_owned(),
                channel_type: channel_type.to_owned(),
            });
        }
        Ok(Self::Void)
    }
}

/// A durable subscription handling one named intent.
pub struct IntentListener {
    id: String,
    intent: String,
    handler: IntentHandler,
    messaging: Weak<Messaging>,
}

impl std::fmt::Debug for IntentListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentListener")
            .field("id", &self.id)
            .field("intent", &self.intent)
            .finish()
    }
}

impl IntentListener {
    /// Creates a listener for the named intent.
    ///
    /// Holds the messaging service weakly: reporting results must not keep a
    /// torn-down runtime alive.
    #[must_use]
    pub fn new(
        intent: impl Into<String>,
        handler: IntentHandler,
        messaging: &Arc<Messaging>,
    ) -> Arc<Self> {
        use mti::prelude::*;
        Arc::new(Self {
            id: "listener".create_type_id::<V7>().to_string(),
            intent: intent.into(),
            handler,
            messaging: Arc::downgrade(messaging),
        })
    }

    /// The intent name this listener handles.
    #[must_use]
    pub fn intent(&self) -> &str {
        &self.intent
    }
}

impl WireListener for IntentListener {
    fn id(&self) -> &str {
        &self.id
    }

    fn matches(&self, envelope: &WireEnvelope) -> bool {
        envelope.msg_type == INTENT_EVENT
            && envelope.payload_str("intent") == Some(self.intent.as_str())
    }

    fn deliver(&self, envelope: &WireEnvelope) {
        let Some(messaging) = self.messaging.upgrade() else {
            warn!(intent = %self.intent, "Intent event after runtime teardown");
            return;
        };

        let decoded: Result<Context, AgentError> = envelope
            .payload
            .get("context")
            .ok_or_else(|| AgentError::Serialization("intent event without context".to_string()))
            .and_then(|raw| serde_json::from_value(raw.clone()).map_err(AgentError::from));

        let handler = self.handler.clone();
        let intent = self.intent.clone();
        let source = envelope.meta.source.clone();
        let event_uuid = envelope.request_id().to_owned();
        let raise_uuid = envelope.payload_str("raiseIntentRequestUuid").map(str::to_owned);

        // The handler and the result report run off the delivery path.
        tokio::spawn(async move {
            let result = match decoded {
                Ok(context) => {
                    trace!(intent = %intent, "Invoking intent handler");
                    // The handler gets its own task so a panic is confined to
                    // it and still yields an (empty) result report.
                    match tokio::spawn((handler)(context, source)).await {
                        Ok(Ok(result)) => result,
                        Ok(Err(e)) => {
                            warn!(intent = %intent, error = %e, "Intent handler failed");
                            IntentResult::Void
                        }
                        Err(e) => {
                            error!(intent = %intent, error = %e, "Intent handler panicked");
                            IntentResult::Void
                        }
                    }
                }
                Err(e) => {
                    warn!(intent = %intent, error = %e, "Malformed intent event");
                    IntentResult::Void
                }
            };

            let report = WireEnvelope::request(
                INTENT_RESULT_REQUEST,
                serde_json::json!({
                    "intentEventUuid": event_uuid,
                    "raiseIntentRequestUuid": raise_uuid,
                    "intentResult": result.to_wire(),
                }),
            );
            let expected = response_type_for(INTENT_RESULT_REQUEST);
            if let Err(e) = messaging.exchange(report, &expected).await {
                warn!(intent = %intent, error = %e, "Failed to report intent result");
            }
        });
    }
}

impl SubscribingListener for IntentListener {
    fn subscribe_request(&self) -> WireEnvelope {
        WireEnvelope::request(
            ADD_INTENT_LISTENER_REQUEST,
            serde_json::json!({ "intent": self.intent }),
        )
    }

    fn unsubscribe_request(&self) -> WireEnvelope {
        WireEnvelope::request(
            INTENT_LISTENER_UNSUBSCRIBE_REQUEST,
            serde_json::json!({ "listenerUUID": self.id }),
        )
    }
}
