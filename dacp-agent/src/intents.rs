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

//! The raising side of intent resolution.
//!
//! Raising an intent is a two-phase protocol. The raise request resolves to
//! an [`IntentResolution`] naming the handling application; the handler's
//! eventual outcome arrives later as a `raiseIntentResultResponse` correlated
//! to the raise request. The wait for that result is registered **before**
//! the raise request is posted, so a handler that answers faster than the
//! raise response can never slip past it.

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::trace;

use dacp_core::common::Messaging;
use dacp_core::listener::{IntentHandler, IntentListener, IntentResult};
use dacp_core::message::catalog::{
    response_type_for, FIND_INTENTS_BY_CONTEXT_REQUEST, FIND_INTENT_REQUEST,
    RAISE_INTENT_FOR_CONTEXT_REQUEST, RAISE_INTENT_REQUEST, RAISE_INTENT_RESULT_RESPONSE,
};
use dacp_core::message::{AgentError, AppIdentifier, Context, WireEnvelope};

use crate::agent::DesktopAgent;
use crate::handle::ListenerHandle;
use crate::types::AppIntent;

/// The settled outcome of a raise request.
///
/// Names the application the intent resolved to; the handler's result is
/// available through [`get_result`](IntentResolution::get_result).
pub struct IntentResolution {
    /// The intent that was raised.
    pub intent: String,
    /// The application handling the intent, when the Desktop Agent named one.
    pub source: Option<AppIdentifier>,
    result: Mutex<Option<JoinHandle<Result<WireEnvelope, AgentError>>>>,
}

impl std::fmt::Debug for IntentResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentResolution")
            .field("intent", &self.intent)
            .field("source", &self.source)
            .finish()
    }
}

impl IntentResolution {
    /// Awaits the handler's result.
    ///
    /// Settles with the handler's context, a minimal channel reference, or
    /// [`IntentResult::Void`] — the handling side reports an empty result
    /// even when its handler fails, so this resolves rather than timing out
    /// on handler misbehavior. Consumes the pending result; a second call
    /// fails.
    pub async fn get_result(&self) -> Result<IntentResult, AgentError> {
        let task = self.result.lock().take().ok_or_else(|| {
            AgentError::Protocol("intent result already consumed".to_string())
        })?;
        let envelope = task
            .await
            .map_err(|e| AgentError::Transport(format!("intent result wait failed: {e}")))??;

        if let Some(error) = envelope.payload_error() {
            return Err(AgentError::Remote(error.to_owned()));
        }
        match envelope.payload.get("intentResult") {
            None | Some(serde_json::Value::Null) => Ok(IntentResult::Void),
            Some(raw) => IntentResult::from_wire(raw),
        }
    }
}

impl DesktopAgent {
    /// Raises an intent for a context, optionally targeting an application.
    pub async fn raise_intent(
        &self,
        intent: &str,
        context: Context,
        app: Option<AppIdentifier>,
    ) -> Result<IntentResolution, AgentError> {
        let request = WireEnvelope::request(
            RAISE_INTENT_REQUEST,
            serde_json::json!({ "intent": intent, "context": context, "app": app }),
        );
        self.raise(request, intent.to_owned()).await
    }

    /// Asks the Desktop Agent to pick an intent for the context, optionally
    /// targeting an application.
    pub async fn raise_intent_for_context(
        &self,
        context: Context,
        app: Option<AppIdentifier>,
    ) -> Result<IntentResolution, AgentError> {
        let request = WireEnvelope::request(
            RAISE_INTENT_FOR_CONTEXT_REQUEST,
            serde_json::json!({ "context": context, "app": app }),
        );
        self.raise(request, String::new()).await
    }

    /// Finds the applications able to handle an intent.
    pub async fn find_intent(
        &self,
        intent: &str,
        context: Option<Context>,
        result_type: Option<&str>,
    ) -> Result<AppIntent, AgentError> {
        let request = WireEnvelope::request(
            FIND_INTENT_REQUEST,
            serde_json::json!({
                "intent": intent,
                "context": context,
                "resultType": result_type,
            }),
        );
        let response = self
            .messaging()
            .exchange(request, &response_type_for(FIND_INTENT_REQUEST))
            .await?;
        let raw = response.payload.get("appIntent").ok_or_else(|| {
            AgentError::Serialization("findIntent response without appIntent".to_string())
        })?;
        Ok(serde_json::from_value(raw.clone())?)
    }

    /// Finds every intent the context can be handled through.
    pub async fn find_intents_by_context(
        &self,
        context: Context,
    ) -> Result<Vec<AppIntent>, AgentError> {
        let request = WireEnvelope::request(
            FIND_INTENTS_BY_CONTEXT_REQUEST,
            serde_json::json!({ "context": context }),
        );
        let response = self
            .messaging()
            .exchange(request, &response_type_for(FIND_INTENTS_BY_CONTEXT_REQUEST))
            .await?;
        let raw = response.payload.get("appIntents").ok_or_else(|| {
            AgentError::Serialization(
                "findIntentsByContext response without appIntents".to_string(),
            )
        })?;
        Ok(serde_json::from_value(raw.clone())?)
    }

    /// Registers a handler for a named intent.
    pub async fn add_intent_listener(
        &self,
        intent: &str,
        handler: IntentHandler,
    ) -> Result<ListenerHandle, AgentError> {
        let listener = IntentListener::new(intent, handler, self.messaging());
        self.messaging().register(listener.clone()).await?;
        Ok(ListenerHandle::new(listener, self.messaging().clone()))
    }

    /// Posts a raise request and builds the pending resolution.
    async fn raise(
        &self,
        request: WireEnvelope,
        intent: String,
    ) -> Result<IntentResolution, AgentError> {
        let messaging = self.messaging().clone();
        let request_id = request.request_id().to_owned();
        let expected_response = response_type_for(&request.msg_type);

        // The result wait opens before the raise request goes out.
        let result_id = request_id.clone();
        let pending = messaging.correlator().open_wait(move |envelope: &WireEnvelope| {
            envelope.msg_type == RAISE_INTENT_RESULT_RESPONSE
                && envelope.request_id() == result_id
        });

        let response = match messaging
            .exchange_with_timeout(
                request,
                &expected_response,
                messaging.config().app_launch_timeout(),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                messaging.correlator().abandon_wait(pending);
                return Err(e);
            }
        };

        let (resolved_intent, source) = decode_resolution(&response, intent);
        trace!(intent = %resolved_intent, request_id = %request_id, "Intent raised");

        let result_timeout = messaging.config().intent_result_timeout();
        let wait_messaging = messaging.clone();
        let result_task = tokio::spawn(async move {
            wait_messaging
                .correlator()
                .settle_wait(
                    pending,
                    result_timeout,
                    Some(RAISE_INTENT_RESULT_RESPONSE.to_owned()),
                    "raiseIntentResult",
                )
                .await
        });

        Ok(IntentResolution {
            intent: resolved_intent,
            source,
            result: Mutex::new(Some(result_task)),
        })
    }
}

/// Reads the handling application out of a raise response.
fn decode_resolution(
    response: &WireEnvelope,
    fallback_intent: String,
) -> (String, Option<AppIdentifier>) {
    let resolution = response.payload.get("intentResolution");
    let intent = resolution
        .and_then(|r| r.get("intent"))
        .and_then(serde_json::Value::as_str)
        .map_or(fallback_intent, str::to_owned);
    let source = resolution
        .and_then(|r| r.get("source"))
        .and_then(|raw| serde_json::from_value::<AppIdentifier>(raw.clone()).ok());
    (intent, source)
}
