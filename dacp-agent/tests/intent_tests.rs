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

use dacp_agent::prelude::*;

use crate::setup::*;

mod setup;

/// Scripts the Desktop Agent's half of a raise: the resolution response and,
/// immediately after it, the handler's result. The result response lands
/// before the raise call has even returned to the caller — only the eagerly
/// registered result wait can catch it.
fn script_raise_with_result(transport: &Arc<ScriptedTransport>, result: serde_json::Value) {
    transport.script(move |request| {
        (request.msg_type == "raiseIntentRequest").then(|| {
            vec![
                WireEnvelope::with_request_id(
                    "raiseIntentResponse",
                    request.request_id(),
                    serde_json::json!({
                        "intentResolution": {
                            "intent": "ViewChart",
                            "source": { "appId": "chart-app", "instanceId": "i-1" }
                        }
                    }),
                ),
                WireEnvelope::with_request_id(
                    "raiseIntentResultResponse",
                    request.request_id(),
                    serde_json::json!({ "intentResult": result }),
                ),
            ]
        })
    });
}

#[tokio::test]
async fn test_raise_intent_round_trip() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    script_raise_with_result(
        &transport,
        serde_json::json!({ "context": { "type": "fdc3.position", "name": "AAPL" } }),
    );

    let resolution = agent
        .raise_intent("ViewChart", Context::new("fdc3.instrument"), None)
        .await?;
    assert_eq!(resolution.intent, "ViewChart");
    assert_eq!(
        resolution.source.as_ref().map(|s| s.app_id.as_str()),
        Some("chart-app")
    );

    match resolution.get_result().await? {
        IntentResult::Context(context) => {
            assert_eq!(context.context_type, "fdc3.position");
            assert_eq!(context.name.as_deref(), Some("AAPL"));
        }
        other => panic!("expected context result, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_raise_intent_settles_empty_when_remote_handler_fails() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    // A failed remote handler is reported as an empty result, not silence.
    script_raise_with_result(&transport, serde_json::json!({}));

    let resolution = agent
        .raise_intent("ViewChart", Context::new("fdc3.instrument"), None)
        .await?;
    let result = resolution.get_result().await?;
    assert!(matches!(result, IntentResult::Void));
    Ok(())
}

#[tokio::test]
async fn test_raise_intent_channel_result_is_minimal_reference() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    script_raise_with_result(
        &transport,
        serde_json::json!({ "channel": { "id": "pc-1", "type": "private" } }),
    );

    let resolution = agent
        .raise_intent("ViewChart", Context::new("fdc3.instrument"), None)
        .await?;
    match resolution.get_result().await? {
        IntentResult::Channel { id, channel_type } => {
            assert_eq!(id, "pc-1");
            assert_eq!(channel_type, "private");
        }
        other => panic!("expected channel result, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_intent_listener_invokes_handler_and_reports_result() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    let handler: IntentHandler = Arc::new(|context, _source| {
        Box::pin(async move {
            assert_eq!(context.context_type, "fdc3.instrument");
            Ok(IntentResult::Context(Context::new("fdc3.position")))
        })
    });
    let _handle = agent.add_intent_listener("ViewChart", handler).await?;
    assert_eq!(transport.count_of("addIntentListenerRequest"), 1);

    transport.push(WireEnvelope::request(
        "intentEvent",
        serde_json::json!({
            "intent": "ViewChart",
            "context": { "type": "fdc3.instrument" },
            "raiseIntentRequestUuid": "req_raise_1"
        }),
    ));

    wait_until(|| transport.count_of("intentResultRequest") == 1).await;
    let reports = transport.posted_of("intentResultRequest");
    assert_eq!(
        reports[0].payload_str("raiseIntentRequestUuid"),
        Some("req_raise_1")
    );
    assert_eq!(
        reports[0].payload["intentResult"]["context"]["type"],
        "fdc3.position"
    );
    Ok(())
}

#[tokio::test]
async fn test_failing_intent_handler_still_reports_empty_result() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    let handler: IntentHandler = Arc::new(|_context, _source| {
        Box::pin(async { Err(AgentError::Protocol("handler blew up".to_string())) })
    });
    let _handle = agent.add_intent_listener("ViewChart", handler).await?;

    transport.push(WireEnvelope::request(
        "intentEvent",
        serde_json::json!({
            "intent": "ViewChart",
            "context": { "type": "fdc3.instrument" },
            "raiseIntentRequestUuid": "req_raise_2"
        }),
    ));

    // The raiser is never left to time out: an empty result goes back.
    wait_until(|| transport.count_of("intentResultRequest") == 1).await;
    let reports = transport.posted_of("intentResultRequest");
    assert_eq!(reports[0].payload["intentResult"], serde_json::json!({}));
    assert_eq!(
        reports[0].payload_str("raiseIntentRequestUuid"),
        Some("req_raise_2")
    );
    Ok(())
}

#[tokio::test]
async fn test_panicking_intent_handler_still_reports_empty_result() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    let handler: IntentHandler = Arc::new(|_context, _source| {
        Box::pin(async { panic!("handler panicked") })
    });
    let _handle = agent.add_intent_listener("ViewChart", handler).await?;

    transport.push(WireEnvelope::request(
        "intentEvent",
        serde_json::json!({
            "intent": "ViewChart",
            "context": { "type": "fdc3.instrument" },
            "raiseIntentRequestUuid": "req_raise_3"
        }),
    ));

    wait_until(|| transport.count_of("intentResultRequest") == 1).await;
    let reports = transport.posted_of("intentResultRequest");
    assert_eq!(reports[0].payload["intentResult"], serde_json::json!({}));
    Ok(())
}

#[tokio::test]
async fn test_intent_listener_ignores_other_intents() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    let handler: IntentHandler =
        Arc::new(|_context, _source| Box::pin(async { Ok(IntentResult::Void) }));
    let _handle = agent.add_intent_listener("ViewChart", handler).await?;

    transport.push(WireEnvelope::request(
        "intentEvent",
        serde_json::json!({
            "intent": "ViewNews",
            "context": { "type": "fdc3.instrument" }
        }),
    ));

    // Give any spawned work a chance to run; nothing should be reported.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(transport.count_of("intentResultRequest"), 0);
    Ok(())
}

#[tokio::test]
async fn test_find_intent_decodes_app_intent() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    transport.script(|request| {
        (request.msg_type == "findIntentRequest").then(|| {
            vec![WireEnvelope::with_request_id(
                "findIntentResponse",
                request.request_id(),
                serde_json::json!({
                    "appIntent": {
                        "intent": { "name": "ViewChart", "displayName": "View Chart" },
                        "apps": [ { "appId": "chart-app" } ]
                    }
                }),
            )]
        })
    });

    let app_intent = agent.find_intent("ViewChart", None, None).await?;
    assert_eq!(app_intent.intent.name, "ViewChart");
    assert_eq!(app_intent.apps.len(), 1);
    assert_eq!(app_intent.apps[0].identifier.app_id, "chart-app");
    Ok(())
}
