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

use parking_lot::Mutex;

use dacp_agent::prelude::*;

use crate::setup::*;

mod setup;

fn scripted_private_channel(transport: &Arc<ScriptedTransport>) {
    transport.script(|request| {
        (request.msg_type == "createPrivateChannelRequest").then(|| {
            vec![WireEnvelope::with_request_id(
                "createPrivateChannelResponse",
                request.request_id(),
                serde_json::json!({ "privateChannel": { "id": "pc-1", "type": "private" } }),
            )]
        })
    });
}

fn detail_recorder() -> (PrivateChannelEventHandler, Arc<Mutex<Vec<Option<String>>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handler: PrivateChannelEventHandler = Arc::new(move |detail| sink.lock().push(detail));
    (handler, seen)
}

#[tokio::test]
async fn test_create_private_channel() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    scripted_private_channel(&transport);
    let channel = agent.create_private_channel().await?;
    assert_eq!(channel.id(), "pc-1");
    assert_eq!(channel.channel().channel_type(), ChannelType::Private);
    Ok(())
}

#[tokio::test]
async fn test_peer_lifecycle_events_dispatch_with_detail() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    scripted_private_channel(&transport);
    let channel = agent.create_private_channel().await?;

    let (add_handler, added) = detail_recorder();
    let (disconnect_handler, disconnected) = detail_recorder();
    let _add = channel.on_add_context_listener(add_handler).await?;
    let _disc = channel.on_disconnect(disconnect_handler).await?;
    assert_eq!(
        transport.count_of("privateChannelAddEventListenerRequest"),
        2
    );

    // Peer subscribed to a context type.
    transport.push(WireEnvelope::request(
        "privateChannelOnAddContextListenerEvent",
        serde_json::json!({ "privateChannelId": "pc-1", "contextType": "fdc3.order" }),
    ));
    // The same event on another channel is not ours.
    transport.push(WireEnvelope::request(
        "privateChannelOnAddContextListenerEvent",
        serde_json::json!({ "privateChannelId": "pc-2", "contextType": "fdc3.trade" }),
    ));
    // Peer went away, no detail attached.
    transport.push(WireEnvelope::request(
        "privateChannelOnDisconnectEvent",
        serde_json::json!({ "privateChannelId": "pc-1" }),
    ));

    assert_eq!(added.lock().as_slice(), &[Some("fdc3.order".to_string())]);
    assert_eq!(disconnected.lock().as_slice(), &[None]);
    Ok(())
}

#[tokio::test]
async fn test_peer_event_listener_unsubscribes() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    scripted_private_channel(&transport);
    let channel = agent.create_private_channel().await?;

    let (handler, seen) = detail_recorder();
    let handle = channel.on_unsubscribe(handler).await?;
    handle.unsubscribe().await;
    assert_eq!(
        transport.count_of("privateChannelUnsubscribeEventListenerRequest"),
        1
    );

    transport.push(WireEnvelope::request(
        "privateChannelOnUnsubscribeEvent",
        serde_json::json!({ "privateChannelId": "pc-1" }),
    ));
    assert!(seen.lock().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_disconnect_acknowledged() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    scripted_private_channel(&transport);
    let channel = agent.create_private_channel().await?;

    channel.disconnect().await?;
    let requests = transport.posted_of("privateChannelDisconnectRequest");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].payload_str("channelId"), Some("pc-1"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_failure_maps_to_single_error() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    scripted_private_channel(&transport);
    let channel = agent.create_private_channel().await?;

    // No acknowledgement: the bounded wait elapses and the failure is the
    // disconnect error, not a bare timeout.
    transport.mute("privateChannelDisconnectRequest");
    let err = channel.disconnect().await.unwrap_err();
    assert!(matches!(err, AgentError::Disconnect(_)));
    Ok(())
}

#[tokio::test]
async fn test_private_channel_broadcast_and_context_listener() -> anyhow::Result<()> {
    initialize_tracing();
    let transport = ScriptedTransport::new();
    let agent = agent_over(&transport, fast_config());
    agent.connect().await?;

    scripted_private_channel(&transport);
    let channel = agent.create_private_channel().await?;

    channel.broadcast(Context::new("fdc3.order")).await?;
    let broadcasts = transport.posted_of("broadcastRequest");
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].payload_str("channelId"), Some("pc-1"));

    let seen: Arc<Mutex<Vec<Context>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handler: ContextHandler = Arc::new(move |context, _source| sink.lock().push(context));
    let _handle = channel.add_context_listener(Some("fdc3.order"), handler).await?;

    transport.push(WireEnvelope::request(
        "broadcastEvent",
        serde_json::json!({
            "channelId": "pc-1",
            "context": { "type": "fdc3.order" }
        }),
    ));
    assert_eq!(seen.lock().len(), 1);
    Ok(())
}
