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

//! The wire message-type catalog and its naming conventions.
//!
//! The protocol derives related message names mechanically: a response type is
//! its request type with the `Request` suffix replaced by `Response`, events
//! end in `Event`, and listener subscriptions pair an
//! `add<Name>ListenerRequest` with a `<name>ListenerUnsubscribeRequest`. The
//! correlator and the listener kinds rely on these conventions instead of
//! enumerating every pairing by hand.

use std::collections::HashMap;

use lazy_static::lazy_static;

/// Suffix carried by every unsolicited event message.
pub const EVENT_SUFFIX: &str = "Event";

// Broadcast / context listeners.
pub const BROADCAST_REQUEST: &str = "broadcastRequest";
pub const BROADCAST_EVENT: &str = "broadcastEvent";
pub const ADD_CONTEXT_LISTENER_REQUEST: &str = "addContextListenerRequest";
pub const CONTEXT_LISTENER_UNSUBSCRIBE_REQUEST: &str = "contextListenerUnsubscribeRequest";

// Intent listeners and the raise → handle → result round trip.
pub const ADD_INTENT_LISTENER_REQUEST: &str = "addIntentListenerRequest";
pub const INTENT_LISTENER_UNSUBSCRIBE_REQUEST: &str = "intentListenerUnsubscribeRequest";
pub const INTENT_EVENT: &str = "intentEvent";
pub const INTENT_RESULT_REQUEST: &str = "intentResultRequest";
pub const RAISE_INTENT_REQUEST: &str = "raiseIntentRequest";
pub const RAISE_INTENT_FOR_CONTEXT_REQUEST: &str = "raiseIntentForContextRequest";
pub const RAISE_INTENT_RESULT_RESPONSE: &str = "raiseIntentResultResponse";
pub const FIND_INTENT_REQUEST: &str = "findIntentRequest";
pub const FIND_INTENTS_BY_CONTEXT_REQUEST: &str = "findIntentsByContextRequest";

// Generic API event listeners.
pub const ADD_EVENT_LISTENER_REQUEST: &str = "addEventListenerRequest";
pub const EVENT_LISTENER_UNSUBSCRIBE_REQUEST: &str = "eventListenerUnsubscribeRequest";
pub const CHANNEL_CHANGED_EVENT: &str = "channelChangedEvent";

// Channels.
pub const GET_OR_CREATE_CHANNEL_REQUEST: &str = "getOrCreateChannelRequest";
pub const JOIN_USER_CHANNEL_REQUEST: &str = "joinUserChannelRequest";
pub const LEAVE_CURRENT_CHANNEL_REQUEST: &str = "leaveCurrentChannelRequest";
pub const GET_CURRENT_CHANNEL_REQUEST: &str = "getCurrentChannelRequest";
pub const GET_CURRENT_CONTEXT_REQUEST: &str = "getCurrentContextRequest";
pub const CREATE_PRIVATE_CHANNEL_REQUEST: &str = "createPrivateChannelRequest";

// Private channel peer-lifecycle events.
pub const PRIVATE_CHANNEL_ADD_EVENT_LISTENER_REQUEST: &str =
    "privateChannelAddEventListenerRequest";
pub const PRIVATE_CHANNEL_UNSUBSCRIBE_EVENT_LISTENER_REQUEST: &str =
    "privateChannelUnsubscribeEventListenerRequest";
pub const PRIVATE_CHANNEL_DISCONNECT_REQUEST: &str = "privateChannelDisconnectRequest";
pub const PRIVATE_CHANNEL_ON_ADD_CONTEXT_LISTENER_EVENT: &str =
    "privateChannelOnAddContextListenerEvent";
pub const PRIVATE_CHANNEL_ON_UNSUBSCRIBE_EVENT: &str = "privateChannelOnUnsubscribeEvent";
pub const PRIVATE_CHANNEL_ON_DISCONNECT_EVENT: &str = "privateChannelOnDisconnectEvent";

// App directory and metadata operations.
pub const OPEN_REQUEST: &str = "openRequest";
pub const FIND_INSTANCES_REQUEST: &str = "findInstancesRequest";
pub const GET_APP_METADATA_REQUEST: &str = "getAppMetadataRequest";
pub const GET_INFO_REQUEST: &str = "getInfoRequest";

lazy_static! {
    /// The supported vocabulary for [`add_event_listener`] API event types,
    /// mapping each public event name to its wire event message type.
    ///
    /// Requests for a type outside this table fail synchronously, before any
    /// wire interaction.
    ///
    /// [`add_event_listener`]: https://github.com/Govcraft/dacp
    pub static ref API_EVENT_TYPES: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("userChannelChanged", CHANNEL_CHANGED_EVENT);
        m
    };
}

/// Derives the response type name for a request type.
///
/// `getInfoRequest` → `getInfoResponse`. A name without the `Request` suffix
/// has `Response` appended, so malformed inputs still produce a name that can
/// never match a real response.
#[must_use]
pub fn response_type_for(request_type: &str) -> String {
    match request_type.strip_suffix("Request") {
        Some(stem) => format!("{stem}Response"),
        None => format!("{request_type}Response"),
    }
}

/// Whether a message type name follows the event naming convention.
#[must_use]
pub fn is_event_type(msg_type: &str) -> bool {
    msg_type.ends_with(EVENT_SUFFIX)
}

/// Resolves a public API event type name to its wire event message type.
#[must_use]
pub fn wire_event_for(api_type: &str) -> Option<&'static str> {
    API_EVENT_TYPES.get(api_type).copied()
}
