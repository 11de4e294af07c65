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

//! The wire envelope exchanged with the Desktop Agent.
//!
//! Every message on the connection — request, response, or event — shares the
//! same outer shell: a `type` that determines routing, a `meta` block carrying
//! the correlation id and timestamp, and an untyped `payload` that individual
//! listener kinds parse lazily for the fields they care about.
//!
//! # Wire Format
//!
//! When serialized to JSON:
//!
//! ```json
//! {
//!   "type": "broadcastEvent",
//!   "meta": {
//!     "requestId": "req_01h9xz7n2e5p6q8r3t1u2v3w4x",
//!     "timestamp": "2024-06-01T12:00:00Z",
//!     "source": { "appId": "pricer", "instanceId": "uuid-1" }
//!   },
//!   "payload": { "channelId": "red", "context": { "type": "fdc3.instrument" } }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;

/// Identifies an application (and optionally a concrete running instance)
/// known to the Desktop Agent.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppIdentifier {
    /// The application id, as listed in the Desktop Agent's directory.
    pub app_id: String,

    /// A specific instance of the application, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
}

impl AppIdentifier {
    /// Creates an identifier for an application without a specific instance.
    #[must_use]
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            instance_id: None,
        }
    }

    /// Creates an identifier for a specific running instance.
    #[must_use]
    pub fn with_instance(app_id: impl Into<String>, instance_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            instance_id: Some(instance_id.into()),
        }
    }
}

/// Metadata block carried by every envelope.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WireMeta {
    /// Correlation id pairing a request with its response. Every envelope this
    /// runtime originates carries a freshly generated, globally unique id.
    pub request_id: String,

    /// The time the envelope was created.
    pub timestamp: DateTime<Utc>,

    /// The application the envelope originated from, when the Desktop Agent
    /// attributes it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<AppIdentifier>,
}

/// An envelope on the Desktop Agent connection.
///
/// The payload is deliberately opaque at this layer. Listener kinds consult
/// well-known fields (`error`, `channelId`, `context`, `intent`, …) through
/// the accessor helpers rather than deserializing into typed schema classes.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WireEnvelope {
    /// The message type name, e.g. `getInfoRequest` or `broadcastEvent`.
    #[serde(rename = "type")]
    pub msg_type: String,

    /// Correlation and provenance metadata.
    pub meta: WireMeta,

    /// The message body, parsed lazily per message kind.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl WireEnvelope {
    /// Creates a new outbound envelope with a freshly generated request id
    /// and a current timestamp.
    #[must_use]
    pub fn request(msg_type: impl Into<String>, payload: serde_json::Value) -> Self {
        use mti::prelude::*;
        Self {
            msg_type: msg_type.into(),
            meta: WireMeta {
                request_id: "req".create_type_id::<V7>().to_string(),
                timestamp: Utc::now(),
                source: None,
            },
            payload,
        }
    }

    /// Creates an envelope with a caller-supplied request id.
    ///
    /// Used when echoing a correlation id back, such as when a mock Desktop
    /// Agent answers a request in tests.
    #[must_use]
    pub fn with_request_id(
        msg_type: impl Into<String>,
        request_id: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            msg_type: msg_type.into(),
            meta: WireMeta {
                request_id: request_id.into(),
                timestamp: Utc::now(),
                source: None,
            },
            payload,
        }
    }

    /// The correlation id from the metadata block.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.meta.request_id
    }

    /// Reads a top-level string field from the payload.
    #[must_use]
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(serde_json::Value::as_str)
    }

    /// The counterparty-reported error string, when present.
    ///
    /// A populated `payload.error` marks the envelope as a failure response
    /// and causes the correlated call to be rejected.
    #[must_use]
    pub fn payload_error(&self) -> Option<&str> {
        self.payload_str("error")
    }
}

// Ensures envelopes can cross task boundaries.
assert_impl_all!(WireEnvelope: Send);
