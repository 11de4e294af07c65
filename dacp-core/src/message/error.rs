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

use std::fmt;

/// Error types for Desktop Agent operations.
///
/// The three kinds a caller is expected to branch on are [`Timeout`]
/// (no matching response within the deadline), [`Remote`] (the counterparty
/// explicitly reported `payload.error`), and [`Protocol`] (a malformed or
/// unsupported request, raised synchronously before any wire interaction).
///
/// [`Timeout`]: AgentError::Timeout
/// [`Remote`]: AgentError::Remote
/// [`Protocol`]: AgentError::Protocol
#[derive(Debug, Clone)]
pub enum AgentError {
    /// No matching response arrived within the deadline.
    Timeout {
        /// The response type the call was waiting for, when known.
        expected: Option<String>,
        /// Caller-supplied label naming the operation that timed out.
        label: String,
    },

    /// The Desktop Agent reported an error string in `payload.error`.
    Remote(String),

    /// The caller violated the protocol, e.g. requested an event type outside
    /// the supported vocabulary.
    Protocol(String),

    /// The transport failed to accept an outbound envelope.
    Transport(String),

    /// Serialization or deserialization failure.
    Serialization(String),

    /// The connection to the Desktop Agent was closed while the call was
    /// outstanding.
    ConnectionClosed,

    /// A private channel failed to disconnect within the bounded wait.
    Disconnect(String),

    /// The runtime is not connected to a Desktop Agent.
    NotConnected,
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout {
                expected: Some(expected),
                label,
            } => write!(f, "Timed out waiting for {expected} ({label})"),
            Self::Timeout {
                expected: None,
                label,
            } => write!(f, "Timed out ({label})"),
            Self::Remote(e) => write!(f, "Desktop Agent reported an error: {e}"),
            Self::Protocol(e) => write!(f, "Protocol error: {e}"),
            Self::Transport(e) => write!(f, "Transport error: {e}"),
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::Disconnect(e) => write!(f, "Private channel disconnect failed: {e}"),
            Self::NotConnected => write!(f, "Not connected to a Desktop Agent"),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl AgentError {
    /// Whether this error is a deadline expiry rather than an explicit
    /// failure reported by the counterparty.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
