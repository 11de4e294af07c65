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

//! Metadata types decoded from Desktop Agent responses.

use dacp_core::prelude::AppIdentifier;
use serde::{Deserialize, Serialize};

/// Descriptive metadata for an application from the Desktop Agent's directory.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    /// The application's identifier.
    #[serde(flatten)]
    pub identifier: AppIdentifier,

    /// Short name of the application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Version of the application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Human-readable title, for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Longer description of the application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Metadata about the Desktop Agent implementation, from `getInfo`.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationMetadata {
    /// The version of the interoperability standard the agent implements.
    pub fdc3_version: String,

    /// The name of the Desktop Agent provider.
    pub provider: String,

    /// The version of the provider implementation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_version: Option<String>,

    /// Metadata for this application, as the Desktop Agent sees it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_metadata: Option<AppMetadata>,
}

/// Descriptive metadata for an intent.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IntentMetadata {
    /// The intent name, e.g. `ViewChart`.
    pub name: String,

    /// Human-readable display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// An intent together with the applications able to handle it, from
/// `findIntent` and `findIntentsByContext`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AppIntent {
    /// The intent.
    pub intent: IntentMetadata,

    /// The applications able to resolve it.
    #[serde(default)]
    pub apps: Vec<AppMetadata>,
}

/// Display hints for a user channel.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DisplayMetadata {
    /// Display name of the channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Color associated with the channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// URL of an icon for the channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub glyph: Option<String>,
}

/// The kind of a channel.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// A user channel, joined through the channel selector.
    User,
    /// An application channel from `getOrCreateChannel`.
    App,
    /// A two-party private channel with peer-lifecycle events.
    Private,
}

impl ChannelType {
    /// The wire name of this channel type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::App => "app",
            Self::Private => "private",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_metadata_flattens_identifier() {
        let json = serde_json::json!({
            "appId": "pricer",
            "instanceId": "i-1",
            "name": "Pricer",
            "title": "The Pricer"
        });
        let metadata: AppMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(metadata.identifier.app_id, "pricer");
        assert_eq!(metadata.identifier.instance_id.as_deref(), Some("i-1"));
        assert_eq!(metadata.name.as_deref(), Some("Pricer"));
    }

    #[test]
    fn test_implementation_metadata_decoding() {
        let json = serde_json::json!({
            "fdc3Version": "2.1",
            "provider": "acme-desktop",
            "providerVersion": "5.2.0"
        });
        let info: ImplementationMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(info.fdc3_version, "2.1");
        assert_eq!(info.provider, "acme-desktop");
        assert!(info.app_metadata.is_none());
    }

    #[test]
    fn test_channel_type_serde_names() {
        assert_eq!(serde_json::to_value(ChannelType::User).unwrap(), "user");
        let parsed: ChannelType = serde_json::from_value(serde_json::json!("private")).unwrap();
        assert_eq!(parsed, ChannelType::Private);
        assert_eq!(parsed.as_str(), "private");
    }

    #[test]
    fn test_app_intent_defaults_empty_apps() {
        let json = serde_json::json!({ "intent": { "name": "ViewChart" } });
        let app_intent: AppIntent = serde_json::from_value(json).unwrap();
        assert_eq!(app_intent.intent.name, "ViewChart");
        assert!(app_intent.apps.is_empty());
    }
}
