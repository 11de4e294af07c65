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

use serde::{Deserialize, Serialize};

/// A structured, typed data payload shared between applications.
///
/// Contexts are identified by their `type` string (e.g. `fdc3.instrument`);
/// everything beyond the standard `name`/`id` fields is preserved untouched in
/// `fields` so unknown context schemas round-trip through the runtime.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Context {
    /// The context type identifier.
    #[serde(rename = "type")]
    pub context_type: String,

    /// Optional human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Optional identifiers bag (`{ "ticker": "AAPL", … }`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,

    /// Any further schema-specific fields, carried opaquely.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Context {
    /// Creates a context carrying only its type.
    #[must_use]
    pub fn new(context_type: impl Into<String>) -> Self {
        Self {
            context_type: context_type.into(),
            name: None,
            id: None,
            fields: serde_json::Map::new(),
        }
    }

    /// Sets the human-readable name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the identifiers bag.
    #[must_use]
    pub fn with_id(mut self, id: serde_json::Value) -> Self {
        self.id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_round_trip_preserves_unknown_fields() {
        let json = serde_json::json!({
            "type": "fdc3.instrument",
            "name": "Apple",
            "id": { "ticker": "AAPL" },
            "market": { "MIC": "XNAS" }
        });

        let context: Context = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(context.context_type, "fdc3.instrument");
        assert_eq!(context.name.as_deref(), Some("Apple"));
        assert!(context.fields.contains_key("market"));

        let back = serde_json::to_value(&context).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn test_context_builder() {
        let context = Context::new("fdc3.contact").with_name("Jane");
        assert_eq!(context.context_type, "fdc3.contact");
        assert_eq!(context.name.as_deref(), Some("Jane"));
        assert!(context.id.is_none());
    }
}
