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

//! Application directory and metadata operations.

use dacp_core::message::catalog::{
    response_type_for, FIND_INSTANCES_REQUEST, GET_APP_METADATA_REQUEST, GET_INFO_REQUEST,
    OPEN_REQUEST,
};
use dacp_core::message::{AgentError, AppIdentifier, Context, WireEnvelope};

use crate::agent::DesktopAgent;
use crate::types::{AppMetadata, ImplementationMetadata};

impl DesktopAgent {
    /// Opens an application, optionally passing it a starting context.
    ///
    /// Uses the app-launch deadline: the target may need to start up.
    pub async fn open(
        &self,
        app: AppIdentifier,
        context: Option<Context>,
    ) -> Result<AppIdentifier, AgentError> {
        let request = WireEnvelope::request(
            OPEN_REQUEST,
            serde_json::json!({ "app": app, "context": context }),
        );
        let response = self
            .messaging()
            .exchange_with_timeout(
                request,
                &response_type_for(OPEN_REQUEST),
                self.messaging().config().app_launch_timeout(),
            )
            .await?;
        let raw = response.payload.get("appIdentifier").ok_or_else(|| {
            AgentError::Serialization("open response without appIdentifier".to_string())
        })?;
        Ok(serde_json::from_value(raw.clone())?)
    }

    /// Lists the running instances of an application.
    pub async fn find_instances(
        &self,
        app: AppIdentifier,
    ) -> Result<Vec<AppIdentifier>, AgentError> {
        let request =
            WireEnvelope::request(FIND_INSTANCES_REQUEST, serde_json::json!({ "app": app }));
        let response = self
            .messaging()
            .exchange(request, &response_type_for(FIND_INSTANCES_REQUEST))
            .await?;
        let raw = response.payload.get("appIdentifiers").ok_or_else(|| {
            AgentError::Serialization(
                "findInstances response without appIdentifiers".to_string(),
            )
        })?;
        Ok(serde_json::from_value(raw.clone())?)
    }

    /// Retrieves directory metadata for an application.
    pub async fn get_app_metadata(&self, app: AppIdentifier) -> Result<AppMetadata, AgentError> {
        let request =
            WireEnvelope::request(GET_APP_METADATA_REQUEST, serde_json::json!({ "app": app }));
        let response = self
            .messaging()
            .exchange(request, &response_type_for(GET_APP_METADATA_REQUEST))
            .await?;
        let raw = response.payload.get("appMetadata").ok_or_else(|| {
            AgentError::Serialization("getAppMetadata response without appMetadata".to_string())
        })?;
        Ok(serde_json::from_value(raw.clone())?)
    }

    /// Retrieves metadata about the Desktop Agent implementation.
    pub async fn get_info(&self) -> Result<ImplementationMetadata, AgentError> {
        let request = WireEnvelope::request(GET_INFO_REQUEST, serde_json::json!({}));
        let response = self
            .messaging()
            .exchange(request, &response_type_for(GET_INFO_REQUEST))
            .await?;
        let raw = response.payload.get("implementationMetadata").ok_or_else(|| {
            AgentError::Serialization(
                "getInfo response without implementationMetadata".to_string(),
            )
        })?;
        Ok(serde_json::from_value(raw.clone())?)
    }
}
