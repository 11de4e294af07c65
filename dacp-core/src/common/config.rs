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

//! Runtime configuration with XDG-compliant file loading.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Configuration for the Desktop Agent client runtime.
///
/// Loaded from `$XDG_CONFIG_HOME/dacp/agent.toml` when present; every field
/// has a default so a missing or partial file is fine.
///
/// # Example Configuration File
///
/// ```toml
/// [timeouts]
/// exchange_timeout_ms = 10000
/// app_launch_timeout_ms = 100000
/// intent_result_timeout_ms = 120000
/// disconnect_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Timeout configuration.
    pub timeouts: TimeoutsConfig,
}

/// Timeout configuration for Desktop Agent operations.
///
/// All values are in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Deadline for an ordinary request/response exchange.
    #[serde(rename = "exchange_timeout_ms")]
    pub exchange: u64,

    /// Deadline for operations that may need to launch an application
    /// (`open`, `raiseIntent`).
    #[serde(rename = "app_launch_timeout_ms")]
    pub app_launch: u64,

    /// Deadline for a raised intent's result to arrive. Generous, since the
    /// remote handler may involve user interaction.
    #[serde(rename = "intent_result_timeout_ms")]
    pub intent_result: u64,

    /// Bounded wait for a private channel disconnect acknowledgement.
    #[serde(rename = "disconnect_timeout_ms")]
    pub disconnect: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            exchange: 10_000,
            app_launch: 100_000,
            intent_result: 120_000,
            disconnect: 5_000,
        }
    }
}

impl AgentConfig {
    /// Load configuration from XDG-compliant locations.
    ///
    /// Attempts to load `agent.toml` from the `dacp` XDG config prefix and
    /// falls back to defaults when the file is missing or unreadable.
    #[must_use]
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("dacp") {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!("Failed to initialize XDG directories for agent config: {}", e);
                return Self::default();
            }
        };

        xdg_dirs.find_config_file("agent.toml").map_or_else(
            || {
                info!("No agent configuration file found, using defaults");
                Self::default()
            },
            |path| match std::fs::read_to_string(&path) {
                Ok(config_str) => match toml::from_str::<Self>(&config_str) {
                    Ok(config) => {
                        info!("Loaded agent configuration from: {}", path.display());
                        config
                    }
                    Err(e) => {
                        warn!(
                            "Failed to parse agent configuration file {}: {}",
                            path.display(),
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!(
                        "Failed to read agent configuration file {}: {}",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
        )
    }

    /// The ordinary exchange deadline.
    #[must_use]
    pub const fn exchange_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.exchange)
    }

    /// The deadline for operations that may launch an application.
    #[must_use]
    pub const fn app_launch_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.app_launch)
    }

    /// The deadline for a raised intent's result.
    #[must_use]
    pub const fn intent_result_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.intent_result)
    }

    /// The bounded wait for a private channel disconnect.
    #[must_use]
    pub const fn disconnect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.disconnect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.exchange_timeout(), Duration::from_secs(10));
        assert_eq!(config.app_launch_timeout(), Duration::from_secs(100));
        assert_eq!(config.intent_result_timeout(), Duration::from_secs(120));
        assert_eq!(config.disconnect_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_keeps_remaining_defaults() {
        let config: AgentConfig = toml::from_str(
            r#"
            [timeouts]
            exchange_timeout_ms = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.exchange_timeout(), Duration::from_millis(50));
        assert_eq!(config.disconnect_timeout(), Duration::from_secs(5));
    }
}
