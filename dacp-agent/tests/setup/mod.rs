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
use std::sync::Once;
use std::time::Duration;

use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Declare the submodules.
pub mod transport;

pub use transport::ScriptedTransport;

// Ensures tracing initialization happens only once across all tests.
static INIT: Once = Once::new();

/// Initializes the global tracing subscriber for tests.
///
/// Sets up a `tracing_subscriber::FmtSubscriber` writing to a log file via
/// `tracing-appender`, with an `EnvFilter` controlling per-target levels.
/// Uses `std::sync::Once` so repeated calls from different tests are safe.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        // Ensure logs directory exists
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "agent_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard so the non-blocking writer is not dropped before process exit
        Box::leak(Box::new(guard));

        let filter = EnvFilter::new("trace")
            .add_directive("dacp_core=trace".parse().unwrap())
            .add_directive("dacp_agent=trace".parse().unwrap())
            .add_directive(tracing_subscriber::filter::LevelFilter::TRACE.into());

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// A configuration with short deadlines, so timeout paths finish quickly.
pub fn fast_config() -> dacp_agent::prelude::AgentConfig {
    let mut config = dacp_agent::prelude::AgentConfig::default();
    config.timeouts.exchange = 100;
    config.timeouts.app_launch = 200;
    config.timeouts.intent_result = 500;
    config.timeouts.disconnect = 100;
    config
}

/// Builds an agent over the scripted transport and wires the return path.
pub fn agent_over(
    transport: &std::sync::Arc<ScriptedTransport>,
    config: dacp_agent::prelude::AgentConfig,
) -> dacp_agent::prelude::DesktopAgent {
    let agent = dacp_agent::prelude::DesktopAgent::new(transport.clone(), config);
    transport.attach(&agent);
    agent
}

/// Polls `condition` until it holds or the one-second budget runs out.
///
/// Spawned listener work (intent handlers, result reports) runs off the
/// delivery path, so tests await its observable effects instead of assuming
/// ordering.
pub async fn wait_until<F>(condition: F)
where
    F: Fn() -> bool,
{
    let deadline = Duration::from_secs(1);
    let result = tokio::time::timeout(deadline, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "condition not reached within {deadline:?}");
}
