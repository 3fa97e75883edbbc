//! Client configuration (layered: code > env > defaults).

use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Default location of the capability card, relative to the endpoint url.
pub const DEFAULT_CARD_PATH: &str = ".well-known/agent.json";

/// JSON-RPC method names for the three task operations.
///
/// The names are an external protocol constant; agents built against different
/// protocol revisions expect different spellings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodNames {
    pub send: String,
    pub send_streaming: String,
    pub get: String,
}

impl Default for MethodNames {
    fn default() -> Self {
        Self {
            send: "tasks/send".to_string(),
            send_streaming: "send_task_streaming".to_string(),
            get: "get_task".to_string(),
        }
    }
}

/// Configuration shared by every [`AgentClient`](crate::client::AgentClient).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use tasklink::config::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .liveness_timeout(Duration::from_secs(1))
///     .build();
/// assert_eq!(config.card_path, ".well-known/agent.json");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct ClientConfig {
    #[builder(into, default = DEFAULT_CARD_PATH.to_string())]
    pub card_path: String,
    #[builder(default)]
    pub methods: MethodNames,
    #[builder(default = vec!["text".to_string()])]
    pub accepted_output_modes: Vec<String>,
    /// Applied to task calls. Task execution has no timeout unless set.
    pub request_timeout: Option<Duration>,
    #[builder(default = Duration::from_secs(3))]
    pub liveness_timeout: Duration,
    #[builder(default = Duration::from_secs(5))]
    pub refresh_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ClientConfig {
    /// Load overrides from environment variables (and `.env` if present).
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Unparseable values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup("TASKLINK_CARD_PATH") {
            self.card_path = path;
        }
        if let Some(name) = lookup("TASKLINK_METHOD_SEND") {
            self.methods.send = name;
        }
        if let Some(name) = lookup("TASKLINK_METHOD_STREAM") {
            self.methods.send_streaming = name;
        }
        if let Some(name) = lookup("TASKLINK_METHOD_GET") {
            self.methods.get = name;
        }
        if let Some(ms) = lookup("TASKLINK_LIVENESS_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.liveness_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = lookup("TASKLINK_REQUEST_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.request_timeout = Some(Duration::from_millis(ms));
        }
        self
    }

    /// Absolute capability card url for an endpoint.
    pub fn card_url(&self, endpoint_url: &str) -> String {
        format!(
            "{}/{}",
            endpoint_url.trim_end_matches('/'),
            self.card_path.trim_start_matches('/')
        )
    }
}
