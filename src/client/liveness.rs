//! Endpoint liveness checks and card refresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AgentClient;
use crate::error::{Result, TaskLinkError};
use crate::types::AgentEndpoint;

/// Outcome of a liveness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EndpointStatus {
    Connected {
        checked_at: DateTime<Utc>,
    },
    Unreachable {
        reason: String,
        checked_at: DateTime<Utc>,
    },
}

impl EndpointStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

fn unreachable_reason(err: &TaskLinkError) -> String {
    match err {
        TaskLinkError::Endpoint { status, .. } => format!("HTTP {status}"),
        TaskLinkError::Network(e) if e.is_timeout() => "timeout".to_string(),
        other => other.to_string(),
    }
}

impl AgentClient {
    /// Poll the capability card with the short liveness timeout.
    pub async fn check_liveness(&self) -> EndpointStatus {
        let timeout = self.config().liveness_timeout;
        let checked_at = Utc::now();
        match self.fetch_card_with_timeout(Some(timeout)).await {
            Ok(_) => EndpointStatus::Connected { checked_at },
            Err(err) => {
                let reason = unreachable_reason(&err);
                debug!(reason = %reason, "endpoint unreachable");
                EndpointStatus::Unreachable { reason, checked_at }
            }
        }
    }

    /// Refetch the card and apply it to `endpoint`, keeping its id.
    pub async fn refresh(&self, endpoint: &mut AgentEndpoint) -> Result<()> {
        let timeout = self.config().refresh_timeout;
        let card = self.fetch_card_with_timeout(Some(timeout)).await?;
        endpoint.apply_card(card)
    }
}
