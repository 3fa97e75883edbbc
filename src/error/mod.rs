//! Error types for tasklink.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all tasklink operations.
#[derive(Error, Debug)]
pub enum TaskLinkError {
    #[error("Endpoint error (status {status} {status_text})")]
    Endpoint {
        status: u16,
        status_text: String,
        body: Option<String>,
    },

    #[error("Decode error: {source}")]
    Decode {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    /// One streamed line failed to parse. Produced by the frame decoder only;
    /// the line is logged and skipped, never returned from a client call.
    #[error("Frame parse error: {line}")]
    FrameParse { line: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Store error: {0}")]
    Store(String),
}

impl TaskLinkError {
    /// Create an endpoint error from a status code and its canonical reason.
    pub fn endpoint(status: u16, body: Option<String>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self::Endpoint {
            status,
            status_text,
            body,
        }
    }

    /// Create a decode error, keeping the offending text for diagnostics.
    pub fn decode(raw: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            raw: raw.into(),
            source,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Endpoint { status, .. } => match status {
                408 | 429 => ErrorCategory::Network,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Endpoint,
            },
            Self::Network(_) | Self::Stream(_) | Self::Io(_) => ErrorCategory::Network,
            Self::Decode { .. } | Self::FrameParse { .. } | Self::Serialization(_) => {
                ErrorCategory::Decode
            }
            Self::Configuration(_) | Self::InvalidArgument(_) => ErrorCategory::Configuration,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Store(_) => ErrorCategory::Store,
        }
    }

    /// Whether a caller-side retry could succeed. The client never retries itself.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Server => RecoverySuggestion::Retry,
            ErrorCategory::Endpoint => RecoverySuggestion::CheckEndpoint,
            ErrorCategory::Configuration | ErrorCategory::Store => {
                RecoverySuggestion::CheckConfiguration
            }
            ErrorCategory::Decode => RecoverySuggestion::InspectPayload,
            ErrorCategory::Cancelled => RecoverySuggestion::None,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, TaskLinkError>;
