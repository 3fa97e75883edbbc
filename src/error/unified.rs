//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Non-2xx answer that is not a server fault.
    Endpoint,
    /// 5xx answer.
    Server,
    Network,
    Decode,
    Configuration,
    Cancelled,
    Store,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    Retry,
    CheckEndpoint,
    CheckConfiguration,
    InspectPayload,
    None,
}
