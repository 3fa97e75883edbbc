//! Convenience re-exports for common use.

pub use crate::client::{
    AgentClient, AgentProtocol, ChunkCallback, EndpointStatus, TaskReply, TaskRequest,
};
pub use crate::config::ClientConfig;
pub use crate::conversation::{ChatRecord, Coordinator, OutgoingMessage, Sender};
pub use crate::error::{Result, TaskLinkError};
pub use crate::normalize::{normalize, ResponseNormalizer};
pub use crate::protocol::{Envelope, ProtocolMethod, RequestBuilder, TaskParams};
pub use crate::types::{
    AgentEndpoint, Artifact, CapabilityCard, FileAttachment, NormalizedResponse, OutboundMessage,
    TaskState,
};
