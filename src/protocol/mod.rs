//! JSON-RPC request construction for the agent task protocol.

pub mod envelope;

pub use envelope::{Envelope, ProtocolMethod, RequestBuilder, TaskParams, JSONRPC_VERSION};
