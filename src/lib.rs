//! tasklink: client for the JSON-RPC agent task protocol.
//!
//! Builds request envelopes, reconstructs streamed replies (SSE, newline
//! delimited JSON, or one document per flush), normalizes the many result
//! shapes agents return, and tracks per-agent sessions and chat history.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tasklink::prelude::*;
//!
//! # async fn example() -> tasklink::error::Result<()> {
//! let config = Arc::new(ClientConfig::default());
//! let coordinator = Coordinator::new(config);
//! coordinator.add_agent(AgentEndpoint::new("echo", "http://localhost:10000", true));
//!
//! let reply = coordinator
//!     .send_message("echo", OutgoingMessage::text("hello"))
//!     .await?;
//! println!("{} ({:?})", reply.content, reply.state);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod normalize;
pub mod prelude;
pub mod protocol;
pub mod store;
pub mod stream;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
