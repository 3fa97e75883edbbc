//! Core types for tasklink.

pub mod endpoint;
pub mod message;
pub mod task;

pub use endpoint::*;
pub use message::*;
pub use task::*;
