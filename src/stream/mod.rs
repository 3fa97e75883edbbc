//! Reconstruction of JSON values from loosely framed response bodies.
//!
//! Agents stream results as SSE (`data: <json>`), as bare newline-delimited
//! JSON, or as whole documents flushed one per chunk. [`FrameDecoder`] accepts
//! all three interchangeably within one body.

pub mod frame;

pub use frame::{decode_frames, Frame, FrameDecoder};
