#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

//! # nalflow - Serialized H.264 Decode Scheduling
//!
//! `nalflow` feeds H.264 access units into a stateful decoder engine that
//! only accepts one decode call at a time and reports results through a
//! callback. Callers submit byte ranges whenever they like; the scheduler
//! queues them, submits them back to back in submission order, and
//! republishes every completion as a frame or error event.
//!
//! ## Features
//!
//! - Strict FIFO, single-flight submission against any [`DecodeEngine`]
//! - Submitted buffers stay alive and immutable until their own completion
//! - Frame and error observers, plus an async event channel
//! - Annex-B access unit splitting and NAL unit classification
//! - A worker-thread passthrough engine for wiring pipelines without a native
//!   decoder
//!
//! ## Quick Start
//!
//! ```rust
//! use nalflow::codec::h264::split_access_units;
//! use nalflow::Decoder;
//!
//! # fn main() -> nalflow::Result<()> {
//! let stream = [
//!     0x00, 0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x1F,
//!     0x00, 0x00, 0x00, 0x01, 0x68, 0xCE,
//!     0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84,
//! ];
//!
//! let decoder = Decoder::new()?;
//! decoder.on_frame(|frame| println!("decoded {}x{}", frame.width, frame.height));
//!
//! for unit in split_access_units(&stream) {
//!     let len = unit.len();
//!     decoder.decode_frames(unit, 0, len)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - `decode`: tasks, the engine boundary, the scheduler and the event
//!   publisher
//! - `decoder`: the caller-facing [`Decoder`]
//! - `codec`: H.264 Annex-B helpers
//! - `config`: process-wide defaults from the environment and config files
//! - `error`: error types and the crate [`Result`] alias
//!
//! [`DecodeEngine`]: decode::DecodeEngine

/// Codec helpers for H.264 byte streams
pub mod codec;

/// Configuration module
pub mod config;

/// Decode tasks, engines, scheduling and event delivery
pub mod decode;

/// Caller-facing decoder
pub mod decoder;

/// Error types and utilities
pub mod error;

pub use decoder::{DecodeEvents, Decoder};
pub use error::{DecodeFailure, DecoderError, Result};
