use std::num::ParseIntError;
use thiserror::Error;

/// Failure reported by a decode engine for one submitted task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DecodeFailure {
    /// Engine-provided description of what went wrong
    pub message: String,
}

impl DecodeFailure {
    /// Creates a failure carrying the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors produced by the decoder façade, the scheduler and its engines
#[derive(Error, Debug)]
pub enum DecoderError {
    /// I/O failure while reading configuration or input
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// `offset + length` does not fit inside the submitted buffer
    #[error("invalid range: offset {offset} + length {length} exceeds buffer of {size} bytes")]
    InvalidRange {
        /// Requested start of the region
        offset: usize,
        /// Requested length of the region
        length: usize,
        /// Size of the buffer the region was taken from
        size: usize,
    },

    /// The engine's `init` returned false
    #[error("decoder engine failed to initialize")]
    EngineInitFailure,

    /// The engine failed to decode one task
    #[error("decode error: {0}")]
    Decode(#[from] DecodeFailure),

    /// Work was submitted after shutdown
    #[error("scheduler closed")]
    SchedulerClosed,

    /// The engine broke its completion contract
    #[error("engine protocol violation: {0}")]
    EngineProtocolViolation(String),

    /// Malformed value in configuration
    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, DecoderError>;
