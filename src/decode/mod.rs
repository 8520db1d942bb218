//! # Decode Scheduling
//!
//! Everything between a caller handing over coded bytes and an observer
//! receiving a decoded frame:
//!
//! - [`DecodeTask`]: an immutable byte region queued for decoding
//! - [`DecodeEngine`]: the boundary to a native decoder that takes one
//!   submission at a time and completes through a [`CompletionSink`]
//! - [`DecodeScheduler`]: FIFO queue plus a single in-flight slot in front of
//!   the engine
//! - [`EventPublisher`]: fan-out of frames and errors to observers
//!
//! [`PassthroughEngine`] is a worker-thread engine that needs no native
//! library, and [`testing::ScriptedEngine`] lets tests complete submissions by
//! hand.

/// Engine boundary and completion callback
pub mod engine;
/// Outcome and event types
pub mod outcome;
/// Worker-thread engine that hands coded units back as frames
pub mod passthrough;
/// Observer registration and delivery
pub mod publisher;
/// The single-flight scheduler
pub mod scheduler;
/// Decode request type
pub mod task;
/// Hand-driven engine for tests
pub mod testing;

pub use engine::{CompletionSink, DecodeEngine};
pub use outcome::{DecodeEvent, DecodeOutcome, DecodedFrame};
pub use passthrough::PassthroughEngine;
pub use publisher::{ErrorObserver, EventPublisher, FrameObserver, Subscription};
pub use scheduler::{DecodeScheduler, SchedulerPhase, SchedulerStats};
pub use task::DecodeTask;
