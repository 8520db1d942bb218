use bytes::Bytes;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

use crate::config::{self, Config};
use crate::decode::{
    DecodeEngine, DecodeEvent, DecodeScheduler, DecodeTask, DecodedFrame, EventPublisher,
    PassthroughEngine, SchedulerPhase, SchedulerStats, Subscription,
};
use crate::error::{DecodeFailure, Result};

/// Decoder for one H.264 stream.
///
/// Accepts access units at any rate, feeds them to its engine one at a time
/// in submission order and reports decoded frames and per-unit failures to
/// registered observers. Dropping the decoder releases the engine.
///
/// # Example
///
/// ```rust
/// use nalflow::Decoder;
///
/// # fn main() -> nalflow::Result<()> {
/// let decoder = Decoder::new()?;
/// decoder.on_frame(|frame| println!("frame {}x{}", frame.width, frame.height));
/// decoder.on_error(|err| eprintln!("decode failed: {}", err));
///
/// let unit = vec![0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84];
/// let len = unit.len();
/// decoder.decode_frames(unit, 0, len)?;
/// decoder.release();
/// # Ok(())
/// # }
/// ```
pub struct Decoder {
    scheduler: DecodeScheduler,
}

impl Decoder {
    /// Creates a decoder backed by a [`PassthroughEngine`] configured from
    /// the process-wide [`Config`]
    pub fn new() -> Result<Self> {
        Self::with_config(&config::get_config())
    }

    /// Creates a decoder backed by a [`PassthroughEngine`] built from `config`
    pub fn with_config(config: &Config) -> Result<Self> {
        Self::with_engine(PassthroughEngine::from_config(config))
    }

    /// Creates a decoder that owns `engine`.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::EngineInitFailure`](crate::DecoderError::EngineInitFailure)
    /// if the engine fails to initialize.
    pub fn with_engine<E>(engine: E) -> Result<Self>
    where
        E: DecodeEngine + 'static,
    {
        let scheduler = DecodeScheduler::new(engine, Arc::new(EventPublisher::new()))?;
        Ok(Self { scheduler })
    }

    /// Queues `buffer[offset..offset + length]` for decoding.
    ///
    /// The buffer is taken over (`Vec<u8>` and `Bytes` convert without a
    /// copy), so it cannot change while the engine works on it.
    ///
    /// # Errors
    ///
    /// - [`InvalidRange`](crate::DecoderError::InvalidRange) if the region
    ///   does not fit in `buffer`; the engine never sees it
    /// - [`SchedulerClosed`](crate::DecoderError::SchedulerClosed) after
    ///   [`release`](Self::release)
    pub fn decode_frames(&self, buffer: impl Into<Bytes>, offset: usize, length: usize) -> Result<()> {
        let task = DecodeTask::new(buffer, offset, length)?;
        self.scheduler.enqueue(task)
    }

    /// Same as [`decode_frames`](Self::decode_frames) for a borrowed buffer:
    /// the region is copied before this returns, so the caller may reuse
    /// `buffer` immediately.
    pub fn decode_frames_from_slice(&self, buffer: &[u8], offset: usize, length: usize) -> Result<()> {
        let task = DecodeTask::copy_from_slice(buffer, offset, length)?;
        self.scheduler.enqueue(task)
    }

    /// Registers a callback for decoded frames
    pub fn on_frame<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&DecodedFrame) + Send + Sync + 'static,
    {
        self.scheduler.publisher().subscribe_frames(observer)
    }

    /// Registers a callback for per-unit decode failures
    pub fn on_error<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&DecodeFailure) + Send + Sync + 'static,
    {
        self.scheduler.publisher().subscribe_errors(observer)
    }

    /// Removes an observer added with [`on_frame`](Self::on_frame) or
    /// [`on_error`](Self::on_error). Returns false if it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.scheduler.publisher().unsubscribe(subscription)
    }

    /// Returns a channel receiving every frame and error published from now on
    pub fn events(&self) -> DecodeEvents {
        let publisher = self.scheduler.publisher();
        let (sender, receiver) = mpsc::unbounded_channel();

        let frames = sender.clone();
        let frame_sub = publisher.subscribe_frames(move |frame| {
            let _ = frames.send(DecodeEvent::Frame(frame.clone()));
        });
        let error_sub = publisher.subscribe_errors(move |err| {
            let _ = sender.send(DecodeEvent::Error(err.clone()));
        });

        DecodeEvents {
            receiver,
            publisher: Arc::downgrade(publisher),
            subscriptions: [frame_sub, error_sub],
        }
    }

    /// Resolves once nothing is in flight or pending, or the decoder is
    /// closed
    pub async fn wait_idle(&self) {
        let mut idle = self.scheduler.subscribe_idle();
        let _ = idle.wait_for(|idle| *idle).await;
    }

    /// Discards pending units and releases the engine. Further
    /// `decode_frames` calls fail. Safe to call more than once.
    pub fn release(&self) {
        self.scheduler.shutdown();
    }

    /// Current scheduler phase
    pub fn phase(&self) -> SchedulerPhase {
        self.scheduler.phase()
    }

    /// Units queued behind the one being decoded
    pub fn pending_len(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// Lifetime counters of the underlying scheduler
    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }
}

/// Channel of decode events, see [`Decoder::events`].
///
/// Unsubscribes from the decoder when dropped.
pub struct DecodeEvents {
    receiver: mpsc::UnboundedReceiver<DecodeEvent>,
    publisher: Weak<EventPublisher>,
    subscriptions: [Subscription; 2],
}

impl DecodeEvents {
    /// Waits for the next event. Returns `None` once the decoder is gone.
    pub async fn recv(&mut self) -> Option<DecodeEvent> {
        self.receiver.recv().await
    }

    /// Returns an already delivered event without waiting
    pub fn try_recv(&mut self) -> Option<DecodeEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for DecodeEvents {
    fn drop(&mut self) {
        if let Some(publisher) = self.publisher.upgrade() {
            for subscription in self.subscriptions {
                publisher.unsubscribe(subscription);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::testing::ScriptedEngine;
    use crate::decode::DecodeOutcome;
    use crate::error::DecoderError;

    #[test]
    fn test_invalid_range_never_reaches_engine() {
        let engine = ScriptedEngine::new();
        let decoder = Decoder::with_engine(engine.clone()).unwrap();

        let err = decoder.decode_frames(vec![0u8; 12], 10, 5).unwrap_err();
        assert!(matches!(err, DecoderError::InvalidRange { .. }));
        let err = decoder.decode_frames_from_slice(&[0u8; 12], 10, 5).unwrap_err();
        assert!(matches!(err, DecoderError::InvalidRange { .. }));

        assert_eq!(engine.submit_count(), 0);
        assert_eq!(decoder.phase(), SchedulerPhase::Idle);
    }

    #[test]
    fn test_release_twice() {
        let engine = ScriptedEngine::new();
        let decoder = Decoder::with_engine(engine.clone()).unwrap();
        decoder.release();
        decoder.release();
        drop(decoder);
        assert_eq!(engine.release_count(), 1);
    }

    #[test]
    fn test_events_unsubscribe_on_drop() {
        let engine = ScriptedEngine::new();
        let decoder = Decoder::with_engine(engine.clone()).unwrap();

        let mut events = decoder.events();
        decoder.decode_frames(vec![1u8, 2, 3], 0, 3).unwrap();
        engine.complete(DecodeOutcome::error("broken"));
        assert_eq!(
            events.try_recv(),
            Some(DecodeEvent::Error(DecodeFailure::new("broken")))
        );
        assert_eq!(events.try_recv(), None);

        assert_eq!(decoder.scheduler.publisher().subscriber_count(), 2);
        drop(events);
        assert_eq!(decoder.scheduler.publisher().subscriber_count(), 0);
    }
}
