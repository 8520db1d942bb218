use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

use super::engine::{CompletionSink, DecodeEngine};
use super::outcome::DecodeOutcome;
use super::publisher::EventPublisher;
use super::task::DecodeTask;
use crate::error::{DecoderError, Result};

/// Externally visible scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Nothing in flight, nothing pending
    Idle,
    /// A task is in flight or its outcome is being published
    Busy,
    /// Shut down or faulted; terminal
    Closed,
}

/// Counters kept by the scheduler over its lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Tasks handed to the engine
    pub submitted: u64,
    /// Completions matched to an in-flight task
    pub completed: u64,
    /// Completions that produced a frame
    pub frames: u64,
    /// Completions that reported a decode error
    pub errors: u64,
    /// Completions that produced no frame
    pub empty: u64,
    /// Pending tasks dropped by shutdown or a fault
    pub discarded: u64,
    /// Completions ignored because they arrived after shutdown
    pub late_completions: u64,
}

struct SchedulerState {
    pending: VecDeque<DecodeTask>,
    in_flight: Option<DecodeTask>,
    // set between clearing `in_flight` and dispatching the next task
    publishing: bool,
    closed: bool,
    faulted: bool,
    stats: SchedulerStats,
}

impl SchedulerState {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: None,
            publishing: false,
            closed: false,
            faulted: false,
            stats: SchedulerStats::default(),
        }
    }

    fn phase(&self) -> SchedulerPhase {
        if self.closed {
            SchedulerPhase::Closed
        } else if self.in_flight.is_some() || self.publishing {
            SchedulerPhase::Busy
        } else {
            SchedulerPhase::Idle
        }
    }

    /// Moves the head of `pending` into the in-flight slot
    fn promote_next(&mut self) -> Option<DecodeTask> {
        let task = self.pending.pop_front()?;
        self.in_flight = Some(task.clone());
        Some(task)
    }

    fn discard_pending(&mut self) -> usize {
        let discarded = self.pending.len();
        self.pending.clear();
        self.stats.discarded += discarded as u64;
        discarded
    }
}

struct Shared {
    state: Mutex<SchedulerState>,
    engine: RwLock<Option<Box<dyn DecodeEngine>>>,
    publisher: Arc<EventPublisher>,
    idle: watch::Sender<bool>,
}

impl Shared {
    // Called with the state lock held so waiters never observe a stale phase
    fn sync_idle(&self, state: &SchedulerState) {
        self.idle.send_replace(state.phase() != SchedulerPhase::Busy);
    }

    fn enqueue(&self, task: DecodeTask) -> Result<()> {
        let dispatch = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(DecoderError::SchedulerClosed);
            }
            state.pending.push_back(task);
            let next = match state.phase() {
                SchedulerPhase::Idle => state.promote_next(),
                _ => None,
            };
            self.sync_idle(&state);
            next
        };

        if let Some(task) = dispatch {
            self.dispatch(task);
        }
        Ok(())
    }

    fn dispatch(&self, task: DecodeTask) {
        // recursive read: a release request queued behind us must not block
        // a submission issued from inside a completion
        let engine = self.engine.read_recursive();
        match engine.as_ref() {
            Some(engine) => {
                log::debug!("submitting {} bytes to decode engine", task.length());
                self.state.lock().stats.submitted += 1;
                engine.submit(&task);
            }
            None => log::debug!(
                "decode engine released, dropping task of {} bytes",
                task.length()
            ),
        }
    }

    fn on_engine_completion(&self, outcome: DecodeOutcome) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.closed {
                state.stats.late_completions += 1;
                log::warn!("ignoring decode engine completion after shutdown");
                return Ok(());
            }

            if state.in_flight.take().is_none() {
                state.faulted = true;
                state.closed = true;
                let discarded = state.discard_pending();
                self.sync_idle(&state);
                log::error!(
                    "decode engine completed with nothing in flight, stopping scheduler ({} pending tasks dropped)",
                    discarded
                );
                return Err(DecoderError::EngineProtocolViolation(
                    "completion received with no task in flight".into(),
                ));
            }

            state.publishing = true;
            state.stats.completed += 1;
            match &outcome {
                DecodeOutcome::Frame(_) => state.stats.frames += 1,
                DecodeOutcome::Error(_) => state.stats.errors += 1,
                DecodeOutcome::NoFrame => state.stats.empty += 1,
            }
        }

        if let DecodeOutcome::Error(err) = &outcome {
            log::debug!("decode engine reported an error: {}", err);
        }
        self.publisher.publish(&outcome);

        let next = {
            let mut state = self.state.lock();
            state.publishing = false;
            let next = if state.closed {
                None
            } else {
                state.promote_next()
            };
            self.sync_idle(&state);
            next
        };

        if let Some(task) = next {
            self.dispatch(task);
        }
        Ok(())
    }

    fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            if !state.closed {
                state.closed = true;
                let discarded = state.discard_pending();
                if discarded > 0 {
                    log::info!("decoder shutdown discarded {} pending tasks", discarded);
                }
            }
            self.sync_idle(&state);
        }

        let engine = self.engine.write().take();
        if let Some(mut engine) = engine {
            engine.release();
            log::debug!("decode engine released");
        }
    }
}

/// Serializes decode tasks onto a single-flight engine.
///
/// Tasks go to the engine in exactly the order they were enqueued, one at a
/// time: the next task is submitted only once the previous completion has been
/// published to every observer. Engine calls and observer callbacks run with
/// no scheduler lock held, so observers may enqueue more work or shut the
/// scheduler down from inside a callback.
///
/// There is no timeout: an engine that never completes leaves the scheduler
/// busy forever.
pub struct DecodeScheduler {
    shared: Arc<Shared>,
}

impl DecodeScheduler {
    /// Takes ownership of `engine`, registers the completion callback and
    /// initializes it.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::EngineInitFailure`] if the engine's `init`
    /// returns false.
    pub fn new<E>(engine: E, publisher: Arc<EventPublisher>) -> Result<Self>
    where
        E: DecodeEngine + 'static,
    {
        let mut engine: Box<dyn DecodeEngine> = Box::new(engine);
        let (idle, _) = watch::channel(true);

        let shared = Arc::new_cyclic(|weak: &Weak<Shared>| {
            let weak = weak.clone();
            engine.set_completion(CompletionSink::new(move |outcome| {
                let Some(shared) = weak.upgrade() else {
                    log::debug!("decode completion arrived after the scheduler was dropped");
                    return;
                };
                if let Err(e) = shared.on_engine_completion(outcome) {
                    log::error!("{}", e);
                }
            }));

            Shared {
                state: Mutex::new(SchedulerState::new()),
                engine: RwLock::new(None),
                publisher,
                idle,
            }
        });

        if !engine.init() {
            log::error!("failed to initialize the decode engine");
            engine.release();
            return Err(DecoderError::EngineInitFailure);
        }
        *shared.engine.write() = Some(engine);

        Ok(Self { shared })
    }

    /// Queues `task` and submits it right away if the engine is idle.
    ///
    /// Never waits for decode work.
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::SchedulerClosed`] after [`shutdown`](Self::shutdown)
    /// or a protocol fault.
    pub fn enqueue(&self, task: DecodeTask) -> Result<()> {
        self.shared.enqueue(task)
    }

    /// Completion entry point, normally reached through the engine's
    /// [`CompletionSink`].
    ///
    /// # Errors
    ///
    /// Returns [`DecoderError::EngineProtocolViolation`] when nothing is in
    /// flight. The scheduler closes itself in that case.
    pub fn on_engine_completion(&self, outcome: DecodeOutcome) -> Result<()> {
        self.shared.on_engine_completion(outcome)
    }

    /// Drops pending tasks, releases the engine once and closes the
    /// scheduler. An in-flight task is left to the engine's release
    /// semantics.
    pub fn shutdown(&self) {
        self.shared.shutdown()
    }

    /// Current phase, see [`SchedulerPhase`]
    pub fn phase(&self) -> SchedulerPhase {
        self.shared.state.lock().phase()
    }

    /// True once a protocol violation closed the scheduler
    pub fn is_faulted(&self) -> bool {
        self.shared.state.lock().faulted
    }

    /// Tasks waiting behind the in-flight one
    pub fn pending_len(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Snapshot of the lifetime counters
    pub fn stats(&self) -> SchedulerStats {
        self.shared.state.lock().stats.clone()
    }

    /// Publisher that completions are delivered through
    pub fn publisher(&self) -> &Arc<EventPublisher> {
        &self.shared.publisher
    }

    /// Watch that reads `true` whenever the scheduler is not busy
    pub fn subscribe_idle(&self) -> watch::Receiver<bool> {
        self.shared.idle.subscribe()
    }
}

impl Drop for DecodeScheduler {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::outcome::DecodedFrame;
    use crate::decode::testing::ScriptedEngine;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;

    fn task(bytes: &'static [u8]) -> DecodeTask {
        DecodeTask::whole(Bytes::from_static(bytes))
    }

    fn scheduler(engine: &ScriptedEngine) -> DecodeScheduler {
        DecodeScheduler::new(engine.clone(), Arc::new(EventPublisher::new())).unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let engine = ScriptedEngine::new();
        let scheduler = scheduler(&engine);
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);

        scheduler.enqueue(task(b"a")).unwrap();
        assert_eq!(scheduler.phase(), SchedulerPhase::Busy);
        scheduler.enqueue(task(b"b")).unwrap();
        assert_eq!(scheduler.pending_len(), 1);

        engine.complete(DecodeOutcome::NoFrame);
        assert_eq!(scheduler.phase(), SchedulerPhase::Busy);
        assert_eq!(scheduler.pending_len(), 0);

        engine.complete(DecodeOutcome::NoFrame);
        assert_eq!(scheduler.phase(), SchedulerPhase::Idle);

        scheduler.enqueue(task(b"c")).unwrap();
        assert_eq!(scheduler.phase(), SchedulerPhase::Busy);

        scheduler.shutdown();
        assert_eq!(scheduler.phase(), SchedulerPhase::Closed);
    }

    #[test]
    fn test_single_flight_fifo() {
        let engine = ScriptedEngine::new();
        let scheduler = scheduler(&engine);

        let units: [&[u8]; 3] = [b"one", b"two", b"three"];
        for unit in units {
            scheduler.enqueue(DecodeTask::whole(Bytes::copy_from_slice(unit))).unwrap();
        }
        assert_eq!(engine.submit_count(), 1);

        while engine.outstanding() > 0 {
            engine.complete(DecodeOutcome::NoFrame);
        }

        assert_eq!(
            engine.submissions(),
            vec![
                Bytes::from_static(b"one"),
                Bytes::from_static(b"two"),
                Bytes::from_static(b"three"),
            ]
        );
        assert_eq!(engine.max_outstanding(), 1);
        assert_eq!(scheduler.stats().submitted, 3);
        assert_eq!(scheduler.stats().completed, 3);
    }

    #[test]
    fn test_init_failure() {
        let engine = ScriptedEngine::failing_init();
        let result = DecodeScheduler::new(engine.clone(), Arc::new(EventPublisher::new()));
        assert!(matches!(result, Err(DecoderError::EngineInitFailure)));
        assert_eq!(engine.init_calls(), 1);
        assert_eq!(engine.submit_count(), 0);
        assert_eq!(engine.release_count(), 1);
    }

    #[test]
    fn test_shutdown_before_dispatch_is_not_counted() {
        let engine = ScriptedEngine::new();
        let scheduler = scheduler(&engine);

        // reserve a task the way enqueue does, then lose the engine before dispatch
        let reserved = {
            let mut state = scheduler.shared.state.lock();
            state.pending.push_back(task(b"a"));
            state.promote_next()
        };
        scheduler.shutdown();
        if let Some(task) = reserved {
            scheduler.shared.dispatch(task);
        }

        assert_eq!(engine.submit_count(), 0);
        assert_eq!(scheduler.stats().submitted, 0);
    }

    #[test]
    fn test_completion_without_in_flight_faults() {
        let engine = ScriptedEngine::new();
        let scheduler = scheduler(&engine);

        let err = scheduler.on_engine_completion(DecodeOutcome::NoFrame).unwrap_err();
        assert!(matches!(err, DecoderError::EngineProtocolViolation(_)));
        assert!(scheduler.is_faulted());
        assert_eq!(scheduler.phase(), SchedulerPhase::Closed);
        assert!(matches!(
            scheduler.enqueue(task(b"x")),
            Err(DecoderError::SchedulerClosed)
        ));

        // the engine is still released exactly once
        scheduler.shutdown();
        assert_eq!(engine.release_count(), 1);
    }

    #[test]
    fn test_completion_after_shutdown_is_ignored() {
        let engine = ScriptedEngine::new();
        let scheduler = scheduler(&engine);
        let frames = Arc::new(Mutex::new(0));
        let f = frames.clone();
        scheduler.publisher().subscribe_frames(move |_| *f.lock() += 1);

        scheduler.enqueue(task(b"a")).unwrap();
        scheduler.enqueue(task(b"b")).unwrap();
        scheduler.shutdown();

        engine.complete(DecodeOutcome::Frame(DecodedFrame::new(vec![0u8], 2, 2)));
        assert_eq!(*frames.lock(), 0);
        assert_eq!(engine.submit_count(), 1);

        let stats = scheduler.stats();
        assert_eq!(stats.late_completions, 1);
        assert_eq!(stats.discarded, 1);
        assert!(!scheduler.is_faulted());
    }

    #[test]
    fn test_drop_releases_engine() {
        let engine = ScriptedEngine::new();
        {
            let scheduler = scheduler(&engine);
            scheduler.enqueue(task(b"a")).unwrap();
        }
        assert_eq!(engine.release_count(), 1);

        // the completion of the abandoned task finds no scheduler
        engine.complete(DecodeOutcome::NoFrame);
    }

    #[test]
    fn test_idle_watch() {
        let engine = ScriptedEngine::new();
        let scheduler = scheduler(&engine);
        let idle = scheduler.subscribe_idle();
        assert!(*idle.borrow());

        scheduler.enqueue(task(b"a")).unwrap();
        assert!(!*idle.borrow());

        engine.complete(DecodeOutcome::NoFrame);
        assert!(*idle.borrow());
    }
}
