//! In-process engine for exercising the scheduler without a native decoder.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

use super::engine::{CompletionSink, DecodeEngine};
use super::outcome::DecodeOutcome;
use super::task::DecodeTask;

#[derive(Debug, Default)]
struct ScriptedState {
    sink: Option<CompletionSink>,
    submissions: Vec<Bytes>,
    outstanding: usize,
    max_outstanding: usize,
    init_calls: usize,
    releases: usize,
}

/// Engine whose completions are driven by hand.
///
/// Clones share state: hand one clone to the scheduler and keep another to
/// inspect submissions and call [`complete`](Self::complete). Completions run
/// on the calling thread, after `submit` has returned, as the engine contract
/// requires.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    state: Arc<Mutex<ScriptedState>>,
    init_result: bool,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedEngine {
    /// An engine whose `init` succeeds
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState::default())),
            init_result: true,
        }
    }

    /// An engine whose `init` reports failure
    pub fn failing_init() -> Self {
        Self {
            init_result: false,
            ..Self::new()
        }
    }

    /// Regions received by `submit`, in order
    pub fn submissions(&self) -> Vec<Bytes> {
        self.state.lock().submissions.clone()
    }

    /// Number of `submit` calls so far
    pub fn submit_count(&self) -> usize {
        self.state.lock().submissions.len()
    }

    /// Submissions not completed yet
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// Highest number of submissions ever outstanding at once
    pub fn max_outstanding(&self) -> usize {
        self.state.lock().max_outstanding
    }

    /// Number of `init` calls so far
    pub fn init_calls(&self) -> usize {
        self.state.lock().init_calls
    }

    /// Number of `release` calls so far
    pub fn release_count(&self) -> usize {
        self.state.lock().releases
    }

    /// Fires the completion callback with `outcome`.
    ///
    /// The callback fires even when nothing is outstanding or after release,
    /// so tests can play a misbehaving engine. Returns false if no callback
    /// was registered.
    pub fn complete(&self, outcome: DecodeOutcome) -> bool {
        let sink = {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            state.sink.clone()
        };
        match sink {
            Some(sink) => {
                sink.complete(outcome);
                true
            }
            None => false,
        }
    }
}

impl DecodeEngine for ScriptedEngine {
    fn set_completion(&mut self, sink: CompletionSink) {
        self.state.lock().sink = Some(sink);
    }

    fn init(&mut self) -> bool {
        self.state.lock().init_calls += 1;
        self.init_result
    }

    fn submit(&self, task: &DecodeTask) {
        let mut state = self.state.lock();
        state.submissions.push(task.region_bytes());
        state.outstanding += 1;
        state.max_outstanding = state.max_outstanding.max(state.outstanding);
    }

    fn release(&mut self) {
        self.state.lock().releases += 1;
    }
}
