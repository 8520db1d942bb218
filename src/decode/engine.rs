use std::fmt;
use std::sync::Arc;

use super::outcome::DecodeOutcome;
use super::task::DecodeTask;

/// Callback an engine uses to report the outcome of a submission.
///
/// Cloneable and callable from any thread.
#[derive(Clone)]
pub struct CompletionSink {
    callback: Arc<dyn Fn(DecodeOutcome) + Send + Sync>,
}

impl CompletionSink {
    /// Wraps `callback`
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(DecodeOutcome) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Reports the outcome of the submission currently outstanding
    pub fn complete(&self, outcome: DecodeOutcome) {
        (self.callback)(outcome)
    }
}

impl fmt::Debug for CompletionSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSink").finish_non_exhaustive()
    }
}

/// Boundary to a native decoder that accepts one submission at a time and
/// reports back out of band.
///
/// Contract:
/// - `set_completion` is called once, before `init`.
/// - `init` returning false is fatal to the owner; it is never retried.
/// - every `submit` triggers exactly one later call of the completion sink,
///   never on the submitting thread before `submit` returns. The task keeps
///   its buffer alive; clone it to hold on to the data past `submit`.
/// - `submit` is never called again until the previous completion arrived.
/// - `release` is idempotent. Completions arriving after it are ignored.
pub trait DecodeEngine: Send + Sync {
    /// Registers the callback that receives every outcome
    fn set_completion(&mut self, sink: CompletionSink);

    /// One-time setup
    fn init(&mut self) -> bool;

    /// Starts decoding `task` asynchronously
    fn submit(&self, task: &DecodeTask);

    /// Tears the engine down
    fn release(&mut self);
}

impl<E: DecodeEngine + ?Sized> DecodeEngine for Box<E> {
    fn set_completion(&mut self, sink: CompletionSink) {
        (**self).set_completion(sink)
    }

    fn init(&mut self) -> bool {
        (**self).init()
    }

    fn submit(&self, task: &DecodeTask) {
        (**self).submit(task)
    }

    fn release(&mut self) {
        (**self).release()
    }
}
