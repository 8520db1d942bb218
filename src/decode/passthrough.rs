use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

use super::engine::{CompletionSink, DecodeEngine};
use super::outcome::{DecodeOutcome, DecodedFrame};
use super::task::DecodeTask;
use crate::codec::h264::{NalUnit, NalUnitIter};
use crate::config::Config;

/// Stand-in engine that runs on its own worker thread and returns the coded
/// access unit itself as the frame payload.
///
/// Lets a pipeline be wired up and exercised end to end without a native
/// decoder: regions holding a coded slice yield one frame with the configured
/// dimensions, parameter sets and other non-VCL units yield no frame, and
/// regions with no parsable NAL unit yield an error.
pub struct PassthroughEngine {
    width: u32,
    height: u32,
    worker_name: String,
    sink: Option<CompletionSink>,
    sender: Option<mpsc::UnboundedSender<DecodeTask>>,
    worker: Option<JoinHandle<()>>,
    released: Arc<AtomicBool>,
}

impl PassthroughEngine {
    /// Engine reporting frames of `width` x `height`, worker named after the
    /// default config
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            worker_name: Config::default().worker_name,
            sink: None,
            sender: None,
            worker: None,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Engine using the dimensions and worker name from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.frame_width, config.frame_height).with_worker_name(&config.worker_name)
    }

    /// Overrides the worker thread name
    pub fn with_worker_name(mut self, name: &str) -> Self {
        self.worker_name = name.to_string();
        self
    }

    /// Classifies one region the way the worker does
    pub fn decode_region(region: Bytes, width: u32, height: u32) -> DecodeOutcome {
        let mut units = 0;
        let mut picture = false;

        for payload in NalUnitIter::new(region.clone()) {
            match NalUnit::parse(payload) {
                Some(nal) => {
                    units += 1;
                    picture |= nal.is_vcl();
                }
                None => return DecodeOutcome::error("Failed to decode frame: corrupt NAL unit header"),
            }
        }

        if units == 0 {
            DecodeOutcome::error("Failed to decode frame: no NAL unit in input")
        } else if picture {
            DecodeOutcome::Frame(DecodedFrame::new(region, width, height))
        } else {
            DecodeOutcome::NoFrame
        }
    }
}

impl DecodeEngine for PassthroughEngine {
    fn set_completion(&mut self, sink: CompletionSink) {
        self.sink = Some(sink);
    }

    fn init(&mut self) -> bool {
        if self.sender.is_some() {
            return true;
        }
        if self.released.load(Ordering::Acquire) {
            log::error!("passthrough engine cannot be initialized after release");
            return false;
        }
        let Some(sink) = self.sink.clone() else {
            log::error!("passthrough engine initialized without a completion callback");
            return false;
        };

        let (sender, mut receiver) = mpsc::unbounded_channel::<DecodeTask>();
        let released = self.released.clone();
        let (width, height) = (self.width, self.height);

        let worker = thread::Builder::new()
            .name(self.worker_name.clone())
            .spawn(move || {
                while let Some(task) = receiver.blocking_recv() {
                    let outcome = Self::decode_region(task.region_bytes(), width, height);
                    if released.load(Ordering::Acquire) {
                        log::debug!("dropping decode outcome produced after release");
                        continue;
                    }
                    sink.complete(outcome);
                }
            });

        match worker {
            Ok(worker) => {
                self.sender = Some(sender);
                self.worker = Some(worker);
                true
            }
            Err(e) => {
                log::error!("failed to spawn decode worker: {}", e);
                false
            }
        }
    }

    fn submit(&self, task: &DecodeTask) {
        match &self.sender {
            Some(sender) => {
                if sender.send(task.clone()).is_err() {
                    log::warn!("decode worker has stopped, task of {} bytes lost", task.length());
                }
            }
            None => log::warn!("passthrough engine received a task before init"),
        }
    }

    fn release(&mut self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            // release may be requested from an observer running on the worker
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                log::error!("decode worker panicked");
            }
        }
    }
}

impl Drop for PassthroughEngine {
    fn drop(&mut self) {
        self.release();
    }
}
