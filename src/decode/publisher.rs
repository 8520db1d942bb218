use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::outcome::{DecodeOutcome, DecodedFrame};
use crate::error::DecodeFailure;

/// Callback invoked for every decoded frame
pub type FrameObserver = Arc<dyn Fn(&DecodedFrame) + Send + Sync>;
/// Callback invoked for every per-task decode failure
pub type ErrorObserver = Arc<dyn Fn(&DecodeFailure) + Send + Sync>;

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

#[derive(Clone)]
enum Observer {
    Frame(FrameObserver),
    Error(ErrorObserver),
}

/// Fans decode outcomes out to registered observers.
///
/// Delivery is synchronous, in subscription order, on the thread that
/// publishes. The registration list is snapshotted before delivery, so an
/// observer may subscribe, unsubscribe or feed the decoder again from inside
/// its callback. Subscriptions added during a delivery see the next outcome,
/// not the current one.
#[derive(Default)]
pub struct EventPublisher {
    observers: RwLock<Vec<(Subscription, Observer)>>,
    next_id: AtomicU64,
}

impl EventPublisher {
    /// A publisher with no observers
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame observer
    pub fn subscribe_frames<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&DecodedFrame) + Send + Sync + 'static,
    {
        self.register(Observer::Frame(Arc::new(observer)))
    }

    /// Appends an error observer
    pub fn subscribe_errors<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&DecodeFailure) + Send + Sync + 'static,
    {
        self.register(Observer::Error(Arc::new(observer)))
    }

    fn register(&self, observer: Observer) -> Subscription {
        let handle = Subscription(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((handle, observer));
        handle
    }

    /// Removes a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, handle: Subscription) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(id, _)| *id != handle);
        observers.len() != before
    }

    /// Frame and error observers combined
    pub fn subscriber_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Delivers `outcome` to the matching observers. `NoFrame` is dropped.
    pub fn publish(&self, outcome: &DecodeOutcome) {
        if matches!(outcome, DecodeOutcome::NoFrame) {
            return;
        }

        let snapshot: Vec<Observer> = self
            .observers
            .read()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        for observer in snapshot {
            match (outcome, observer) {
                (DecodeOutcome::Frame(frame), Observer::Frame(f)) => f(frame),
                (DecodeOutcome::Error(err), Observer::Error(f)) => f(err),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    fn frame(width: u32) -> DecodeOutcome {
        DecodeOutcome::Frame(DecodedFrame::new(vec![0u8; 4], width, 1))
    }

    #[test]
    fn test_delivery_order_and_channels() {
        let publisher = EventPublisher::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let l = log.clone();
        publisher.subscribe_frames(move |f| l.lock().push(format!("a:frame:{}", f.width)));
        let l = log.clone();
        publisher.subscribe_errors(move |e| l.lock().push(format!("b:error:{}", e)));
        let l = log.clone();
        publisher.subscribe_frames(move |f| l.lock().push(format!("c:frame:{}", f.width)));

        publisher.publish(&frame(640));
        publisher.publish(&DecodeOutcome::error("bad slice"));
        publisher.publish(&DecodeOutcome::NoFrame);

        assert_eq!(
            *log.lock(),
            vec![
                "a:frame:640".to_string(),
                "c:frame:640".to_string(),
                "b:error:bad slice".to_string(),
            ]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let publisher = EventPublisher::new();
        let count = Arc::new(AtomicU64::new(0));

        let c = count.clone();
        let handle = publisher.subscribe_frames(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        publisher.publish(&frame(1));
        assert!(publisher.unsubscribe(handle));
        assert!(!publisher.unsubscribe(handle));
        publisher.publish(&frame(2));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let publisher = EventPublisher::new();
        publisher.publish(&frame(1));

        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        publisher.subscribe_frames(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_observer_can_subscribe_during_delivery() {
        let publisher = Arc::new(EventPublisher::new());
        let p = publisher.clone();
        publisher.subscribe_frames(move |_| {
            p.subscribe_frames(|_| {});
        });

        publisher.publish(&frame(1));
        assert_eq!(publisher.subscriber_count(), 2);
    }
}
