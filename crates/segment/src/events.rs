//! Segment close notifications
//!
//! Segment lifecycle is owned outside this core: readers are opened,
//! reference counted and eventually closed by the hosting node. The engine
//! only needs to hear about closes so segment-scoped caches can drop their
//! entries. `SegmentEvents` is an explicitly owned hub, not a process
//! global; whoever owns the segments owns the hub.

use meridian_core::SegmentId;
use parking_lot::Mutex;
use tracing::debug;

type CloseListener = Box<dyn Fn(SegmentId) + Send + Sync>;

/// Close-notification hub for a set of segments
#[derive(Default)]
pub struct SegmentEvents {
    listeners: Mutex<Vec<CloseListener>>,
}

impl SegmentEvents {
    /// Create an empty hub
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener invoked on every segment close
    pub fn on_close(&self, listener: impl Fn(SegmentId) + Send + Sync + 'static) {
        self.listeners.lock().push(Box::new(listener));
    }

    /// Notify listeners that a segment has been closed
    ///
    /// Invoked once per segment by the lifecycle owner. Listeners run on
    /// the caller's thread; they must not re-enter the hub.
    pub fn notify_close(&self, segment: SegmentId) {
        debug!(%segment, "segment closed");
        let listeners = self.listeners.lock();
        for listener in listeners.iter() {
            listener(segment);
        }
    }
}

impl std::fmt::Debug for SegmentEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentEvents")
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_listeners_fire_per_close() {
        let events = SegmentEvents::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        events.on_close(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        events.notify_close(SegmentId::from_raw(1));
        events.notify_close(SegmentId::from_raw(2));
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_listener_sees_segment_id() {
        let events = SegmentEvents::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.on_close(move |id| sink.lock().push(id));
        events.notify_close(SegmentId::from_raw(7));
        assert_eq!(seen.lock().as_slice(), &[SegmentId::from_raw(7)]);
    }
}
