use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::bus::{DIALOG, DIALOG_CLOSE, DIALOG_OPEN, EventBus, Subscription};

/// Counts open dialogs from `DIALOG.OPEN` / `DIALOG.CLOSE`.
///
/// Shells use it to suspend global gestures (pull to refresh, shortcuts)
/// while any dialog is up.
#[derive(Debug)]
pub struct DialogTracker {
    open: Arc<AtomicUsize>,
    _subscription: Subscription,
}

impl DialogTracker {
    pub fn attach(bus: &EventBus) -> Self {
        let open = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&open);
        let subscription = bus.subscribe(DIALOG, move |event| match event.topic.as_str() {
            DIALOG_OPEN => {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            DIALOG_CLOSE => {
                let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    Some(n.saturating_sub(1))
                });
            }
            _ => {}
        });
        Self {
            open,
            _subscription: subscription,
        }
    }

    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn any_open(&self) -> bool {
        self.open_count() > 0
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::bus::Payload;

    #[test]
    fn counts_and_never_underflows() {
        let bus = EventBus::new();
        let tracker = DialogTracker::attach(&bus);
        bus.publish_sync(DIALOG_OPEN, Payload::Empty);
        bus.publish_sync(DIALOG_OPEN, Payload::Empty);
        assert_eq!(tracker.open_count(), 2);
        bus.publish_sync(DIALOG_CLOSE, Payload::Empty);
        bus.publish_sync(DIALOG_CLOSE, Payload::Empty);
        bus.publish_sync(DIALOG_CLOSE, Payload::Empty);
        assert_eq!(tracker.open_count(), 0);
        assert!(!tracker.any_open());
    }

    #[test]
    fn detaches_on_drop() {
        let bus = EventBus::new();
        let tracker = DialogTracker::attach(&bus);
        assert_eq!(bus.subscriber_count(), 1);
        drop(tracker);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
