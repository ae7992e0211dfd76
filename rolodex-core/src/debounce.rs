//! Search box debouncing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Quiet period used by the console's search boxes.
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Receives settled search values.
pub type SearchSink = Arc<dyn Fn(String) + Send + Sync>;

/// Coalesces keystrokes into one search per quiet period.
///
/// Non-empty input (re)starts a timer and is forwarded once the timer runs
/// out without further input. Empty input cancels any pending timer and is
/// forwarded at once. A superseded value is never forwarded.
///
/// Must be used inside a tokio runtime. Dropping the debouncer cancels the
/// pending timer.
pub struct QueryDebouncer {
    delay: Duration,
    sink: SearchSink,
    latest: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl QueryDebouncer {
    pub fn new(delay: Duration, sink: SearchSink) -> Self {
        Self {
            delay,
            sink,
            latest: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Feed the current content of the search box.
    pub fn on_input(&mut self, raw_value: &str) {
        self.cancel();
        let generation = self.latest.load(Ordering::SeqCst);

        if raw_value.is_empty() {
            (self.sink)(String::new());
            return;
        }

        let value = raw_value.to_string();
        let delay = self.delay;
        let sink = Arc::clone(&self.sink);
        let latest = Arc::clone(&self.latest);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::SeqCst) == generation {
                sink(value);
            }
        }));
    }

    /// Drop the pending value, if any, without forwarding it.
    pub fn cancel(&mut self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a value is waiting for its quiet period to end.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for QueryDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for QueryDebouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryDebouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}
