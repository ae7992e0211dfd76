//! In-memory publish/subscribe channel shared by every screen.
//!
//! One [`EventBus`] is created at start-up and cloned into whoever needs it.
//! Topics are dot-separated (`CONTACTS.REFRESH`) and subscriptions match by
//! segment prefix, so subscribing to `CONTACTS` also receives
//! `CONTACTS.REFRESH`.
//!
//! # Delivery
//!
//! - [`EventBus::publish_sync`] delivers to every matching handler before it
//!   returns, in subscription order. Handlers may publish again (nested
//!   delivery happens inline) or unsubscribe.
//! - [`EventBus::publish`] queues the event. The queue is drained by the
//!   dispatcher task ([`EventBus::spawn_dispatcher`]) or by
//!   [`EventBus::dispatch_pending`].
//!
//! A handler's subscription is re-checked right before each delivery, so an
//! unsubscribe takes effect for everything not yet delivered, queued events
//! included. Handlers run without any bus lock held.

mod topic;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::Notify;
use tokio::task::JoinHandle;

pub use topic::{
    AUTH, AUTH_LOGIN, AUTH_LOGOUT, COMPANIES, COMPANIES_REFRESH, CONTACTS, CONTACTS_REFRESH,
    DIALOG, DIALOG_CLOSE, DIALOG_OPEN, Event, Payload, TOAST_SHOW, Toast, topic_matches,
};

/// Event handler.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Identifier returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// What [`EventBus::unsubscribe`] removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsubscribe {
    /// A single subscription.
    Id(SubscriptionId),
    /// Every subscription on this topic or below it.
    Topic(String),
}

impl From<SubscriptionId> for Unsubscribe {
    fn from(value: SubscriptionId) -> Self {
        Self::Id(value)
    }
}

impl From<&str> for Unsubscribe {
    fn from(value: &str) -> Self {
        Self::Topic(value.to_string())
    }
}

struct Entry {
    id: SubscriptionId,
    prefix: String,
    handler: Handler,
}

#[derive(Default)]
struct Inner {
    subscribers: Mutex<Vec<Entry>>,
    queue: Mutex<VecDeque<Event>>,
    next_id: AtomicU64,
    notify: Notify,
    closed: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn remove(&self, target: &Unsubscribe) -> usize {
        let mut subscribers = lock(&self.subscribers);
        let before = subscribers.len();
        subscribers.retain(|entry| match target {
            Unsubscribe::Id(id) => entry.id != *id,
            Unsubscribe::Topic(topic) => !topic_matches(topic, &entry.prefix),
        });
        before - subscribers.len()
    }
}

/// Scoped subscription handle. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    id: SubscriptionId,
    bus: Weak<Inner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Keep the subscription alive for the bus lifetime and return its id.
    pub fn detach(mut self) -> SubscriptionId {
        self.bus = Weak::new();
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.remove(&Unsubscribe::Id(self.id));
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Process-wide event bus. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("pending", &self.pending_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `prefix` and everything below it.
    pub fn subscribe<F>(&self, prefix: &str, handler: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.subscribers).push(Entry {
            id,
            prefix: prefix.to_string(),
            handler: Arc::new(handler),
        });
        log::debug!("Subscribed {id:?} to {prefix}");
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Remove a subscription, or every subscription at or below a topic.
    ///
    /// Returns how many subscriptions were removed.
    pub fn unsubscribe(&self, target: impl Into<Unsubscribe>) -> usize {
        let target = target.into();
        let removed = self.inner.remove(&target);
        log::debug!("Unsubscribed {target:?} ({removed} removed)");
        removed
    }

    /// Queue an event for the dispatcher. Returns `false` once shut down.
    pub fn publish(&self, topic: &str, payload: impl Into<Payload>) -> bool {
        if self.is_closed() {
            log::debug!("Bus closed, dropping {topic}");
            return false;
        }
        lock(&self.inner.queue).push_back(Event {
            topic: topic.to_string(),
            payload: payload.into(),
        });
        self.inner.notify.notify_one();
        true
    }

    /// Deliver an event to every matching handler before returning.
    ///
    /// Returns the number of handlers invoked.
    pub fn publish_sync(&self, topic: &str, payload: impl Into<Payload>) -> usize {
        if self.is_closed() {
            log::debug!("Bus closed, dropping {topic}");
            return 0;
        }
        self.deliver(&Event {
            topic: topic.to_string(),
            payload: payload.into(),
        })
    }

    /// Drain queued events in publish order. Returns how many were dispatched.
    pub fn dispatch_pending(&self) -> usize {
        let mut dispatched = 0;
        loop {
            // Pop one at a time so handlers can publish while we drain.
            let Some(event) = lock(&self.inner.queue).pop_front() else {
                break;
            };
            self.deliver(&event);
            dispatched += 1;
        }
        dispatched
    }

    /// Drain the queue whenever something is published, until shutdown.
    pub async fn run_dispatcher(self) {
        loop {
            self.dispatch_pending();
            if self.is_closed() {
                break;
            }
            self.inner.notify.notified().await;
        }
        log::debug!("Bus dispatcher stopped");
    }

    /// Run [`run_dispatcher`](Self::run_dispatcher) on the current runtime.
    pub fn spawn_dispatcher(&self) -> JoinHandle<()> {
        tokio::spawn(self.clone().run_dispatcher())
    }

    /// Drop every subscription and queued event; later publishes are ignored.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let dropped = {
            let mut queue = lock(&self.inner.queue);
            let n = queue.len();
            queue.clear();
            n
        };
        lock(&self.inner.subscribers).clear();
        self.inner.notify.notify_one();
        log::info!("Event bus shut down ({dropped} queued events dropped)");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.inner.queue).len()
    }

    fn deliver(&self, event: &Event) -> usize {
        let targets: Vec<SubscriptionId> = lock(&self.inner.subscribers)
            .iter()
            .filter(|entry| topic_matches(&entry.prefix, &event.topic))
            .map(|entry| entry.id)
            .collect();

        let mut delivered = 0;
        for id in targets {
            let handler = lock(&self.inner.subscribers)
                .iter()
                .find(|entry| entry.id == id)
                .map(|entry| Arc::clone(&entry.handler));
            // Unsubscribed by an earlier handler in this pass
            let Some(handler) = handler else {
                continue;
            };
            handler(event);
            delivered += 1;
        }
        log::trace!("{} delivered to {delivered} handler(s)", event.topic);
        delivered
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&Event) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |event: &Event| {
            lock(&sink).push(event.topic.clone());
        })
    }

    fn topics(seen: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        lock(seen).clone()
    }

    #[test]
    fn prefix_subscription_receives_children() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        let _sub = bus.subscribe(CONTACTS, handler);

        assert_eq!(bus.publish_sync(CONTACTS_REFRESH, Payload::Empty), 1);
        assert_eq!(bus.publish_sync(COMPANIES_REFRESH, Payload::Empty), 0);
        assert_eq!(topics(&seen), vec![CONTACTS_REFRESH]);
    }

    #[test]
    fn publish_is_queued_until_dispatched() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        let _sub = bus.subscribe(TOAST_SHOW, handler);

        assert!(bus.publish(TOAST_SHOW, Toast::new("Refreshed")));
        assert!(topics(&seen).is_empty());
        assert_eq!(bus.pending_count(), 1);

        assert_eq!(bus.dispatch_pending(), 1);
        assert_eq!(topics(&seen), vec![TOAST_SHOW]);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        let sub = bus.subscribe(COMPANIES, handler);
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish_sync(COMPANIES_REFRESH, Payload::Empty);
        assert!(topics(&seen).is_empty());
    }

    #[test]
    fn detached_subscription_survives_drop_of_id() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        let id = bus.subscribe(AUTH, handler).detach();
        bus.publish_sync(AUTH_LOGOUT, Payload::Empty);
        assert_eq!(topics(&seen).len(), 1);
        assert_eq!(bus.unsubscribe(id), 1);
        bus.publish_sync(AUTH_LOGOUT, Payload::Empty);
        assert_eq!(topics(&seen).len(), 1);
    }

    #[test]
    fn unsubscribe_topic_skips_queued_events_but_not_other_topics() {
        let bus = EventBus::new();
        let (contacts_seen, contacts) = recorder();
        let (companies_seen, companies) = recorder();
        let _a = bus.subscribe(CONTACTS, contacts);
        let _b = bus.subscribe(COMPANIES, companies);

        bus.publish(CONTACTS_REFRESH, Payload::Empty);
        bus.publish(COMPANIES_REFRESH, Payload::Empty);
        assert_eq!(bus.unsubscribe(CONTACTS), 1);

        assert_eq!(bus.dispatch_pending(), 2);
        assert!(topics(&contacts_seen).is_empty());
        assert_eq!(topics(&companies_seen), vec![COMPANIES_REFRESH]);
    }

    #[test]
    fn handler_unsubscribing_itself_gets_no_further_queued_events() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicU64::new(0));
        let own_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let handler_bus = bus.clone();
        let handler_count = Arc::clone(&count);
        let handler_id = Arc::clone(&own_id);
        let sub = bus.subscribe(CONTACTS, move |_| {
            handler_count.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *lock(&handler_id) {
                handler_bus.unsubscribe(id);
            }
        });
        *lock(&own_id) = Some(sub.detach());

        bus.publish(CONTACTS_REFRESH, Payload::Empty);
        bus.publish(CONTACTS_REFRESH, Payload::Empty);
        bus.dispatch_pending();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_removed_mid_pass_is_skipped() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        let victim = Arc::new(Mutex::new(None::<Subscription>));

        let killer_victim = Arc::clone(&victim);
        let _killer = bus.subscribe(CONTACTS, move |_| {
            lock(&killer_victim).take();
        });
        *lock(&victim) = Some(bus.subscribe(CONTACTS, handler));

        assert_eq!(bus.publish_sync(CONTACTS_REFRESH, Payload::Empty), 1);
        assert!(topics(&seen).is_empty());
    }

    #[test]
    fn nested_sync_publish_is_delivered_inline() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        let _log = bus.subscribe("", handler);

        let inner_bus = bus.clone();
        let _relay = bus.subscribe(CONTACTS_REFRESH, move |_| {
            inner_bus.publish_sync(TOAST_SHOW, Toast::new("Refreshed"));
        });

        bus.publish_sync(CONTACTS_REFRESH, Payload::Empty);
        assert_eq!(topics(&seen), vec![CONTACTS_REFRESH, TOAST_SHOW]);
    }

    #[test]
    fn shutdown_drops_everything() {
        let bus = EventBus::new();
        let (seen, handler) = recorder();
        let sub = bus.subscribe(CONTACTS, handler);
        bus.publish(CONTACTS_REFRESH, Payload::Empty);

        bus.shutdown();
        assert!(bus.is_closed());
        assert_eq!(bus.pending_count(), 0);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(!bus.publish(CONTACTS_REFRESH, Payload::Empty));
        assert_eq!(bus.publish_sync(CONTACTS_REFRESH, Payload::Empty), 0);
        drop(sub);
        assert!(topics(&seen).is_empty());
    }

    #[tokio::test]
    async fn dispatcher_task_drains_queue() {
        let bus = EventBus::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _sub = bus.subscribe(TOAST_SHOW, move |event| {
            let _ = tx.send(event.payload.clone());
        });
        let dispatcher = bus.spawn_dispatcher();

        bus.publish(TOAST_SHOW, Toast::new("Contact Added").auto_hide());
        let payload = rx.recv().await;
        assert_eq!(
            payload,
            Some(Payload::Toast(Toast::new("Contact Added").auto_hide()))
        );

        bus.shutdown();
        assert!(dispatcher.await.is_ok());
    }
}
