#![forbid(unsafe_code)]

//! Thread-safe dispatcher: publish anywhere, deliver on the consumer thread.
//!
//! A [`Dispatcher`] wraps an [`EventRegistry`] in a mutex and turns every
//! publish into a [`Task`](crate::channel::Task) posted to the shared
//! [`MainChannel`]. Producers on radio or sensor threads therefore never run
//! handlers themselves; handlers only ever execute on whichever thread
//! drains the channel, and never concurrently with each other.
//!
//! # Design
//!
//! The registry lock is held only for bookkeeping. When a queued publish
//! finally runs, it takes the lock just long enough to snapshot the live
//! subscribers for the name, releases it, then invokes the snapshot. Two
//! consequences, both deliberate:
//!
//! - Handlers may freely call back into the dispatcher (subscribe,
//!   unsubscribe, publish, even for the name being delivered) without
//!   deadlocking.
//! - Membership is decided when delivery starts, not when `publish` was
//!   called: subscribers added after the publish but before the drain do
//!   receive the event, and a peer unsubscribed by an earlier handler in
//!   the same fan-out still receives it, because it is already in the
//!   snapshot. Unsubscribing yourself always works: the snapshot for any
//!   later fan-out is taken after the removal.
//!
//! # Invariants
//!
//! - Per name, delivery order equals subscription order.
//! - Publishes from one producer are delivered in the order published;
//!   publishes from different producers in channel arrival order.
//! - `publish` never blocks on handler execution.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::channel::MainChannel;
use crate::event::Event;
use crate::registry::{EventRegistry, Subscriber, SubscriberId};

struct Inner<E: 'static> {
    registry: Mutex<EventRegistry<E>>,
    channel: MainChannel,
}

impl<E: 'static> Inner<E> {
    // Handlers run with the lock released, so a panicking handler cannot
    // poison this mutex; reclaiming covers the remaining edge cases.
    fn registry(&self) -> MutexGuard<'_, EventRegistry<E>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable, thread-safe publish/subscribe endpoint for one event family.
///
/// Clones share the registry and the channel. An application typically owns
/// one dispatcher per family (remote traffic, input gestures, timer expiry)
/// all posting to the same [`MainChannel`].
pub struct Dispatcher<E: 'static> {
    inner: Arc<Inner<E>>,
}

impl<E: 'static> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Send + 'static> Dispatcher<E> {
    /// Create a dispatcher that defers delivery onto `channel`.
    #[must_use]
    pub fn new(channel: MainChannel) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(EventRegistry::new()),
                channel,
            }),
        }
    }

    /// The channel deliveries are posted to.
    #[must_use]
    pub fn channel(&self) -> &MainChannel {
        &self.inner.channel
    }

    /// Whether `other` is a clone of this dispatcher.
    ///
    /// Clones share one registry; two dispatchers that merely post to the
    /// same [`MainChannel`] are not the same dispatcher.
    #[must_use]
    pub fn same_dispatcher(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Register `subscriber` for `name`. Idempotent per (name, subscriber).
    pub fn subscribe<S>(&self, name: &str, subscriber: &Arc<S>)
    where
        S: Subscriber<E> + 'static,
    {
        self.inner.registry().subscribe(name, subscriber);
    }

    /// Remove the subscription of `id` under `name`, if any.
    ///
    /// Takes effect for every delivery whose snapshot has not been taken
    /// yet, including publishes already queued on the channel.
    pub fn unsubscribe(&self, name: &str, id: SubscriberId) {
        self.inner.registry().unsubscribe(name, id);
    }

    /// Remove every subscription of `id` across all names.
    pub fn unsubscribe_from_all(&self, id: SubscriberId) {
        self.inner.registry().unsubscribe_from_all(id);
    }

    /// Whether `id` is subscribed under `name` and still alive.
    #[must_use]
    pub fn is_subscribed(&self, name: &str, id: SubscriberId) -> bool {
        self.inner.registry().is_subscribed(name, id)
    }

    /// Number of live subscribers under `name`.
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.inner.registry().subscriber_count(name)
    }

    /// Queue `event` for delivery to the subscribers of `name`.
    ///
    /// Returns as soon as the task is on the channel. The snapshot of who
    /// receives the event is taken when the task runs, not now.
    pub fn publish(&self, name: &str, event: E) {
        tracing::trace!(name, "publish queued");
        let inner = Arc::clone(&self.inner);
        let name = name.to_owned();
        self.inner.channel.post(move || {
            let targets = inner.registry().snapshot(&name);
            tracing::trace!(name = name.as_str(), targets = targets.len(), "deliver");
            for target in targets {
                target.on_event(&event);
            }
        });
    }
}

impl<E: Event> Dispatcher<E> {
    /// Queue `event` under the name its kind declares.
    pub fn publish_event(&self, event: E) {
        self.publish(event.name(), event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::thread;

    fn drain(channel: &MainChannel) -> usize {
        let mut ran = 0;
        while let Some(task) = channel.try_pop() {
            task();
            ran += 1;
        }
        ran
    }

    struct Recorder {
        label: &'static str,
        log: Arc<StdMutex<Vec<(&'static str, u32)>>>,
    }

    impl Recorder {
        fn new(label: &'static str, log: &Arc<StdMutex<Vec<(&'static str, u32)>>>) -> Arc<Self> {
            Arc::new(Self {
                label,
                log: Arc::clone(log),
            })
        }
    }

    impl Subscriber<u32> for Recorder {
        fn on_event(&self, event: &u32) {
            self.log.lock().unwrap().push((self.label, *event));
        }
    }

    #[test]
    fn delivery_waits_for_the_drain() {
        let channel = MainChannel::new();
        let dispatcher = Dispatcher::new(channel.clone());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = Recorder::new("a", &log);
        dispatcher.subscribe("tick", &a);

        dispatcher.publish("tick", 1);
        // Subscription state is synchronous even though delivery is not.
        assert!(dispatcher.is_subscribed("tick", SubscriberId::of(&a)));
        assert!(log.lock().unwrap().is_empty(), "must not deliver inline");

        assert_eq!(drain(&channel), 1);
        assert_eq!(*log.lock().unwrap(), [("a", 1)]);
    }

    #[test]
    fn publishes_deliver_in_publish_order() {
        let channel = MainChannel::new();
        let dispatcher = Dispatcher::new(channel.clone());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = Recorder::new("a", &log);
        dispatcher.subscribe("tick", &a);
        dispatcher.subscribe("tock", &a);

        dispatcher.publish("tick", 1);
        dispatcher.publish("tock", 2);
        dispatcher.publish("tick", 3);
        drain(&channel);
        assert_eq!(*log.lock().unwrap(), [("a", 1), ("a", 2), ("a", 3)]);
    }

    #[test]
    fn unsubscribe_beats_a_queued_publish() {
        let channel = MainChannel::new();
        let dispatcher = Dispatcher::new(channel.clone());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = Recorder::new("a", &log);
        dispatcher.subscribe("tick", &a);

        dispatcher.publish("tick", 1);
        // Removed after the publish was queued but before the drain: the
        // snapshot happens at delivery time, so nothing is invoked.
        dispatcher.unsubscribe("tick", SubscriberId::of(&a));
        drain(&channel);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn subscriber_added_before_the_drain_is_included() {
        let channel = MainChannel::new();
        let dispatcher = Dispatcher::new(channel.clone());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = Recorder::new("a", &log);

        dispatcher.publish("tick", 1);
        dispatcher.subscribe("tick", &a);
        drain(&channel);
        assert_eq!(*log.lock().unwrap(), [("a", 1)]);
    }

    #[test]
    fn dropped_subscriber_is_skipped_at_delivery() {
        let channel = MainChannel::new();
        let dispatcher = Dispatcher::new(channel.clone());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = Recorder::new("a", &log);
        dispatcher.subscribe("tick", &a);

        dispatcher.publish("tick", 1);
        drop(a);
        drain(&channel);
        assert!(log.lock().unwrap().is_empty());
    }

    struct Resubscriber {
        dispatcher: Dispatcher<u32>,
        target: StdMutex<Option<Arc<Recorder>>>,
    }

    impl Subscriber<u32> for Resubscriber {
        fn on_event(&self, _event: &u32) {
            // Calling back into the dispatcher mid-delivery must not
            // deadlock; the registry lock is not held while we run.
            if let Some(target) = self.target.lock().unwrap().take() {
                self.dispatcher.subscribe("tick", &target);
            }
        }
    }

    #[test]
    fn handler_may_subscribe_during_fanout() {
        let channel = MainChannel::new();
        let dispatcher = Dispatcher::new(channel.clone());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let late = Recorder::new("late", &log);
        let hook = Arc::new(Resubscriber {
            dispatcher: dispatcher.clone(),
            target: StdMutex::new(Some(Arc::clone(&late))),
        });
        dispatcher.subscribe("tick", &hook);

        dispatcher.publish("tick", 1);
        drain(&channel);
        // `late` joined during delivery of 1, so it only sees 2.
        dispatcher.publish("tick", 2);
        drain(&channel);
        assert_eq!(*log.lock().unwrap(), [("late", 2)]);
    }

    #[test]
    fn producers_on_other_threads_are_serialized_by_the_channel() {
        let channel = MainChannel::new();
        let dispatcher = Dispatcher::new(channel.clone());
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = Recorder::new("a", &log);
        dispatcher.subscribe("tick", &a);

        let producers: Vec<_> = (0..4)
            .map(|t| {
                let dispatcher = dispatcher.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        dispatcher.publish("tick", t * 50 + i);
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }
        drain(&channel);

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 200);
        // Each producer's own publishes arrive in order.
        for t in 0..4 {
            let ours: Vec<_> = log.iter().map(|(_, v)| *v).filter(|v| v / 50 == t).collect();
            assert!(ours.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn clones_share_registry_and_channel() {
        let channel = MainChannel::new();
        let dispatcher = Dispatcher::new(channel.clone());
        let other = dispatcher.clone();
        let log = Arc::new(StdMutex::new(Vec::new()));
        let a = Recorder::new("a", &log);

        dispatcher.subscribe("tick", &a);
        assert!(other.is_subscribed("tick", SubscriberId::of(&a)));
        other.publish("tick", 5);
        drain(&channel);
        assert_eq!(*log.lock().unwrap(), [("a", 5)]);

        assert!(dispatcher.same_dispatcher(&other));
        // Sharing a channel does not make two dispatchers the same.
        let unrelated: Dispatcher<u32> = Dispatcher::new(channel);
        assert!(!dispatcher.same_dispatcher(&unrelated));
    }
}
