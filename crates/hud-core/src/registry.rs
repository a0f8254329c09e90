#![forbid(unsafe_code)]

//! Name-keyed subscriber registry, the single-threaded core of dispatch.
//!
//! An [`EventRegistry`] maps event names to ordered subscriber lists. It
//! holds subscribers weakly: dropping the last strong handle to a subscriber
//! retires it from every list without an explicit unsubscribe, and the
//! registry prunes dead entries whenever it walks a list. Identity is the
//! subscriber's allocation address ([`SubscriberId`]), so the same object
//! can be registered under many names and removed from all of them at once.
//!
//! # Invariants
//!
//! - Per name, live subscribers are notified in subscription order.
//! - Subscribing twice under one name is idempotent; the original position
//!   is kept.
//! - A dead `Weak` is never invoked and is dropped from the list on the
//!   next publish or query that touches it.
//!
//! The registry itself is not synchronized. [`Dispatcher`](crate::dispatch)
//! wraps it in a mutex for cross-thread use; direct use is for
//! single-threaded owners and tests.

use std::sync::{Arc, Weak};

use ahash::AHashMap;

/// Receiver half of a subscription.
///
/// Implementations must tolerate being invoked from whichever thread drains
/// the main channel, hence `Send + Sync`.
pub trait Subscriber<E>: Send + Sync {
    /// Handle one published event. The registry only borrows the payload;
    /// clone if it must outlive the call.
    fn on_event(&self, event: &E);

    /// Short label for logs.
    fn tag(&self) -> &str {
        "subscriber"
    }
}

/// Stable identity of a subscriber: the address of its shared allocation.
///
/// Valid for as long as any strong or weak handle keeps the allocation
/// alive, which covers every moment the registry can still name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

impl SubscriberId {
    /// Identity of the subscriber behind a shared handle.
    #[must_use]
    pub fn of<S: ?Sized>(subscriber: &Arc<S>) -> Self {
        Self::of_ref(&**subscriber)
    }

    /// Identity from a plain reference. Must point into the same allocation
    /// the `Arc` owns for the ids to line up; `&*arc` and methods on the
    /// subscriber itself both qualify.
    #[must_use]
    pub fn of_ref<S: ?Sized>(subscriber: &S) -> Self {
        Self(std::ptr::from_ref(subscriber).cast::<()>() as usize)
    }
}

struct Slot<E: 'static> {
    id: SubscriberId,
    sink: Weak<dyn Subscriber<E>>,
}

/// Ordered, name-keyed subscriber lists with weak-handle liveness.
pub struct EventRegistry<E: 'static> {
    slots: AHashMap<String, Vec<Slot<E>>>,
}

impl<E: 'static> EventRegistry<E> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: AHashMap::new(),
        }
    }

    /// Register `subscriber` for events published under `name`.
    ///
    /// Appends to the end of the list; re-subscribing the same object under
    /// the same name is a no-op that keeps its original position.
    pub fn subscribe<S>(&mut self, name: &str, subscriber: &Arc<S>)
    where
        S: Subscriber<E> + 'static,
    {
        let id = SubscriberId::of(subscriber);
        let list = self.slots.entry(name.to_owned()).or_default();
        if list.iter().any(|slot| slot.id == id) {
            tracing::debug!(name, tag = subscriber.tag(), "already subscribed");
            return;
        }
        // Unsize in a second step; annotating the `downgrade` call would
        // pin its type parameter to the trait object.
        let weak = Arc::downgrade(subscriber);
        let sink: Weak<dyn Subscriber<E>> = weak;
        list.push(Slot { id, sink });
        tracing::debug!(
            name,
            tag = subscriber.tag(),
            subscribers = list.len(),
            "subscribed"
        );
    }

    /// Drop the subscription of `id` under `name`, if present.
    ///
    /// Unknown names and unsubscribed ids are ignored. An empty list is
    /// removed from the map so name queries reflect reality.
    pub fn unsubscribe(&mut self, name: &str, id: SubscriberId) {
        let Some(list) = self.slots.get_mut(name) else {
            return;
        };
        let before = list.len();
        list.retain(|slot| slot.id != id);
        if list.len() != before {
            tracing::debug!(name, "unsubscribed");
        }
        if list.is_empty() {
            self.slots.remove(name);
        }
    }

    /// Drop every subscription of `id`, across all names.
    pub fn unsubscribe_from_all(&mut self, id: SubscriberId) {
        self.slots.retain(|_, list| {
            list.retain(|slot| slot.id != id);
            !list.is_empty()
        });
    }

    /// Whether `id` is currently subscribed under `name` and still alive.
    #[must_use]
    pub fn is_subscribed(&self, name: &str, id: SubscriberId) -> bool {
        self.slots
            .get(name)
            .is_some_and(|list| {
                list.iter()
                    .any(|slot| slot.id == id && slot.sink.strong_count() > 0)
            })
    }

    /// Number of live subscribers under `name`.
    #[must_use]
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.slots.get(name).map_or(0, |list| {
            list.iter()
                .filter(|slot| slot.sink.strong_count() > 0)
                .count()
        })
    }

    /// Names that currently have at least one slot, in map order.
    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// Upgrade the live subscribers under `name`, pruning dead slots.
    ///
    /// The returned handles pin the subscribers for the duration of a
    /// fan-out, so delivery never races destruction.
    pub(crate) fn snapshot(&mut self, name: &str) -> Vec<Arc<dyn Subscriber<E>>> {
        let Some(list) = self.slots.get_mut(name) else {
            return Vec::new();
        };
        let mut live = Vec::with_capacity(list.len());
        list.retain(|slot| match slot.sink.upgrade() {
            Some(sink) => {
                live.push(sink);
                true
            }
            None => false,
        });
        if list.is_empty() {
            self.slots.remove(name);
        }
        live
    }

    /// Deliver `event` to every live subscriber of `name`, in subscription
    /// order, synchronously on the calling thread.
    ///
    /// Dead slots encountered on the way are pruned. Handlers run after the
    /// list walk completes, so a handler dropping some other subscriber's
    /// last handle cannot disturb this fan-out.
    pub fn publish_local(&mut self, name: &str, event: &E) {
        let targets = self.snapshot(name);
        tracing::trace!(name, targets = targets.len(), "publish");
        for target in targets {
            target.on_event(event);
        }
    }
}

impl<E: 'static> Default for EventRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}
