#![forbid(unsafe_code)]

//! Blocking FIFO channel and the process-wide main-thread task queue.
//!
//! [`BlockingChannel`] is the one primitive in this crate that is safe to
//! touch from more than one thread: producers `push` from anywhere, a single
//! logical consumer blocks in `pop`. [`MainChannel`] specializes it to
//! [`Task`] closures and is the funnel through which every deferred
//! notification reaches the consumer thread.
//!
//! # Ordering
//!
//! All pushes go through one mutex, so the channel defines a single global
//! FIFO order across producers. `pop` returns elements strictly in that
//! order.
//!
//! # Bounds
//!
//! The channel is unbounded by design: `push` never blocks and never drops.
//! A flooding producer grows memory without limit; detecting that is out of
//! scope here.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Thread-safe unbounded FIFO: concurrent push, blocking pop.
///
/// One mutex plus one condvar signalled on push. Many producers, one
/// logical consumer.
pub struct BlockingChannel<T> {
    queue: Mutex<VecDeque<T>>,
    ready: Condvar,
}

impl<T> BlockingChannel<T> {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }

    // A panicking producer cannot leave the queue in a torn state (push is a
    // single VecDeque operation), so a poisoned lock is safe to reclaim.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an element and wake one waiting consumer.
    ///
    /// Always succeeds; the channel has no capacity limit.
    pub fn push(&self, item: T) {
        let mut queue = self.lock();
        queue.push_back(item);
        // Wake exactly one thread parked in `pop`.
        self.ready.notify_one();
    }

    /// Remove and return the oldest element, blocking until one is available.
    pub fn pop(&self) -> T {
        let mut queue = self.lock();
        loop {
            if let Some(item) = queue.pop_front() {
                return item;
            }
            queue = self
                .ready
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Remove and return the oldest element if one is queued right now.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Racy emptiness snapshot.
    ///
    /// Only suitable for opportunistic polling; by the time the caller acts
    /// on the answer another thread may have pushed or popped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Racy length snapshot. Same caveats as [`is_empty`](Self::is_empty).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

impl<T> Default for BlockingChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for BlockingChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingChannel")
            .field("len", &self.len())
            .finish()
    }
}

/// A deferred unit of work owned by the [`MainChannel`] until executed.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable handle to the single process-wide queue of pending [`Task`]s.
///
/// Constructed once by the application root and handed to every dispatcher
/// and to the consumer loop; clones share the same queue. There is no
/// global instance: anything that needs to post work receives a handle.
#[derive(Clone)]
pub struct MainChannel {
    queue: Arc<BlockingChannel<Task>>,
}

impl MainChannel {
    /// Create a fresh, empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Arc::new(BlockingChannel::new()),
        }
    }

    /// Queue a closure for execution on the consumer thread.
    pub fn post<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.push(Box::new(f));
    }

    /// Queue an already-boxed task.
    pub fn post_task(&self, task: Task) {
        self.queue.push(task);
    }

    /// Block until a task is available, then take it.
    #[must_use]
    pub fn pop(&self) -> Task {
        self.queue.pop()
    }

    /// Take a task if one is queued right now.
    #[must_use]
    pub fn try_pop(&self) -> Option<Task> {
        self.queue.try_pop()
    }

    /// Racy emptiness snapshot, for polling loops only.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Racy count of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether two handles refer to the same underlying queue.
    #[must_use]
    pub fn same_channel(&self, other: &MainChannel) -> bool {
        Arc::ptr_eq(&self.queue, &other.queue)
    }
}

impl Default for MainChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MainChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainChannel")
            .field("len", &self.len())
            .finish()
    }
}
