#![forbid(unsafe_code)]

//! Cancellable one-shot timers that fire through the dispatcher.
//!
//! A [`DelayTimer`] parks a worker thread on a condition variable instead
//! of sleeping, so cancellation takes effect immediately rather than after
//! the remaining delay. Expiry does not run the callback on the worker:
//! it publishes a [`Timeout`] through a [`Dispatcher`], and the callback
//! executes on whichever thread drains the main channel, like every other
//! handler in the system.
//!
//! # Cancellation
//!
//! [`DelayTimer::cancel`] wins every race it can be asked to win:
//!
//! - Worker still waiting: the flag flips under the mutex, the worker wakes
//!   and exits without publishing.
//! - Expiry already published but not yet delivered: the delegate is
//!   unsubscribed and the armed flag is down, so the queued delivery finds
//!   nothing to invoke.
//! - Callback already entered on the consumer thread: it finishes. Blocking
//!   `cancel` on handler completion would forbid calling it from inside
//!   timer callbacks, which is legal and exercised.
//!
//! `cancel` joins the worker before returning; the worker never outlives
//! the call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hud_core::dispatch::Dispatcher;
use hud_core::event::Event;
use hud_core::registry::{Subscriber, SubscriberId};

/// A timer expired. Published under a per-schedule name, never the bare
/// kind name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout;

impl Timeout {
    /// Prefix of every scheduled timer's event name.
    pub const NAME: &'static str = "timeout";
}

impl Event for Timeout {
    fn name(&self) -> &'static str {
        Self::NAME
    }
}

/// Dispatcher carrying timer expirations.
pub type TimerDispatcher = Dispatcher<Timeout>;

static NEXT_SCHEDULE: AtomicU64 = AtomicU64::new(0);

fn next_schedule_name() -> String {
    let id = NEXT_SCHEDULE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{id}", Timeout::NAME)
}

struct TimerShared {
    /// True from `delay` until expiry-or-cancel. Guarded by the mutex the
    /// worker waits on, so a cancel and a publish cannot interleave.
    armed: Mutex<bool>,
    wake: Condvar,
}

impl TimerShared {
    fn armed(&self) -> MutexGuard<'_, bool> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Subscriber end of one schedule: holds the user callback.
struct DelayedFunction {
    shared: Arc<TimerShared>,
    callback: Box<dyn Fn() + Send + Sync>,
}

impl Subscriber<Timeout> for DelayedFunction {
    fn on_event(&self, _event: &Timeout) {
        {
            let mut armed = self.shared.armed();
            // A cancel that landed after the worker published still wins.
            if !*armed {
                tracing::trace!("timeout delivery skipped, schedule cancelled");
                return;
            }
            // One-shot: the schedule is consumed before the callback runs.
            // The guard drops here so the callback may cancel or re-arm
            // this very timer without deadlocking.
            *armed = false;
        }
        (self.callback)();
    }

    fn tag(&self) -> &str {
        "delayed-function"
    }
}

/// One-shot timer: schedule a callback after a delay, cancel any time.
///
/// Each call to [`delay`](Self::delay) publishes under a fresh name, so a
/// delivery queued by an earlier schedule can never reach the current
/// callback. Dropping the timer cancels it.
pub struct DelayTimer {
    dispatcher: TimerDispatcher,
    shared: Arc<TimerShared>,
    name: String,
    delegate: Option<Arc<DelayedFunction>>,
    worker: Option<JoinHandle<()>>,
}

impl DelayTimer {
    /// Create an idle timer publishing through `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: TimerDispatcher) -> Self {
        Self {
            dispatcher,
            shared: Arc::new(TimerShared {
                armed: Mutex::new(false),
                wake: Condvar::new(),
            }),
            name: next_schedule_name(),
            delegate: None,
            worker: None,
        }
    }

    /// Event name of the current schedule.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a schedule is armed right now.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        *self.shared.armed()
    }

    /// Schedule `callback` to run after `duration`. Replaces any pending
    /// schedule, cancelling it first.
    pub fn delay<F>(&mut self, duration: Duration, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.cancel();
        self.name = next_schedule_name();
        *self.shared.armed() = true;

        let delegate = Arc::new(DelayedFunction {
            shared: Arc::clone(&self.shared),
            callback: Box::new(callback),
        });
        self.dispatcher.subscribe(&self.name, &delegate);
        self.delegate = Some(delegate);

        tracing::debug!(name = self.name.as_str(), ?duration, "timer armed");
        let shared = Arc::clone(&self.shared);
        let dispatcher = self.dispatcher.clone();
        let name = self.name.clone();
        let worker = thread::Builder::new()
            .name("hud-timer".into())
            .spawn(move || {
                let armed = shared.armed();
                let (armed, _timed_out) = shared
                    .wake
                    .wait_timeout_while(armed, duration, |armed| *armed)
                    .unwrap_or_else(PoisonError::into_inner);
                // Publish under the mutex: a cancel observing `armed` down
                // is ordered strictly after this enqueue.
                if *armed {
                    tracing::trace!(name = name.as_str(), "timer expired");
                    dispatcher.publish(&name, Timeout);
                } else {
                    tracing::trace!(name = name.as_str(), "timer cancelled before expiry");
                }
            })
            .expect("failed to spawn timer thread");
        self.worker = Some(worker);
    }

    /// Disarm the pending schedule, if any, and join the worker.
    ///
    /// After this returns the callback will not be started: the armed flag
    /// is down and the delegate is unsubscribed, so even an expiry already
    /// queued on the channel delivers to nothing.
    pub fn cancel(&mut self) {
        {
            let mut armed = self.shared.armed();
            if *armed {
                tracing::debug!(name = self.name.as_str(), "timer cancelled");
            }
            *armed = false;
            self.shared.wake.notify_one();
        }
        if let Some(delegate) = self.delegate.take() {
            self.dispatcher.unsubscribe(&self.name, SubscriberId::of(&delegate));
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!(name = self.name.as_str(), "timer worker panicked");
            }
        }
    }
}

impl Drop for DelayTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
