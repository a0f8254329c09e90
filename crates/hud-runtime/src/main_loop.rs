#![forbid(unsafe_code)]

//! The consumer loop: drains the main channel and executes tasks one at a
//! time, so every event handler in the process runs on this one thread.
//!
//! # Design
//!
//! Two driving styles share one loop:
//!
//! - [`MainLoop::tick`] for cooperative embedding: runs the tasks that were
//!   queued when the tick began, then returns so the caller can poll
//!   sensors or sleep. Tasks posted *during* a tick wait for the next one,
//!   which keeps a task that re-posts itself from starving the caller.
//! - [`MainLoop::run`] / [`MainLoop::spawn`] for a dedicated thread:
//!   blocks on the channel and executes until stopped.
//!
//! A panicking task is caught, logged, and dropped; the loop keeps going.
//! One bad handler must not take the device down with it.
//!
//! # Shutdown
//!
//! [`StopHandle::stop`] raises a flag and posts a wake-up no-op so a loop
//! parked in `pop` notices. Tasks still queued when the loop exits are
//! dropped unexecuted.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hud_core::channel::{MainChannel, Task};
use web_time::Instant;

/// Single-threaded executor for the tasks queued on a [`MainChannel`].
pub struct MainLoop {
    channel: MainChannel,
    stop: Arc<AtomicBool>,
    started_at: Instant,
    tasks_run: u64,
}

impl MainLoop {
    /// Create a loop that will drain `channel`.
    #[must_use]
    pub fn new(channel: MainChannel) -> Self {
        Self {
            channel,
            stop: Arc::new(AtomicBool::new(false)),
            started_at: Instant::now(),
            tasks_run: 0,
        }
    }

    /// The channel this loop drains.
    #[must_use]
    pub fn channel(&self) -> &MainChannel {
        &self.channel
    }

    /// Handle that can stop this loop from any thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: Arc::clone(&self.stop),
            channel: self.channel.clone(),
        }
    }

    /// Tasks executed so far, panicked ones included.
    #[must_use]
    pub fn tasks_run(&self) -> u64 {
        self.tasks_run
    }

    /// Time since the loop was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Run every task that was queued when the tick began; return the count.
    ///
    /// Bounded by the queue length at entry, so re-posting tasks cannot
    /// spin this call forever.
    pub fn tick(&mut self) -> usize {
        let budget = self.channel.len();
        let mut ran = 0;
        while ran < budget {
            let Some(task) = self.channel.try_pop() else {
                break;
            };
            self.execute(task);
            ran += 1;
        }
        ran
    }

    /// Block on the channel and execute tasks until stopped.
    pub fn run(&mut self) {
        tracing::debug!("main loop running");
        while !self.stop.load(Ordering::Acquire) {
            let task = self.channel.pop();
            self.execute(task);
        }
        tracing::debug!(tasks_run = self.tasks_run, "main loop stopped");
    }

    /// Move the loop onto its own thread and return a joinable handle.
    #[must_use]
    pub fn spawn(mut self) -> MainLoopHandle {
        let stop = self.stop_handle();
        let thread = thread::Builder::new()
            .name("hud-main".into())
            .spawn(move || self.run())
            .expect("failed to spawn main loop thread");
        MainLoopHandle {
            stop,
            thread: Some(thread),
        }
    }

    fn execute(&mut self, task: Task) {
        self.tasks_run += 1;
        if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
            tracing::error!(
                task = self.tasks_run,
                panic = panic_message(payload.as_ref()),
                "task panicked; loop continues"
            );
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Cloneable stop signal for a [`MainLoop`].
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<AtomicBool>,
    channel: MainChannel,
}

impl StopHandle {
    /// Ask the loop to exit. Idempotent; safe from any thread, including a
    /// task running on the loop itself.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
        // Wake a loop parked in `pop`.
        self.channel.post(|| {});
    }
}

/// Owner of a spawned loop thread. Stops and joins on [`shutdown`] or drop.
///
/// [`shutdown`]: MainLoopHandle::shutdown
pub struct MainLoopHandle {
    stop: StopHandle,
    thread: Option<JoinHandle<()>>,
}

impl MainLoopHandle {
    /// Stop signal for the running loop.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Whether the loop thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the loop and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        self.stop.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("main loop thread panicked");
            }
        }
    }
}

impl Drop for MainLoopHandle {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn tick_executes_in_fifo_order() {
        let channel = MainChannel::new();
        let mut main_loop = MainLoop::new(channel.clone());
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4 {
            let log = Arc::clone(&log);
            channel.post(move || log.lock().unwrap().push(i));
        }
        assert_eq!(main_loop.tick(), 4);
        assert_eq!(*log.lock().unwrap(), [0, 1, 2, 3]);
        assert_eq!(main_loop.tasks_run(), 4);
    }

    #[test]
    fn tick_on_empty_channel_returns_zero() {
        let mut main_loop = MainLoop::new(MainChannel::new());
        assert_eq!(main_loop.tick(), 0);
    }

    #[test]
    fn tick_leaves_tasks_posted_during_the_tick() {
        let channel = MainChannel::new();
        let mut main_loop = MainLoop::new(channel.clone());
        let reposter = channel.clone();
        channel.post(move || reposter.post(|| {}));
        // The re-posted task is outside this tick's budget.
        assert_eq!(main_loop.tick(), 1);
        assert_eq!(channel.len(), 1);
        assert_eq!(main_loop.tick(), 1);
        assert!(channel.is_empty());
    }

    #[test]
    fn panicking_task_does_not_stop_the_tick() {
        let channel = MainChannel::new();
        let mut main_loop = MainLoop::new(channel.clone());
        let hits = Arc::new(AtomicUsize::new(0));
        channel.post(|| panic!("boom"));
        let after = Arc::clone(&hits);
        channel.post(move || {
            after.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(main_loop.tick(), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn spawned_loop_executes_and_shuts_down() {
        let channel = MainChannel::new();
        let handle = MainLoop::new(channel.clone()).spawn();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..8 {
            let hits = Arc::clone(&hits);
            channel.post(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        while hits.load(Ordering::SeqCst) < 8 {
            thread::yield_now();
        }
        handle.shutdown();
        assert_eq!(hits.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn shutdown_wakes_an_idle_loop() {
        let handle = MainLoop::new(MainChannel::new()).spawn();
        // The loop is parked in `pop` with nothing queued; this must not hang.
        handle.shutdown();
    }

    #[test]
    fn panicking_task_does_not_kill_a_spawned_loop() {
        let channel = MainChannel::new();
        let handle = MainLoop::new(channel.clone()).spawn();
        channel.post(|| panic!("boom"));
        let hits = Arc::new(AtomicUsize::new(0));
        let after = Arc::clone(&hits);
        channel.post(move || {
            after.fetch_add(1, Ordering::SeqCst);
        });
        while hits.load(Ordering::SeqCst) == 0 {
            thread::yield_now();
        }
        assert!(!handle.is_finished());
        handle.shutdown();
    }

    #[test]
    fn stop_from_a_task_on_the_loop_itself() {
        let channel = MainChannel::new();
        let main_loop = MainLoop::new(channel.clone());
        let stop = main_loop.stop_handle();
        let handle = main_loop.spawn();
        channel.post(move || stop.stop());
        handle.shutdown();
    }

    #[test]
    fn drop_joins_the_loop_thread() {
        let channel = MainChannel::new();
        {
            let _handle = MainLoop::new(channel.clone()).spawn();
        }
        // Reaching here means drop stopped and joined without hanging.
        channel.post(|| {});
    }
}
