#![forbid(unsafe_code)]

//! Runtime half of the hud stack: the consumer loop that executes queued
//! tasks, and cancellable one-shot timers that publish through it.
//!
//! - [`main_loop`]: [`MainLoop`] drains the shared
//!   [`MainChannel`](hud_core::channel::MainChannel), either cooperatively
//!   (`tick`) or on a dedicated thread (`spawn`), with panic isolation per
//!   task.
//! - [`timer`]: [`DelayTimer`] arms a worker thread per schedule and routes
//!   expiry through a [`Dispatcher`](hud_core::dispatch::Dispatcher) so the
//!   callback always runs on the consumer thread.

pub mod main_loop;
pub mod timer;

pub use main_loop::{MainLoop, MainLoopHandle, StopHandle};
pub use timer::{DelayTimer, Timeout, TimerDispatcher};
