#![forbid(unsafe_code)]

//! Core event plumbing for the hud stack: typed events, a blocking task
//! channel, a name-keyed subscriber registry, and a thread-safe dispatcher
//! that defers every delivery onto the consumer thread.
//!
//! Layering, bottom to top:
//!
//! - [`channel`]: [`BlockingChannel`] and the shared [`MainChannel`] of
//!   pending [`Task`]s.
//! - [`event`]: payload kinds with stable names, grouped into the
//!   [`RemoteEvent`](event::RemoteEvent) and
//!   [`InputEvent`](event::InputEvent) families.
//! - [`registry`]: single-threaded [`EventRegistry`] with weak subscriber
//!   handles and insertion-order fan-out.
//! - [`dispatch`]: [`Dispatcher`], the cross-thread facade that snapshots
//!   subscribers under a lock and invokes them with the lock released.
//!
//! Nothing here spins up threads or owns a loop; see `hud-runtime` for the
//! consumer loop and timers, and `hud-view` for the widget tree that plugs
//! into this as a subscriber.

pub mod channel;
pub mod dispatch;
pub mod event;
pub mod registry;

pub use channel::{BlockingChannel, MainChannel, Task};
pub use dispatch::Dispatcher;
pub use event::Event;
pub use registry::{EventRegistry, Subscriber, SubscriberId};
