#![forbid(unsafe_code)]

//! hud public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use hud_core as core;
    #[cfg(feature = "runtime")]
    pub use hud_runtime as runtime;
    pub use hud_view as view;
}
