#![forbid(unsafe_code)]

//! Widget tree for the hud stack: owned nodes with rectangular frames,
//! remote/input event bindings, and parent-ward gesture bubbling.
//!
//! - [`geometry`]: integer points, sizes, and rectangles.
//! - [`node`]: the [`Node`] tree. Parents own children; dispatchers hold
//!   weak handles; dropping a subtree unbinds it everywhere.
//! - [`error`]: [`TreeError`], returned by refused tree mutations.

pub mod error;
pub mod geometry;
pub mod node;

pub use error::TreeError;
pub use geometry::{Point, Rect, Size};
pub use node::{InputHandler, Node, RemoteHandler};
