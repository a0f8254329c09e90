#![forbid(unsafe_code)]

//! Error type for tree mutations.

use thiserror::Error;

/// Why a tree mutation was refused. The tree is left untouched in every
/// case.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The node already has a parent; detach it first.
    #[error("node '{tag}' is already attached")]
    AlreadyAttached { tag: String },

    /// The operation needs a parent and the node has none.
    #[error("node '{tag}' is not attached")]
    NotAttached { tag: String },

    /// The destination lies inside the node's own subtree.
    #[error("attaching '{tag}' under '{target}' would create a cycle")]
    WouldCycle { tag: String, target: String },
}
