//! Engine Errors
//!
//! All fallible engine operations return [`EngineError`]. There is one
//! structural failure mode (a derived node with no inputs) plus the handle
//! and provenance checks that arena-based addressing makes cheap to enforce.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors produced by graph construction and engine operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// A derived node was constructed with an empty input list.
    ///
    /// Derived nodes must have at least one input; no node is created.
    #[error("derived node requires at least one input")]
    EmptyInputs,

    /// A node handle does not name a node in this engine.
    ///
    /// Handles are engine-scoped; using a handle from a different engine
    /// instance is also reported as unknown.
    #[error("unknown node handle {0:?}")]
    UnknownNode(NodeId),

    /// A value was injected into a derived node.
    ///
    /// Only source nodes accept external injection; derived nodes are
    /// mutated exclusively by their compute step.
    #[error("cannot inject a value into derived node {0:?}")]
    NotASource(NodeId),
}
