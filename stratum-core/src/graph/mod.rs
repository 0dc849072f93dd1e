//! Dependency Graph
//!
//! This module implements the incremental computation graph: a directed
//! acyclic graph of value-holding nodes where source nodes are mutated by
//! external injection and derived nodes are pure functions of other nodes.
//!
//! # Overview
//!
//! - Nodes hold a current value plus the bookkeeping (height, recompute and
//!   change stamps, necessity) needed to decide staleness and ordering.
//! - Edges run from inputs to the derived nodes that consume them; reverse
//!   edges (dependants) are registered lazily as the graph is observed.
//!
//! When a source changes, only the stale nodes that are necessary (reachable
//! from an observed node) recompute, in ascending height order, so every
//! node sees up-to-date inputs.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an engine-owned arena and are addressed by index
//!    handles. This sidesteps the ownership hazards of a shared DAG with
//!    back-references: adjacency is just handle-indexed lists.
//!
//! 2. The graph's shape is immutable once built: callers construct
//!    bottom-up (sources first), and heights are computed at construction
//!    and never change. The graph must be acyclic by construction; height
//!    ordering assumes it and does not detect cycles.
//!
//! 3. Scheduling state (the stabilization counter, the pending heap, the
//!    observed set) is explicit engine state, never ambient globals, so
//!    independent engines coexist in one process.

mod engine;
mod node;
mod updater;

pub use engine::Engine;
pub use node::{Node, NodeId, NodeKind};
pub use updater::Updater;
