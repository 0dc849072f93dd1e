//! Stratum Core
//!
//! This crate provides the core engine for Stratum, an incremental
//! (self-adjusting) computation library. It implements:
//!
//! - A DAG of value-holding nodes: mutable sources and pure derived nodes
//! - Dirty tracking via stabilization counters (recompute and change stamps)
//! - Height-ordered stabilization that recomputes exactly the stale,
//!   necessary nodes, with equality-based cutoff of unchanged values
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `graph`: the node entity, the updater contract, and the engine that
//!   schedules recomputation
//! - `error`: the error type shared by all fallible operations
//!
//! # Example
//!
//! ```rust,ignore
//! use stratum_core::Engine;
//!
//! let mut engine = Engine::new();
//! let a = engine.add_source(2);
//! let b = engine.add_source(3);
//! let c = engine.add_derived(|v: &[i64]| v[0] + v[1], &[a, b])?;
//!
//! // Only observed nodes are kept current.
//! engine.observe(c)?;
//! assert_eq!(engine.get_value(c)?, 5);
//!
//! engine.set_value(a, 10)?;
//! assert_eq!(engine.get_value(c)?, 13);
//! ```
//!
//! # Concurrency
//!
//! The engine is single-threaded and fully synchronous. It is a plain value
//! the caller owns and threads through all calls; a multi-threaded host must
//! serialize access externally.

pub mod error;
pub mod graph;

pub use error::EngineError;
pub use graph::{Engine, Node, NodeId, NodeKind, Updater};
