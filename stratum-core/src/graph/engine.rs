//! Incremental Engine
//!
//! The engine orchestrates a set of nodes: injecting new source values,
//! marking nodes necessary through observation, and running stabilization
//! passes that recompute exactly the stale, necessary nodes in
//! dependency-respecting order.
//!
//! # Algorithm
//!
//! 1. `set_value` advances the global stabilization counter, stamps the
//!    source's `change_id`, and enqueues every necessary direct dependant
//!    into the pending heap.
//!
//! 2. `observe` walks the upstream transitive closure of the observed node
//!    with an iterative work-list, marking every reachable node necessary,
//!    registering dependant back-references, and enqueueing stale nodes.
//!
//! 3. `get_value` on an observed node first runs a stabilization pass:
//!    the counter advances once, then pending nodes are extracted in
//!    ascending height order and recomputed. Because height strictly
//!    increases along every edge, a node is always recomputed after all of
//!    its inputs. A recomputation whose output is unchanged by value
//!    equality cuts off propagation: dependants are only enqueued when the
//!    value actually changed.
//!
//! # Ambient State
//!
//! All scheduler state (the counter, the pending heap and its dedup set,
//! the observed set) lives in the engine value the caller owns. There are
//! no globals; independent engine instances coexist freely.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::error::EngineError;

use super::node::{Adjacency, Node, NodeId, NodeKind};
use super::updater::Updater;

/// The incremental computation engine.
///
/// Owns the node arena and all scheduling state. Single-threaded and fully
/// synchronous: no operation suspends or blocks, and a multi-threaded host
/// must serialize all calls to one engine instance externally.
///
/// # Failure
///
/// If an updater panics during a stabilization pass, the panic propagates
/// to the caller of [`get_value`](Engine::get_value) and the pending heap
/// and dedup set may be left non-empty. The engine must be treated as
/// undefined after such a panic; there is no automatic recovery.
///
/// # Example
///
/// ```rust,ignore
/// let mut engine = Engine::new();
/// let a = engine.add_source(2);
/// let b = engine.add_source(3);
/// let c = engine.add_derived(|v: &[i64]| v[0] + v[1], &[a, b])?;
///
/// engine.observe(c)?;
/// assert_eq!(engine.get_value(c)?, 5);
///
/// engine.set_value(a, 10)?;
/// assert_eq!(engine.get_value(c)?, 13);
/// ```
pub struct Engine<V>
where
    V: Clone + PartialEq,
{
    /// The node arena. Handles are indices into this vector; nodes are
    /// never removed, so handles stay valid for the engine's lifetime.
    nodes: Vec<Node<V>>,

    /// The global stabilization counter. Advanced by `set_value` and once
    /// per non-empty stabilization pass.
    stabilization: u64,

    /// Pending recomputations, ordered by ascending height (ties broken by
    /// handle). `Reverse` turns the std max-heap into a min-heap.
    heap: BinaryHeap<Reverse<(u64, NodeId)>>,

    /// Dedup set mirroring the heap: a node already pending is not
    /// re-enqueued. Cleared when a pass drains the heap.
    pending: IndexSet<NodeId>,

    /// Nodes the caller has observed, directly or through the upstream
    /// walk. Reads of these trigger stabilization.
    observed: IndexSet<NodeId>,
}

impl<V> Engine<V>
where
    V: Clone + PartialEq,
{
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            stabilization: 0,
            heap: BinaryHeap::new(),
            pending: IndexSet::new(),
            observed: IndexSet::new(),
        }
    }

    /// Add a source node with the given initial value. Always succeeds.
    pub fn add_source(&mut self, value: V) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::source(value));
        trace!(node = id.raw(), "source node added");
        id
    }

    /// Add a derived node computed from `inputs` by `updater`.
    ///
    /// Fails with [`EngineError::EmptyInputs`] if `inputs` is empty and
    /// with [`EngineError::UnknownNode`] if any input handle is invalid;
    /// no node is created in either case. The node's height is
    /// `1 + max(input heights)` and is fixed for its lifetime.
    ///
    /// The node holds a placeholder value (a clone of its first input's
    /// current value) until its first compute step runs.
    pub fn add_derived(
        &mut self,
        updater: impl Updater<V> + 'static,
        inputs: &[NodeId],
    ) -> Result<NodeId, EngineError> {
        if inputs.is_empty() {
            return Err(EngineError::EmptyInputs);
        }

        let mut max_height = 0;
        for &input in inputs {
            max_height = max_height.max(self.node(input)?.height());
        }
        let placeholder = self.node(inputs[0])?.value().clone();

        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::derived(
            Box::new(updater),
            Adjacency::from_slice(inputs),
            max_height + 1,
            placeholder,
        ));
        trace!(node = id.raw(), height = max_height + 1, "derived node added");
        Ok(id)
    }

    /// Inject a new value into a source node.
    ///
    /// Fails with [`EngineError::NotASource`] on a derived node and
    /// [`EngineError::UnknownNode`] on a bad handle. A value equal to the
    /// current one (by value equality) is a no-op: the counter does not
    /// advance and nothing is enqueued. Otherwise the counter advances,
    /// the node's `change_id` is stamped, the value is installed directly
    /// (sources bypass the compute step), and every necessary direct
    /// dependant is enqueued for the next stabilization pass.
    pub fn set_value(&mut self, id: NodeId, value: V) -> Result<(), EngineError> {
        let node = self.node(id)?;
        if node.kind() == NodeKind::Derived {
            return Err(EngineError::NotASource(id));
        }
        if *node.value() == value {
            return Ok(());
        }

        self.stabilization += 1;
        let stabilization = self.stabilization;
        self.node_mut(id)?.inject(value, stabilization);

        let dependants: Adjacency = self.nodes[id.index()].dependants().into();
        let mut enqueued = 0usize;
        for dependant in dependants {
            if self.enqueue_if_necessary(dependant) {
                enqueued += 1;
            }
        }
        debug!(
            node = id.raw(),
            stabilization,
            enqueued,
            "source value injected"
        );
        Ok(())
    }

    /// Observe a node, keeping it (and everything upstream) current.
    ///
    /// No-op if the node is already observed. Otherwise walks the full
    /// upstream transitive closure with an iterative work-list and a
    /// per-call visited set, so cost is linear in the reachable subgraph
    /// size rather than in the number of paths to each node. Every visited
    /// node joins the observed set and becomes necessary; stale nodes are
    /// enqueued; each input gets the visiting node registered as a
    /// dependant exactly once. Already-necessary regions are still walked
    /// so that back-references from the newly observed node are registered.
    ///
    /// Observation is monotonic: there is no unobserve.
    pub fn observe(&mut self, id: NodeId) -> Result<(), EngineError> {
        self.node(id)?;
        if self.observed.contains(&id) {
            return Ok(());
        }

        let mut worklist = vec![id];
        let mut visited: HashSet<NodeId> = HashSet::new();

        while let Some(current) = worklist.pop() {
            if !visited.insert(current) {
                continue;
            }

            self.observed.insert(current);
            self.nodes[current.index()].mark_necessary();

            let newest = self.newest_input_change(current);
            if self.nodes[current.index()].is_stale(newest) {
                self.enqueue_if_necessary(current);
            }

            let inputs: Adjacency = self.nodes[current.index()].inputs().into();
            for input in inputs {
                self.nodes[input.index()].add_dependant(current);
                worklist.push(input);
            }
        }

        trace!(node = id.raw(), visited = visited.len(), "node observed");
        Ok(())
    }

    /// Read a node's current value.
    ///
    /// If the node is observed, a stabilization pass runs first, so the
    /// returned value reflects all prior `set_value` calls. If the node is
    /// not observed, the current value is returned as-is with no freshness
    /// guarantee: it may be arbitrarily stale, or still the construction
    /// placeholder for a derived node that never computed.
    pub fn get_value(&mut self, id: NodeId) -> Result<V, EngineError> {
        self.node(id)?;
        if self.observed.contains(&id) {
            self.stabilize();
        }
        Ok(self.nodes[id.index()].value().clone())
    }

    /// Read a node's current value without stabilizing.
    ///
    /// Never triggers recomputation, observed or not.
    pub fn peek(&self, id: NodeId) -> Result<&V, EngineError> {
        Ok(self.node(id)?.value())
    }

    /// Get a reference to a node for introspection (kind, height,
    /// necessity, adjacency).
    pub fn node(&self, id: NodeId) -> Result<&Node<V>, EngineError> {
        self.nodes
            .get(id.index())
            .ok_or(EngineError::UnknownNode(id))
    }

    /// Check whether a node is in the observed set.
    pub fn is_observed(&self, id: NodeId) -> bool {
        self.observed.contains(&id)
    }

    /// Total number of nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of observed nodes (including those reached by the upstream
    /// walk).
    pub fn observed_count(&self) -> usize {
        self.observed.len()
    }

    /// Number of recomputations currently pending.
    pub fn pending_count(&self) -> usize {
        self.heap.len()
    }

    /// Current value of the global stabilization counter.
    pub fn stabilization_number(&self) -> u64 {
        self.stabilization
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node<V>, EngineError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(EngineError::UnknownNode(id))
    }

    /// Enqueue a node for recomputation if it is necessary and not already
    /// pending. Returns whether it was enqueued.
    fn enqueue_if_necessary(&mut self, id: NodeId) -> bool {
        let node = &self.nodes[id.index()];
        if !node.is_necessary() {
            return false;
        }
        let height = node.height();
        if self.pending.insert(id) {
            self.heap.push(Reverse((height, id)));
            return true;
        }
        false
    }

    /// Maximum `change_id` over a node's inputs; 0 for a source.
    fn newest_input_change(&self, id: NodeId) -> u64 {
        self.nodes[id.index()]
            .inputs()
            .iter()
            .map(|input| self.nodes[input.index()].change_id())
            .max()
            .unwrap_or(0)
    }

    /// Run one stabilization pass.
    ///
    /// No-op when nothing is pending. Otherwise the counter advances once
    /// and pending nodes are extracted in ascending height order. A popped
    /// node that is no longer stale is skipped and the pass continues with
    /// the remaining pending nodes, so every stale necessary node is
    /// recomputed before the pass ends. A node whose recomputation changed
    /// its value enqueues its necessary dependants into the same pass.
    fn stabilize(&mut self) {
        if self.heap.is_empty() {
            return;
        }

        self.stabilization += 1;
        let stabilization = self.stabilization;
        debug!(
            stabilization,
            pending = self.heap.len(),
            "stabilization pass started"
        );

        let mut recomputed = 0usize;
        while let Some(Reverse((_, id))) = self.heap.pop() {
            let newest = self.newest_input_change(id);
            if !self.nodes[id.index()].is_stale(newest) {
                continue;
            }

            // Gather input values in declared order, then recompute.
            let inputs: Adjacency = self.nodes[id.index()].inputs().into();
            let input_values: SmallVec<[V; 4]> = inputs
                .iter()
                .map(|input| self.nodes[input.index()].value().clone())
                .collect();
            let changed = self.nodes[id.index()].compute(stabilization, &input_values);
            recomputed += 1;
            trace!(node = id.raw(), changed, "node recomputed");

            if changed {
                let dependants: Adjacency = self.nodes[id.index()].dependants().into();
                for dependant in dependants {
                    self.enqueue_if_necessary(dependant);
                }
            }
        }

        self.pending.clear();
        debug!(stabilization, recomputed, "stabilization pass finished");
    }
}

impl<V> Default for Engine<V>
where
    V: Clone + PartialEq,
{
    fn default() -> Self {
        Self::new()
    }
}
