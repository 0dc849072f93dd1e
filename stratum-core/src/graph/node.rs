//! Graph Nodes
//!
//! This module defines the vertices of the dependency graph: the opaque
//! [`NodeId`] handle and the [`Node`] entity holding a value together with
//! the bookkeeping used to decide staleness and recomputation order.
//!
//! # Identity
//!
//! Nodes live in an arena owned by the engine and are addressed by index.
//! A `NodeId` is just that index; equality is handle-value equality. Handles
//! are issued by the engine at insertion and stay valid for the engine's
//! whole lifetime (nodes are never removed).
//!
//! # Ordering
//!
//! Every node carries a `height`: 0 for sources, `1 + max(input heights)`
//! for derived nodes. Height strictly increases along every input edge, so
//! processing pending nodes in ascending height order guarantees that a node
//! only recomputes after all of its inputs have been brought up to date.
//! The graph's shape is fixed once built, so heights never change.

use std::fmt::Debug;

use smallvec::SmallVec;

use super::updater::Updater;

/// Unique identifier for a node in the dependency graph.
///
/// An index into the owning engine's node arena. `Copy`, cheap to pass
/// around, and ordered (used as a tie-breaker in the recompute heap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a handle for the given arena slot.
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Get the raw arena index.
    pub fn raw(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

/// The provenance of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A source node. Roots of the graph: no inputs, mutated only by
    /// external injection through the engine.
    Source,

    /// A derived node. Computed from one or more inputs by a pure updater.
    Derived,
}

/// Inline capacity for adjacency lists. Most nodes have a handful of inputs
/// and consumers; larger fan-in/fan-out spills to the heap.
pub(crate) type Adjacency = SmallVec<[NodeId; 4]>;

/// A node in the dependency graph.
///
/// Generic over the value type `V`, which must support value equality so
/// that "did the value actually change" is a meaningful question. Change
/// detection uses `PartialEq` uniformly, never reference identity.
///
/// A node is exactly one of:
///
/// - source: no updater, empty inputs, height 0
/// - derived: updater present, non-empty inputs, height ≥ 1
pub struct Node<V> {
    /// Current value.
    value: V,

    /// Longest distance from any source node. Fixed at construction.
    height: u64,

    /// Stabilization number at which this node last ran its compute step.
    /// 0 means never. Non-decreasing over the node's lifetime.
    recompute_id: u64,

    /// Stabilization number at which the value last actually changed,
    /// whether by injection (sources) or recomputation (derived nodes).
    /// May exceed `recompute_id` for a source, which has no compute step.
    change_id: u64,

    /// True once this node is reachable from an observed node. Monotonic:
    /// only ever transitions false -> true.
    necessary: bool,

    /// True until the first compute step runs.
    never_computed: bool,

    /// The pure update function. Present iff the node is derived.
    updater: Option<Box<dyn Updater<V>>>,

    /// Input nodes, in declared order. The updater receives their values
    /// in exactly this order.
    inputs: Adjacency,

    /// Direct consumers, registered lazily as the graph is observed.
    /// Each consumer appears at most once.
    dependants: Adjacency,
}

impl<V> Node<V>
where
    V: Clone + PartialEq,
{
    /// Create a source node with the given initial value.
    pub(crate) fn source(value: V) -> Self {
        Self {
            value,
            height: 0,
            recompute_id: 0,
            change_id: 0,
            necessary: false,
            never_computed: true,
            updater: None,
            inputs: Adjacency::new(),
            dependants: Adjacency::new(),
        }
    }

    /// Create a derived node.
    ///
    /// Only the engine constructs these: it validates that `inputs` is
    /// non-empty and computes `height` from the input nodes, which the
    /// arena-resident node cannot dereference itself. The initial value is
    /// a placeholder; the first compute step overwrites it.
    pub(crate) fn derived(
        updater: Box<dyn Updater<V>>,
        inputs: Adjacency,
        height: u64,
        initial: V,
    ) -> Self {
        debug_assert!(!inputs.is_empty(), "derived node must have inputs");
        Self {
            value: initial,
            height,
            recompute_id: 0,
            change_id: 0,
            necessary: false,
            never_computed: true,
            updater: Some(updater),
            inputs,
            dependants: Adjacency::new(),
        }
    }

    /// Get the node's provenance.
    pub fn kind(&self) -> NodeKind {
        if self.updater.is_some() {
            NodeKind::Derived
        } else {
            NodeKind::Source
        }
    }

    /// Get the node's height.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Get the current value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Get the stabilization number of the last compute step.
    pub fn recompute_id(&self) -> u64 {
        self.recompute_id
    }

    /// Get the stabilization number of the last actual value change.
    pub fn change_id(&self) -> u64 {
        self.change_id
    }

    /// Check whether this node is reachable from an observed node.
    pub fn is_necessary(&self) -> bool {
        self.necessary
    }

    /// Mark the node as reachable from an observed node.
    pub(crate) fn mark_necessary(&mut self) {
        self.necessary = true;
    }

    /// Get the inputs, in declared order.
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Get the registered direct consumers.
    pub fn dependants(&self) -> &[NodeId] {
        &self.dependants
    }

    /// Register a direct consumer.
    ///
    /// Deduplicated: observation may walk the same edge more than once
    /// across calls, and a duplicate entry would double-enqueue the
    /// consumer on every change. Returns whether the consumer was new.
    pub(crate) fn add_dependant(&mut self, id: NodeId) -> bool {
        if self.dependants.contains(&id) {
            return false;
        }
        self.dependants.push(id);
        true
    }

    /// Install an externally injected value.
    ///
    /// Used by the engine for source nodes only; bypasses the compute step
    /// and stamps `change_id` with the current stabilization number.
    pub(crate) fn inject(&mut self, value: V, stabilization: u64) {
        self.value = value;
        self.change_id = stabilization;
    }

    /// Run the compute step for the given stabilization number.
    ///
    /// Idempotent per pass: a node already computed at `stabilization` is
    /// left untouched. Sources stamp their bookkeeping and return without
    /// touching the value. Derived nodes apply the updater to
    /// `input_values` (the engine gathers them in declared input order) and
    /// install the result iff it differs from the current value by value
    /// equality, stamping `change_id`.
    ///
    /// Returns whether the value changed.
    pub(crate) fn compute(&mut self, stabilization: u64, input_values: &[V]) -> bool {
        if self.recompute_id == stabilization {
            return false;
        }
        self.never_computed = false;
        self.recompute_id = stabilization;

        let Some(updater) = self.updater.as_mut() else {
            return false;
        };

        let new_value = updater.update(input_values);
        if new_value != self.value {
            self.value = new_value;
            self.change_id = stabilization;
            return true;
        }
        false
    }

    /// Check whether this node needs recomputation.
    ///
    /// A node is stale when it is necessary and either has never computed
    /// or some input changed more recently than the node last recomputed.
    /// The engine supplies `newest_input_change`, the maximum `change_id`
    /// over the node's inputs (0 for a source). Evaluated fresh on every
    /// call; never cached.
    pub fn is_stale(&self, newest_input_change: u64) -> bool {
        self.necessary && (self.never_computed || newest_input_change > self.recompute_id)
    }
}

impl<V> Debug for Node<V>
where
    V: Clone + PartialEq + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind())
            .field("value", &self.value)
            .field("height", &self.height)
            .field("recompute_id", &self.recompute_id)
            .field("change_id", &self.change_id)
            .field("necessary", &self.necessary)
            .field("inputs", &self.inputs)
            .field("dependants", &self.dependants)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn sum_node(inputs: Adjacency, height: u64) -> Node<i64> {
        Node::derived(
            Box::new(|values: &[i64]| values.iter().sum::<i64>()),
            inputs,
            height,
            0,
        )
    }

    #[test]
    fn source_node_shape() {
        let node = Node::source(7);
        assert_eq!(node.kind(), NodeKind::Source);
        assert_eq!(node.height(), 0);
        assert!(node.inputs().is_empty());
        assert_eq!(*node.value(), 7);
    }

    #[test]
    fn derived_node_shape() {
        let node = sum_node(smallvec![NodeId::from_index(0)], 1);
        assert_eq!(node.kind(), NodeKind::Derived);
        assert_eq!(node.height(), 1);
        assert_eq!(node.inputs().len(), 1);
    }

    #[test]
    fn compute_is_idempotent_per_stabilization() {
        let mut node = sum_node(smallvec![NodeId::from_index(0)], 1);

        assert!(node.compute(1, &[5]));
        assert_eq!(*node.value(), 5);
        assert_eq!(node.recompute_id(), 1);

        // Same stabilization number: guard fires, inputs ignored.
        assert!(!node.compute(1, &[100]));
        assert_eq!(*node.value(), 5);
    }

    #[test]
    fn compute_stamps_change_id_only_on_change() {
        let mut node = sum_node(smallvec![NodeId::from_index(0)], 1);

        assert!(node.compute(1, &[5]));
        assert_eq!(node.change_id(), 1);

        // Same resulting value: recompute_id advances, change_id does not.
        assert!(!node.compute(2, &[5]));
        assert_eq!(node.recompute_id(), 2);
        assert_eq!(node.change_id(), 1);
    }

    #[test]
    fn source_compute_leaves_value_alone() {
        let mut node = Node::source(3);
        assert!(!node.compute(1, &[]));
        assert_eq!(*node.value(), 3);
        assert_eq!(node.recompute_id(), 1);
        assert_eq!(node.change_id(), 0);
    }

    #[test]
    fn staleness_requires_necessary() {
        let mut node = sum_node(smallvec![NodeId::from_index(0)], 1);

        // Never computed but not necessary: not stale.
        assert!(!node.is_stale(0));

        node.mark_necessary();
        assert!(node.is_stale(0));

        node.compute(1, &[5]);
        assert!(!node.is_stale(0));

        // Input changed after our last compute.
        assert!(node.is_stale(2));
        // Input changed before (or at) our last compute.
        assert!(!node.is_stale(1));
    }

    #[test]
    fn dependants_deduplicate() {
        let mut node = Node::source(0);
        let consumer = NodeId::from_index(9);

        assert!(node.add_dependant(consumer));
        assert!(!node.add_dependant(consumer));
        assert_eq!(node.dependants().len(), 1);
    }

    #[test]
    fn inject_stamps_change_id() {
        let mut node = Node::source(1);
        node.inject(2, 7);
        assert_eq!(*node.value(), 2);
        assert_eq!(node.change_id(), 7);
        assert_eq!(node.recompute_id(), 0);
    }
}
