//! Update Functions
//!
//! An [`Updater`] is the caller-supplied function slot of a derived node.
//! It maps the current values of the node's inputs, in declared order, to
//! the node's new value.
//!
//! # Contract
//!
//! Updaters must be pure: deterministic given their inputs and free of
//! observable side effects. They must not panic on valid input; a panic
//! during a stabilization pass propagates to the caller and leaves the
//! engine in an undefined state (see [`Engine`](super::Engine)).
//!
//! The trait takes `&mut self` only so an implementation may keep cheap
//! private scratch space between calls; observable behavior must stay pure.

/// A pure update function for a derived node.
///
/// Implemented for any `FnMut(&[V]) -> V` closure, so callers usually do
/// not implement this trait directly:
///
/// ```rust,ignore
/// let sum = engine.add_derived(|values: &[i64]| values.iter().sum(), &[a, b])?;
/// ```
pub trait Updater<V> {
    /// Compute the node's new value from its inputs' current values.
    ///
    /// `inputs` holds one value per declared input, in declaration order.
    fn update(&mut self, inputs: &[V]) -> V;
}

impl<V, F> Updater<V> for F
where
    F: FnMut(&[V]) -> V,
{
    fn update(&mut self, inputs: &[V]) -> V {
        self(inputs)
    }
}
