//! ILP Observer

use good_lp::Variable;

use crate::solvers::ilp::state::AllocationConstraint;

/// Observer trait for capturing the ILP formulation as it's built.
///
/// The model builder stays the only implementation of ILP construction; observers passively
/// record what happens, e.g. to persist the model for audit.
pub trait ILPObserver {
    /// Called when the allocation variable `v[category][record]` is created.
    fn on_allocation_variable(&mut self, category: usize, record: usize, var: Variable);

    /// Called when a term is added to the objective function.
    ///
    /// `coefficient` is the expected revenue of one unit of `var`.
    fn on_objective_term(&mut self, _var: Variable, _coefficient: f64) {}

    /// Called when a constraint is added to the model.
    fn on_constraint(&mut self, constraint: &AllocationConstraint);
}

/// Observer that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ILPObserver for NoopObserver {
    fn on_allocation_variable(&mut self, _category: usize, _record: usize, _var: Variable) {}

    fn on_constraint(&mut self, _constraint: &AllocationConstraint) {}
}
