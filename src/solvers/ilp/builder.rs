//! ILP Model Builder
//!
//! Assembles the revenue-maximisation model:
//!
//! - one non-negative integer variable `v[i][j]` per category `i` and record `j`,
//! - objective `sum_j size_j * sum_i cs[i][j] * aov[i][j] * v[i][j]`,
//! - `min_i <= sum_j v[i][j] <= max_i` for every configured bound,
//! - `sum_j v[d][j] <= sum_j v[a][j]` for every configured coupling,
//! - `sum_i v[i][j] <= capacity_multiplier * size_j` for every record.

use std::fmt;

use good_lp::{Expression, ProblemVariables};
use thiserror::Error;
use tracing::debug;

use crate::{
    categories::CATEGORY_COUNT,
    config::PlanConfig,
    profiles::CategoryProfiles,
    solvers::ilp::{
        observer::ILPObserver,
        state::{AllocationConstraint, ConstraintKind, ILPState, VariableGrid},
    },
};

/// Model construction errors
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// A rule refers to a category that has no variables
    #[error("category {0} is not modeled")]
    UnknownCategory(usize),

    /// An objective coefficient is NaN or infinite
    #[error("objective coefficient for v[{category}][{record}] is not finite: {value}")]
    NonFiniteCoefficient {
        /// Category index
        category: usize,
        /// Record index
        record: usize,
        /// Offending coefficient
        value: f64,
    },
}

/// Fully assembled allocation model, ready to hand to a solver.
pub struct AllocationModel {
    pb: ProblemVariables,
    objective: Expression,
    variables: VariableGrid,
    constraints: Vec<AllocationConstraint>,
}

impl fmt::Debug for AllocationModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationModel")
            .field("pb", &"<ProblemVariables>")
            .field("objective", &"<Expression>")
            .field(
                "variables",
                &format!("[{} variables]", self.variables.len()),
            )
            .field(
                "constraints",
                &format!("[{} constraints]", self.constraints.len()),
            )
            .finish()
    }
}

impl AllocationModel {
    /// Build the model for the given profiles and plan.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if a rule names an unknown category or a revenue coefficient is
    /// not finite.
    pub fn build<O: ILPObserver + ?Sized>(
        profiles: &CategoryProfiles,
        config: &PlanConfig,
        observer: &mut O,
    ) -> Result<Self, ModelError> {
        let mut state =
            ILPState::with_allocation_variables(CATEGORY_COUNT, profiles.record_count());

        add_revenue_objective(&mut state, profiles, observer)?;
        add_category_bounds(&mut state, config, observer)?;
        add_couplings(&mut state, config, observer)?;
        add_record_capacity(&mut state, profiles, config, observer);

        let (pb, objective, variables, constraints) = state.into_parts();

        debug!(
            variables = variables.len(),
            constraints = constraints.len(),
            "built allocation model"
        );

        Ok(Self {
            pb,
            objective,
            variables,
            constraints,
        })
    }

    /// Decision variables.
    pub fn variables(&self) -> &VariableGrid {
        &self.variables
    }

    /// Objective expression (maximised).
    pub fn objective(&self) -> &Expression {
        &self.objective
    }

    /// All constraints, in construction order.
    pub fn constraints(&self) -> &[AllocationConstraint] {
        &self.constraints
    }

    /// Extract the problem variables, objective, decision variables and constraints.
    pub fn into_parts(
        self,
    ) -> (
        ProblemVariables,
        Expression,
        VariableGrid,
        Vec<AllocationConstraint>,
    ) {
        (self.pb, self.objective, self.variables, self.constraints)
    }
}

fn add_revenue_objective<O: ILPObserver + ?Sized>(
    state: &mut ILPState,
    profiles: &CategoryProfiles,
    observer: &mut O,
) -> Result<(), ModelError> {
    let cells: Vec<_> = state.variables().iter().collect();

    for (category, record, var) in cells {
        observer.on_allocation_variable(category, record, var);

        let coefficient = profiles.unit_revenue(category, record).unwrap_or(0.0);

        if !coefficient.is_finite() {
            return Err(ModelError::NonFiniteCoefficient {
                category,
                record,
                value: coefficient,
            });
        }

        state.add_to_objective(var, coefficient);
        observer.on_objective_term(var, coefficient);
    }

    Ok(())
}

fn add_category_bounds<O: ILPObserver + ?Sized>(
    state: &mut ILPState,
    config: &PlanConfig,
    observer: &mut O,
) -> Result<(), ModelError> {
    for bound in &config.bounds {
        let total = category_total(state.variables(), bound.category)?;

        push(
            state,
            observer,
            AllocationConstraint::geq(
                format!("bound_min_{}", bound.category),
                ConstraintKind::CategoryMinimum,
                total.clone(),
                f64::from(bound.min),
            ),
        );

        push(
            state,
            observer,
            AllocationConstraint::leq(
                format!("bound_max_{}", bound.category),
                ConstraintKind::CategoryMaximum,
                total,
                f64::from(bound.max),
            ),
        );
    }

    Ok(())
}

fn add_couplings<O: ILPObserver + ?Sized>(
    state: &mut ILPState,
    config: &PlanConfig,
    observer: &mut O,
) -> Result<(), ModelError> {
    for coupling in &config.couplings {
        let dependent = category_total(state.variables(), coupling.dependent)?;
        let anchor = category_total(state.variables(), coupling.anchor)?;

        push(
            state,
            observer,
            AllocationConstraint::leq(
                format!("couple_{}_{}", coupling.dependent, coupling.anchor),
                ConstraintKind::Coupling,
                dependent - anchor,
                0.0,
            ),
        );
    }

    Ok(())
}

fn add_record_capacity<O: ILPObserver + ?Sized>(
    state: &mut ILPState,
    profiles: &CategoryProfiles,
    config: &PlanConfig,
    observer: &mut O,
) {
    for (record, size) in profiles.sizes().iter().copied().enumerate() {
        let total = state.variables().record_total(record);

        push(
            state,
            observer,
            AllocationConstraint::leq(
                format!("capacity_{record}"),
                ConstraintKind::Capacity,
                total,
                config.capacity_multiplier * size,
            ),
        );
    }
}

fn category_total(variables: &VariableGrid, category: usize) -> Result<Expression, ModelError> {
    variables
        .category_total(category)
        .ok_or(ModelError::UnknownCategory(category))
}

fn push<O: ILPObserver + ?Sized>(
    state: &mut ILPState,
    observer: &mut O,
    constraint: AllocationConstraint,
) {
    observer.on_constraint(&constraint);
    state.add_constraint(constraint);
}
