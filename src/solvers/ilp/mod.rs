//! ILP Solver

use std::time::Instant;

use good_lp::{IntoAffineExpression, ResolutionError, Solution, SolverModel};
use num_traits::ToPrimitive;
use tracing::{debug, error, info};

#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs as default_solver;
#[cfg(all(not(feature = "solver-highs"), feature = "solver-microlp"))]
use good_lp::solvers::microlp::microlp as default_solver;

use crate::{
    config::PlanConfig,
    profiles::CategoryProfiles,
    solvers::{
        Allocation, Solver, SolverError,
        ilp::state::{AllocationConstraint, ConstraintRelation, FEASIBILITY_TOLERANCE, VariableGrid},
    },
};

pub mod builder;
pub mod observer;
pub mod renderers;
pub mod state;

pub use builder::{AllocationModel, ModelError};
pub use observer::{ILPObserver, NoopObserver};

/// Largest distance from an integer a solved value may have.
pub const INTEGRALITY_TOLERANCE: f64 = 1e-6;

/// Solver using Integer Linear Programming (ILP)
#[derive(Debug)]
pub struct ILPSolver;

impl ILPSolver {
    /// Solve with an observer for capturing the ILP formulation.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if the model cannot be built or the engine reports an error.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use outreach::{
    ///     config::PlanConfig,
    ///     profiles::CategoryProfiles,
    ///     solvers::ilp::{ILPSolver, renderers::lp::LpRenderer},
    /// };
    /// # fn example(profiles: &CategoryProfiles) -> Result<(), Box<dyn std::error::Error>> {
    ///
    /// let mut renderer = LpRenderer::new("allocation.lp");
    /// let allocation = ILPSolver::solve_with_observer(profiles, &PlanConfig::default(), &mut renderer)?;
    /// renderer.write()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn solve_with_observer<O: ILPObserver + ?Sized>(
        profiles: &CategoryProfiles,
        config: &PlanConfig,
        observer: &mut O,
    ) -> Result<Allocation, SolverError> {
        let model = AllocationModel::build(profiles, config, observer)?;

        Self::solve_model(model)
    }

    /// Solve an already-built model.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if the engine reports an error or returns non-integral values.
    pub fn solve_model(model: AllocationModel) -> Result<Allocation, SolverError> {
        let (pb, objective, variables, constraints) = model.into_parts();

        // A model without records has only constant rows; the engine is not needed (and some
        // backends reject empty problems).
        if variables.records() == 0 {
            ensure_constant_rows_hold(&constraints)?;

            return Ok(Allocation::new(
                vec![Vec::new(); variables.categories()],
                objective.constant(),
            ));
        }

        info!(
            variables = variables.len(),
            constraints = constraints.len(),
            "solving allocation model"
        );

        let start = Instant::now();

        let mut model = pb.maximise(objective.clone()).using(default_solver);

        model = apply_recorded_constraints(model, constraints);

        let solution = model.solve().inspect_err(|source| {
            error!(%source, "solver reported an error");
        })?;

        let objective_value = solution.eval(&objective);

        info!(
            objective = objective_value,
            elapsed_ms = start.elapsed().as_millis(),
            "solved allocation model"
        );

        let quantities = collect_quantities(&solution, &variables)?;

        Ok(Allocation::new(quantities, objective_value))
    }
}

impl Solver for ILPSolver {
    fn solve(profiles: &CategoryProfiles, config: &PlanConfig) -> Result<Allocation, SolverError> {
        let mut observer = NoopObserver;

        Self::solve_with_observer(profiles, config, &mut observer)
    }
}

fn apply_recorded_constraints<S: SolverModel>(
    mut model: S,
    constraints: Vec<AllocationConstraint>,
) -> S {
    for constraint in constraints {
        model = match constraint.relation {
            ConstraintRelation::Leq => model.with(constraint.lhs.leq(constraint.rhs)),
            ConstraintRelation::Geq => model.with(constraint.lhs.geq(constraint.rhs)),
        };
    }

    model
}

/// Check rows that have no variables left, which the engine never sees.
fn ensure_constant_rows_hold(constraints: &[AllocationConstraint]) -> Result<(), SolverError> {
    for constraint in constraints {
        let lhs = constraint.lhs.constant();

        let holds = match constraint.relation {
            ConstraintRelation::Leq => lhs <= constraint.rhs + FEASIBILITY_TOLERANCE,
            ConstraintRelation::Geq => lhs >= constraint.rhs - FEASIBILITY_TOLERANCE,
        };

        if !holds {
            debug!(constraint = %constraint.name, "constant row is violated");

            return Err(ResolutionError::Infeasible.into());
        }
    }

    Ok(())
}

/// Read back every decision variable as a non-negative integer quantity.
fn collect_quantities(
    solution: &impl Solution,
    variables: &VariableGrid,
) -> Result<Vec<Vec<u32>>, SolverError> {
    let mut quantities = vec![Vec::with_capacity(variables.records()); variables.categories()];

    for (category, record, var) in variables.iter() {
        let quantity = to_quantity(category, record, solution.value(var))?;

        if let Some(row) = quantities.get_mut(category) {
            row.push(quantity);
        }
    }

    Ok(quantities)
}

/// The engine returns floats; accept values within [`INTEGRALITY_TOLERANCE`] of an integer.
fn to_quantity(category: usize, record: usize, value: f64) -> Result<u32, SolverError> {
    let rounded = value.round();

    if (value - rounded).abs() > INTEGRALITY_TOLERANCE {
        return Err(SolverError::NonIntegralValue {
            category,
            record,
            value,
        });
    }

    rounded.to_u32().ok_or(SolverError::ValueOutOfRange {
        category,
        record,
        value,
    })
}
