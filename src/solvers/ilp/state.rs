//! ILP State

use std::fmt;

use good_lp::{Expression, ProblemVariables, Solution, Variable, variable};

/// Tolerance used when checking a constraint against solved values.
pub const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Relation operator for a linear ILP constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintRelation {
    /// Less than or equal (`lhs <= rhs`)
    Leq,

    /// Greater than or equal (`lhs >= rhs`)
    Geq,
}

impl ConstraintRelation {
    /// Relation symbol as written in LP files.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Leq => "<=",
            Self::Geq => ">=",
        }
    }
}

/// Family a constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Category total lower bound
    CategoryMinimum,

    /// Category total upper bound
    CategoryMaximum,

    /// Category total capped by another category's total
    Coupling,

    /// Per-record capacity across all categories
    Capacity,
}

impl ConstraintKind {
    /// Short human-readable name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CategoryMinimum => "category_minimum",
            Self::CategoryMaximum => "category_maximum",
            Self::Coupling => "coupling",
            Self::Capacity => "capacity",
        }
    }
}

/// Recorded linear constraint emitted during model construction.
#[derive(Debug, Clone)]
pub struct AllocationConstraint {
    /// Row name, unique within a model
    pub name: String,

    /// Constraint family
    pub kind: ConstraintKind,

    /// Left-hand side expression
    pub lhs: Expression,

    /// Relation operator
    pub relation: ConstraintRelation,

    /// Right-hand side scalar
    pub rhs: f64,
}

impl AllocationConstraint {
    /// Create a less-than-or-equal constraint.
    pub fn leq(name: String, kind: ConstraintKind, lhs: Expression, rhs: f64) -> Self {
        Self {
            name,
            kind,
            lhs,
            relation: ConstraintRelation::Leq,
            rhs,
        }
    }

    /// Create a greater-than-or-equal constraint.
    pub fn geq(name: String, kind: ConstraintKind, lhs: Expression, rhs: f64) -> Self {
        Self {
            name,
            kind,
            lhs,
            relation: ConstraintRelation::Geq,
            rhs,
        }
    }

    /// Whether the constraint holds for the given values, within [`FEASIBILITY_TOLERANCE`].
    pub fn holds(&self, solution: &impl Solution) -> bool {
        let lhs = solution.eval(&self.lhs);

        match self.relation {
            ConstraintRelation::Leq => lhs <= self.rhs + FEASIBILITY_TOLERANCE,
            ConstraintRelation::Geq => lhs >= self.rhs - FEASIBILITY_TOLERANCE,
        }
    }
}

/// Decision variables `v[category][record]`.
#[derive(Debug, Clone, Default)]
pub struct VariableGrid {
    rows: Vec<Vec<Variable>>,
    records: usize,
}

impl VariableGrid {
    /// Add one non-negative integer variable per `(category, record)` pair.
    pub fn add_to(pb: &mut ProblemVariables, categories: usize, records: usize) -> Self {
        let rows = (0..categories)
            .map(|_| {
                (0..records)
                    .map(|_| pb.add(variable().integer().min(0)))
                    .collect()
            })
            .collect();

        Self { rows, records }
    }

    /// Number of categories.
    pub fn categories(&self) -> usize {
        self.rows.len()
    }

    /// Number of records.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Total number of variables.
    pub fn len(&self) -> usize {
        self.rows.len() * self.records
    }

    /// Whether the grid holds no variables.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Variable of a `(category, record)` pair.
    pub fn get(&self, category: usize, record: usize) -> Option<Variable> {
        self.rows.get(category)?.get(record).copied()
    }

    /// All variables of a category, in record order.
    pub fn category(&self, category: usize) -> Option<&[Variable]> {
        self.rows.get(category).map(Vec::as_slice)
    }

    /// Iterate `(category, record, variable)` in category-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Variable)> + '_ {
        self.rows.iter().enumerate().flat_map(|(category, row)| {
            row.iter()
                .copied()
                .enumerate()
                .map(move |(record, var)| (category, record, var))
        })
    }

    /// `sum_j v[category][j]`
    pub fn category_total(&self, category: usize) -> Option<Expression> {
        self.category(category)
            .map(|row| row.iter().copied().map(Expression::from).sum())
    }

    /// `sum_i v[i][record]`
    pub fn record_total(&self, record: usize) -> Expression {
        self.rows
            .iter()
            .filter_map(|row| row.get(record).copied())
            .map(Expression::from)
            .sum()
    }
}

/// Display name of a decision variable.
pub fn variable_name(category: usize, record: usize) -> String {
    format!("v[{category}][{record}]")
}

/// Builder state for ILP problem variables, objective and constraints
pub struct ILPState {
    pb: ProblemVariables,
    objective: Expression,
    variables: VariableGrid,
    constraints: Vec<AllocationConstraint>,
}

impl fmt::Debug for ILPState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ILPState")
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

impl ILPState {
    /// Create ILP state with one allocation variable per `(category, record)` pair and an
    /// empty objective.
    pub fn with_allocation_variables(categories: usize, records: usize) -> Self {
        let mut pb = ProblemVariables::new();
        let variables = VariableGrid::add_to(&mut pb, categories, records);

        Self {
            pb,
            objective: Expression::default(),
            variables,
            constraints: Vec::new(),
        }
    }

    /// Decision variables.
    pub fn variables(&self) -> &VariableGrid {
        &self.variables
    }

    /// Number of recorded constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Add a term to the objective function.
    pub fn add_to_objective(&mut self, var: Variable, coefficient: f64) {
        self.objective += var * coefficient;
    }

    /// Record a constraint.
    pub fn add_constraint(&mut self, constraint: AllocationConstraint) {
        self.constraints.push(constraint);
    }

    /// Extract the problem variables, objective, decision variables and recorded constraints.
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
