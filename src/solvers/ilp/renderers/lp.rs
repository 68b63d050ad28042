//! CPLEX LP Renderer
//!
//! Captures the allocation model as it's built and writes it as a CPLEX LP file, so the
//! persisted artifact is exactly the model handed to the solver.
//!
//! # Example
//!
//! ```rust,no_run
//! use outreach::{
//!     config::PlanConfig,
//!     profiles::CategoryProfiles,
//!     solvers::ilp::{ILPSolver, renderers::lp::LpRenderer},
//! };
//! # fn example(profiles: &CategoryProfiles) -> Result<(), Box<dyn std::error::Error>> {
//!
//! let mut renderer = LpRenderer::new("allocation.lp");
//!
//! let _allocation = ILPSolver::solve_with_observer(profiles, &PlanConfig::default(), &mut renderer)?;
//!
//! renderer.write()?;
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::{self, Write as _},
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use good_lp::{Expression, IntoAffineExpression, Variable};
use rustc_hash::FxHashMap;
use tracing::info;

use crate::{
    categories::category_label,
    solvers::ilp::{ILPObserver, state::AllocationConstraint},
};

/// Width after which a row is continued on the next line.
pub const LINE_WIDTH: usize = 78;

/// Errors that can occur while writing the LP file.
#[derive(Debug, thiserror::Error)]
pub enum LpWriteError {
    /// Failed to write to the output file.
    #[error("failed to write LP file: {0}")]
    Io(#[from] io::Error),

    /// Failed to format the LP text.
    #[error("failed to format LP text: {0}")]
    Format(#[from] fmt::Error),
}

/// Decision variable captured by the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturedVariable {
    /// Category index
    pub category: usize,

    /// Record index
    pub record: usize,

    /// ILP decision variable
    pub var: Variable,
}

impl CapturedVariable {
    /// LP-safe name, `v_<category>_<record>`.
    pub fn lp_name(&self) -> String {
        format!("v_{}_{}", self.category, self.record)
    }
}

/// Captured model formulation.
#[derive(Debug, Clone, Default)]
pub struct LpFormulation {
    /// Decision variables in creation order
    pub variables: Vec<CapturedVariable>,

    /// Variable -> position in `variables`
    pub positions: FxHashMap<Variable, usize>,

    /// Objective terms: `var` -> unit revenue
    pub objective_terms: FxHashMap<Variable, f64>,

    /// Constraints in construction order
    pub constraints: Vec<AllocationConstraint>,
}

impl LpFormulation {
    fn name_of(&self, var: Variable) -> String {
        self.positions
            .get(&var)
            .and_then(|&position| self.variables.get(position))
            .map_or_else(
                || format!("x_{var:?}").replace(|ch: char| !ch.is_ascii_alphanumeric(), "_"),
                CapturedVariable::lp_name,
            )
    }

    fn position_of(&self, var: Variable) -> usize {
        self.positions.get(&var).copied().unwrap_or(usize::MAX)
    }

    /// Non-zero terms of an expression, ordered by variable creation.
    fn ordered_terms(&self, expr: &Expression) -> Vec<(Variable, f64)> {
        let mut terms: Vec<(Variable, f64)> = expr
            .linear_coefficients()
            .filter(|(_, coeff)| coeff.abs() >= f64::EPSILON)
            .collect();

        terms.sort_by_key(|(var, _)| self.position_of(*var));

        terms
    }
}

/// LP renderer that implements `ILPObserver`.
#[derive(Debug, Clone)]
pub struct LpRenderer {
    formulation: LpFormulation,
    output_path: PathBuf,
}

impl LpRenderer {
    /// Create a new LP renderer writing to `output_path`.
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            formulation: LpFormulation::default(),
            output_path: output_path.into(),
        }
    }

    /// Captured formulation.
    pub fn formulation(&self) -> &LpFormulation {
        &self.formulation
    }

    /// Get the output path.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Render the captured model as CPLEX LP text.
    ///
    /// # Errors
    ///
    /// Returns [`LpWriteError::Format`] if the text cannot be formatted.
    pub fn render(&self) -> Result<String, LpWriteError> {
        let formulation = &self.formulation;
        let mut output = String::new();

        self.render_header(&mut output)?;

        output.push_str("Maximize\n");
        output.push_str(&Self::render_objective(formulation));

        output.push_str("Subject To\n");
        Self::render_constraints(formulation, &mut output)?;

        output.push_str("Bounds\n");
        for captured in &formulation.variables {
            writeln!(output, " {} >= 0", captured.lp_name())?;
        }

        if !formulation.variables.is_empty() {
            output.push_str("General\n");
            let names: Vec<String> = formulation
                .variables
                .iter()
                .map(CapturedVariable::lp_name)
                .collect();
            output.push_str(&wrap_row(" ", &names));
        }

        output.push_str("End\n");

        Ok(output)
    }

    /// Write the rendered model to the output file.
    ///
    /// # Errors
    ///
    /// Returns [`LpWriteError::Io`] if the file cannot be created or written.
    pub fn write(&self) -> Result<(), LpWriteError> {
        let mut file = BufWriter::new(File::create(&self.output_path)?);

        self.write_to(&mut file)?;

        file.flush()?;

        info!(
            path = %self.output_path.display(),
            variables = self.formulation.variables.len(),
            constraints = self.formulation.constraints.len(),
            "wrote LP file"
        );

        Ok(())
    }

    /// Write the rendered model to any writer.
    ///
    /// # Errors
    ///
    /// Returns an [`LpWriteError`] if the model cannot be rendered or the writer fails.
    pub fn write_to(&self, writer: &mut impl Write) -> Result<(), LpWriteError> {
        writer.write_all(self.render()?.as_bytes())?;

        Ok(())
    }

    fn render_header(&self, output: &mut String) -> fmt::Result {
        let formulation = &self.formulation;
        let categories = formulation
            .variables
            .iter()
            .map(|captured| captured.category + 1)
            .max()
            .unwrap_or(0);
        let records = formulation
            .variables
            .iter()
            .map(|captured| captured.record + 1)
            .max()
            .unwrap_or(0);

        output.push_str("\\ Outreach allocation model\n");
        writeln!(
            output,
            "\\ {categories} categories x {records} records, {} constraints",
            formulation.constraints.len()
        )?;
        output.push_str("\\ v_i_j is the quantity v[i][j] of category i sent to record j\n");

        for category in 0..categories {
            if let Some(label) = category_label(category) {
                writeln!(output, "\\ category {category} = {label}")?;
            }
        }

        Ok(())
    }

    fn render_objective(formulation: &LpFormulation) -> String {
        let mut terms: Vec<(Variable, f64)> = formulation
            .objective_terms
            .iter()
            .map(|(var, coeff)| (*var, *coeff))
            .filter(|(_, coeff)| coeff.abs() >= f64::EPSILON)
            .collect();

        terms.sort_by_key(|(var, _)| formulation.position_of(*var));

        let rendered = render_terms(formulation, &terms);

        if rendered.is_empty() {
            return String::from(" obj: 0\n");
        }

        wrap_row(" obj:", &rendered)
    }

    fn render_constraints(formulation: &LpFormulation, output: &mut String) -> fmt::Result {
        for constraint in &formulation.constraints {
            let terms = formulation.ordered_terms(&constraint.lhs);

            // LP rows keep constants on the right-hand side
            let rhs = constraint.rhs - constraint.lhs.constant();

            if terms.is_empty() {
                writeln!(
                    output,
                    "\\ {}: 0 {} {} (no variables)",
                    constraint.name,
                    constraint.relation.symbol(),
                    render_number(rhs)
                )?;
                continue;
            }

            let mut tokens = render_terms(formulation, &terms);
            tokens.push(String::from(constraint.relation.symbol()));
            tokens.push(render_signed(rhs));

            output.push_str(&wrap_row(&format!(" {}:", constraint.name), &tokens));
        }

        Ok(())
    }
}

impl ILPObserver for LpRenderer {
    fn on_allocation_variable(&mut self, category: usize, record: usize, var: Variable) {
        let formulation = &mut self.formulation;

        formulation
            .positions
            .insert(var, formulation.variables.len());
        formulation.variables.push(CapturedVariable {
            category,
            record,
            var,
        });
    }

    fn on_objective_term(&mut self, var: Variable, coefficient: f64) {
        *self.formulation.objective_terms.entry(var).or_insert(0.0) += coefficient;
    }

    fn on_constraint(&mut self, constraint: &AllocationConstraint) {
        self.formulation.constraints.push(constraint.clone());
    }
}

/// Render terms as LP tokens: `10 v_0_0`, `+ 2.5 v_0_1`, `- v_3_0`.
fn render_terms(formulation: &LpFormulation, terms: &[(Variable, f64)]) -> Vec<String> {
    terms
        .iter()
        .enumerate()
        .map(|(idx, (var, coeff))| {
            let name = formulation.name_of(*var);
            let magnitude = coeff.abs();

            let term = if (magnitude - 1.0).abs() < f64::EPSILON {
                name
            } else {
                format!("{} {name}", render_number(magnitude))
            };

            match (idx, *coeff < 0.0) {
                (0, false) => term,
                (_, false) => format!("+ {term}"),
                (_, true) => format!("- {term}"),
            }
        })
        .collect()
}

fn render_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}

fn render_signed(value: f64) -> String {
    if value < 0.0 {
        format!("-{}", render_number(value.abs()))
    } else {
        render_number(value)
    }
}

/// Join `tokens` after `prefix`, starting a continuation line whenever [`LINE_WIDTH`] would be
/// exceeded.
fn wrap_row(prefix: &str, tokens: &[String]) -> String {
    let mut output = String::from(prefix);
    let mut line_len = prefix.len();

    for token in tokens {
        if line_len + 1 + token.len() > LINE_WIDTH && line_len > prefix.len() {
            output.push_str("\n   ");
            line_len = 3;
        } else if !output.is_empty() && !output.ends_with(' ') {
            output.push(' ');
            line_len += 1;
        }

        output.push_str(token);
        line_len += token.len();
    }

    output.push('\n');

    output
}

#[cfg(test)]
mod tests {
    use std::fs;

    use good_lp::{ProblemVariables, variable};
    use tempfile::tempdir;
    use testresult::TestResult;

    use crate::solvers::ilp::state::ConstraintKind;

    use super::*;

    fn two_variable_renderer() -> (LpRenderer, Variable, Variable) {
        let mut pb = ProblemVariables::new();
        let a = pb.add(variable().integer().min(0));
        let b = pb.add(variable().integer().min(0));

        let mut renderer = LpRenderer::new("allocation.lp");

        renderer.on_allocation_variable(0, 0, a);
        renderer.on_objective_term(a, 10.0);
        renderer.on_allocation_variable(7, 0, b);
        renderer.on_objective_term(b, 2.5);

        (renderer, a, b)
    }

    #[test]
    fn render_writes_all_sections_in_order() -> TestResult {
        let (mut renderer, a, b) = two_variable_renderer();

        renderer.on_constraint(&AllocationConstraint::leq(
            String::from("capacity_0"),
            ConstraintKind::Capacity,
            a + b,
            6.0,
        ));

        let output = renderer.render()?;

        let sections = ["Maximize", "Subject To", "Bounds", "General", "End"]
            .map(|section| output.find(&format!("\n{section}\n")));

        assert!(sections.iter().all(Option::is_some));
        assert!(sections.windows(2).all(|pair| pair.first() < pair.get(1)));

        assert!(output.starts_with("\\ Outreach allocation model\n"));
        assert!(output.contains(" obj: 10 v_0_0 + 2.5 v_7_0\n"));
        assert!(output.contains(" capacity_0: v_0_0 + v_7_0 <= 6\n"));
        assert!(output.contains(" v_7_0 >= 0\n"));
        assert!(output.contains("\\ category 7 = c42\n"));
        assert!(output.ends_with("End\n"));

        Ok(())
    }

    #[test]
    fn coupling_rows_render_negative_terms() -> TestResult {
        let (mut renderer, a, b) = two_variable_renderer();

        renderer.on_constraint(&AllocationConstraint::leq(
            String::from("couple_7_0"),
            ConstraintKind::Coupling,
            Expression::from(b) - a,
            0.0,
        ));

        let output = renderer.render()?;

        assert!(output.contains(" couple_7_0: - v_0_0 + v_7_0 <= 0\n"));

        Ok(())
    }

    #[test]
    fn constant_only_rows_are_commented_out() -> TestResult {
        let mut renderer = LpRenderer::new("allocation.lp");

        renderer.on_constraint(&AllocationConstraint::geq(
            String::from("bound_min_0"),
            ConstraintKind::CategoryMinimum,
            Expression::default(),
            1000.0,
        ));

        let output = renderer.render()?;

        assert!(output.contains("\\ bound_min_0: 0 >= 1000 (no variables)\n"));
        assert!(output.contains(" obj: 0\n"));
        assert!(!output.contains("General"));

        Ok(())
    }

    #[test]
    fn long_rows_wrap_at_line_width() -> TestResult {
        let mut pb = ProblemVariables::new();
        let mut renderer = LpRenderer::new("allocation.lp");

        for record in 0..50 {
            let var = pb.add(variable().integer().min(0));
            renderer.on_allocation_variable(0, record, var);
            renderer.on_objective_term(var, 123.456);
        }

        let output = renderer.render()?;

        assert!(output.lines().all(|line| line.len() <= LINE_WIDTH));
        assert!(output.contains("v_0_49"));

        Ok(())
    }

    #[test]
    fn render_number_drops_integral_fraction() {
        assert_eq!(render_number(10.0), "10");
        assert_eq!(render_number(10.5), "10.5");
        assert_eq!(render_signed(-3.0), "-3");
    }

    #[test]
    fn write_creates_file() -> TestResult {
        let dir = tempdir()?;
        let path = dir.path().join("allocation.lp");

        let (mut renderer, _, _) = two_variable_renderer();
        renderer.output_path = path.clone();

        assert_eq!(renderer.output_path(), path.as_path());

        renderer.write()?;

        let contents = fs::read_to_string(&path)?;

        assert_eq!(contents, renderer.render()?);

        Ok(())
    }
}
