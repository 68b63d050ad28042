//! Solvers for Allocation Plans

use good_lp::ResolutionError;
use thiserror::Error;

use crate::{
    config::PlanConfig,
    profiles::CategoryProfiles,
    solvers::ilp::builder::ModelError,
};

pub mod ilp;

/// Solver Errors
#[derive(Debug, Error)]
pub enum SolverError {
    /// Wrapped model construction error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Wrapped solver resolution error (infeasible, unbounded or engine failure)
    #[error(transparent)]
    ResolutionError(#[from] ResolutionError),

    /// The engine returned a value that is not an integer.
    #[error("solved value for v[{category}][{record}] is not integral: {value}")]
    NonIntegralValue {
        /// Category index
        category: usize,
        /// Record index
        record: usize,
        /// Value returned by the engine
        value: f64,
    },

    /// The engine returned a value outside the representable quantity range.
    #[error("solved value for v[{category}][{record}] is out of range: {value}")]
    ValueOutOfRange {
        /// Category index
        category: usize,
        /// Record index
        record: usize,
        /// Value returned by the engine
        value: f64,
    },
}

/// Solved allocation: integer quantities per `(category, record)` and the achieved objective.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    quantities: Vec<Vec<u32>>,
    objective: f64,
}

impl Allocation {
    /// Create an allocation from quantities indexed `[category][record]`.
    pub fn new(quantities: Vec<Vec<u32>>, objective: f64) -> Self {
        Self {
            quantities,
            objective,
        }
    }

    /// Objective value reported by the solver.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Number of categories.
    pub fn category_count(&self) -> usize {
        self.quantities.len()
    }

    /// Number of records.
    pub fn record_count(&self) -> usize {
        self.quantities.first().map_or(0, Vec::len)
    }

    /// Quantity of `category` sent to `record`.
    pub fn quantity(&self, category: usize, record: usize) -> Option<u32> {
        self.quantities.get(category)?.get(record).copied()
    }

    /// Total quantity of a category across all records.
    pub fn category_total(&self, category: usize) -> u64 {
        self.quantities
            .get(category)
            .map_or(0, |row| row.iter().copied().map(u64::from).sum())
    }

    /// Total quantity sent to a record across all categories.
    pub fn record_total(&self, record: usize) -> u64 {
        self.quantities
            .iter()
            .filter_map(|row| row.get(record).copied())
            .map(u64::from)
            .sum()
    }

    /// Iterate `(category, record, quantity)` in category-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, u32)> + '_ {
        self.quantities
            .iter()
            .enumerate()
            .flat_map(|(category, row)| {
                row.iter()
                    .copied()
                    .enumerate()
                    .map(move |(record, quantity)| (category, record, quantity))
            })
    }

    /// Recompute expected revenue from the profiles:
    /// `sum_j size_j * sum_i cs[i][j] * aov[i][j] * v[i][j]`.
    ///
    /// Cells outside the profile shape contribute nothing.
    pub fn revenue(&self, profiles: &CategoryProfiles) -> f64 {
        self.iter()
            .filter_map(|(category, record, quantity)| {
                profiles
                    .unit_revenue(category, record)
                    .map(|unit| unit * f64::from(quantity))
            })
            .sum()
    }

    /// Expected revenue of one category.
    pub fn category_revenue(&self, profiles: &CategoryProfiles, category: usize) -> f64 {
        self.quantities
            .get(category)
            .into_iter()
            .flat_map(|row| row.iter().copied().enumerate())
            .filter_map(|(record, quantity)| {
                profiles
                    .unit_revenue(category, record)
                    .map(|unit| unit * f64::from(quantity))
            })
            .sum()
    }

    /// Email volume estimate of one category, when the profiles carry volumes.
    pub fn category_emails(&self, profiles: &CategoryProfiles, category: usize) -> Option<f64> {
        if !profiles.has_email_volumes() {
            return None;
        }

        let total = self
            .quantities
            .get(category)
            .into_iter()
            .flat_map(|row| row.iter().copied().enumerate())
            .filter_map(|(record, quantity)| {
                profiles
                    .email_volume(category, record)
                    .map(|volume| volume * f64::from(quantity))
            })
            .sum();

        Some(total)
    }
}

/// Trait for solving allocation plans
pub trait Solver {
    /// Build and solve the allocation model for the given profiles and plan.
    ///
    /// # Errors
    ///
    /// Returns a [`SolverError`] if the model cannot be built or the engine reports an error.
    fn solve(profiles: &CategoryProfiles, config: &PlanConfig) -> Result<Allocation, SolverError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::categories::CATEGORY_COUNT;

    use super::*;

    fn allocation() -> Allocation {
        let mut quantities = vec![vec![0, 0]; CATEGORY_COUNT];

        if let Some(row) = quantities.get_mut(0) {
            *row = vec![1, 2];
        }

        if let Some(row) = quantities.get_mut(8) {
            *row = vec![3, 0];
        }

        Allocation::new(quantities, 0.0)
    }

    #[test]
    fn totals_sum_rows_and_columns() {
        let allocation = allocation();

        assert_eq!(allocation.category_total(0), 3);
        assert_eq!(allocation.category_total(8), 3);
        assert_eq!(allocation.category_total(9), 0);
        assert_eq!(allocation.record_total(0), 4);
        assert_eq!(allocation.record_total(1), 2);
        assert_eq!(allocation.record_count(), 2);
        assert_eq!(allocation.iter().count(), 2 * CATEGORY_COUNT);
    }

    #[test]
    fn revenue_weights_quantities_by_unit_revenue() -> TestResult {
        let profiles = CategoryProfiles::new(
            vec![2.0, 10.0],
            vec![vec![0.5, 0.25]; CATEGORY_COUNT],
            vec![vec![4.0, 8.0]; CATEGORY_COUNT],
        )?;

        let allocation = allocation();

        // record 0: 2 * 0.5 * 4 = 4 per unit, 4 units; record 1: 10 * 0.25 * 8 = 20 per unit, 2 units
        assert!((allocation.revenue(&profiles) - 56.0).abs() < 1e-9);
        assert!((allocation.category_revenue(&profiles, 0) - 44.0).abs() < 1e-9);
        assert!((allocation.category_revenue(&profiles, 8) - 12.0).abs() < 1e-9);

        Ok(())
    }

    #[test]
    fn email_estimate_needs_volumes() -> TestResult {
        let profiles = CategoryProfiles::new(
            vec![1.0, 1.0],
            vec![vec![0.5, 0.5]; CATEGORY_COUNT],
            vec![vec![1.0, 1.0]; CATEGORY_COUNT],
        )?;

        let allocation = allocation();

        assert_eq!(allocation.category_emails(&profiles, 0), None);

        let profiles = profiles.with_email_volumes(vec![vec![2.0, 5.0]; CATEGORY_COUNT])?;

        assert_eq!(allocation.category_emails(&profiles, 0), Some(12.0));

        Ok(())
    }
}
