//! Allocation Pipeline
//!
//! Load the campaign dataset, reduce it to the modeled categories, solve the allocation model
//! and persist the formulation.

use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{info, warn};

use crate::{
    categories::PROFILE_SOURCES,
    config::{ConfigError, PlanConfig},
    dataset::{Dataset, DatasetError},
    profiles::{CategoryProfiles, ProfileError},
    report::Report,
    solvers::{
        Allocation, Solver, SolverError,
        ilp::{ILPSolver, renderers::lp::{LpRenderer, LpWriteError}},
    },
};

/// Default path of the LP artifact.
pub const DEFAULT_LP_PATH: &str = "allocation.lp";

/// Errors that can occur during a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid plan configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Malformed input dataset
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Dataset could not be reduced to the modeled categories
    #[error(transparent)]
    Profile(#[from] ProfileError),

    /// Model construction or solve failed
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// The LP artifact could not be written
    #[error(transparent)]
    LpWrite(#[from] LpWriteError),
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Profiles the model was built from
    pub profiles: CategoryProfiles,

    /// Solved allocation
    pub allocation: Allocation,

    /// Wall time spent building and solving the model
    pub elapsed: Duration,
}

impl PlanOutcome {
    /// Operator report for this outcome.
    pub fn report<'a>(&'a self, config: &'a PlanConfig) -> Report<'a> {
        Report::new(&self.profiles, &self.allocation, config, self.elapsed)
    }
}

/// End-to-end allocation run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PlanConfig,
    lp_output: Option<PathBuf>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(PlanConfig::default())
    }
}

impl Pipeline {
    /// Create a pipeline writing the LP artifact to [`DEFAULT_LP_PATH`].
    pub fn new(config: PlanConfig) -> Self {
        Self {
            config,
            lp_output: Some(PathBuf::from(DEFAULT_LP_PATH)),
        }
    }

    /// Set where the LP artifact is written; `None` skips it.
    #[must_use]
    pub fn with_lp_output(mut self, path: Option<PathBuf>) -> Self {
        self.lp_output = path;
        self
    }

    /// Plan configuration.
    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// LP artifact path, if one is written.
    pub fn lp_output(&self) -> Option<&Path> {
        self.lp_output.as_deref()
    }

    /// Run the pipeline on a CSV input file.
    ///
    /// The LP artifact is only written once the model has been solved.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] if the input is malformed, the solver fails, or the artifact
    /// cannot be written.
    pub fn run(&self, input: impl AsRef<Path>) -> Result<PlanOutcome, PipelineError> {
        self.config.validate()?;

        let dataset = Dataset::from_path(input.as_ref(), self.config.expected_records)?;

        info!(
            path = %input.as_ref().display(),
            records = dataset.record_count(),
            "loaded dataset"
        );

        self.run_dataset(&dataset)
    }

    /// Run the pipeline on an already-loaded dataset.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] if the dataset cannot be reduced, the solver fails, or the
    /// artifact cannot be written.
    pub fn run_dataset(&self, dataset: &Dataset) -> Result<PlanOutcome, PipelineError> {
        let mut profiles = CategoryProfiles::from_dataset(dataset, &PROFILE_SOURCES)?;

        if let Some(source) = self.config.volume_source {
            let volumes = source.modeled_volumes(dataset.email_volumes())?;

            profiles = profiles.with_email_volumes(volumes)?;
        }

        let start = Instant::now();

        let allocation = match &self.lp_output {
            Some(path) => {
                let mut renderer = LpRenderer::new(path.clone());

                let allocation =
                    ILPSolver::solve_with_observer(&profiles, &self.config, &mut renderer)?;

                renderer.write()?;

                allocation
            }
            None => ILPSolver::solve(&profiles, &self.config)?,
        };

        let elapsed = start.elapsed();

        let recomputed = allocation.revenue(&profiles);

        if (recomputed - allocation.objective()).abs() > 1e-6 * recomputed.abs().max(1.0) {
            warn!(
                reported = allocation.objective(),
                recomputed, "objective differs from recomputed revenue"
            );
        }

        Ok(PlanOutcome {
            profiles,
            allocation,
            elapsed,
        })
    }
}
