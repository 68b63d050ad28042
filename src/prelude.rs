//! Outreach prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    categories::{CATEGORY_COUNT, CategoryMapping, PROFILE_SOURCES, category_label},
    config::{CategoryBound, ConfigError, Coupling, PlanConfig},
    dataset::{Dataset, DatasetError},
    pipeline::{Pipeline, PipelineError, PlanOutcome},
    profiles::{CategoryProfiles, ProfileError},
    report::{Report, ReportError},
    solvers::{
        Allocation, Solver, SolverError,
        ilp::{
            AllocationModel, ILPObserver, ILPSolver, ModelError, NoopObserver,
            renderers::lp::{LpRenderer, LpWriteError},
        },
    },
    volumes::VolumeSource,
};
