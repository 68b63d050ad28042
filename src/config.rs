//! Plan Configuration
//!
//! Business rules for an allocation run. [`PlanConfig::default`] is the reference campaign;
//! a YAML file can override any part of it.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    categories::{CATEGORY_COUNT, DEFAULT_RECORD_COUNT},
    volumes::VolumeSource,
};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the configuration file
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// A rule refers to a category that is not modeled
    #[error("{rule} refers to unknown category {category}")]
    UnknownCategory {
        /// Kind of rule
        rule: &'static str,
        /// Offending category index
        category: usize,
    },

    /// A category has more than one bound entry
    #[error("category {0} has more than one bound")]
    DuplicateBound(usize),

    /// A coupling ties a category to itself
    #[error("category {0} cannot be coupled to itself")]
    SelfCoupling(usize),

    /// The capacity multiplier is negative or not finite
    #[error("capacity multiplier must be a finite non-negative number, got {0}")]
    InvalidCapacityMultiplier(f64),
}

/// Aggregate volume bounds of one category, summed over all records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryBound {
    /// Modeled category index
    pub category: usize,

    /// Lower bound (inclusive)
    pub min: u32,

    /// Upper bound (inclusive)
    pub max: u32,
}

impl CategoryBound {
    /// Create a new bound.
    pub const fn new(category: usize, min: u32, max: u32) -> Self {
        Self { category, min, max }
    }
}

/// `total(dependent) <= total(anchor)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Coupling {
    /// Category whose total is capped
    pub dependent: usize,

    /// Category whose total is the cap
    pub anchor: usize,
}

impl Coupling {
    /// Create a new coupling.
    pub const fn new(dependent: usize, anchor: usize) -> Self {
        Self { dependent, anchor }
    }
}

/// Reference per-category bounds.
pub const DEFAULT_BOUNDS: [CategoryBound; CATEGORY_COUNT] = [
    CategoryBound::new(7, 8_000, 18_000),
    CategoryBound::new(8, 3_000, 6_000),
    CategoryBound::new(0, 10_000, 25_000),
    CategoryBound::new(1, 5_000, 8_500),
    CategoryBound::new(2, 1_500, 8_000),
    CategoryBound::new(3, 4_000, 10_000),
    CategoryBound::new(4, 1_500, 8_000),
    CategoryBound::new(5, 9_000, 20_000),
    CategoryBound::new(6, 8_000, 15_000),
];

/// Reference couplings.
pub const DEFAULT_COUPLINGS: [Coupling; 2] = [Coupling::new(7, 3), Coupling::new(8, 5)];

/// Reference per-record capacity, as a multiple of the record size.
pub const DEFAULT_CAPACITY_MULTIPLIER: f64 = 3.0;

/// Allocation plan configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlanConfig {
    /// Required record count of the input; `None` accepts any count.
    pub expected_records: Option<usize>,

    /// Items a record may receive across all categories, per unit of size.
    pub capacity_multiplier: f64,

    /// Aggregate bounds per category.
    pub bounds: Vec<CategoryBound>,

    /// Aggregate couplings between categories.
    pub couplings: Vec<Coupling>,

    /// Email volume estimate to report; `None` leaves volumes unused.
    pub volume_source: Option<VolumeSource>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            expected_records: Some(DEFAULT_RECORD_COUNT),
            capacity_multiplier: DEFAULT_CAPACITY_MULTIPLIER,
            bounds: DEFAULT_BOUNDS.to_vec(),
            couplings: DEFAULT_COUPLINGS.to_vec(),
            volume_source: None,
        }
    }
}

impl PlanConfig {
    /// Load and validate a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails validation.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;

        Self::from_yaml_str(&contents)
    }

    /// Parse and validate a configuration from YAML.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the YAML cannot be parsed or fails validation.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_norway::from_str(yaml)?;

        config.validate()?;

        Ok(config)
    }

    /// Check that every rule refers to a modeled category.
    ///
    /// Bounds with `min > max` are accepted; the solver reports them as infeasible.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.capacity_multiplier.is_finite() || self.capacity_multiplier < 0.0 {
            return Err(ConfigError::InvalidCapacityMultiplier(
                self.capacity_multiplier,
            ));
        }

        let mut seen = [false; CATEGORY_COUNT];

        for bound in &self.bounds {
            let slot = seen
                .get_mut(bound.category)
                .ok_or(ConfigError::UnknownCategory {
                    rule: "bound",
                    category: bound.category,
                })?;

            if *slot {
                return Err(ConfigError::DuplicateBound(bound.category));
            }

            *slot = true;
        }

        for coupling in &self.couplings {
            for category in [coupling.dependent, coupling.anchor] {
                if category >= CATEGORY_COUNT {
                    return Err(ConfigError::UnknownCategory {
                        rule: "coupling",
                        category,
                    });
                }
            }

            if coupling.dependent == coupling.anchor {
                return Err(ConfigError::SelfCoupling(coupling.dependent));
            }
        }

        Ok(())
    }

    /// Bound configured for a category.
    pub fn bound(&self, category: usize) -> Option<&CategoryBound> {
        self.bounds.iter().find(|bound| bound.category == category)
    }
}
