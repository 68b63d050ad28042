//! Category Profiles
//!
//! Narrows the raw category columns down to the modeled categories. Click rates and order values
//! are always reduced together through [`CategoryProfiles::from_dataset`] so a category's two
//! profiles can never drift apart.

use thiserror::Error;

use crate::{
    categories::{CATEGORY_COUNT, CategoryMapping},
    dataset::Dataset,
};

/// Profile shape errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    /// A raw array is too narrow for the category mapping
    #[error("raw array has {found} columns, mapping needs at least {required}")]
    MissingColumn {
        /// Width required by the mapping
        required: usize,
        /// Actual width
        found: usize,
    },

    /// A modeled array does not have one row per category
    #[error("{array} has {found} categories, expected {expected}")]
    CategoryCount {
        /// Name of the offending array
        array: &'static str,
        /// Expected category count
        expected: usize,
        /// Actual category count
        found: usize,
    },

    /// A column does not have one entry per record
    #[error("{array} column {column} has {found} records, expected {expected}")]
    RecordCount {
        /// Name of the offending array
        array: &'static str,
        /// Column index
        column: usize,
        /// Expected record count
        expected: usize,
        /// Actual record count
        found: usize,
    },
}

/// Select the mapped raw columns, in modeled order.
///
/// # Errors
///
/// Returns [`ProfileError::MissingColumn`] if `raw` is narrower than the mapping requires.
pub fn reduce_columns<T: Clone>(
    raw: &[Vec<T>],
    mapping: &CategoryMapping,
) -> Result<Vec<Vec<T>>, ProfileError> {
    mapping
        .iter()
        .map(|(_, source)| {
            raw.get(source).cloned().ok_or(ProfileError::MissingColumn {
                required: mapping.required_width(),
                found: raw.len(),
            })
        })
        .collect()
}

/// Per-record sizes and per-category profiles of the modeled categories.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryProfiles {
    sizes: Vec<f64>,
    click_rates: Vec<Vec<f64>>,
    order_values: Vec<Vec<f64>>,
    email_volumes: Option<Vec<Vec<f64>>>,
}

impl CategoryProfiles {
    /// Create profiles from already-modeled arrays, indexed `[category][record]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] if either array is not [`CATEGORY_COUNT`] wide or a column
    /// length differs from `sizes`.
    pub fn new(
        sizes: Vec<f64>,
        click_rates: Vec<Vec<f64>>,
        order_values: Vec<Vec<f64>>,
    ) -> Result<Self, ProfileError> {
        ensure_modeled_shape("click rates", &click_rates, sizes.len())?;
        ensure_modeled_shape("order values", &order_values, sizes.len())?;

        Ok(Self {
            sizes,
            click_rates,
            order_values,
            email_volumes: None,
        })
    }

    /// Reduce a raw dataset's click rates and order values through the same mapping.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] if the dataset is narrower than the mapping requires.
    pub fn from_dataset(dataset: &Dataset, mapping: &CategoryMapping) -> Result<Self, ProfileError> {
        let click_rates = reduce_columns(dataset.click_rates(), mapping)?;
        let order_values = reduce_columns(dataset.order_values(), mapping)?;

        Self::new(dataset.sizes().to_vec(), click_rates, order_values)
    }

    /// Attach modeled email volumes, indexed `[category][record]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] if `volumes` does not have the modeled shape.
    pub fn with_email_volumes(mut self, volumes: Vec<Vec<f64>>) -> Result<Self, ProfileError> {
        ensure_modeled_shape("email volumes", &volumes, self.sizes.len())?;

        self.email_volumes = Some(volumes);

        Ok(self)
    }

    /// Number of records.
    pub fn record_count(&self) -> usize {
        self.sizes.len()
    }

    /// Per-record sizes.
    pub fn sizes(&self) -> &[f64] {
        &self.sizes
    }

    /// Size of a record.
    pub fn size(&self, record: usize) -> Option<f64> {
        self.sizes.get(record).copied()
    }

    /// Click rate of a category for a record.
    pub fn click_rate(&self, category: usize, record: usize) -> Option<f64> {
        cell(&self.click_rates, category, record)
    }

    /// Average order value of a category for a record.
    pub fn order_value(&self, category: usize, record: usize) -> Option<f64> {
        cell(&self.order_values, category, record)
    }

    /// Email volume of a category for a record, when volumes are attached.
    pub fn email_volume(&self, category: usize, record: usize) -> Option<f64> {
        cell(self.email_volumes.as_deref()?, category, record)
    }

    /// Whether email volumes are attached.
    pub fn has_email_volumes(&self) -> bool {
        self.email_volumes.is_some()
    }

    /// Expected revenue of sending one item of `category` to `record`:
    /// `size * click rate * order value`.
    pub fn unit_revenue(&self, category: usize, record: usize) -> Option<f64> {
        Some(
            self.size(record)?
                * self.click_rate(category, record)?
                * self.order_value(category, record)?,
        )
    }
}

fn cell(columns: &[Vec<f64>], category: usize, record: usize) -> Option<f64> {
    columns.get(category)?.get(record).copied()
}

fn ensure_modeled_shape(
    array: &'static str,
    columns: &[Vec<f64>],
    records: usize,
) -> Result<(), ProfileError> {
    if columns.len() != CATEGORY_COUNT {
        return Err(ProfileError::CategoryCount {
            array,
            expected: CATEGORY_COUNT,
            found: columns.len(),
        });
    }

    if let Some((column, values)) = columns
        .iter()
        .enumerate()
        .find(|(_, values)| values.len() != records)
    {
        return Err(ProfileError::RecordCount {
            array,
            column,
            expected: records,
            found: values.len(),
        });
    }

    Ok(())
}
