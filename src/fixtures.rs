//! Fixtures
//!
//! Deterministic campaign datasets and YAML plan configurations for tests and demos.

use std::{
    fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::{
    categories::{RAW_CATEGORY_COUNT, RAW_VOLUME_COUNT, VOLUME_LABELS},
    config::{ConfigError, PlanConfig},
    dataset::{Dataset, DatasetError},
};

/// Fixture Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error writing or reading fixture files
    #[error("Failed to access fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// Plan fixture could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generated dataset was rejected
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Load a plan configuration from `<base_path>/plans/<name>.yml`.
///
/// # Errors
///
/// Returns a [`FixtureError`] if the file cannot be read or is not a valid plan.
pub fn plan(base_path: impl AsRef<Path>, name: &str) -> Result<PlanConfig, FixtureError> {
    let path = base_path.as_ref().join("plans").join(format!("{name}.yml"));

    Ok(PlanConfig::from_path(path)?)
}

/// Synthetic campaign dataset.
///
/// Every cell is derived from its record and column index, so runs are reproducible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CampaignFixture {
    records: u32,
    base_size: f64,
}

impl CampaignFixture {
    /// Create a fixture with `records` records.
    pub fn new(records: u32) -> Self {
        Self {
            records,
            base_size: 1.0,
        }
    }

    /// Set the size of the smallest record.
    #[must_use]
    pub fn with_base_size(mut self, base_size: f64) -> Self {
        self.base_size = base_size;
        self
    }

    /// Number of records.
    pub fn records(&self) -> u32 {
        self.records
    }

    /// Size of a record.
    pub fn size(&self, record: u32) -> f64 {
        self.base_size + f64::from(record % 5)
    }

    /// Click rate of a raw category for a record.
    pub fn click_rate(&self, category: u32, record: u32) -> f64 {
        0.01 * f64::from(1 + (category + record) % 7)
    }

    /// Average order value of a raw category for a record.
    pub fn order_value(&self, category: u32, record: u32) -> f64 {
        20.0 + f64::from(category) + f64::from(record % 3)
    }

    /// Email volume of a raw volume column for a record.
    pub fn email_volume(&self, column: u32, record: u32) -> f64 {
        100.0 + 10.0 * f64::from(column) + f64::from(record)
    }

    /// Header row of the generated CSV.
    pub fn header() -> Vec<String> {
        let mut header = vec![String::from("id"), String::from("size")];

        header.extend((1..=RAW_CATEGORY_COUNT).map(|i| format!("cs{i}")));
        header.extend((1..=RAW_CATEGORY_COUNT).map(|i| format!("aov{i}")));
        header.extend(VOLUME_LABELS.iter().map(|label| (*label).to_string()));

        header
    }

    /// Cells of one record row.
    pub fn row(&self, record: u32) -> Vec<String> {
        let categories = 0..raw_count(RAW_CATEGORY_COUNT);

        let mut row = vec![format!("r{record}"), self.size(record).to_string()];

        row.extend(
            categories
                .clone()
                .map(|category| self.click_rate(category, record).to_string()),
        );
        row.extend(categories.map(|category| self.order_value(category, record).to_string()));
        row.extend(
            (0..raw_count(RAW_VOLUME_COUNT))
                .map(|column| self.email_volume(column, record).to_string()),
        );

        row
    }

    /// Render the dataset as CSV text.
    pub fn csv(&self) -> String {
        let mut csv = Self::header().join(",");
        csv.push('\n');

        for record in 0..self.records {
            csv.push_str(&self.row(record).join(","));
            csv.push('\n');
        }

        csv
    }

    /// Write the CSV to `dir/<name>.csv`, returning its path.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Io`] if the file cannot be written.
    pub fn write_csv(&self, dir: impl AsRef<Path>, name: &str) -> Result<PathBuf, FixtureError> {
        let path = dir.as_ref().join(format!("{name}.csv"));

        fs::write(&path, self.csv())?;

        Ok(path)
    }

    /// Parse the generated CSV into a [`Dataset`].
    ///
    /// # Errors
    ///
    /// Returns a [`FixtureError`] if the generated data is rejected.
    pub fn dataset(&self) -> Result<Dataset, FixtureError> {
        Ok(Dataset::from_reader(self.csv().as_bytes(), None)?)
    }
}

fn raw_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use testresult::TestResult;

    use crate::dataset::COLUMN_COUNT;

    use super::*;

    #[test]
    fn rows_match_input_layout() {
        let fixture = CampaignFixture::new(3);

        assert_eq!(CampaignFixture::header().len(), COLUMN_COUNT);
        assert!((0..3).all(|record| fixture.row(record).len() == COLUMN_COUNT));
    }

    #[test]
    fn generated_dataset_parses() -> TestResult {
        let fixture = CampaignFixture::new(6).with_base_size(2.0);
        let dataset = fixture.dataset()?;

        assert_eq!(dataset.record_count(), 6);
        assert_eq!(dataset.sizes().first().copied(), Some(2.0));
        assert_eq!(dataset.sizes().get(4).copied(), Some(6.0));

        Ok(())
    }

    #[test]
    fn write_csv_round_trips_through_loader() -> TestResult {
        let dir = tempdir()?;
        let fixture = CampaignFixture::new(5);

        let path = fixture.write_csv(dir.path(), "campaign")?;
        let dataset = Dataset::from_path(&path, Some(5))?;

        assert_eq!(dataset.sizes(), fixture.dataset()?.sizes());

        Ok(())
    }

    #[test]
    fn plan_fixtures_load_from_base_path() -> TestResult {
        let reference = plan("./fixtures", "reference")?;

        assert_eq!(reference, PlanConfig::default());

        let small = plan("./fixtures", "small")?;

        assert_eq!(small.expected_records, None);
        assert!(small.bounds.iter().all(|bound| bound.min <= bound.max));

        Ok(())
    }
}
