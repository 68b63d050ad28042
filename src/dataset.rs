//! Dataset
//!
//! Loads the campaign input: one header row, then one row per record with a fixed positional
//! column layout.

use std::{fs::File, io, ops::Range, path::Path};

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::debug;

use crate::categories::{RAW_CATEGORY_COUNT, RAW_VOLUME_COUNT};

/// Column holding the record size.
pub const SIZE_COLUMN: usize = 1;

/// Columns holding the raw per-category click rates.
pub const CLICK_RATE_COLUMNS: Range<usize> = 2..26;

/// Columns holding the raw per-category average order values.
pub const ORDER_VALUE_COLUMNS: Range<usize> = 26..50;

/// Columns holding the raw per-category email volumes.
pub const EMAIL_VOLUME_COLUMNS: Range<usize> = 50..60;

/// Total number of columns in a well-formed row.
pub const COLUMN_COUNT: usize = 60;

/// Malformed input errors
#[derive(Debug, Error)]
pub enum DatasetError {
    /// IO error opening the input
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),

    /// CSV syntax error
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A row (or the header) does not have the expected number of columns
    #[error("row {row} has {found} columns, expected {expected}")]
    ColumnCount {
        /// 1-indexed line in the input (the header is row 1)
        row: usize,
        /// Expected column count
        expected: usize,
        /// Actual column count
        found: usize,
    },

    /// The number of records does not match the expected count
    #[error("input has {found} records, expected {expected}")]
    RecordCount {
        /// Expected record count
        expected: usize,
        /// Actual record count
        found: usize,
    },

    /// A cell could not be parsed as a finite number
    #[error("row {row}, column {column}: invalid number {value:?}")]
    InvalidNumber {
        /// 1-indexed line in the input
        row: usize,
        /// 0-indexed column
        column: usize,
        /// Raw cell contents
        value: String,
    },

    /// A record has a negative size
    #[error("row {row}: size cannot be negative, got {value}")]
    NegativeSize {
        /// 1-indexed line in the input
        row: usize,
        /// Parsed size
        value: f64,
    },

    /// An in-memory array does not have the expected shape
    #[error("{array} has shape mismatch: expected {expected}, found {found}")]
    Shape {
        /// Name of the offending array
        array: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        found: usize,
    },
}

/// Raw campaign input, column-major and row-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    sizes: Vec<f64>,
    click_rates: Vec<Vec<f64>>,
    order_values: Vec<Vec<f64>>,
    email_volumes: Vec<Vec<f64>>,
}

impl Dataset {
    /// Create a dataset from in-memory arrays.
    ///
    /// `click_rates` and `order_values` must have [`RAW_CATEGORY_COUNT`] columns and
    /// `email_volumes` must have [`RAW_VOLUME_COUNT`] columns, each as long as `sizes`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Shape`] if any array has the wrong shape,
    /// [`DatasetError::InvalidNumber`] if a size is not finite, or
    /// [`DatasetError::NegativeSize`] if a size is negative.
    pub fn new(
        sizes: Vec<f64>,
        click_rates: Vec<Vec<f64>>,
        order_values: Vec<Vec<f64>>,
        email_volumes: Vec<Vec<f64>>,
    ) -> Result<Self, DatasetError> {
        let records = sizes.len();

        ensure_shape("click rates", &click_rates, RAW_CATEGORY_COUNT, records)?;
        ensure_shape("order values", &order_values, RAW_CATEGORY_COUNT, records)?;
        ensure_shape("email volumes", &email_volumes, RAW_VOLUME_COUNT, records)?;

        for (idx, &value) in sizes.iter().enumerate() {
            let row = idx + 2;

            if !value.is_finite() {
                return Err(DatasetError::InvalidNumber {
                    row,
                    column: SIZE_COLUMN,
                    value: value.to_string(),
                });
            }

            if value < 0.0 {
                return Err(DatasetError::NegativeSize { row, value });
            }
        }

        Ok(Self {
            sizes,
            click_rates,
            order_values,
            email_volumes,
        })
    }

    /// Load a dataset from a CSV file.
    ///
    /// When `expected_records` is set, the input must contain exactly that many records.
    ///
    /// # Errors
    ///
    /// Returns a [`DatasetError`] if the file cannot be read or does not match the layout.
    pub fn from_path(
        path: impl AsRef<Path>,
        expected_records: Option<usize>,
    ) -> Result<Self, DatasetError> {
        let file = File::open(path.as_ref())?;

        Self::from_reader(file, expected_records)
    }

    /// Load a dataset from any CSV source.
    ///
    /// # Errors
    ///
    /// Returns a [`DatasetError`] if the source cannot be read or does not match the layout.
    pub fn from_reader(
        reader: impl io::Read,
        expected_records: Option<usize>,
    ) -> Result<Self, DatasetError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let header_len = csv_reader.headers()?.len();

        if header_len != COLUMN_COUNT {
            return Err(DatasetError::ColumnCount {
                row: 1,
                expected: COLUMN_COUNT,
                found: header_len,
            });
        }

        let mut sizes = Vec::new();
        let mut click_rates = vec![Vec::new(); CLICK_RATE_COLUMNS.len()];
        let mut order_values = vec![Vec::new(); ORDER_VALUE_COLUMNS.len()];
        let mut email_volumes = vec![Vec::new(); EMAIL_VOLUME_COLUMNS.len()];

        for (i, result) in csv_reader.records().enumerate() {
            let record = result?;
            let row = i + 2; // 1-indexed, skip header

            if record.len() != COLUMN_COUNT {
                return Err(DatasetError::ColumnCount {
                    row,
                    expected: COLUMN_COUNT,
                    found: record.len(),
                });
            }

            let size = parse_cell(&record, row, SIZE_COLUMN)?;

            if size < 0.0 {
                return Err(DatasetError::NegativeSize { row, value: size });
            }

            sizes.push(size);

            push_columns(&record, row, CLICK_RATE_COLUMNS, &mut click_rates)?;
            push_columns(&record, row, ORDER_VALUE_COLUMNS, &mut order_values)?;
            push_columns(&record, row, EMAIL_VOLUME_COLUMNS, &mut email_volumes)?;
        }

        if let Some(expected) = expected_records
            && expected != sizes.len()
        {
            return Err(DatasetError::RecordCount {
                expected,
                found: sizes.len(),
            });
        }

        debug!(records = sizes.len(), columns = COLUMN_COUNT, "parsed input");

        Ok(Self {
            sizes,
            click_rates,
            order_values,
            email_volumes,
        })
    }

    /// Number of records.
    pub fn record_count(&self) -> usize {
        self.sizes.len()
    }

    /// Per-record sizes.
    pub fn sizes(&self) -> &[f64] {
        &self.sizes
    }

    /// Raw click rates, indexed `[raw category][record]`.
    pub fn click_rates(&self) -> &[Vec<f64>] {
        &self.click_rates
    }

    /// Raw average order values, indexed `[raw category][record]`.
    pub fn order_values(&self) -> &[Vec<f64>] {
        &self.order_values
    }

    /// Raw email volumes, indexed `[volume column][record]`.
    pub fn email_volumes(&self) -> &[Vec<f64>] {
        &self.email_volumes
    }
}

fn ensure_shape(
    array: &'static str,
    columns: &[Vec<f64>],
    width: usize,
    records: usize,
) -> Result<(), DatasetError> {
    if columns.len() != width {
        return Err(DatasetError::Shape {
            array,
            expected: width,
            found: columns.len(),
        });
    }

    if let Some(column) = columns.iter().find(|column| column.len() != records) {
        return Err(DatasetError::Shape {
            array,
            expected: records,
            found: column.len(),
        });
    }

    Ok(())
}

fn push_columns(
    record: &StringRecord,
    row: usize,
    columns: Range<usize>,
    targets: &mut [Vec<f64>],
) -> Result<(), DatasetError> {
    for (column, target) in columns.zip(targets.iter_mut()) {
        target.push(parse_cell(record, row, column)?);
    }

    Ok(())
}

fn parse_cell(record: &StringRecord, row: usize, column: usize) -> Result<f64, DatasetError> {
    let raw = record.get(column).ok_or(DatasetError::ColumnCount {
        row,
        expected: COLUMN_COUNT,
        found: record.len(),
    })?;

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(DatasetError::InvalidNumber {
            row,
            column,
            value: raw.to_string(),
        }),
    }
}
