//! Categories
//!
//! The input schema carries more category columns than the model uses. The tables here are the
//! single place where raw column positions are tied to modeled categories.

/// Number of raw click-rate / order-value category columns in the input.
pub const RAW_CATEGORY_COUNT: usize = 24;

/// Number of raw email-volume columns in the input.
pub const RAW_VOLUME_COUNT: usize = 10;

/// Number of modeled outreach categories.
pub const CATEGORY_COUNT: usize = 9;

/// Record count of the reference campaign input.
pub const DEFAULT_RECORD_COUNT: usize = 2096;

/// Email-volume columns that carry data for the modeled category at the same index.
pub const DIRECT_VOLUME_COUNT: usize = 7;

/// Email-volume columns relocated into the raw category space: `(volume column, raw slot)`.
///
/// Mirrors [`PROFILE_SOURCES`], which reads modeled categories 7 and 8 from raw slots 12 and 18.
pub const RELOCATED_VOLUMES: [(usize, usize); 2] = [(7, 12), (8, 18)];

/// Raw profile column feeding each modeled category.
///
/// Raw category `43` has no profile data and the remaining raw columns duplicate other
/// categories, so only these nine columns are modeled.
pub const PROFILE_SOURCES: CategoryMapping = CategoryMapping::new([0, 1, 2, 3, 4, 5, 6, 12, 18]);

/// Email-volume column feeding each modeled category when volumes are taken as loaded.
///
/// Column 8 (`em43`) belongs to a category with no profile data and is skipped, so `c64`
/// reads `em64`.
pub const DIRECT_VOLUME_SOURCES: CategoryMapping =
    CategoryMapping::new([0, 1, 2, 3, 4, 5, 6, 7, 9]);

/// Business labels of the modeled categories, by modeled index.
pub const CATEGORY_LABELS: [&str; CATEGORY_COUNT] =
    ["c1", "c2", "c3", "c4", "c5", "c6", "c7", "c42", "c64"];

/// Business labels of the raw email-volume columns, by column index.
pub const VOLUME_LABELS: [&str; RAW_VOLUME_COUNT] = [
    "em1", "em2", "em3", "em4", "em5", "em6", "em7", "em42", "em43", "em64",
];

/// Fixed correspondence between modeled categories and raw category columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryMapping {
    sources: [usize; CATEGORY_COUNT],
}

impl CategoryMapping {
    /// Create a mapping where `sources[i]` is the raw column of modeled category `i`.
    pub const fn new(sources: [usize; CATEGORY_COUNT]) -> Self {
        Self { sources }
    }

    /// Raw columns, in modeled order.
    pub fn sources(&self) -> &[usize; CATEGORY_COUNT] {
        &self.sources
    }

    /// Raw column for a modeled category.
    pub fn source(&self, category: usize) -> Option<usize> {
        self.sources.get(category).copied()
    }

    /// Iterate `(modeled category, raw column)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.sources.iter().copied().enumerate()
    }

    /// Minimum raw width an array needs for every source column to exist.
    pub fn required_width(&self) -> usize {
        self.sources.iter().max().map_or(0, |max| max + 1)
    }
}

/// Business label for a modeled category.
pub fn category_label(category: usize) -> Option<&'static str> {
    CATEGORY_LABELS.get(category).copied()
}
