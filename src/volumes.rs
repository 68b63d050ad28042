//! Email Volumes
//!
//! Only some categories have their own email-volume column. The averager spreads the loaded
//! columns over the raw category space and fills every slot without data with the per-record
//! mean across all loaded columns.

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{
    categories::{
        CATEGORY_COUNT, DIRECT_VOLUME_COUNT, DIRECT_VOLUME_SOURCES, RAW_CATEGORY_COUNT,
        RELOCATED_VOLUMES,
    },
    profiles::{ProfileError, reduce_columns},
};

/// Where modeled email volumes come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeSource {
    /// Use the loaded columns as-is, selected through [`DIRECT_VOLUME_SOURCES`].
    Direct,

    /// Use the averaged volumes; categories without a direct column get the per-record mean.
    ReducedMean,
}

impl VolumeSource {
    /// Resolve modeled email volumes, indexed `[category][record]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] if `ems` is too narrow or its columns differ in length.
    pub fn modeled_volumes(self, ems: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ProfileError> {
        match self {
            Self::Direct => reduce_columns(ems, &DIRECT_VOLUME_SOURCES),
            Self::ReducedMean => {
                let mut volumes = average_volumes(ems)?;
                volumes.truncate(CATEGORY_COUNT);

                Ok(volumes)
            }
        }
    }
}

/// Spread loaded email volumes over the raw category space.
///
/// Returns [`RAW_CATEGORY_COUNT`] columns where:
///
/// - slots `0..7` are the loaded columns with the same index,
/// - each `(column, slot)` pair of [`RELOCATED_VOLUMES`] copies a loaded column into that slot,
/// - every other slot holds the per-record mean of all loaded columns.
///
/// # Errors
///
/// Returns a [`ProfileError`] if `ems` is too narrow or its columns differ in length.
pub fn average_volumes(ems: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ProfileError> {
    ensure_volume_columns(ems)?;

    let means = record_means(ems)?;
    let mut averaged = vec![means; RAW_CATEGORY_COUNT];

    for (slot, column) in averaged.iter_mut().zip(ems).take(DIRECT_VOLUME_COUNT) {
        slot.clone_from(column);
    }

    for (column, slot) in RELOCATED_VOLUMES {
        if let (Some(source), Some(target)) = (ems.get(column), averaged.get_mut(slot)) {
            target.clone_from(source);
        }
    }

    Ok(averaged)
}

/// Per-record arithmetic mean across all columns of `ems`.
///
/// # Errors
///
/// Returns [`ProfileError::RecordCount`] if the columns differ in length.
pub fn record_means(ems: &[Vec<f64>]) -> Result<Vec<f64>, ProfileError> {
    let Some(first) = ems.first() else {
        return Ok(Vec::new());
    };

    let records = first.len();

    if let Some((column, values)) = ems
        .iter()
        .enumerate()
        .find(|(_, values)| values.len() != records)
    {
        return Err(ProfileError::RecordCount {
            array: "email volumes",
            column,
            expected: records,
            found: values.len(),
        });
    }

    let width = ems.len().to_f64().unwrap_or(f64::INFINITY);

    let means = (0..records)
        .map(|record| {
            ems.iter()
                .filter_map(|column| column.get(record))
                .sum::<f64>()
                / width
        })
        .collect();

    Ok(means)
}

fn ensure_volume_columns(ems: &[Vec<f64>]) -> Result<(), ProfileError> {
    let required = RELOCATED_VOLUMES
        .iter()
        .map(|&(column, _)| column + 1)
        .fold(DIRECT_VOLUME_COUNT.max(CATEGORY_COUNT), usize::max);

    if ems.len() < required {
        return Err(ProfileError::MissingColumn {
            required,
            found: ems.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::categories::RAW_VOLUME_COUNT;

    use super::*;

    /// Ten columns over two records; column `i` holds `i` and `10 * i`.
    fn known_volumes() -> Vec<Vec<f64>> {
        (0..RAW_VOLUME_COUNT)
            .map(|i| {
                let value = f64::from(u32::try_from(i).unwrap_or(u32::MAX));
                vec![value, 10.0 * value]
            })
            .collect()
    }

    #[test]
    fn record_means_average_every_column() -> TestResult {
        let means = record_means(&known_volumes())?;

        assert_eq!(means, vec![4.5, 45.0]);

        Ok(())
    }

    #[test]
    fn averaged_direct_slots_pass_through() -> TestResult {
        let ems = known_volumes();
        let averaged = average_volumes(&ems)?;

        assert_eq!(averaged.len(), RAW_CATEGORY_COUNT);

        for slot in 0..DIRECT_VOLUME_COUNT {
            assert_eq!(averaged.get(slot), ems.get(slot), "slot {slot} changed");
        }

        Ok(())
    }

    #[test]
    fn averaged_relocates_columns_seven_and_eight() -> TestResult {
        let ems = known_volumes();
        let averaged = average_volumes(&ems)?;

        assert_eq!(averaged.get(12), ems.get(7));
        assert_eq!(averaged.get(18), ems.get(8));

        Ok(())
    }

    #[test]
    fn averaged_fills_remaining_slots_with_mean() -> TestResult {
        let averaged = average_volumes(&known_volumes())?;
        let mean = vec![4.5, 45.0];

        for (slot, values) in averaged.iter().enumerate() {
            if slot < DIRECT_VOLUME_COUNT || slot == 12 || slot == 18 {
                continue;
            }

            assert_eq!(values, &mean, "slot {slot} should hold the record mean");
        }

        assert_eq!(averaged.get(7), Some(&mean));
        assert_eq!(averaged.get(8), Some(&mean));

        Ok(())
    }

    #[test]
    fn direct_source_gives_c64_the_em64_column() -> TestResult {
        let ems = known_volumes();
        let volumes = VolumeSource::Direct.modeled_volumes(&ems)?;

        assert_eq!(volumes.len(), CATEGORY_COUNT);
        assert_eq!(volumes.get(7), ems.get(7));
        assert_eq!(volumes.get(8), ems.get(9));
        assert_ne!(volumes.get(8), ems.get(8), "em43 has no modeled category");

        Ok(())
    }

    #[test]
    fn direct_source_rejects_input_without_em64() {
        let mut ems = known_volumes();
        ems.pop();

        assert!(matches!(
            VolumeSource::Direct.modeled_volumes(&ems),
            Err(ProfileError::MissingColumn { required: 10, found: 9 })
        ));
    }

    #[test]
    fn reduced_mean_source_uses_mean_for_categories_without_data() -> TestResult {
        let ems = known_volumes();
        let volumes = VolumeSource::ReducedMean.modeled_volumes(&ems)?;

        assert_eq!(volumes.len(), CATEGORY_COUNT);
        assert_eq!(volumes.get(6), ems.get(6));
        assert_eq!(volumes.get(7), Some(&vec![4.5, 45.0]));
        assert_eq!(volumes.get(8), Some(&vec![4.5, 45.0]));

        Ok(())
    }

    #[test]
    fn averaging_rejects_ragged_columns() {
        let mut ems = known_volumes();

        if let Some(column) = ems.get_mut(3) {
            column.pop();
        }

        assert!(matches!(
            average_volumes(&ems),
            Err(ProfileError::RecordCount { column: 3, .. })
        ));
    }

    #[test]
    fn averaging_rejects_narrow_input() {
        let ems = vec![vec![1.0]; 5];

        assert!(matches!(
            average_volumes(&ems),
            Err(ProfileError::MissingColumn { found: 5, .. })
        ));
    }

    #[test]
    fn volume_source_parses_from_kebab_case() -> TestResult {
        let source: VolumeSource = serde_norway::from_str("reduced-mean")?;

        assert_eq!(source, VolumeSource::ReducedMean);

        Ok(())
    }
}
