//! Azimuthal-coverage gap detection for one height layer.

use std::ops::Range;

use crate::core::points::{PointsBuffer, COL_AZIM};

/// Check whether the selected gates of one layer leave an azimuth gap.
///
/// Partitions the full circle into `n_bins_gap` equal bins, counts the rows
/// of `rows` per bin, and reports a gap when any bin holds fewer than
/// `n_obs_gap_min` observations. A gapped layer has too little angular
/// coverage for a reliable profile fit.
///
/// # Arguments
///
/// * `points` - Feature buffer
/// * `rows` - Row range belonging to the layer under test
/// * `n_bins_gap` - Number of azimuth histogram bins
/// * `n_obs_gap_min` - Minimum observations per bin
pub fn has_azimuth_gap(
    points: &PointsBuffer,
    rows: Range<usize>,
    n_bins_gap: usize,
    n_obs_gap_min: usize,
) -> bool {
    if n_bins_gap == 0 || n_obs_gap_min == 0 {
        return false;
    }

    let mut counts = vec![0usize; n_bins_gap];
    for i_row in rows {
        let azim = points.row(i_row)[COL_AZIM];
        let mut bin = ((azim.rem_euclid(360.0) / 360.0) * n_bins_gap as f32) as usize;
        if bin >= n_bins_gap {
            bin = n_bins_gap - 1;
        }
        counts[bin] += 1;
    }

    counts.iter().any(|&c| c < n_obs_gap_min)
}
