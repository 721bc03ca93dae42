//! Gate selection into the feature buffer and the post-fit flag update.

use crate::core::cells::CellImage;
use crate::core::geometry::beam_height;
use crate::core::points::{GateCode, PointsBuffer, PointsError};
use crate::core::scan::{ScanError, ScanImage};
use crate::processors::ProcessingError;

/// Select the gates of one scan inside a range and altitude window and
/// append their feature rows.
///
/// Membership uses exactly the tests of the capacity planner: gate range
/// center in `[range_min, range_max]` and beam height in
/// `[altitude_min, altitude_max)`. Validity of the observables is recorded
/// as missing flags rather than used to skip rows, so the planned capacity
/// is exact. Cell and fringe membership is carried over from the label
/// image; rows land in scan traversal order.
///
/// Callers loop this across scans and layers to fill one shared buffer
/// sized by the capacity plan.
///
/// # Returns
///
/// The updated number of rows in the buffer.
pub fn get_list_of_selected_gates(
    vrad: &ScanImage,
    dbz: &ScanImage,
    cell_image: &CellImage,
    range_min: f32,
    range_max: f32,
    altitude_min: f32,
    altitude_max: f32,
    points: &mut PointsBuffer,
) -> Result<usize, ProcessingError> {
    vrad.meta.check_same_grid(&dbz.meta)?;
    if cell_image.n_azim() != vrad.meta.n_azim || cell_image.n_rang() != vrad.meta.n_rang {
        return Err(ScanError::DimensionMismatch {
            expected_azim: vrad.meta.n_azim,
            expected_rang: vrad.meta.n_rang,
            actual_azim: cell_image.n_azim(),
            actual_rang: cell_image.n_rang(),
        }
        .into());
    }

    for i_azim in 0..vrad.meta.n_azim {
        for i_rang in 0..vrad.meta.n_rang {
            let range = vrad.meta.gate_range(i_rang);
            if range < range_min || range > range_max {
                continue;
            }
            let height = beam_height(range, vrad.meta.elev, vrad.meta.antenna_height);
            if height < altitude_min || height >= altitude_max {
                continue;
            }

            let vrad_value = vrad.value(i_azim, i_rang);
            let dbz_value = dbz.value(i_azim, i_rang);

            let mut code = GateCode::empty();
            if vrad_value.is_none() {
                code.insert(GateCode::MISSING_VRAD);
            }
            if dbz_value.is_none() {
                code.insert(GateCode::MISSING_DBZ);
            }
            if cell_image.in_cell(i_azim, i_rang) {
                code.insert(GateCode::CELL);
            } else if cell_image.in_fringe(i_azim, i_rang) {
                code.insert(GateCode::FRINGE);
            }

            points.push_row(
                vrad.meta.gate_azimuth(i_azim),
                height,
                vrad_value.unwrap_or(f32::NAN),
                dbz_value.unwrap_or(f32::NAN),
                code,
            )?;
        }
    }

    Ok(points.len())
}

/// Rewrite gate flags from the residuals of an external profile fit.
///
/// `included_index[k]` is the buffer row that produced observation `k`; the
/// fitted value is written into the row's scratch column and the
/// residual-outlier flag set when `|observed - fitted|` exceeds
/// `abs_vdif_max`. This enables a residual-aware second pass without
/// re-running clustering or classification, and is the only step allowed to
/// change codes after classification.
pub fn update_flag_fields_in_points_array(
    y_obs: &[f32],
    y_fitted: &[f32],
    included_index: &[usize],
    abs_vdif_max: f32,
    points: &mut PointsBuffer,
) -> Result<(), PointsError> {
    if y_obs.len() != y_fitted.len() || y_obs.len() != included_index.len() {
        return Err(PointsError::FitLengthMismatch {
            n_obs: y_obs.len(),
            n_fitted: y_fitted.len(),
            n_index: included_index.len(),
        });
    }

    for (k, &i_row) in included_index.iter().enumerate() {
        if i_row >= points.len() {
            return Err(PointsError::RowOutOfRange {
                i_row,
                n_rows: points.len(),
            });
        }
        points.set_fitted(i_row, y_fitted[k]);
        if (y_obs[k] - y_fitted[k]).abs() > abs_vdif_max {
            let mut code = points.gate_code(i_row);
            code.insert(GateCode::RESIDUAL_OUTLIER);
            points.set_gate_code(i_row, code);
        }
    }
    Ok(())
}
