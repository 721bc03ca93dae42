//! Connected-component clustering of high-reflectivity gates.
//!
//! This module labels contiguous precipitation echoes on the polar grid:
//! - [`find_cells`] flood-fills 8-connected foreground gates into numbered
//!   cells, treating azimuth as circular and range as bounded
//! - [`fringe_cells`] grows surviving cells outward by a physical distance
//! - [`update_map`] re-applies a stricter area cutoff and erases the losers

use log::debug;

use crate::core::cells::{CellImage, CellProp, CELL_FRINGE, CELL_NONE};
use crate::core::geometry::calc_dist;
use crate::core::scan::{ScanError, ScanImage};

fn check_cell_grid(dbz: &ScanImage, cell_image: &CellImage) -> Result<(), ScanError> {
    if cell_image.n_azim() != dbz.meta.n_azim || cell_image.n_rang() != dbz.meta.n_rang {
        return Err(ScanError::DimensionMismatch {
            expected_azim: dbz.meta.n_azim,
            expected_rang: dbz.meta.n_rang,
            actual_azim: cell_image.n_azim(),
            actual_rang: cell_image.n_rang(),
        });
    }
    Ok(())
}

/// Label connected groups of high-reflectivity gates into numbered cells.
///
/// A gate is foreground when its decoded reflectivity reaches
/// `dbz_thres_min` and its range does not exceed `r_cell_max` km. Each
/// 8-connected foreground component receives a unique id starting at 1,
/// assigned in azimuth-major discovery order so identical input always
/// yields identical labels. Azimuth wraps at the 0/360 boundary; range
/// does not.
///
/// # Arguments
///
/// * `dbz` - Reflectivity scan
/// * `cell_image` - Label grid, overwritten in place
/// * `dbz_thres_min` - Minimum reflectivity of a foreground gate, dBZ
/// * `r_cell_max` - Maximum gate range considered, km
///
/// # Returns
///
/// The number of distinct cells found (zero is a valid outcome).
pub fn find_cells(
    dbz: &ScanImage,
    cell_image: &mut CellImage,
    dbz_thres_min: f32,
    r_cell_max: f32,
) -> Result<usize, ScanError> {
    check_cell_grid(dbz, cell_image)?;

    let n_azim = dbz.meta.n_azim;
    let n_rang = dbz.meta.n_rang;
    cell_image.clear();

    let foreground = |i_azim: usize, i_rang: usize| -> bool {
        if dbz.meta.gate_range(i_rang) > r_cell_max {
            return false;
        }
        matches!(dbz.value(i_azim, i_rang), Some(v) if v >= dbz_thres_min)
    };

    let mut n_cells = 0usize;
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for i_azim in 0..n_azim {
        for i_rang in 0..n_rang {
            if cell_image.label(i_azim, i_rang) != CELL_NONE || !foreground(i_azim, i_rang) {
                continue;
            }

            // New component: flood-fill it with the next id.
            n_cells += 1;
            let id = n_cells as i32;
            cell_image.set_label(i_azim, i_rang, id);
            stack.push((i_azim, i_rang));

            while let Some((a, r)) = stack.pop() {
                for d_azim in -1i32..=1 {
                    for d_rang in -1i32..=1 {
                        if d_azim == 0 && d_rang == 0 {
                            continue;
                        }
                        let na = (a as i32 + d_azim).rem_euclid(n_azim as i32) as usize;
                        let nr = r as i32 + d_rang;
                        if nr < 0 || nr >= n_rang as i32 {
                            continue;
                        }
                        let nr = nr as usize;
                        if cell_image.label(na, nr) == CELL_NONE && foreground(na, nr) {
                            cell_image.set_label(na, nr, id);
                            stack.push((na, nr));
                        }
                    }
                }
            }
        }
    }

    debug!("find_cells: {} cells above {} dBZ", n_cells, dbz_thres_min);
    Ok(n_cells)
}

/// Grow cell labels outward by a physical distance.
///
/// Every gate outside a cell that lies within `fringe` km of a core cell
/// gate is marked [`CELL_FRINGE`]. The search window per gate is derived
/// from its range, because one azimuth step covers more ground far from the
/// radar; the final membership test uses the chord distance of
/// [`calc_dist`]. Core labels are the only dilation sources, so the fringe
/// never grows from itself.
///
/// # Arguments
///
/// * `cell_image` - Label grid, updated in place
/// * `azim_scale` - Azimuth step in degrees
/// * `range_scale` - Range bin size in km
/// * `fringe` - Dilation distance in km
pub fn fringe_cells(cell_image: &mut CellImage, azim_scale: f32, range_scale: f32, fringe: f32) {
    if fringe <= 0.0 || range_scale <= 0.0 || azim_scale <= 0.0 {
        return;
    }

    let n_azim = cell_image.n_azim();
    let n_rang = cell_image.n_rang();
    let rang_half = (fringe / range_scale).ceil() as i32;

    for i_azim in 0..n_azim {
        for i_rang in 0..n_rang {
            if cell_image.label(i_azim, i_rang) != CELL_NONE {
                continue;
            }

            // Azimuth window shrinks with range; at the radar itself every
            // ray is within reach.
            let arc_per_ray = (i_rang as f32).max(1.0) * range_scale * azim_scale.to_radians();
            let azim_half = ((fringe / arc_per_ray).ceil() as i32).min(n_azim as i32 / 2);

            'search: for d_azim in -azim_half..=azim_half {
                let na = (i_azim as i32 + d_azim).rem_euclid(n_azim as i32) as usize;
                for d_rang in -rang_half..=rang_half {
                    let nr = i_rang as i32 + d_rang;
                    if nr < 0 || nr >= n_rang as i32 {
                        continue;
                    }
                    let nr = nr as usize;
                    if cell_image.label(na, nr) <= 0 {
                        continue;
                    }
                    let dist = calc_dist(i_rang, i_azim, nr, na, range_scale, azim_scale);
                    if dist <= fringe {
                        cell_image.set_label(i_azim, i_rang, CELL_FRINGE);
                        break 'search;
                    }
                }
            }
        }
    }
}

/// Re-apply a minimum-area cutoff and erase the cells below it.
///
/// Independent of the area filter inside the statistics pass; callers use it
/// for a second, stricter pruning. Dropped cells are flagged in `cell_props`
/// and their gates reset to [`CELL_NONE`].
///
/// # Returns
///
/// The number of cells still alive after the cutoff.
pub fn update_map(
    cell_image: &mut CellImage,
    cell_props: &mut [CellProp],
    min_cell_area: usize,
) -> usize {
    for prop in cell_props.iter_mut() {
        if prop.area < min_cell_area {
            prop.drop = true;
        }
    }

    for label in cell_image.labels_mut() {
        if *label > 0 {
            let i = (*label - 1) as usize;
            if i < cell_props.len() && cell_props[i].drop {
                *label = CELL_NONE;
            }
        }
    }

    let n_valid = cell_props.iter().filter(|p| !p.drop).count();
    debug!(
        "update_map: {} of {} cells at or above {} gates",
        n_valid,
        cell_props.len(),
        min_cell_area
    );
    n_valid
}
