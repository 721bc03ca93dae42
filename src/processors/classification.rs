//! Per-gate bitmask classification and the inclusion predicate.
//!
//! Classification is a fixed decision pipeline, not a dispatch hierarchy:
//! each predicate inspects the decoded gate and contributes one flag, in the
//! documented order. Flags are additive; nothing here ever clears a bit.

use crate::config::ClassifyConfig;
use crate::core::cells::CellImage;
use crate::core::geometry::beam_height;
use crate::core::points::{GateCode, PointsBuffer, COL_DBZ, COL_VRAD};
use crate::core::scan::{ScanError, ScanImage};
use crate::processors::ProcessingError;

/// Profile retrieval flavor deciding which gate codes are usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileType {
    /// Bird/insect density and wind from gates outside precipitation.
    Biology,
    /// Precipitation profile from gates inside cells.
    Precipitation,
    /// Quality-screened gates regardless of echo type.
    All,
}

/// Flags that disqualify a gate from every profile flavor.
const UNUSABLE: GateCode = GateCode::MISSING_DBZ
    .union(GateCode::MISSING_VRAD)
    .union(GateCode::OUTSIDE_WINDOW)
    .union(GateCode::RESIDUAL_OUTLIER);

/// Pure predicate: may a gate with this code enter the fit for `profile`?
///
/// Never mutates the code; the post-fit update is the only step allowed to
/// change flags after classification.
pub fn include_gate(profile: ProfileType, code: GateCode) -> bool {
    if code.intersects(UNUSABLE) {
        return false;
    }
    match profile {
        ProfileType::Biology => !code.intersects(
            GateCode::CELL
                .union(GateCode::FRINGE)
                .union(GateCode::CLUTTER)
                .union(GateCode::PRECIP)
                .union(GateCode::LOW_VRAD),
        ),
        ProfileType::Precipitation => {
            code.intersects(GateCode::CELL.union(GateCode::PRECIP))
                && !code.contains(GateCode::CLUTTER)
        }
        ProfileType::All => !code.contains(GateCode::CLUTTER),
    }
}

/// Height band of one profile layer.
#[derive(Debug, Clone, Copy)]
pub struct HeightLayer {
    /// Zero-based layer index.
    pub i_layer: usize,
    /// Layer thickness in km.
    pub thickness: f32,
}

impl HeightLayer {
    /// Inclusive lower bound of the layer, km.
    #[inline]
    pub fn lower(&self) -> f32 {
        self.i_layer as f32 * self.thickness
    }

    /// Exclusive upper bound of the layer, km.
    #[inline]
    pub fn upper(&self) -> f32 {
        (self.i_layer as f32 + 1.0) * self.thickness
    }

    /// Whether a beam height falls inside the layer.
    #[inline]
    pub fn contains(&self, height: f32) -> bool {
        height >= self.lower() && height < self.upper()
    }
}

/// Texture ceiling of a precipitation gate, m/s.
///
/// Derived from the distance between the precipitation floor and the
/// receiver noise floor: echoes close to the noise floor carry noisy
/// velocities, so the acceptable texture shrinks with `dbz_noise` rising
/// toward `dbz_min`.
fn precip_texture_ceiling(config: &ClassifyConfig) -> f32 {
    ((config.dbz_min - config.dbz_noise) / 10.0).max(0.0)
}

/// Classify every gate of one scan inside a height layer and append the
/// selected feature rows.
///
/// Gates whose beam height falls in `layer` and whose range lies inside the
/// configured `[range_min, range_max]` window are decoded and coded by the
/// fixed predicate order:
///
/// 1. missing-data flags for reflectivity, velocity, texture and clutter
/// 2. clutter flag (clutter map at or above `dbz_clutter`, when enabled)
/// 3. precipitation flag (reflectivity within `[dbz_min, dbz_max]` and
///    texture below the noise-derived ceiling)
/// 4. azimuth-window membership
/// 5. low-velocity flag (|vrad| below `abs_vrad_min`)
/// 6. cell/fringe membership from the label image
///
/// Missing observables are stored as `NaN`; their flags keep the row out of
/// any fit via [`include_gate`]. Rows land in scan traversal order at the
/// buffer's current write position.
///
/// # Returns
///
/// The updated number of rows in the buffer.
pub fn classify_gates(
    dbz: &ScanImage,
    vrad: &ScanImage,
    tex: &ScanImage,
    clutter: &ScanImage,
    cell_image: &CellImage,
    config: &ClassifyConfig,
    layer: HeightLayer,
    points: &mut PointsBuffer,
) -> Result<usize, ProcessingError> {
    dbz.meta.check_same_grid(&vrad.meta)?;
    dbz.meta.check_same_grid(&tex.meta)?;
    dbz.meta.check_same_grid(&clutter.meta)?;
    if cell_image.n_azim() != dbz.meta.n_azim || cell_image.n_rang() != dbz.meta.n_rang {
        return Err(ScanError::DimensionMismatch {
            expected_azim: dbz.meta.n_azim,
            expected_rang: dbz.meta.n_rang,
            actual_azim: cell_image.n_azim(),
            actual_rang: cell_image.n_rang(),
        }
        .into());
    }

    let tex_ceiling = precip_texture_ceiling(config);

    for i_azim in 0..dbz.meta.n_azim {
        for i_rang in 0..dbz.meta.n_rang {
            let range = dbz.meta.gate_range(i_rang);
            if range < config.range_min || range > config.range_max {
                continue;
            }
            let height = beam_height(range, dbz.meta.elev, dbz.meta.antenna_height);
            if !layer.contains(height) {
                continue;
            }

            let azim = dbz.meta.gate_azimuth(i_azim);
            let dbz_value = dbz.value(i_azim, i_rang);
            let vrad_value = vrad.value(i_azim, i_rang);
            let tex_value = tex.value(i_azim, i_rang);
            let clutter_value = clutter.value(i_azim, i_rang);

            let mut code = GateCode::empty();

            if dbz_value.is_none() {
                code.insert(GateCode::MISSING_DBZ);
            }
            if vrad_value.is_none() {
                code.insert(GateCode::MISSING_VRAD);
            }
            if tex_value.is_none() {
                code.insert(GateCode::MISSING_TEX);
            }
            if clutter_value.is_none() {
                code.insert(GateCode::MISSING_CLUTTER);
            }

            if config.clutter_flag {
                if let Some(c) = clutter_value {
                    if c >= config.dbz_clutter {
                        code.insert(GateCode::CLUTTER);
                    }
                }
            }

            if let Some(d) = dbz_value {
                let tex_ok = match tex_value {
                    Some(t) => t < tex_ceiling,
                    None => false,
                };
                if d >= config.dbz_min && d <= config.dbz_max && tex_ok {
                    code.insert(GateCode::PRECIP);
                }
            }

            if azim < config.azim_min || azim > config.azim_max {
                code.insert(GateCode::OUTSIDE_WINDOW);
            }

            if let Some(v) = vrad_value {
                if v.abs() < config.abs_vrad_min {
                    code.insert(GateCode::LOW_VRAD);
                }
            }

            if cell_image.in_cell(i_azim, i_rang) {
                code.insert(GateCode::CELL);
            } else if cell_image.in_fringe(i_azim, i_rang) {
                code.insert(GateCode::FRINGE);
            }

            points.push_row(
                azim,
                height,
                vrad_value.unwrap_or(f32::NAN),
                dbz_value.unwrap_or(f32::NAN),
                code,
            )?;
        }
    }

    Ok(points.len())
}

/// Lightweight single-criterion re-classification of one selected row.
///
/// Applies a reflectivity ceiling and a velocity floor directly to the
/// feature row, without re-decoding any image: reflectivity above `dbz_max`
/// marks the gate as cell echo, |velocity| below `vrad_min` marks it
/// low-velocity. Flags are only added.
pub fn classify_gates_simple(
    points: &mut PointsBuffer,
    i_row: usize,
    dbz_max: f32,
    vrad_min: f32,
) {
    let row = points.row(i_row);
    let dbz = row[COL_DBZ];
    let vrad = row[COL_VRAD];

    let mut code = points.gate_code(i_row);
    if dbz.is_finite() && dbz > dbz_max {
        code.insert(GateCode::CELL);
    }
    if vrad.is_finite() && vrad.abs() < vrad_min {
        code.insert(GateCode::LOW_VRAD);
    }
    points.set_gate_code(i_row, code);
}
