//! Gate classification bitmask and the flat feature-vector buffer.

use std::fmt;

use thiserror::Error;

/// Errors raised by points-buffer operations.
#[derive(Debug, Error)]
pub enum PointsError {
    #[error("points buffer full: planned capacity is {capacity} rows")]
    BufferFull { capacity: usize },

    #[error("fit arrays disagree: {n_obs} observed, {n_fitted} fitted, {n_index} index entries")]
    FitLengthMismatch {
        n_obs: usize,
        n_fitted: usize,
        n_index: usize,
    },

    #[error("fit index points at row {i_row}, buffer holds {n_rows} rows")]
    RowOutOfRange { i_row: usize, n_rows: usize },
}

/// Per-gate classification bitmask.
///
/// Flags are additive-only during classification; the single exception is
/// [`GateCode::RESIDUAL_OUTLIER`], written by the post-fit update step.
/// The bit layout is fixed here and documented in DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateCode(u32);

impl GateCode {
    /// Gate lies inside a surviving precipitation cell.
    pub const CELL: GateCode = GateCode(1 << 0);
    /// Gate lies in the dilated margin of a cell.
    pub const FRINGE: GateCode = GateCode(1 << 1);
    /// Reflectivity byte is the missing sentinel.
    pub const MISSING_DBZ: GateCode = GateCode(1 << 2);
    /// Radial velocity byte is the missing sentinel.
    pub const MISSING_VRAD: GateCode = GateCode(1 << 3);
    /// Texture byte is the missing sentinel.
    pub const MISSING_TEX: GateCode = GateCode(1 << 4);
    /// Clutter-map byte is the missing sentinel.
    pub const MISSING_CLUTTER: GateCode = GateCode(1 << 5);
    /// Clutter-map value reaches the clutter reflectivity floor.
    pub const CLUTTER: GateCode = GateCode(1 << 6);
    /// Reflectivity and texture consistent with precipitation.
    pub const PRECIP: GateCode = GateCode(1 << 7);
    /// Gate falls outside the requested azimuth window.
    pub const OUTSIDE_WINDOW: GateCode = GateCode(1 << 8);
    /// Absolute radial velocity below the clutter-rejection floor.
    pub const LOW_VRAD: GateCode = GateCode(1 << 9);
    /// Post-fit residual exceeded the allowed deviation.
    pub const RESIDUAL_OUTLIER: GateCode = GateCode(1 << 10);

    /// Code with no flags set.
    #[inline]
    pub const fn empty() -> Self {
        GateCode(0)
    }

    /// Raw bit representation.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Rebuild a code from raw bits.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        GateCode(bits)
    }

    /// Whether every flag in `other` is set.
    #[inline]
    pub const fn contains(self, other: GateCode) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any flag in `other` is set.
    #[inline]
    pub const fn intersects(self, other: GateCode) -> bool {
        self.0 & other.0 != 0
    }

    /// Set the flags of `other`.
    #[inline]
    pub fn insert(&mut self, other: GateCode) {
        self.0 |= other.0;
    }

    /// Union of two codes.
    #[inline]
    pub const fn union(self, other: GateCode) -> GateCode {
        GateCode(self.0 | other.0)
    }

    /// Store the code in a feature-row column.
    ///
    /// The buffer is `f32` throughout because the external fit routine
    /// consumes it as one homogeneous array; eleven flag bits are well within
    /// the 24-bit exact-integer range of `f32`.
    #[inline]
    pub fn to_f32(self) -> f32 {
        self.0 as f32
    }

    /// Read a code back out of a feature-row column.
    #[inline]
    pub fn from_f32(value: f32) -> Self {
        GateCode(value as u32)
    }
}

impl fmt::Display for GateCode {
    /// Human-readable list of the set flags, for diagnostics and logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(GateCode, &str); 11] = [
            (GateCode::CELL, "cell"),
            (GateCode::FRINGE, "fringe"),
            (GateCode::MISSING_DBZ, "missing-dbz"),
            (GateCode::MISSING_VRAD, "missing-vrad"),
            (GateCode::MISSING_TEX, "missing-tex"),
            (GateCode::MISSING_CLUTTER, "missing-clutter"),
            (GateCode::CLUTTER, "clutter"),
            (GateCode::PRECIP, "precip"),
            (GateCode::OUTSIDE_WINDOW, "outside-window"),
            (GateCode::LOW_VRAD, "low-vrad"),
            (GateCode::RESIDUAL_OUTLIER, "residual-outlier"),
        ];

        if self.0 == 0 {
            return write!(f, "clear");
        }

        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Column index of the gate azimuth in degrees.
pub const COL_AZIM: usize = 0;
/// Column index of the beam height in km.
pub const COL_HEIGHT: usize = 1;
/// Column index of the observed radial velocity in m/s (`NaN` when missing).
pub const COL_VRAD: usize = 2;
/// Column index of the reflectivity in dBZ (`NaN` when missing).
pub const COL_DBZ: usize = 3;
/// Column index of the gate code bits.
pub const COL_CODE: usize = 4;
/// Scratch column for the fitted value written back after the profile fit.
pub const COL_FITTED: usize = 5;
/// Number of feature columns per row.
pub const N_COLS: usize = 6;

/// Flat array of per-gate feature vectors.
///
/// One row per selected gate, in scan traversal order (azimuth-major, range
/// inner). Capacity is fixed at construction by the capacity planner; writes
/// past the planned bound are rejected, never reallocated.
#[derive(Debug, Clone)]
pub struct PointsBuffer {
    data: Vec<f32>,
    n_rows: usize,
    capacity: usize,
}

impl PointsBuffer {
    /// Allocate a buffer for at most `capacity` rows.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity * N_COLS],
            n_rows: 0,
            capacity,
        }
    }

    /// Number of rows written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Planned row capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one feature row, returning its row index.
    pub fn push_row(
        &mut self,
        azim: f32,
        height: f32,
        vrad: f32,
        dbz: f32,
        code: GateCode,
    ) -> Result<usize, PointsError> {
        if self.n_rows >= self.capacity {
            return Err(PointsError::BufferFull {
                capacity: self.capacity,
            });
        }
        let base = self.n_rows * N_COLS;
        self.data[base + COL_AZIM] = azim;
        self.data[base + COL_HEIGHT] = height;
        self.data[base + COL_VRAD] = vrad;
        self.data[base + COL_DBZ] = dbz;
        self.data[base + COL_CODE] = code.to_f32();
        self.data[base + COL_FITTED] = f32::NAN;
        self.n_rows += 1;
        Ok(self.n_rows - 1)
    }

    /// Feature columns of row `i_row`.
    #[inline]
    pub fn row(&self, i_row: usize) -> &[f32] {
        let base = i_row * N_COLS;
        &self.data[base..base + N_COLS]
    }

    /// Gate code of row `i_row`.
    #[inline]
    pub fn gate_code(&self, i_row: usize) -> GateCode {
        GateCode::from_f32(self.row(i_row)[COL_CODE])
    }

    /// Overwrite the gate code of row `i_row`.
    #[inline]
    pub fn set_gate_code(&mut self, i_row: usize, code: GateCode) {
        self.data[i_row * N_COLS + COL_CODE] = code.to_f32();
    }

    /// Write the fitted value of row `i_row`.
    #[inline]
    pub fn set_fitted(&mut self, i_row: usize, fitted: f32) {
        self.data[i_row * N_COLS + COL_FITTED] = fitted;
    }

    /// Flat feature slice of the written rows, for the external fit routine.
    pub fn as_slice(&self) -> &[f32] {
        &self.data[..self.n_rows * N_COLS]
    }
}
