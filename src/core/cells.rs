//! Cell label image and per-cluster property records.
//!
//! The clustering pass writes positive cluster ids into a [`CellImage`];
//! the statistics pass fills one [`CellProp`] per id. Ids index the property
//! arena directly (`id - 1`), and removal is a flag on the record until the
//! explicit erase pass resets the labelled gates, so ids stay stable while
//! the filter criteria are evaluated.

/// Label of a gate that belongs to no cluster.
pub const CELL_NONE: i32 = 0;

/// Label of a gate added to a cluster margin by fringe dilation.
///
/// Kept distinct from the core cluster ids so the classifier can treat
/// fringe gates with lower confidence.
pub const CELL_FRINGE: i32 = -1;

/// Integer label grid co-registered with the reflectivity scan.
///
/// Same azimuth-major layout as [`crate::core::scan::ScanImage`]. Values are
/// `CELL_NONE`, a positive cluster id, or `CELL_FRINGE`; the grid is mutated
/// in place by clustering, filtering and dilation and is read-only afterwards.
#[derive(Debug, Clone)]
pub struct CellImage {
    n_azim: usize,
    n_rang: usize,
    data: Vec<i32>,
}

impl CellImage {
    /// Create an all-`CELL_NONE` label grid.
    pub fn new(n_azim: usize, n_rang: usize) -> Self {
        Self {
            n_azim,
            n_rang,
            data: vec![CELL_NONE; n_azim * n_rang],
        }
    }

    #[inline]
    pub fn n_azim(&self) -> usize {
        self.n_azim
    }

    #[inline]
    pub fn n_rang(&self) -> usize {
        self.n_rang
    }

    #[inline]
    pub fn index(&self, i_azim: usize, i_rang: usize) -> usize {
        i_azim * self.n_rang + i_rang
    }

    #[inline]
    pub fn label(&self, i_azim: usize, i_rang: usize) -> i32 {
        self.data[self.index(i_azim, i_rang)]
    }

    #[inline]
    pub fn set_label(&mut self, i_azim: usize, i_rang: usize, label: i32) {
        let i = self.index(i_azim, i_rang);
        self.data[i] = label;
    }

    /// Whether the gate belongs to a surviving cluster core.
    #[inline]
    pub fn in_cell(&self, i_azim: usize, i_rang: usize) -> bool {
        self.label(i_azim, i_rang) > 0
    }

    /// Whether the gate was added by fringe dilation.
    #[inline]
    pub fn in_fringe(&self, i_azim: usize, i_rang: usize) -> bool {
        self.label(i_azim, i_rang) == CELL_FRINGE
    }

    /// Reset every gate to `CELL_NONE`.
    pub fn clear(&mut self) {
        self.data.fill(CELL_NONE);
    }

    /// Flat label slice, azimuth-major.
    pub fn labels(&self) -> &[i32] {
        &self.data
    }

    /// Mutable flat label slice, azimuth-major.
    pub fn labels_mut(&mut self) -> &mut [i32] {
        &mut self.data
    }
}

/// Aggregate statistics of one detected cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct CellProp {
    /// Range index of the peak reflectivity gate.
    pub i_rang_of_max: usize,
    /// Azimuth index of the peak reflectivity gate.
    pub i_azim_of_max: usize,
    /// Mean reflectivity over the cluster in dBZ.
    pub dbz_avg: f32,
    /// Mean velocity texture over the cluster in m/s.
    pub tex_avg: f32,
    /// Coefficient of variation: texture mean over reflectivity magnitude.
    pub cv: f32,
    /// Number of gates in the cluster.
    pub area: usize,
    /// Number of gates whose clutter-map value exceeds the clutter ceiling.
    pub clutter_area: usize,
    /// Peak reflectivity in dBZ.
    pub dbz_max: f32,
    /// Stable cluster id minus one; survives re-ordering.
    pub index: usize,
    /// Marked for removal by the filter criteria.
    pub drop: bool,
}

impl CellProp {
    /// A fresh record for cluster `id` (1-based), before accumulation.
    pub fn new(id: usize) -> Self {
        Self {
            i_rang_of_max: 0,
            i_azim_of_max: 0,
            dbz_avg: 0.0,
            tex_avg: 0.0,
            cv: 0.0,
            area: 0,
            clutter_area: 0,
            dbz_max: f32::NEG_INFINITY,
            index: id - 1,
            drop: false,
        }
    }

    /// Fraction of cluster gates flagged by the clutter map.
    pub fn clutter_fraction(&self) -> f32 {
        if self.area == 0 {
            0.0
        } else {
            self.clutter_area as f32 / self.area as f32
        }
    }
}
