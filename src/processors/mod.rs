//! Classification pipeline stages.

pub mod analysis;
pub mod capacity;
pub mod classification;
pub mod clustering;
pub mod gaps;
pub mod selection;
pub mod texture;

use log::info;
use thiserror::Error;

use crate::config::GateConfig;
use crate::core::cells::{CellImage, CellProp};
use crate::core::points::PointsError;
use crate::core::scan::{ScanError, ScanImage, ScanMeta};

// Re-export key operations for convenience
pub use analysis::{analyze_cells, sort_cells};
pub use capacity::{det_number_of_gates, det_svdfit_array_size, SvdFitPlan};
pub use classification::{
    classify_gates, classify_gates_simple, include_gate, HeightLayer, ProfileType,
};
pub use clustering::{find_cells, fringe_cells, update_map};
pub use gaps::has_azimuth_gap;
pub use selection::{get_list_of_selected_gates, update_flag_fields_in_points_array};
pub use texture::calc_texture;

/// Errors that can occur while running pipeline stages.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Points(#[from] PointsError),
}

/// Outcome of the per-scan cell stage.
#[derive(Debug)]
pub struct ScanClassification {
    /// Cluster labels after filtering and fringe dilation.
    pub cell_image: CellImage,
    /// Per-cluster statistics, ranked largest first.
    pub cell_props: Vec<CellProp>,
    /// Clusters found by the clustering pass.
    pub n_cells: usize,
    /// Clusters surviving the quality filters.
    pub n_cells_valid: usize,
    /// Velocity texture field of the scan.
    pub texture: ScanImage,
}

/// Run the cell stage of the pipeline for one scan pair.
///
/// Chains clustering, texture computation, cell statistics/filtering and
/// fringe dilation in their required order, leaving a label image and
/// texture field ready for per-gate classification.
///
/// # Arguments
///
/// * `dbz` - Reflectivity scan
/// * `vrad` - Radial velocity scan on the same grid
/// * `clutter` - Clutter map on the same grid
/// * `config` - Pipeline thresholds
///
/// # Errors
///
/// Returns an error when the scan grids are not co-registered.
pub fn classify_scan_pair(
    dbz: &ScanImage,
    vrad: &ScanImage,
    clutter: &ScanImage,
    config: &GateConfig,
) -> anyhow::Result<ScanClassification> {
    let mut cell_image = CellImage::new(dbz.meta.n_azim, dbz.meta.n_rang);
    let n_cells = find_cells(
        dbz,
        &mut cell_image,
        config.cells.dbz_thres_min,
        config.cells.r_cell_max,
    )?;

    let tex_meta = ScanMeta {
        value_offset: 0.0,
        value_scale: config.texture.stdev_scale,
        ..vrad.meta.clone()
    };
    let texture = calc_texture(
        tex_meta,
        vrad,
        dbz,
        config.texture.n_rang_neighborhood,
        config.texture.n_azim_neighborhood,
        config.texture.n_count_min,
    )?;

    let (mut cell_props, n_cells_valid) = analyze_cells(
        dbz,
        vrad,
        &texture,
        clutter,
        &mut cell_image,
        n_cells,
        &config.cells,
    )?;
    sort_cells(&mut cell_props);

    fringe_cells(
        &mut cell_image,
        dbz.meta.azim_scale,
        dbz.meta.range_scale,
        config.cells.fringe_dist,
    );

    info!(
        "scan at {:.1} deg: {} cells found, {} kept",
        dbz.meta.elev, n_cells, n_cells_valid
    );

    Ok(ScanClassification {
        cell_image,
        cell_props,
        n_cells,
        n_cells_valid,
        texture,
    })
}
