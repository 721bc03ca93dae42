//! Configuration types for the gate classification pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds applied to clustered cells by the statistics filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellConfig {
    /// Minimum reflectivity for a gate to seed or join a cell, dBZ
    #[serde(default = "default_dbz_cell_thres")]
    pub dbz_thres_min: f32,

    /// Maximum range considered by the clustering pass, km
    #[serde(default = "default_r_cell_max")]
    pub r_cell_max: f32,

    /// Minimum cell area in gates
    #[serde(default = "default_area_min")]
    pub area_min: usize,

    /// Minimum mean cell reflectivity, dBZ
    #[serde(default = "default_cell_dbz_min")]
    pub cell_dbz_min: f32,

    /// Maximum coefficient of variation (texture over reflectivity)
    #[serde(default = "default_cell_stdev_max")]
    pub cell_stdev_max: f32,

    /// Maximum fraction of cell gates flagged by the clutter map
    #[serde(default = "default_cell_clutter_fraction")]
    pub cell_clutter_fraction: f32,

    /// Minimum mean absolute radial velocity of a cell, m/s
    #[serde(default = "default_abs_vrad_min")]
    pub abs_vrad_min: f32,

    /// Clutter-map value above which a gate counts as clutter
    #[serde(default = "default_clutter_value_max")]
    pub clutter_value_max: f32,

    /// Whether the clutter map participates in cell filtering
    #[serde(default)]
    pub clutter_flag: bool,

    /// Fringe dilation distance around surviving cells, km
    #[serde(default = "default_fringe_dist")]
    pub fringe_dist: f32,
}

fn default_dbz_cell_thres() -> f32 {
    15.0
}

fn default_r_cell_max() -> f32 {
    30.0
}

fn default_area_min() -> usize {
    4
}

fn default_cell_dbz_min() -> f32 {
    15.0
}

fn default_cell_stdev_max() -> f32 {
    5.0
}

fn default_cell_clutter_fraction() -> f32 {
    0.5
}

fn default_abs_vrad_min() -> f32 {
    1.0
}

fn default_clutter_value_max() -> f32 {
    0.1
}

fn default_fringe_dist() -> f32 {
    5.0
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            dbz_thres_min: default_dbz_cell_thres(),
            r_cell_max: default_r_cell_max(),
            area_min: default_area_min(),
            cell_dbz_min: default_cell_dbz_min(),
            cell_stdev_max: default_cell_stdev_max(),
            cell_clutter_fraction: default_cell_clutter_fraction(),
            abs_vrad_min: default_abs_vrad_min(),
            clutter_value_max: default_clutter_value_max(),
            clutter_flag: false,
            fringe_dist: default_fringe_dist(),
        }
    }
}

/// Neighborhood parameters of the velocity texture field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextureConfig {
    /// Full neighborhood width in range bins (odd)
    #[serde(default = "default_n_rang_neighborhood")]
    pub n_rang_neighborhood: usize,

    /// Full neighborhood width in azimuth rays (odd)
    #[serde(default = "default_n_azim_neighborhood")]
    pub n_azim_neighborhood: usize,

    /// Minimum valid velocity samples for a defined texture value
    #[serde(default = "default_n_count_min")]
    pub n_count_min: usize,

    /// Quantization step of the stored texture bytes, m/s per count
    #[serde(default = "default_stdev_scale")]
    pub stdev_scale: f32,
}

fn default_n_rang_neighborhood() -> usize {
    3
}

fn default_n_azim_neighborhood() -> usize {
    3
}

fn default_n_count_min() -> usize {
    4
}

fn default_stdev_scale() -> f32 {
    0.1
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            n_rang_neighborhood: default_n_rang_neighborhood(),
            n_azim_neighborhood: default_n_azim_neighborhood(),
            n_count_min: default_n_count_min(),
            stdev_scale: default_stdev_scale(),
        }
    }
}

/// Per-gate classification thresholds and the selection window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Minimum reflectivity of a precipitation gate, dBZ
    #[serde(default = "default_dbz_min")]
    pub dbz_min: f32,

    /// Maximum reflectivity of a precipitation gate, dBZ
    #[serde(default = "default_dbz_max")]
    pub dbz_max: f32,

    /// Receiver noise floor, dBZ; bounds the texture ceiling of precipitation
    #[serde(default = "default_dbz_noise")]
    pub dbz_noise: f32,

    /// Clutter-map reflectivity at or above which a gate is clutter, dBZ
    #[serde(default = "default_dbz_clutter")]
    pub dbz_clutter: f32,

    /// Minimum absolute radial velocity of a usable gate, m/s
    #[serde(default = "default_abs_vrad_min")]
    pub abs_vrad_min: f32,

    /// Whether the clutter map participates in gate classification
    #[serde(default)]
    pub clutter_flag: bool,

    /// Minimum selected range, km
    #[serde(default = "default_range_min")]
    pub range_min: f32,

    /// Maximum selected range, km
    #[serde(default = "default_range_max")]
    pub range_max: f32,

    /// Start of the accepted azimuth window, degrees
    #[serde(default)]
    pub azim_min: f32,

    /// End of the accepted azimuth window, degrees
    #[serde(default = "default_azim_max")]
    pub azim_max: f32,
}

fn default_dbz_min() -> f32 {
    20.0
}

fn default_dbz_max() -> f32 {
    60.0
}

fn default_dbz_noise() -> f32 {
    -40.0
}

fn default_dbz_clutter() -> f32 {
    -10.0
}

fn default_range_min() -> f32 {
    5.0
}

fn default_range_max() -> f32 {
    25.0
}

fn default_azim_max() -> f32 {
    360.0
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            dbz_min: default_dbz_min(),
            dbz_max: default_dbz_max(),
            dbz_noise: default_dbz_noise(),
            dbz_clutter: default_dbz_clutter(),
            abs_vrad_min: default_abs_vrad_min(),
            clutter_flag: false,
            range_min: default_range_min(),
            range_max: default_range_max(),
            azim_min: 0.0,
            azim_max: default_azim_max(),
        }
    }
}

/// Height layering and fit-quality parameters of the profile retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Number of height layers in the profile
    #[serde(default = "default_n_layers")]
    pub n_layers: usize,

    /// Thickness of one height layer, km
    #[serde(default = "default_layer_thickness")]
    pub layer_thickness: f32,

    /// Azimuth histogram bins of the gap detector
    #[serde(default = "default_n_bins_gap")]
    pub n_bins_gap: usize,

    /// Minimum observations per azimuth bin
    #[serde(default = "default_n_obs_gap_min")]
    pub n_obs_gap_min: usize,

    /// Maximum |observed - fitted| residual of an accepted gate, m/s
    #[serde(default = "default_abs_vdif_max")]
    pub abs_vdif_max: f32,
}

fn default_n_layers() -> usize {
    30
}

fn default_layer_thickness() -> f32 {
    0.2
}

fn default_n_bins_gap() -> usize {
    8
}

fn default_n_obs_gap_min() -> usize {
    5
}

fn default_abs_vdif_max() -> f32 {
    10.0
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            n_layers: default_n_layers(),
            layer_thickness: default_layer_thickness(),
            n_bins_gap: default_n_bins_gap(),
            n_obs_gap_min: default_n_obs_gap_min(),
            abs_vdif_max: default_abs_vdif_max(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub cells: CellConfig,

    #[serde(default)]
    pub texture: TextureConfig,

    #[serde(default)]
    pub classify: ClassifyConfig,

    #[serde(default)]
    pub layers: LayerConfig,
}

impl GateConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: GateConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
