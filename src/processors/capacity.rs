//! Capacity planning for the feature buffer.
//!
//! Pure computation, no side effects: before any gate is selected, the
//! planner determines how many gates can fall inside each height layer and
//! range window across the scans of a volume. The selection step is
//! bound-checked against this plan and never reallocates mid-pass.

use std::ops::Range;

use crate::core::geometry::beam_height;
use crate::core::scan::{PolarVolume, ScanMeta};

/// Count the gates of one scan whose beam height falls inside a layer.
///
/// A gate qualifies when its range center lies in `[range_min, range_max]`
/// and its beam height in `[i_layer * thickness, (i_layer + 1) * thickness)`.
/// Height depends only on the range bin, so each qualifying bin contributes
/// one gate per azimuth ray.
///
/// # Arguments
///
/// * `i_layer` - Zero-based height layer index
/// * `layer_thickness` - Layer thickness in km
/// * `range_min`, `range_max` - Selected range window in km
/// * `meta` - Scan geometry (range binning, elevation, antenna height)
pub fn det_number_of_gates(
    i_layer: usize,
    layer_thickness: f32,
    range_min: f32,
    range_max: f32,
    meta: &ScanMeta,
) -> usize {
    let lower = i_layer as f32 * layer_thickness;
    let upper = lower + layer_thickness;

    let mut n_gates = 0usize;
    for i_rang in 0..meta.n_rang {
        let range = meta.gate_range(i_rang);
        if range < range_min || range > range_max {
            continue;
        }
        let height = beam_height(range, meta.elev, meta.antenna_height);
        if height >= lower && height < upper {
            n_gates += meta.n_azim;
        }
    }
    n_gates
}

/// Sizing plan of the points buffer across all layers of a volume.
#[derive(Debug, Clone)]
pub struct SvdFitPlan {
    /// Total row capacity across all layers.
    pub n_rows: usize,
    /// Disjoint row range of each layer, in layer order.
    pub layers: Vec<Range<usize>>,
}

/// Plan the feature-buffer capacity for every layer over a whole volume.
///
/// Sums [`det_number_of_gates`] across the volume's scans per layer and lays
/// the layers out as consecutive, non-overlapping row ranges. The total is
/// the upper bound that guarantees gate selection never overflows the
/// buffer.
pub fn det_svdfit_array_size(
    volume: &dyn PolarVolume,
    n_layers: usize,
    layer_thickness: f32,
    range_min: f32,
    range_max: f32,
) -> SvdFitPlan {
    let mut layers = Vec::with_capacity(n_layers);
    let mut offset = 0usize;

    for i_layer in 0..n_layers {
        let mut n_layer_gates = 0usize;
        for i_scan in 0..volume.num_scans() {
            if let Some(meta) = volume.scan_geometry(i_scan) {
                n_layer_gates +=
                    det_number_of_gates(i_layer, layer_thickness, range_min, range_max, &meta);
            }
        }
        layers.push(offset..offset + n_layer_gates);
        offset += n_layer_gates;
    }

    SvdFitPlan {
        n_rows: offset,
        layers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(n_azim: usize, n_rang: usize, elev: f32) -> ScanMeta {
        ScanMeta {
            antenna_height: 0.0,
            elev,
            n_rang,
            n_azim,
            range_scale: 1.0,
            azim_scale: 360.0 / n_azim as f32,
            value_offset: 0.0,
            value_scale: 1.0,
            missing: 255,
        }
    }

    struct TestVolume {
        scans: Vec<ScanMeta>,
    }

    impl PolarVolume for TestVolume {
        fn num_scans(&self) -> usize {
            self.scans.len()
        }

        fn scan_geometry(&self, i_scan: usize) -> Option<ScanMeta> {
            self.scans.get(i_scan).cloned()
        }
    }

    #[test]
    fn test_flat_beam_fills_bottom_layer() {
        // At zero elevation every near gate stays below 1 km.
        let m = meta(36, 50, 0.0);
        let n = det_number_of_gates(0, 1.0, 0.0, 1000.0, &m);
        assert_eq!(n, 36 * 50);
        assert_eq!(det_number_of_gates(5, 1.0, 0.0, 1000.0, &m), 0);
    }

    #[test]
    fn test_range_window_limits_count() {
        let m = meta(36, 50, 0.0);
        // Gate centers 5.5 through 9.5 km qualify.
        let n = det_number_of_gates(0, 1.0, 5.0, 10.0, &m);
        assert_eq!(n, 36 * 5);
    }

    #[test]
    fn test_elevated_beam_spreads_over_layers() {
        let m = meta(36, 100, 5.0);
        let total: usize = (0..60)
            .map(|l| det_number_of_gates(l, 0.2, 0.0, 1000.0, &m))
            .sum();
        // Every range bin lands in exactly one layer as long as enough
        // layers are requested.
        assert_eq!(total, 36 * 100);
    }

    #[test]
    fn test_plan_partitions_are_disjoint_and_cover_total() {
        let volume = TestVolume {
            scans: vec![meta(36, 100, 0.5), meta(36, 100, 2.0)],
        };

        let plan = det_svdfit_array_size(&volume, 20, 0.2, 5.0, 25.0);

        let mut expected_start = 0usize;
        for layer in &plan.layers {
            assert_eq!(layer.start, expected_start);
            expected_start = layer.end;
        }
        assert_eq!(expected_start, plan.n_rows);
        assert!(plan.n_rows > 0);
    }

    #[test]
    fn test_empty_volume_plans_zero_rows() {
        let volume = TestVolume { scans: vec![] };
        let plan = det_svdfit_array_size(&volume, 10, 0.2, 5.0, 25.0);
        assert_eq!(plan.n_rows, 0);
        assert!(plan.layers.iter().all(|l| l.is_empty()));
    }
}
