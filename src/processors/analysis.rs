//! Per-cell statistics, quality filtering and ranking.

use log::debug;

use crate::config::CellConfig;
use crate::core::cells::{CellImage, CellProp, CELL_NONE};
use crate::core::scan::{ScanError, ScanImage};

/// Guard against dividing the texture mean by a vanishing reflectivity mean.
const DBZ_AVG_EPSILON: f32 = 1e-6;

/// Compute per-cell statistics and erase the cells that fail the filters.
///
/// For every cluster id in `cell_image` this accumulates area, mean
/// reflectivity and texture, peak reflectivity and its coordinates, the
/// clutter-flagged gate count, and the mean absolute radial velocity. A cell
/// is marked for removal when any of these holds:
///
/// - area below `area_min`
/// - mean reflectivity below `cell_dbz_min`
/// - coefficient of variation above `cell_stdev_max`
/// - clutter filtering active and clutter fraction above
///   `cell_clutter_fraction`
/// - mean |vrad| below `abs_vrad_min` (near-zero radial velocity points to
///   ground clutter rather than precipitation or biology)
///
/// Removal erases the cell's gates from `cell_image` in place; the property
/// records keep their stable indices.
///
/// # Arguments
///
/// * `dbz`, `vrad`, `tex`, `clutter` - Co-registered scan fields
/// * `cell_image` - Cluster labels from [`crate::processors::find_cells`]
/// * `n_cells` - Cluster count returned by the clustering pass
/// * `config` - Filter thresholds
///
/// # Returns
///
/// The populated property records and the number of surviving cells.
pub fn analyze_cells(
    dbz: &ScanImage,
    vrad: &ScanImage,
    tex: &ScanImage,
    clutter: &ScanImage,
    cell_image: &mut CellImage,
    n_cells: usize,
    config: &CellConfig,
) -> Result<(Vec<CellProp>, usize), ScanError> {
    dbz.meta.check_same_grid(&vrad.meta)?;
    dbz.meta.check_same_grid(&tex.meta)?;
    dbz.meta.check_same_grid(&clutter.meta)?;

    let mut props: Vec<CellProp> = (1..=n_cells).map(CellProp::new).collect();

    // Per-cell running sums; the property record keeps only the finished
    // averages.
    let mut dbz_sum = vec![0.0f32; n_cells];
    let mut dbz_count = vec![0usize; n_cells];
    let mut tex_sum = vec![0.0f32; n_cells];
    let mut tex_count = vec![0usize; n_cells];
    let mut vrad_abs_sum = vec![0.0f32; n_cells];
    let mut vrad_count = vec![0usize; n_cells];

    for i_azim in 0..dbz.meta.n_azim {
        for i_rang in 0..dbz.meta.n_rang {
            let label = cell_image.label(i_azim, i_rang);
            if label <= 0 {
                continue;
            }
            let i = (label - 1) as usize;
            if i >= n_cells {
                continue;
            }

            let prop = &mut props[i];
            prop.area += 1;

            if let Some(c) = clutter.value(i_azim, i_rang) {
                if c > config.clutter_value_max {
                    prop.clutter_area += 1;
                }
            }

            if let Some(d) = dbz.value(i_azim, i_rang) {
                dbz_sum[i] += d;
                dbz_count[i] += 1;
                if d > prop.dbz_max {
                    prop.dbz_max = d;
                    prop.i_rang_of_max = i_rang;
                    prop.i_azim_of_max = i_azim;
                }
            }

            if let Some(t) = tex.value(i_azim, i_rang) {
                tex_sum[i] += t;
                tex_count[i] += 1;
            }

            if let Some(v) = vrad.value(i_azim, i_rang) {
                vrad_abs_sum[i] += v.abs();
                vrad_count[i] += 1;
            }
        }
    }

    for (i, prop) in props.iter_mut().enumerate() {
        if dbz_count[i] > 0 {
            prop.dbz_avg = dbz_sum[i] / dbz_count[i] as f32;
        }
        if tex_count[i] > 0 {
            prop.tex_avg = tex_sum[i] / tex_count[i] as f32;
        }
        // cv undefined for a vanishing reflectivity mean; left at zero so
        // the cell is not dropped on an undefined ratio.
        if prop.dbz_avg.abs() > DBZ_AVG_EPSILON && tex_count[i] > 0 {
            prop.cv = prop.tex_avg / prop.dbz_avg.abs();
        }

        if prop.area < config.area_min {
            prop.drop = true;
        }
        if prop.dbz_avg < config.cell_dbz_min {
            prop.drop = true;
        }
        if prop.cv > config.cell_stdev_max {
            prop.drop = true;
        }
        if config.clutter_flag && prop.clutter_fraction() > config.cell_clutter_fraction {
            prop.drop = true;
        }
        if vrad_count[i] > 0 && vrad_abs_sum[i] / (vrad_count[i] as f32) < config.abs_vrad_min {
            prop.drop = true;
        }

        debug!(
            "cell {}: area={} dbzAvg={:.1} texAvg={:.2} cv={:.3} clutter={} dbzMax={:.1} drop={}",
            i + 1,
            prop.area,
            prop.dbz_avg,
            prop.tex_avg,
            prop.cv,
            prop.clutter_area,
            prop.dbz_max,
            prop.drop
        );
    }

    // Erase the dropped cells from the label image.
    for label in cell_image.labels_mut() {
        if *label > 0 {
            let i = (*label - 1) as usize;
            if i < n_cells && props[i].drop {
                *label = CELL_NONE;
            }
        }
    }

    let n_valid = props.iter().filter(|p| !p.drop).count();
    debug!("analyze_cells: {} of {} cells survive", n_valid, n_cells);
    Ok((props, n_valid))
}

/// Order cell records by descending area, largest peak reflectivity first on
/// ties.
///
/// The ranking is used for reporting only; cluster ids in the label image
/// are untouched (each record keeps its stable `index`).
pub fn sort_cells(cell_props: &mut [CellProp]) {
    cell_props.sort_by(|a, b| {
        b.area.cmp(&a.area).then(
            b.dbz_max
                .partial_cmp(&a.dbz_max)
                .unwrap_or(std::cmp::Ordering::Equal),
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scan::ScanMeta;
    use crate::processors::clustering::find_cells;

    fn meta(n_azim: usize, n_rang: usize, offset: f32, scale: f32) -> ScanMeta {
        ScanMeta {
            antenna_height: 0.0,
            elev: 0.5,
            n_rang,
            n_azim,
            range_scale: 1.0,
            azim_scale: 360.0 / n_azim as f32,
            value_offset: offset,
            value_scale: scale,
            missing: 255,
        }
    }

    struct Fixture {
        dbz: ScanImage,
        vrad: ScanImage,
        tex: ScanImage,
        clutter: ScanImage,
        cells: CellImage,
        n_cells: usize,
    }

    /// One 2x2 blob at 30 dBZ, 5 m/s, zero texture, clean clutter map.
    fn blob_fixture(n_azim: usize, n_rang: usize) -> Fixture {
        let mut dbz = ScanImage::filled_missing(meta(n_azim, n_rang, -32.0, 0.5));
        let mut vrad = ScanImage::filled_missing(meta(n_azim, n_rang, -64.0, 0.5));
        let mut tex = ScanImage::filled_missing(meta(n_azim, n_rang, 0.0, 0.1));
        let clutter = ScanImage::filled_missing(meta(n_azim, n_rang, 0.0, 1.0));

        for (a, r) in [(2, 3), (2, 4), (3, 3), (3, 4)] {
            dbz.set_value(a, r, 30.0);
            vrad.set_value(a, r, 5.0);
            tex.set_value(a, r, 0.0);
        }

        let mut cells = CellImage::new(n_azim, n_rang);
        let n_cells = find_cells(&dbz, &mut cells, 10.0, 100.0).unwrap();

        Fixture {
            dbz,
            vrad,
            tex,
            clutter,
            cells,
            n_cells,
        }
    }

    #[test]
    fn test_healthy_cell_survives() {
        let mut f = blob_fixture(8, 16);
        let config = CellConfig {
            area_min: 4,
            cell_dbz_min: 15.0,
            abs_vrad_min: 2.0,
            ..CellConfig::default()
        };

        let (props, n_valid) =
            analyze_cells(&f.dbz, &f.vrad, &f.tex, &f.clutter, &mut f.cells, f.n_cells, &config)
                .unwrap();

        assert_eq!(n_valid, 1);
        assert_eq!(props[0].area, 4);
        assert!((props[0].dbz_avg - 30.0).abs() < 0.5);
        assert!((props[0].dbz_max - 30.0).abs() < 0.5);
        assert_eq!(props[0].i_azim_of_max, 2);
        assert_eq!(props[0].i_rang_of_max, 3);
        assert!(!props[0].drop);
        assert!(f.cells.in_cell(2, 3));
    }

    #[test]
    fn test_small_cell_is_removed() {
        // Present after clustering, absent after filtering.
        let mut f = blob_fixture(8, 16);
        assert_eq!(f.n_cells, 1);
        assert!(f.cells.in_cell(2, 3));

        let config = CellConfig {
            area_min: 10,
            ..CellConfig::default()
        };
        let (props, n_valid) =
            analyze_cells(&f.dbz, &f.vrad, &f.tex, &f.clutter, &mut f.cells, f.n_cells, &config)
                .unwrap();

        assert_eq!(n_valid, 0);
        assert!(props[0].drop);
        assert!(!f.cells.in_cell(2, 3));
    }

    #[test]
    fn test_slow_cell_is_removed() {
        let mut f = blob_fixture(8, 16);
        let config = CellConfig {
            abs_vrad_min: 10.0,
            ..CellConfig::default()
        };

        let (_, n_valid) =
            analyze_cells(&f.dbz, &f.vrad, &f.tex, &f.clutter, &mut f.cells, f.n_cells, &config)
                .unwrap();
        assert_eq!(n_valid, 0);
    }

    #[test]
    fn test_mean_speed_just_above_floor_survives() {
        // Fixture gates move at 5 m/s; the floor sits just below the mean.
        let mut f = blob_fixture(8, 16);
        let config = CellConfig {
            abs_vrad_min: 4.9,
            ..CellConfig::default()
        };

        let (props, n_valid) =
            analyze_cells(&f.dbz, &f.vrad, &f.tex, &f.clutter, &mut f.cells, f.n_cells, &config)
                .unwrap();
        assert_eq!(n_valid, 1);
        assert!(!props[0].drop);
    }

    #[test]
    fn test_cluttered_cell_removed_only_when_flag_set() {
        let mut f = blob_fixture(8, 16);
        for (a, r) in [(2, 3), (2, 4), (3, 3)] {
            f.clutter.set_value(a, r, 1.0);
        }

        let mut config = CellConfig {
            cell_clutter_fraction: 0.5,
            clutter_value_max: 0.1,
            clutter_flag: false,
            abs_vrad_min: 2.0,
            ..CellConfig::default()
        };

        let mut cells = f.cells.clone();
        let (props, n_valid) =
            analyze_cells(&f.dbz, &f.vrad, &f.tex, &f.clutter, &mut cells, f.n_cells, &config)
                .unwrap();
        assert_eq!(props[0].clutter_area, 3);
        assert_eq!(n_valid, 1);

        config.clutter_flag = true;
        let (_, n_valid) =
            analyze_cells(&f.dbz, &f.vrad, &f.tex, &f.clutter, &mut f.cells, f.n_cells, &config)
                .unwrap();
        assert_eq!(n_valid, 0);
    }

    #[test]
    fn test_noisy_texture_drops_cell() {
        let mut f = blob_fixture(8, 16);
        for (a, r) in [(2, 3), (2, 4), (3, 3), (3, 4)] {
            f.tex.set_value(a, r, 20.0);
        }

        let config = CellConfig {
            cell_stdev_max: 0.5,
            abs_vrad_min: 2.0,
            ..CellConfig::default()
        };
        let (props, n_valid) =
            analyze_cells(&f.dbz, &f.vrad, &f.tex, &f.clutter, &mut f.cells, f.n_cells, &config)
                .unwrap();

        assert!(props[0].cv > 0.5);
        assert_eq!(n_valid, 0);
    }

    #[test]
    fn test_grid_mismatch_is_an_error() {
        let f = blob_fixture(8, 16);
        let bad_vrad = ScanImage::filled_missing(meta(8, 15, -64.0, 0.5));
        let mut cells = f.cells.clone();

        let result = analyze_cells(
            &f.dbz,
            &bad_vrad,
            &f.tex,
            &f.clutter,
            &mut cells,
            f.n_cells,
            &CellConfig::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_sort_cells_area_then_peak() {
        let mut props = vec![CellProp::new(1), CellProp::new(2), CellProp::new(3)];
        props[0].area = 5;
        props[0].dbz_max = 20.0;
        props[1].area = 9;
        props[1].dbz_max = 10.0;
        props[2].area = 5;
        props[2].dbz_max = 35.0;

        sort_cells(&mut props);

        // Larger area wins; equal area resolved by peak reflectivity.
        assert_eq!(props[0].index, 1);
        assert_eq!(props[1].index, 2);
        assert_eq!(props[2].index, 0);
    }
}
