//! Local-variability texture of the radial velocity field.

use rayon::prelude::*;

use crate::core::scan::{ScanError, ScanImage, ScanMeta};

/// Compute the velocity texture field over a rectangular neighborhood.
///
/// Texture is the standard deviation of radial velocity inside an
/// `n_azim_neighborhood` x `n_rang_neighborhood` window centered on each
/// gate. A neighbor contributes only when both its velocity and its
/// reflectivity decode; gates with fewer than `n_count_min` contributing
/// neighbors get the missing sentinel, which protects the classifier from
/// spuriously low texture at grid edges and in sparse data. Azimuth wraps
/// circularly, range clips at the grid edges.
///
/// Rows are independent, so the computation is parallelized per azimuth ray.
///
/// # Arguments
///
/// * `tex_meta` - Descriptor of the output field (quantization and sentinel)
/// * `vrad` - Radial velocity scan
/// * `dbz` - Reflectivity scan gating neighbor validity
/// * `n_rang_neighborhood` - Full window width in range bins
/// * `n_azim_neighborhood` - Full window width in azimuth rays
/// * `n_count_min` - Minimum valid neighbors for a defined texture value
///
/// # Returns
///
/// The quantized texture image on the same grid.
pub fn calc_texture(
    tex_meta: ScanMeta,
    vrad: &ScanImage,
    dbz: &ScanImage,
    n_rang_neighborhood: usize,
    n_azim_neighborhood: usize,
    n_count_min: usize,
) -> Result<ScanImage, ScanError> {
    vrad.meta.check_same_grid(&dbz.meta)?;
    vrad.meta.check_same_grid(&tex_meta)?;

    let n_azim = vrad.meta.n_azim;
    let n_rang = vrad.meta.n_rang;
    let azim_half = (n_azim_neighborhood / 2) as i32;
    let rang_half = (n_rang_neighborhood / 2) as i32;

    let rows: Vec<Vec<u8>> = (0..n_azim)
        .into_par_iter()
        .map(|i_azim| {
            let mut row = Vec::with_capacity(n_rang);

            for i_rang in 0..n_rang {
                let mut count = 0usize;
                let mut moment1 = 0.0f32;
                let mut moment2 = 0.0f32;

                for d_azim in -azim_half..=azim_half {
                    let na = (i_azim as i32 + d_azim).rem_euclid(n_azim as i32) as usize;
                    for d_rang in -rang_half..=rang_half {
                        let nr = i_rang as i32 + d_rang;
                        if nr < 0 || nr >= n_rang as i32 {
                            continue;
                        }
                        let nr = nr as usize;

                        let v = match vrad.value(na, nr) {
                            Some(v) => v,
                            None => continue,
                        };
                        if dbz.value(na, nr).is_none() {
                            continue;
                        }

                        count += 1;
                        moment1 += v;
                        moment2 += v * v;
                    }
                }

                if count < n_count_min || count == 0 {
                    row.push(tex_meta.missing);
                    continue;
                }

                let mean = moment1 / count as f32;
                let variance = (moment2 / count as f32 - mean * mean).max(0.0);
                row.push(tex_meta.encode(variance.sqrt()));
            }

            row
        })
        .collect();

    let mut data = Vec::with_capacity(n_azim * n_rang);
    for row in rows {
        data.extend(row);
    }

    ScanImage::new(tex_meta, data)
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn tex_meta(n_azim: usize, n_rang: usize) -> ScanMeta {
        meta(n_azim, n_rang, 0.0, 0.1)
    }

    fn uniform_scans(n_azim: usize, n_rang: usize, vrad_value: f32) -> (ScanImage, ScanImage) {
        let mut vrad = ScanImage::filled_missing(meta(n_azim, n_rang, -64.0, 0.5));
        let mut dbz = ScanImage::filled_missing(meta(n_azim, n_rang, -32.0, 0.5));
        for a in 0..n_azim {
            for r in 0..n_rang {
                vrad.set_value(a, r, vrad_value);
                dbz.set_value(a, r, 20.0);
            }
        }
        (vrad, dbz)
    }

    #[test]
    fn test_constant_velocity_has_zero_texture() {
        let (vrad, dbz) = uniform_scans(8, 16, 5.0);
        let tex = calc_texture(tex_meta(8, 16), &vrad, &dbz, 3, 3, 4).unwrap();

        for a in 0..8 {
            for r in 0..16 {
                let t = tex.value(a, r).unwrap();
                assert!(t.abs() < 0.11, "texture {} at ({}, {})", t, a, r);
            }
        }
    }

    #[test]
    fn test_all_missing_velocity_yields_missing_texture() {
        // Reflectivity alone cannot make a texture gate valid.
        let vrad = ScanImage::filled_missing(meta(8, 16, -64.0, 0.5));
        let (_, dbz) = uniform_scans(8, 16, 0.0);

        let tex = calc_texture(tex_meta(8, 16), &vrad, &dbz, 3, 3, 1).unwrap();
        for a in 0..8 {
            for r in 0..16 {
                assert_eq!(tex.value(a, r), None);
            }
        }
    }

    #[test]
    fn test_missing_reflectivity_gates_neighbors_out() {
        let (vrad, mut dbz) = uniform_scans(8, 16, 5.0);
        for a in 0..8 {
            for r in 0..16 {
                dbz.set_missing(a, r);
            }
        }

        let tex = calc_texture(tex_meta(8, 16), &vrad, &dbz, 3, 3, 1).unwrap();
        assert_eq!(tex.value(4, 8), None);
    }

    #[test]
    fn test_sparse_neighborhood_below_count_min_is_missing() {
        let mut vrad = ScanImage::filled_missing(meta(8, 16, -64.0, 0.5));
        let mut dbz = ScanImage::filled_missing(meta(8, 16, -32.0, 0.5));
        // Only three valid neighbors around (4, 8).
        for (a, r) in [(4, 8), (4, 9), (5, 8)] {
            vrad.set_value(a, r, 5.0);
            dbz.set_value(a, r, 20.0);
        }

        let tex = calc_texture(tex_meta(8, 16), &vrad, &dbz, 3, 3, 4).unwrap();
        assert_eq!(tex.value(4, 8), None);
    }

    #[test]
    fn test_velocity_spread_raises_texture() {
        let (mut vrad, dbz) = uniform_scans(8, 16, 5.0);
        // Alternate sign along range in one sector.
        for r in 0..16 {
            let v = if r % 2 == 0 { 10.0 } else { -10.0 };
            vrad.set_value(4, r, v);
        }

        let tex = calc_texture(tex_meta(8, 16), &vrad, &dbz, 3, 3, 4).unwrap();
        assert!(tex.value(4, 8).unwrap() > 5.0);
    }

    #[test]
    fn test_azimuth_wrap_uses_opposite_edge_rows() {
        // Rays 0 and 7 are adjacent through the wrap; a hot neighbor on ray 7
        // must raise the texture of ray 0.
        let (mut vrad, dbz) = uniform_scans(8, 16, 0.0);
        vrad.set_value(7, 8, 20.0);

        let tex = calc_texture(tex_meta(8, 16), &vrad, &dbz, 3, 3, 4).unwrap();
        assert!(tex.value(0, 8).unwrap() > 1.0);
        // Two rays away from the wrap the window no longer sees it.
        assert!(tex.value(2, 8).unwrap() < 0.11);
    }

    #[test]
    fn test_grid_mismatch_is_an_error() {
        let (vrad, _) = uniform_scans(8, 16, 0.0);
        let (_, dbz) = uniform_scans(8, 15, 0.0);
        assert!(calc_texture(tex_meta(8, 16), &vrad, &dbz, 3, 3, 4).is_err());
    }
}
