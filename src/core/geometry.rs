//! Distance and neighbor-index mapping between polar grids.

/// Effective Earth radius for beam-height geometry, km (4/3 model).
pub const EFFECTIVE_EARTH_RADIUS: f32 = 4.0 / 3.0 * 6371.0;

/// Planar chord distance in km between two gates of a polar grid.
///
/// Uses the law of cosines on the azimuth-angle difference; azimuth bin
/// width in km grows with range, so grid-index distance is not a usable
/// proxy.
///
/// # Arguments
///
/// * `i_rang1`, `i_azim1` - First gate (range bin, azimuth ray)
/// * `i_rang2`, `i_azim2` - Second gate
/// * `range_scale` - Range bin size in km
/// * `azim_scale` - Azimuth step in degrees
pub fn calc_dist(
    i_rang1: usize,
    i_azim1: usize,
    i_rang2: usize,
    i_azim2: usize,
    range_scale: f32,
    azim_scale: f32,
) -> f32 {
    let r1 = i_rang1 as f32 * range_scale;
    let r2 = i_rang2 as f32 * range_scale;
    let d_azim = (i_azim1 as f32 - i_azim2 as f32) * azim_scale.to_radians();
    let dist_sq = r1 * r1 + r2 * r2 - 2.0 * r1 * r2 * d_azim.cos();
    dist_sq.max(0.0).sqrt()
}

/// Map a gate index in a parent grid to the nearest gate in a child grid.
///
/// The two grids cover the same sweep at possibly different resolution; the
/// parent gate's bin-center coordinates are rescaled into child bins and
/// rounded. Returns `None` when the parent range bin falls beyond the child
/// grid.
pub fn find_nearby_gate_index(
    n_azim_parent: usize,
    n_rang_parent: usize,
    i_parent: usize,
    n_azim_child: usize,
    n_rang_child: usize,
) -> Option<usize> {
    if n_rang_parent == 0 || n_azim_parent == 0 || n_rang_child == 0 || n_azim_child == 0 {
        return None;
    }
    if i_parent >= n_azim_parent * n_rang_parent {
        return None;
    }

    let i_azim_parent = i_parent / n_rang_parent;
    let i_rang_parent = i_parent % n_rang_parent;

    // Bin centers rescaled into child resolution; azimuth wraps, range does not.
    let azim_ratio = n_azim_child as f32 / n_azim_parent as f32;
    let i_azim_child = ((i_azim_parent as f32 + 0.5) * azim_ratio - 0.5).round() as i64;
    let i_azim_child = i_azim_child.rem_euclid(n_azim_child as i64) as usize;

    let rang_ratio = n_rang_child as f32 / n_rang_parent as f32;
    let i_rang_child = ((i_rang_parent as f32 + 0.5) * rang_ratio - 0.5).round();
    if i_rang_child < 0.0 {
        return None;
    }
    let i_rang_child = i_rang_child as usize;
    if i_rang_child >= n_rang_child {
        return None;
    }

    Some(i_azim_child * n_rang_child + i_rang_child)
}

/// Height above the radar reference in km of a gate at `range` km.
///
/// Standard beam propagation: `r sin(e) + r^2 / (2 R_eff) + antenna height`,
/// with the 4/3 effective Earth radius.
#[inline]
pub fn beam_height(range: f32, elev_deg: f32, antenna_height: f32) -> f32 {
    range * elev_deg.to_radians().sin()
        + range * range / (2.0 * EFFECTIVE_EARTH_RADIUS)
        + antenna_height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_dist_radial() {
        // Same ray, 10 bins apart on a 1 km scale.
        let d = calc_dist(0, 0, 10, 0, 1.0, 1.0);
        assert!((d - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_calc_dist_antipodal_chord() {
        // Opposite rays at the same range: chord is the diameter.
        let d = calc_dist(10, 0, 10, 180, 1.0, 1.0);
        assert!((d - 20.0).abs() < 1e-3);
    }

    #[test]
    fn test_calc_dist_same_gate_is_zero() {
        assert_eq!(calc_dist(7, 42, 7, 42, 0.5, 1.0), 0.0);
    }

    #[test]
    fn test_nearby_gate_same_resolution_is_identity() {
        for i in [0usize, 5, 17, 31] {
            assert_eq!(find_nearby_gate_index(4, 8, i, 4, 8), Some(i));
        }
    }

    #[test]
    fn test_nearby_gate_half_range_resolution() {
        // Parent has 8 range bins, child 4: pairs of parent bins collapse.
        let a = find_nearby_gate_index(4, 8, 0, 4, 4).unwrap();
        let b = find_nearby_gate_index(4, 8, 1, 4, 4).unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, 0);
        let c = find_nearby_gate_index(4, 8, 7, 4, 4).unwrap();
        assert_eq!(c, 3);
    }

    #[test]
    fn test_nearby_gate_axes_share_rounding() {
        // Doubling the resolution of either axis maps a parent bin center
        // onto a child bin boundary; both axes resolve it the same way.
        let via_azim = find_nearby_gate_index(4, 8, 0, 8, 8).unwrap();
        assert_eq!(via_azim / 8, 1);
        assert_eq!(via_azim % 8, 0);

        let via_rang = find_nearby_gate_index(4, 8, 0, 4, 16).unwrap();
        assert_eq!(via_rang / 16, 0);
        assert_eq!(via_rang % 16, 1);
    }

    #[test]
    fn test_nearby_gate_out_of_bounds() {
        assert_eq!(find_nearby_gate_index(4, 8, 32, 4, 8), None);
        assert_eq!(find_nearby_gate_index(0, 0, 0, 4, 8), None);
    }

    #[test]
    fn test_beam_height_flat_earth_terms() {
        // At zero elevation only curvature and antenna height remain.
        let h = beam_height(0.0, 0.0, 0.3);
        assert!((h - 0.3).abs() < 1e-6);

        let h100 = beam_height(100.0, 0.0, 0.0);
        let expected = 100.0 * 100.0 / (2.0 * EFFECTIVE_EARTH_RADIUS);
        assert!((h100 - expected).abs() < 1e-4);
    }

    #[test]
    fn test_beam_height_grows_with_elevation() {
        let low = beam_height(50.0, 0.5, 0.0);
        let high = beam_height(50.0, 2.0, 0.0);
        assert!(high > low);
    }
}
