//! Polar scan containers and the volume accessor contract.
//!
//! A scan is a flat byte grid over (azimuth, range) together with the
//! geometry and calibration needed to decode the stored bytes into
//! physical units. All classification stages operate on co-registered
//! scans, so grid compatibility is checked up front and reported as a
//! typed error rather than a panic deep inside a loop.

use thiserror::Error;

/// Errors raised when scan grids do not line up.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("image data has {actual} bytes, expected {expected} ({n_azim} azim x {n_rang} rang)")]
    DataSizeMismatch {
        expected: usize,
        actual: usize,
        n_azim: usize,
        n_rang: usize,
    },

    #[error("co-registered grids differ: {expected_azim}x{expected_rang} vs {actual_azim}x{actual_rang}")]
    DimensionMismatch {
        expected_azim: usize,
        expected_rang: usize,
        actual_azim: usize,
        actual_rang: usize,
    },
}

/// Immutable per-scan geometry and calibration descriptor.
///
/// One instance per scan quantity (reflectivity, radial velocity, texture,
/// clutter map). The linear transform maps a stored byte `b` to a physical
/// value as `value_offset + value_scale * b`; the byte equal to `missing`
/// carries no data.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanMeta {
    /// Height of the radar antenna in km.
    pub antenna_height: f32,
    /// Elevation of the scan in degrees.
    pub elev: f32,
    /// Number of range bins per ray.
    pub n_rang: usize,
    /// Number of azimuth rays per sweep.
    pub n_azim: usize,
    /// Size of a range bin in km.
    pub range_scale: f32,
    /// Angular step between azimuth rays in degrees.
    pub azim_scale: f32,
    /// Offset of the byte-to-physical transform.
    pub value_offset: f32,
    /// Scale of the byte-to-physical transform.
    pub value_scale: f32,
    /// Sentinel byte marking "no data".
    pub missing: u8,
}

impl ScanMeta {
    /// Decode a raw byte into a physical value, `None` for the missing sentinel.
    #[inline]
    pub fn decode(&self, raw: u8) -> Option<f32> {
        if raw == self.missing {
            None
        } else {
            Some(self.value_offset + self.value_scale * raw as f32)
        }
    }

    /// Quantize a physical value back into a byte, clamped to the byte range.
    ///
    /// A value quantizing onto the missing sentinel is nudged one step so it
    /// stays data; only [`ScanImage::set_missing`] produces the sentinel.
    #[inline]
    pub fn encode(&self, value: f32) -> u8 {
        let raw = ((value - self.value_offset) / self.value_scale).round();
        let raw = raw.clamp(0.0, 255.0) as u8;
        if raw != self.missing {
            raw
        } else if raw == u8::MAX {
            raw - 1
        } else {
            raw + 1
        }
    }

    /// Physical range of a gate center in km.
    #[inline]
    pub fn gate_range(&self, i_rang: usize) -> f32 {
        (i_rang as f32 + 0.5) * self.range_scale
    }

    /// Azimuth of a ray center in degrees.
    #[inline]
    pub fn gate_azimuth(&self, i_azim: usize) -> f32 {
        (i_azim as f32 + 0.5) * self.azim_scale
    }

    /// Total number of gates in the grid.
    #[inline]
    pub fn n_gates(&self) -> usize {
        self.n_azim * self.n_rang
    }

    /// Check that `other` describes the same grid shape.
    pub fn check_same_grid(&self, other: &ScanMeta) -> Result<(), ScanError> {
        if self.n_azim != other.n_azim || self.n_rang != other.n_rang {
            return Err(ScanError::DimensionMismatch {
                expected_azim: self.n_azim,
                expected_rang: self.n_rang,
                actual_azim: other.n_azim,
                actual_rang: other.n_rang,
            });
        }
        Ok(())
    }
}

/// A quantized scan field: flat byte grid plus its descriptor.
///
/// Layout is azimuth-major: `index = i_azim * n_rang + i_rang`. Every stage
/// in the crate uses this traversal order, which also fixes the row order of
/// the points buffer consumed by the external fit routine.
#[derive(Debug, Clone)]
pub struct ScanImage {
    pub meta: ScanMeta,
    data: Vec<u8>,
}

impl ScanImage {
    /// Wrap raw scan bytes, checking the size against the descriptor.
    pub fn new(meta: ScanMeta, data: Vec<u8>) -> Result<Self, ScanError> {
        let expected = meta.n_gates();
        if data.len() != expected {
            return Err(ScanError::DataSizeMismatch {
                expected,
                actual: data.len(),
                n_azim: meta.n_azim,
                n_rang: meta.n_rang,
            });
        }
        Ok(Self { meta, data })
    }

    /// Create a scan filled with the missing sentinel.
    pub fn filled_missing(meta: ScanMeta) -> Self {
        let data = vec![meta.missing; meta.n_gates()];
        Self { meta, data }
    }

    /// Flat index of a gate.
    #[inline]
    pub fn index(&self, i_azim: usize, i_rang: usize) -> usize {
        i_azim * self.meta.n_rang + i_rang
    }

    /// Raw byte at a gate.
    #[inline]
    pub fn raw(&self, i_azim: usize, i_rang: usize) -> u8 {
        self.data[self.index(i_azim, i_rang)]
    }

    /// Decoded physical value at a gate, `None` when missing.
    #[inline]
    pub fn value(&self, i_azim: usize, i_rang: usize) -> Option<f32> {
        self.meta.decode(self.raw(i_azim, i_rang))
    }

    /// Store a physical value at a gate.
    #[inline]
    pub fn set_value(&mut self, i_azim: usize, i_rang: usize, value: f32) {
        let i = self.index(i_azim, i_rang);
        self.data[i] = self.meta.encode(value);
    }

    /// Mark a gate as missing.
    #[inline]
    pub fn set_missing(&mut self, i_azim: usize, i_rang: usize) {
        let i = self.index(i_azim, i_rang);
        self.data[i] = self.meta.missing;
    }

    /// Raw byte slice, azimuth-major.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume the image and return its raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Read-only contract of the external polar-volume collaborator.
///
/// The capacity planner walks every scan of a volume to size the points
/// buffer; it only needs the per-scan geometry, never the pixel data, so the
/// trait stays this narrow.
pub trait PolarVolume {
    /// Number of scans (elevations) in the volume.
    fn num_scans(&self) -> usize;

    /// Geometry descriptor of scan `i_scan`, `None` when out of bounds.
    fn scan_geometry(&self, i_scan: usize) -> Option<ScanMeta>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(n_azim: usize, n_rang: usize) -> ScanMeta {
        ScanMeta {
            antenna_height: 0.05,
            elev: 0.5,
            n_rang,
            n_azim,
            range_scale: 1.0,
            azim_scale: 360.0 / n_azim as f32,
            value_offset: -32.0,
            value_scale: 0.5,
            missing: 255,
        }
    }

    #[test]
    fn test_decode_missing_sentinel() {
        let m = meta(4, 8);
        assert_eq!(m.decode(255), None);
        assert_eq!(m.decode(64), Some(0.0));
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let m = meta(4, 8);
        let raw = m.encode(30.0);
        let value = m.decode(raw).unwrap();
        assert!((value - 30.0).abs() < m.value_scale);
    }

    #[test]
    fn test_encode_clamps_to_byte_range() {
        let m = meta(4, 8);
        assert_eq!(m.encode(-1000.0), 0);
        // Byte 255 is the missing sentinel here, so saturation stops at 254.
        assert_eq!(m.encode(1000.0), 254);
    }

    #[test]
    fn test_encode_never_hits_missing_sentinel() {
        // Texture-style transform: offset 0, scale 0.1, missing 255. A gate
        // at 25.5 m/s would quantize onto the sentinel and read back as
        // "no data"; it must stay decodable instead.
        let m = ScanMeta {
            value_offset: 0.0,
            value_scale: 0.1,
            ..meta(4, 8)
        };
        let raw = m.encode(25.5);
        assert_ne!(raw, m.missing);
        assert!(m.decode(raw).is_some());

        // A mid-range sentinel is stepped over the same way.
        let m = ScanMeta { missing: 0, ..m };
        let raw = m.encode(-5.0);
        assert_ne!(raw, 0);
        assert_eq!(m.decode(raw), Some(0.1));
    }

    #[test]
    fn test_image_size_checked() {
        let m = meta(4, 8);
        assert!(ScanImage::new(m.clone(), vec![0u8; 32]).is_ok());
        let err = ScanImage::new(m, vec![0u8; 31]).unwrap_err();
        assert!(matches!(err, ScanError::DataSizeMismatch { expected: 32, .. }));
    }

    #[test]
    fn test_grid_compatibility_check() {
        let a = meta(4, 8);
        let b = meta(4, 9);
        assert!(a.check_same_grid(&a).is_ok());
        assert!(a.check_same_grid(&b).is_err());
    }

    #[test]
    fn test_set_and_read_value() {
        let m = meta(4, 8);
        let mut img = ScanImage::filled_missing(m);
        assert_eq!(img.value(2, 3), None);
        img.set_value(2, 3, 10.0);
        assert!((img.value(2, 3).unwrap() - 10.0).abs() < 0.5);
        img.set_missing(2, 3);
        assert_eq!(img.value(2, 3), None);
    }
}
