//! Per-gate classification and echo-cell clustering for weather radar
//! profile retrieval.
//!
//! This crate provides tools for:
//! - Connected-component clustering of precipitation cells on a polar grid
//! - Per-cell statistics, quality filtering and fringe dilation
//! - Radial-velocity texture computation
//! - Bitmask classification of every radar gate
//! - Capacity planning and assembly of the feature buffer consumed by an
//!   external profile-fitting routine
//!
//! Reading radar volumes, the fit solver itself and profile output belong to
//! external collaborators; the crate only consumes co-registered scan fields
//! through the accessor types in [`core::scan`].
//!
//! # Example
//!
//! ```no_run
//! use radar_gates::config::GateConfig;
//! use radar_gates::processors::classify_scan_pair;
//! # fn scans() -> (radar_gates::ScanImage, radar_gates::ScanImage, radar_gates::ScanImage) { unimplemented!() }
//!
//! let (dbz, vrad, clutter) = scans();
//! let config = GateConfig::default();
//! let result = classify_scan_pair(&dbz, &vrad, &clutter, &config).unwrap();
//! println!("{} cells kept", result.n_cells_valid);
//! ```

pub mod config;
pub mod core;
pub mod processors;

pub use config::GateConfig;
pub use core::cells::{CellImage, CellProp, CELL_FRINGE, CELL_NONE};
pub use core::points::{GateCode, PointsBuffer};
pub use core::scan::{PolarVolume, ScanImage, ScanMeta};
pub use processors::{ProfileType, ScanClassification};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
