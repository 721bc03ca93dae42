//! Core data model: scan containers, cell labels, feature buffer, geometry.

pub mod cells;
pub mod geometry;
pub mod points;
pub mod scan;

pub use cells::{CellImage, CellProp, CELL_FRINGE, CELL_NONE};
pub use points::{GateCode, PointsBuffer, PointsError};
pub use scan::{PolarVolume, ScanError, ScanImage, ScanMeta};
