// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric operations for floor plan fusion
//!
//! - [`MaskPolygonizer`] converts binary room masks into validated simple
//!   polygons, with a single bowtie-repair attempt per contour
//! - [`match_points_to_polygons`] assigns point entities to containing
//!   polygons through an R-tree index
//! - [`ScaleCalibrator`] converts pixel areas into physical areas under an
//!   optional calibration factor

pub mod error;
pub mod polygon;
pub mod scale;
pub mod spatial;

pub use error::{GeometryError, ScaleError};
pub use polygon::{MaskPolygonizer, PolygonizeOutcome, RoomPolygon};
pub use scale::ScaleCalibrator;
pub use spatial::match_points_to_polygons;
