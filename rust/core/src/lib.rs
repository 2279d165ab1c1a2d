// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared types and configuration for the floor plan extraction pipeline
//!
//! This crate holds the data model exchanged between the tiling, detection,
//! fusion and orchestration layers:
//!
//! - [`TileRect`] - fixed-size tile rectangles over a page raster
//! - [`Detection`] - detector output in global pixel coordinates
//! - [`TextEntity`] - OCR output with confidence and center point
//! - [`RoomRecord`] / [`PageResult`] / [`JobResult`] - the persisted result shape
//! - [`PipelineConfig`] - the immutable process-wide configuration value

pub mod config;
pub mod types;

pub use config::PipelineConfig;
pub use types::{
    Detection, JobResult, PageMeta, PageResult, RoomRecord, TextEntity, TileRect,
};
