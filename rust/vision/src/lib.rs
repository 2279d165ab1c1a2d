// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tiled object detection over large floor plan rasters
//!
//! Architectural drawings are far larger than a detector's input size, so
//! this crate runs inference over a sliding window of fixed-size tiles:
//!
//! 1. [`TileGrid`] plans an overlapping tile grid with edge clamping
//! 2. [`ContentAwareFilter`] discards tiles with negligible ink content
//! 3. [`DetectionBatchCoordinator`] batches crops through the [`Detector`]
//!    collaborator and shifts local boxes into page coordinates
//! 4. [`BoxFusionMerger`] fuses cross-tile duplicates via weighted box fusion
//!
//! The offline counterpart, [`DatasetTiler`], cuts annotated drawings into
//! training tiles with normalized label files.

pub mod content_filter;
pub mod coordinator;
pub mod dataset;
pub mod detector;
pub mod render;
pub mod tile_grid;
pub mod wbf;

pub use content_filter::ContentAwareFilter;
pub use coordinator::DetectionBatchCoordinator;
pub use dataset::{DatasetError, DatasetTiler, TileReport, TileTask};
pub use detector::{DetectError, Detector, Segmenter};
pub use render::render_detections;
pub use tile_grid::TileGrid;
pub use wbf::BoxFusionMerger;
