// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process-wide pipeline configuration

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Immutable configuration shared by every pipeline component.
///
/// Constructed once per worker process and cloned into each component's
/// constructor; components never reach for global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Side length of the square detection tiles in pixels.
    pub tile_size: u32,
    /// Fraction of tile overlap between neighboring tiles, in [0, 1).
    pub tile_overlap: f32,
    /// Downsample factor used when building the content mask.
    pub content_scale: f32,
    /// Minimum ink ratio for a tile to be worth sending to the detector.
    pub content_threshold: f32,
    /// Confidence threshold passed to the object detector.
    pub confidence_threshold: f32,
    /// Minimum OCR confidence; the OCR collaborator pre-filters below this.
    pub ocr_confidence_threshold: f32,
    /// IoU threshold for weighted box fusion.
    pub iou_threshold: f32,
    /// Number of tile crops per detector call.
    pub batch_size: usize,
    /// Minimum room contour area in square pixels.
    pub min_room_area: f64,
    /// Detector class id to display name.
    pub class_map: FxHashMap<u32, String>,
}

impl PipelineConfig {
    /// Display name for a detector class id, `"Unknown"` when unmapped.
    pub fn class_name(&self, class_id: u32) -> String {
        self.class_map
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".into())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let class_map: FxHashMap<u32, String> = [
            (0, "Wall"),
            (1, "Window"),
            (2, "Door"),
            (3, "Room"),
            (4, "Toilet"),
            (5, "Sink"),
            (6, "Electrical"),
        ]
        .into_iter()
        .map(|(id, name)| (id, name.to_string()))
        .collect();

        Self {
            tile_size: 640,
            tile_overlap: 0.2,
            content_scale: 0.1,
            content_threshold: 0.01,
            confidence_threshold: 0.25,
            ocr_confidence_threshold: 0.25,
            iou_threshold: 0.45,
            batch_size: 16,
            min_room_area: 500.0,
            class_map,
        }
    }
}
