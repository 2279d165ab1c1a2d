// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core data model for the extraction pipeline

use serde::{Deserialize, Serialize};

/// A fixed-size tile rectangle in image pixel coordinates.
///
/// Invariant: `x2 - x1 == y2 - y1 == tile_size` and the rectangle lies fully
/// inside the source image bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TileRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl TileRect {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// A single object detection in global pixel coordinates.
///
/// `bbox` is `[x1, y1, x2, y2]`. Merged detections produced by box fusion
/// share this shape, so a fused set can be fed back through the merger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub bbox: [f32; 4],
    /// Detection confidence in [0, 1].
    pub score: f32,
    pub class_id: u32,
}

impl Detection {
    pub fn new(bbox: [f32; 4], score: f32, class_id: u32) -> Self {
        Self {
            bbox,
            score,
            class_id,
        }
    }

    /// Center point of the bounding box.
    pub fn center(&self) -> [f32; 2] {
        [
            (self.bbox[0] + self.bbox[2]) / 2.0,
            (self.bbox[1] + self.bbox[3]) / 2.0,
        ]
    }

    pub fn area(&self) -> f32 {
        (self.bbox[2] - self.bbox[0]).max(0.0) * (self.bbox[3] - self.bbox[1]).max(0.0)
    }
}

/// A recognized text fragment from the OCR collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextEntity {
    pub text: String,
    /// OCR confidence; entries below the global threshold are pre-filtered
    /// by the collaborator.
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` in page pixel coordinates.
    pub bbox: [f32; 4],
    /// `[cx, cy]` center of the text box.
    pub center: [f32; 2],
}

impl TextEntity {
    pub fn new(text: impl Into<String>, confidence: f32, bbox: [f32; 4]) -> Self {
        let center = [
            bbox[0] + (bbox[2] - bbox[0]) / 2.0,
            bbox[1] + (bbox[3] - bbox[1]) / 2.0,
        ];
        Self {
            text: text.into(),
            confidence,
            bbox,
            center,
        }
    }
}

/// One assembled room: label, calibrated area and contained objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomRecord {
    pub id: String,
    pub label: String,
    pub confidence: f32,
    /// Physical area in square units; `None` when no scale calibration is set.
    pub area: Option<f64>,
    /// Labels of the detected objects whose centers fall inside the room.
    pub objects: Vec<String>,
    /// Exterior ring of the room polygon as `[x, y]` pixel coordinates.
    pub polygon: Vec<[f64; 2]>,
}

/// Per-page summary metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageMeta {
    /// `[width, height]` of the page raster.
    pub image_size: [u32; 2],
    /// Sum of all calibrated room areas (0.0 when uncalibrated).
    pub total_area: f64,
    pub room_count: usize,
    /// Contours discarded because polygon repair failed.
    pub dropped_regions: usize,
}

/// Result of analyzing one page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageResult {
    /// 1-based page number.
    pub page: usize,
    /// Artifact key of the annotated page image.
    pub image_key: String,
    pub meta: PageMeta,
    pub data: Vec<RoomRecord>,
}

/// The persisted result document for one job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResult {
    pub job_id: String,
    pub results: Vec<PageResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_center_and_area() {
        let det = Detection::new([10.0, 20.0, 30.0, 60.0], 0.9, 2);
        assert_eq!(det.center(), [20.0, 40.0]);
        assert_eq!(det.area(), 800.0);
    }

    #[test]
    fn text_entity_center_is_derived_from_bbox() {
        let txt = TextEntity::new("KITCHEN", 0.95, [100.0, 50.0, 200.0, 80.0]);
        assert_eq!(txt.center, [150.0, 65.0]);
    }

    #[test]
    fn job_result_round_trips_through_json() {
        let result = JobResult {
            job_id: "job-1".into(),
            results: vec![PageResult {
                page: 1,
                image_key: "results/job-1/job-1_p1.png".into(),
                meta: PageMeta {
                    image_size: [1000, 800],
                    total_area: 412.5,
                    room_count: 2,
                    dropped_regions: 0,
                },
                data: vec![RoomRecord {
                    id: "room_0".into(),
                    label: "KITCHEN".into(),
                    confidence: 0.9,
                    area: Some(212.5),
                    objects: vec!["Sink".into()],
                    polygon: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]],
                }],
            }],
        };

        let encoded = serde_json::to_string(&result).unwrap();
        let decoded: JobResult = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, result);
    }
}
