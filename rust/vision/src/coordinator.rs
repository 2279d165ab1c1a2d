// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batched tile inference with global coordinate reassembly

use crate::detector::{DetectError, Detector};
use image::{imageops, RgbImage};
use planfuse_core::{Detection, TileRect};

/// Groups tiles into detector batches and shifts the resulting local boxes
/// into global page coordinates.
#[derive(Debug, Clone, Copy)]
pub struct DetectionBatchCoordinator {
    batch_size: usize,
    confidence_threshold: f32,
}

impl DetectionBatchCoordinator {
    pub fn new(batch_size: usize, confidence_threshold: f32) -> Self {
        Self {
            batch_size: batch_size.max(1),
            confidence_threshold,
        }
    }

    /// Run the detector over all tiles and accumulate global detections.
    pub fn run(
        &self,
        image: &RgbImage,
        tiles: &[TileRect],
        detector: &dyn Detector,
    ) -> Result<Vec<Detection>, DetectError> {
        let mut global = Vec::new();
        let batches = tiles.len().div_ceil(self.batch_size);
        tracing::info!(tiles = tiles.len(), batches, "running tiled inference");

        for batch in tiles.chunks(self.batch_size) {
            let crops: Vec<RgbImage> = batch
                .iter()
                .map(|t| imageops::crop_imm(image, t.x1, t.y1, t.width(), t.height()).to_image())
                .collect();

            let results = detector.detect_batch(&crops, self.confidence_threshold)?;
            if results.len() != batch.len() {
                return Err(DetectError::BatchShape {
                    expected: batch.len(),
                    got: results.len(),
                });
            }

            for (tile, detections) in batch.iter().zip(results) {
                for mut det in detections {
                    det.bbox[0] += tile.x1 as f32;
                    det.bbox[2] += tile.x1 as f32;
                    det.bbox[1] += tile.y1 as f32;
                    det.bbox[3] += tile.y1 as f32;
                    global.push(det);
                }
            }
        }

        tracing::debug!(detections = global.len(), "tiled inference complete");
        Ok(global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    /// Emits one fixed local box per crop so offsets are easy to verify.
    struct FixedBoxDetector;

    impl Detector for FixedBoxDetector {
        fn detect_batch(
            &self,
            crops: &[RgbImage],
            _confidence_threshold: f32,
        ) -> Result<Vec<Vec<Detection>>, DetectError> {
            Ok(crops
                .iter()
                .map(|_| vec![Detection::new([10.0, 20.0, 30.0, 40.0], 0.8, 1)])
                .collect())
        }
    }

    struct ShortDetector;

    impl Detector for ShortDetector {
        fn detect_batch(
            &self,
            _crops: &[RgbImage],
            _confidence_threshold: f32,
        ) -> Result<Vec<Vec<Detection>>, DetectError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn local_boxes_are_offset_by_tile_origin() {
        let image = RgbImage::from_pixel(200, 200, Rgb([255, 255, 255]));
        let tiles = vec![
            TileRect::new(0, 0, 100, 100),
            TileRect::new(100, 100, 200, 200),
        ];
        let coordinator = DetectionBatchCoordinator::new(1, 0.25);

        let detections = coordinator
            .run(&image, &tiles, &FixedBoxDetector)
            .unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].bbox, [10.0, 20.0, 30.0, 40.0]);
        assert_eq!(detections[1].bbox, [110.0, 120.0, 130.0, 140.0]);
    }

    #[test]
    fn batching_accumulates_across_all_batches() {
        let image = RgbImage::from_pixel(300, 100, Rgb([255, 255, 255]));
        let tiles = vec![
            TileRect::new(0, 0, 100, 100),
            TileRect::new(100, 0, 200, 100),
            TileRect::new(200, 0, 300, 100),
        ];
        // batch_size 2 -> two detector calls
        let coordinator = DetectionBatchCoordinator::new(2, 0.25);

        let detections = coordinator
            .run(&image, &tiles, &FixedBoxDetector)
            .unwrap();
        assert_eq!(detections.len(), 3);
    }

    #[test]
    fn mismatched_batch_shape_is_rejected() {
        let image = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let tiles = vec![TileRect::new(0, 0, 100, 100)];
        let coordinator = DetectionBatchCoordinator::new(4, 0.25);

        let err = coordinator.run(&image, &tiles, &ShortDetector).unwrap_err();
        assert!(matches!(err, DetectError::BatchShape { expected: 1, got: 0 }));
    }
}
