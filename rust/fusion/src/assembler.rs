// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-page room assembly
//!
//! Joins the segmentation mask, fused detections and OCR text into room
//! records with calibrated areas.

use crate::text::{TextClassifier, TextKind};
use image::GrayImage;
use planfuse_core::{Detection, PageMeta, PipelineConfig, RoomRecord, TextEntity};
use planfuse_geometry::{
    match_points_to_polygons, GeometryError, MaskPolygonizer, ScaleCalibrator,
};
use std::sync::Arc;
use thiserror::Error;

/// Fraction of contour perimeter used as the simplification epsilon.
const SIMPLIFY_RATIO: f64 = 0.005;

/// Page assembly failure; the page fails as one unit.
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("geometry stage failed: {0}")]
    Geometry(#[from] GeometryError),
}

/// Everything the orchestrator persists for one page, minus the artifacts.
#[derive(Debug, Clone)]
pub struct PageAssembly {
    pub meta: PageMeta,
    pub rooms: Vec<RoomRecord>,
}

/// Joins vision and logic signals into per-page room records.
pub struct FusionAssembler {
    config: PipelineConfig,
    polygonizer: MaskPolygonizer,
    calibrator: ScaleCalibrator,
    classifier: Arc<dyn TextClassifier>,
}

impl FusionAssembler {
    pub fn new(
        config: PipelineConfig,
        calibrator: ScaleCalibrator,
        classifier: Arc<dyn TextClassifier>,
    ) -> Self {
        let polygonizer = MaskPolygonizer::new(config.min_room_area, SIMPLIFY_RATIO);
        Self {
            config,
            polygonizer,
            calibrator,
            classifier,
        }
    }

    /// Assemble one page from its mask, detections and text entities.
    pub fn assemble(
        &self,
        image_size: (u32, u32),
        room_mask: &GrayImage,
        detections: &[Detection],
        texts: &[TextEntity],
    ) -> Result<PageAssembly, FusionError> {
        let outcome = self.polygonizer.polygonize(room_mask)?;
        let polygons = outcome.polygons;
        tracing::info!(
            rooms = polygons.len(),
            dropped = outcome.dropped,
            "fusion: polygonized room mask"
        );

        // Room label candidates with their canonical names.
        let mut labels: Vec<(&TextEntity, String)> = Vec::new();
        for text in texts {
            let (kind, canonical) = self.classifier.classify(&text.text);
            if kind == TextKind::RoomLabel {
                let name = canonical.unwrap_or_else(|| text.text.clone());
                labels.push((text, name));
            }
        }

        let label_centers: Vec<[f64; 2]> = labels
            .iter()
            .map(|(t, _)| [t.center[0] as f64, t.center[1] as f64])
            .collect();
        let object_centers: Vec<[f64; 2]> = detections
            .iter()
            .map(|d| {
                let [cx, cy] = d.center();
                [cx as f64, cy as f64]
            })
            .collect();

        let label_matches = match_points_to_polygons(&label_centers, &polygons);
        let object_matches = match_points_to_polygons(&object_centers, &polygons);

        let mut rooms = Vec::with_capacity(polygons.len());
        let mut total_area = 0.0;

        for (index, polygon) in polygons.iter().enumerate() {
            // Highest-confidence label wins; ties go to the first seen.
            let mut best: Option<(&TextEntity, &str)> = None;
            for (slot, (entity, name)) in labels.iter().enumerate() {
                if label_matches[slot] != Some(index) {
                    continue;
                }
                if best.map_or(true, |(b, _)| entity.confidence > b.confidence) {
                    best = Some((*entity, name.as_str()));
                }
            }
            let (label, confidence) = match best {
                Some((entity, name)) => (name.to_string(), entity.confidence),
                None => (format!("Room {}", index + 1), 0.0),
            };

            let objects: Vec<String> = detections
                .iter()
                .enumerate()
                .filter(|(slot, _)| object_matches[*slot] == Some(index))
                .map(|(_, det)| self.config.class_name(det.class_id))
                .collect();

            let area = self.calibrator.area_from_pixels(polygon.pixel_area());
            total_area += area.unwrap_or(0.0);

            rooms.push(RoomRecord {
                id: format!("room_{index}"),
                label,
                confidence,
                area,
                objects,
                polygon: polygon.exterior_points(),
            });
        }

        let meta = PageMeta {
            image_size: [image_size.0, image_size.1],
            total_area: (total_area * 100.0).round() / 100.0,
            room_count: rooms.len(),
            dropped_regions: outcome.dropped,
        };

        Ok(PageAssembly { meta, rooms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::VocabClassifier;
    use approx::assert_relative_eq;
    use image::Luma;

    fn mask_with_rects(rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut mask = GrayImage::new(1000, 1000);
        for &(x1, y1, x2, y2) in rects {
            for y in y1..y2 {
                for x in x1..x2 {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        mask
    }

    fn assembler(ppu: Option<f64>) -> FusionAssembler {
        let calibrator = match ppu {
            Some(value) => ScaleCalibrator::with_scale(value).unwrap(),
            None => ScaleCalibrator::new(),
        };
        FusionAssembler::new(
            PipelineConfig::default(),
            calibrator,
            Arc::new(VocabClassifier::new()),
        )
    }

    #[test]
    fn two_rooms_with_labels_objects_and_areas() {
        // Room 1: 200x200 at (100,100); Room 2: 200x300 at (400,100).
        let mask = mask_with_rects(&[(100, 100, 300, 300), (400, 100, 600, 400)]);

        let texts = vec![
            TextEntity::new("Master Bed", 0.95, [120.0, 120.0, 200.0, 150.0]),
            TextEntity::new("Kitchen", 0.90, [450.0, 150.0, 500.0, 180.0]),
            // Orphan label outside every room.
            TextEntity::new("Hallway", 0.80, [800.0, 800.0, 850.0, 820.0]),
        ];
        let detections = vec![
            Detection::new([110.0, 110.0, 130.0, 130.0], 0.9, 4), // Toilet in room 1
            Detection::new([410.0, 110.0, 430.0, 130.0], 0.8, 5), // Sink in room 2
        ];

        let assembly = assembler(Some(10.0))
            .assemble((1000, 1000), &mask, &detections, &texts)
            .unwrap();

        assert_eq!(assembly.meta.room_count, 2);
        assert_eq!(assembly.meta.dropped_regions, 0);
        assert_eq!(assembly.rooms.len(), 2);

        let room1 = assembly
            .rooms
            .iter()
            .find(|r| r.label == "MASTER BEDROOM")
            .expect("room 1 labeled");
        assert_relative_eq!(room1.area.unwrap(), 400.0, epsilon = 0.01);
        assert!(room1.objects.contains(&"Toilet".to_string()));

        let room2 = assembly
            .rooms
            .iter()
            .find(|r| r.label == "KITCHEN")
            .expect("room 2 labeled");
        assert_relative_eq!(room2.area.unwrap(), 600.0, epsilon = 0.01);
        assert!(room2.objects.contains(&"Sink".to_string()));

        assert_relative_eq!(assembly.meta.total_area, 1000.0, epsilon = 0.02);
    }

    #[test]
    fn rooms_without_labels_get_placeholders() {
        let mask = mask_with_rects(&[(100, 100, 300, 300)]);
        let assembly = assembler(Some(10.0))
            .assemble((1000, 1000), &mask, &[], &[])
            .unwrap();

        assert_eq!(assembly.rooms.len(), 1);
        assert_eq!(assembly.rooms[0].label, "Room 1");
        assert_eq!(assembly.rooms[0].confidence, 0.0);
        assert!(assembly.rooms[0].objects.is_empty());
    }

    #[test]
    fn highest_confidence_label_wins_first_seen_breaks_ties() {
        let mask = mask_with_rects(&[(100, 100, 300, 300)]);
        let texts = vec![
            TextEntity::new("Closet", 0.70, [120.0, 120.0, 160.0, 140.0]),
            TextEntity::new("Kitchen", 0.92, [180.0, 180.0, 240.0, 200.0]),
            TextEntity::new("Garage", 0.92, [200.0, 220.0, 260.0, 240.0]),
        ];

        let assembly = assembler(None)
            .assemble((1000, 1000), &mask, &[], &texts)
            .unwrap();

        // Kitchen and Garage tie at 0.92; Kitchen came first.
        assert_eq!(assembly.rooms[0].label, "KITCHEN");
    }

    #[test]
    fn uncalibrated_pages_have_null_areas() {
        let mask = mask_with_rects(&[(100, 100, 300, 300)]);
        let assembly = assembler(None)
            .assemble((1000, 1000), &mask, &[], &[])
            .unwrap();

        assert!(assembly.rooms[0].area.is_none());
        assert_relative_eq!(assembly.meta.total_area, 0.0);
    }

    #[test]
    fn empty_mask_fails_the_page_as_a_unit() {
        let mask = GrayImage::new(0, 0);
        let err = assembler(None)
            .assemble((0, 0), &mask, &[], &[])
            .unwrap_err();
        assert!(matches!(err, FusionError::Geometry(_)));
    }

    #[test]
    fn noise_text_never_becomes_a_label() {
        let mask = mask_with_rects(&[(100, 100, 300, 300)]);
        let texts = vec![TextEntity::new("12x14", 0.99, [150.0, 150.0, 190.0, 170.0])];

        let assembly = assembler(None)
            .assemble((1000, 1000), &mask, &[], &texts)
            .unwrap();
        assert_eq!(assembly.rooms[0].label, "Room 1");
    }
}
