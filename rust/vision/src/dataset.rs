// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Offline training tile generation
//!
//! Cuts annotated drawings into detector-sized tiles and writes one label
//! file per tile. Labels use the `class_id cx cy w h` line format with all
//! four spatial values normalized to [0, 1] relative to the tile size.
//!
//! Tiling runs one image per worker across a fixed-size pool; workers share
//! nothing but the read-only configuration.

use crate::tile_grid::TileGrid;
use geo::{Area, BooleanOps, BoundingRect, Coord, Intersects, LineString, Polygon};
use image::imageops;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Ground-truth clips smaller than this many square pixels are artifacts of
/// the tile boundary and are not labeled.
const MIN_CLIP_AREA: f64 = 50.0;

/// Errors from dataset tile generation.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("could not read image {path}: {source}")]
    ImageRead {
        path: String,
        source: image::ImageError,
    },

    #[error("could not write tile output: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode tile image: {0}")]
    ImageWrite(#[from] image::ImageError),
}

/// One image worth of tiling work.
#[derive(Debug, Clone)]
pub struct TileTask {
    pub image_path: PathBuf,
    /// Ground-truth polygons grouped by class name.
    pub polygons: Vec<(String, Vec<Polygon<f64>>)>,
    /// Output root; tiles land in `images/`, labels in `labels/`.
    pub output_dir: PathBuf,
    pub base_name: String,
}

/// Outcome of tiling one image.
#[derive(Debug, Clone)]
pub struct TileReport {
    pub base_name: String,
    pub tiles_written: usize,
}

/// Parallel tiler for training data preparation.
#[derive(Debug, Clone)]
pub struct DatasetTiler {
    grid: TileGrid,
    tile_size: u32,
    workers: usize,
    class_map: FxHashMap<String, u32>,
}

impl DatasetTiler {
    pub fn new(
        tile_size: u32,
        overlap: f32,
        workers: usize,
        class_map: FxHashMap<String, u32>,
    ) -> Self {
        Self {
            grid: TileGrid::new(tile_size, overlap),
            tile_size,
            workers: workers.max(1),
            class_map,
        }
    }

    /// Process a batch of images, one per worker on a fixed-size pool.
    pub fn process_batch(&self, tasks: &[TileTask]) -> Vec<Result<TileReport, DatasetError>> {
        tracing::info!(tasks = tasks.len(), workers = self.workers, "starting dataset tiling batch");
        let run = || {
            tasks
                .par_iter()
                .map(|task| {
                    let report = self.process_single(task);
                    if let Err(err) = &report {
                        tracing::warn!(base = %task.base_name, error = %err, "tiling task failed");
                    }
                    report
                })
                .collect()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool.install(run),
            Err(err) => {
                tracing::warn!(error = %err, "dedicated pool unavailable, using global pool");
                run()
            }
        }
    }

    fn process_single(&self, task: &TileTask) -> Result<TileReport, DatasetError> {
        let image = image::open(&task.image_path)
            .map_err(|source| DatasetError::ImageRead {
                path: task.image_path.display().to_string(),
                source,
            })?
            .to_rgb8();

        fs::create_dir_all(task.output_dir.join("images"))?;
        fs::create_dir_all(task.output_dir.join("labels"))?;

        let (width, height) = image.dimensions();
        let mut tile_index = 0usize;

        for tile in self.grid.generate(width, height) {
            let tile_poly = rect_polygon(
                tile.x1 as f64,
                tile.y1 as f64,
                tile.x2 as f64,
                tile.y2 as f64,
            );

            let mut labels = Vec::new();
            for (class_name, polygons) in &task.polygons {
                let Some(&class_id) = self.class_map.get(class_name) else {
                    continue;
                };

                for poly in polygons {
                    if !tile_poly.intersects(poly) {
                        continue;
                    }
                    let clipped = tile_poly.intersection(poly);
                    if clipped.unsigned_area() < MIN_CLIP_AREA {
                        continue;
                    }
                    let Some(bounds) = clipped.bounding_rect() else {
                        continue;
                    };

                    let w = bounds.max().x - bounds.min().x;
                    let h = bounds.max().y - bounds.min().y;
                    let cx = bounds.min().x + w / 2.0 - tile.x1 as f64;
                    let cy = bounds.min().y + h / 2.0 - tile.y1 as f64;

                    let size = self.tile_size as f64;
                    labels.push(format!(
                        "{} {:.6} {:.6} {:.6} {:.6}",
                        class_id,
                        (cx / size).clamp(0.0, 1.0),
                        (cy / size).clamp(0.0, 1.0),
                        (w / size).clamp(0.0, 1.0),
                        (h / size).clamp(0.0, 1.0),
                    ));
                }
            }

            // Tiles without any ground truth are not written at all.
            if labels.is_empty() {
                continue;
            }

            let tile_name = format!("{}_{}", task.base_name, tile_index);
            let crop =
                imageops::crop_imm(&image, tile.x1, tile.y1, tile.width(), tile.height())
                    .to_image();
            crop.save(task.output_dir.join("images").join(format!("{tile_name}.jpg")))?;
            fs::write(
                task.output_dir.join("labels").join(format!("{tile_name}.txt")),
                labels.join("\n"),
            )?;
            tile_index += 1;
        }

        tracing::debug!(base = %task.base_name, tiles = tile_index, "image tiled");
        Ok(TileReport {
            base_name: task.base_name.clone(),
            tiles_written: tile_index,
        })
    }
}

fn rect_polygon(x1: f64, y1: f64, x2: f64, y2: f64) -> Polygon<f64> {
    Polygon::new(
        LineString::from(vec![
            Coord { x: x1, y: y1 },
            Coord { x: x2, y: y1 },
            Coord { x: x2, y: y2 },
            Coord { x: x1, y: y2 },
        ]),
        vec![],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn class_map() -> FxHashMap<String, u32> {
        [("Door".to_string(), 2u32)].into_iter().collect()
    }

    #[test]
    fn writes_normalized_labels_for_clipped_polygons() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("plan.png");
        RgbImage::from_pixel(400, 400, Rgb([255, 255, 255]))
            .save(&image_path)
            .unwrap();

        // A 40x40 door polygon inside the first 200x200 tile.
        let door = rect_polygon(100.0, 120.0, 140.0, 160.0);
        let task = TileTask {
            image_path,
            polygons: vec![("Door".into(), vec![door])],
            output_dir: dir.path().join("out"),
            base_name: "plan".into(),
        };

        let tiler = DatasetTiler::new(200, 0.0, 2, class_map());
        let reports = tiler.process_batch(&[task]);
        assert_eq!(reports.len(), 1);
        let report = reports[0].as_ref().unwrap();
        assert_eq!(report.tiles_written, 1);

        let label = fs::read_to_string(dir.path().join("out/labels/plan_0.txt")).unwrap();
        let parts: Vec<&str> = label.split_whitespace().collect();
        assert_eq!(parts[0], "2");
        for value in &parts[1..] {
            let v: f64 = value.parse().unwrap();
            assert!((0.0..=1.0).contains(&v), "out of range: {v}");
        }
        // cx = 120/200, cy = 140/200, w = h = 40/200
        assert_eq!(parts[1], "0.600000");
        assert_eq!(parts[2], "0.700000");
        assert_eq!(parts[3], "0.200000");
        assert_eq!(parts[4], "0.200000");

        assert!(dir.path().join("out/images/plan_0.jpg").exists());
    }

    #[test]
    fn sub_threshold_boundary_clips_produce_no_labels() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("plan.png");
        RgbImage::from_pixel(400, 400, Rgb([255, 255, 255]))
            .save(&image_path)
            .unwrap();

        // A 6x6 sliver straddling the tile corner: every per-tile clip is
        // at most 3x3 = 9 px^2, below the 50 px^2 threshold.
        let sliver = rect_polygon(197.0, 197.0, 203.0, 203.0);
        let task = TileTask {
            image_path,
            polygons: vec![("Door".into(), vec![sliver])],
            output_dir: dir.path().join("out"),
            base_name: "plan".into(),
        };

        let tiler = DatasetTiler::new(200, 0.0, 2, class_map());
        let report = tiler.process_batch(&[task]).remove(0).unwrap();
        assert_eq!(report.tiles_written, 0);
    }

    #[test]
    fn unknown_classes_produce_no_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("plan.png");
        RgbImage::from_pixel(256, 256, Rgb([255, 255, 255]))
            .save(&image_path)
            .unwrap();

        let task = TileTask {
            image_path,
            polygons: vec![("Chimney".into(), vec![rect_polygon(10.0, 10.0, 60.0, 60.0)])],
            output_dir: dir.path().join("out"),
            base_name: "plan".into(),
        };

        let tiler = DatasetTiler::new(256, 0.0, 2, class_map());
        let report = tiler.process_batch(&[task]).remove(0).unwrap();
        assert_eq!(report.tiles_written, 0);
    }
}
