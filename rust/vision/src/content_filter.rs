// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Content-aware tile filtering
//!
//! Scanned drawings are mostly empty paper. Before spending detector calls,
//! each candidate tile is checked against a cheap downsampled "ink" mask and
//! tiles with negligible content are skipped. Dropping sparse real content is
//! an accepted, tunable risk of this filter.

use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use planfuse_core::TileRect;

/// Filters candidate tiles by ink density.
#[derive(Debug, Clone, Copy)]
pub struct ContentAwareFilter {
    /// Downsample factor for the content mask, typically 0.1.
    scale: f32,
    /// Minimum ink ratio for a tile to survive.
    ink_threshold: f32,
}

impl ContentAwareFilter {
    pub fn new(scale: f32, ink_threshold: f32) -> Self {
        Self {
            scale,
            ink_threshold,
        }
    }

    /// Keep the tiles whose downsampled region contains ink.
    pub fn filter(&self, image: &RgbImage, tiles: &[TileRect]) -> Vec<TileRect> {
        let mask = match self.content_mask(image) {
            Some(mask) => mask,
            None => return Vec::new(),
        };

        let (mask_w, mask_h) = mask.dimensions();
        let mut kept = Vec::new();
        let mut skipped = 0usize;

        for tile in tiles {
            let sx1 = (tile.x1 as f32 * self.scale) as u32;
            let sy1 = (tile.y1 as f32 * self.scale) as u32;
            let sx2 = ((tile.x2 as f32 * self.scale) as u32).min(mask_w);
            let sy2 = ((tile.y2 as f32 * self.scale) as u32).min(mask_h);
            if sx2 <= sx1 || sy2 <= sy1 {
                skipped += 1;
                continue;
            }

            let region = (sx2 - sx1) as usize * (sy2 - sy1) as usize;
            let mut ink = 0usize;
            for y in sy1..sy2 {
                for x in sx1..sx2 {
                    if mask.get_pixel(x, y).0[0] > 0 {
                        ink += 1;
                    }
                }
            }

            if ink as f32 / region as f32 > self.ink_threshold {
                kept.push(*tile);
            } else {
                skipped += 1;
            }
        }

        tracing::info!(
            kept = kept.len(),
            skipped,
            "content filter reduced tile set"
        );
        kept
    }

    /// Build the downsampled, binarized, dilated ink mask.
    ///
    /// Ink (dark strokes) becomes white, paper becomes black; dilation
    /// connects broken lines into solid blocks of content.
    fn content_mask(&self, image: &RgbImage) -> Option<GrayImage> {
        let small_w = (image.width() as f32 * self.scale) as u32;
        let small_h = (image.height() as f32 * self.scale) as u32;
        if small_w == 0 || small_h == 0 {
            return None;
        }

        let gray = imageops::grayscale(image);
        let small = imageops::resize(&gray, small_w, small_h, imageops::FilterType::Triangle);

        let ink = binarize_ink(&small, otsu_level(&small));
        let dilated = imageproc::morphology::dilate(&ink, Norm::L1, 2);
        Some(dilated)
    }
}

/// Pixels darker than the level become white (ink), the rest black.
fn binarize_ink(image: &GrayImage, level: u8) -> GrayImage {
    let mut result = GrayImage::new(image.width(), image.height());
    for (x, y, pixel) in image.enumerate_pixels() {
        let value = if pixel.0[0] < level { 255 } else { 0 };
        result.put_pixel(x, y, Luma([value]));
    }
    result
}

/// Calculate Otsu's optimal threshold level.
fn otsu_level(image: &GrayImage) -> u8 {
    // Build histogram
    let mut histogram = [0u32; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = (image.width() * image.height()) as f64;
    if total_pixels == 0.0 {
        return 128;
    }

    let mut sum_total = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

    let mut sum_background = 0.0;
    let mut weight_background = 0.0;
    let mut max_variance = 0.0;
    let mut best_threshold = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }

        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += t as f64 * count as f64;

        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum_total - sum_background) / weight_foreground;

        let variance =
            weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);

        if variance > max_variance {
            max_variance = variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_grid::TileGrid;
    use image::Rgb;

    fn page_with_ink_block(w: u32, h: u32) -> RgbImage {
        let mut img = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
        // Dense black block in the top-left tile.
        for y in 40..160 {
            for x in 40..160 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        img
    }

    #[test]
    fn blank_page_drops_every_tile() {
        let img = RgbImage::from_pixel(400, 400, Rgb([255, 255, 255]));
        let tiles = TileGrid::new(200, 0.0).generate(400, 400);
        let filter = ContentAwareFilter::new(0.1, 0.01);

        assert!(filter.filter(&img, &tiles).is_empty());
    }

    #[test]
    fn tile_with_ink_survives() {
        let img = page_with_ink_block(400, 400);
        let tiles = TileGrid::new(200, 0.0).generate(400, 400);
        let filter = ContentAwareFilter::new(0.1, 0.01);

        let kept = filter.filter(&img, &tiles);
        assert!(kept.contains(&TileRect::new(0, 0, 200, 200)));
        // The empty bottom-right quadrant is skipped.
        assert!(!kept.contains(&TileRect::new(200, 200, 400, 400)));
    }

    #[test]
    fn degenerate_downsample_keeps_nothing() {
        let img = page_with_ink_block(9, 9);
        let filter = ContentAwareFilter::new(0.1, 0.01);
        let tiles = vec![TileRect::new(0, 0, 9, 9)];

        assert!(filter.filter(&img, &tiles).is_empty());
    }

    #[test]
    fn otsu_separates_a_bimodal_image() {
        let mut img = GrayImage::new(10, 10);
        for (x, _, pixel) in img.enumerate_pixels_mut() {
            pixel.0[0] = if x < 5 { 20 } else { 230 };
        }
        let level = otsu_level(&img);
        assert!(level > 20 && level <= 230);
    }
}
