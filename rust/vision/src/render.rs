// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Annotated page rendering
//!
//! Draws the fused detections onto a copy of the page raster so reviewers
//! can eyeball what the detector saw. Colors cycle per class id.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use planfuse_core::Detection;

const PALETTE: [Rgb<u8>; 7] = [
    Rgb([220, 57, 18]),
    Rgb([51, 102, 204]),
    Rgb([16, 150, 24]),
    Rgb([255, 153, 0]),
    Rgb([153, 0, 153]),
    Rgb([0, 153, 198]),
    Rgb([221, 68, 119]),
];

/// Render detection boxes onto a copy of the page.
pub fn render_detections(image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let mut annotated = image.clone();
    let (width, height) = annotated.dimensions();

    for det in detections {
        let x = det.bbox[0].max(0.0) as i32;
        let y = det.bbox[1].max(0.0) as i32;
        let w = (det.bbox[2] - det.bbox[0]).max(1.0) as u32;
        let h = (det.bbox[3] - det.bbox[1]).max(1.0) as u32;
        if x as u32 >= width || y as u32 >= height {
            continue;
        }

        let color = PALETTE[det.class_id as usize % PALETTE.len()];
        let rect = Rect::at(x, y).of_size(w.min(width - x as u32), h.min(height - y as u32));
        draw_hollow_rect_mut(&mut annotated, rect, color);
        // Double border for visibility on dense drawings.
        if rect.width() > 2 && rect.height() > 2 {
            let inner = Rect::at(x + 1, y + 1).of_size(rect.width() - 2, rect.height() - 2);
            draw_hollow_rect_mut(&mut annotated, inner, color);
        }
    }

    annotated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxes_change_pixels_inside_the_page() {
        let image = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let detections = vec![Detection::new([10.0, 10.0, 40.0, 40.0], 0.9, 2)];

        let annotated = render_detections(&image, &detections);
        assert_ne!(annotated.get_pixel(10, 10), &Rgb([255, 255, 255]));
        // Pixels far from any box are untouched.
        assert_eq!(annotated.get_pixel(90, 90), &Rgb([255, 255, 255]));
    }

    #[test]
    fn out_of_bounds_boxes_are_ignored() {
        let image = RgbImage::from_pixel(50, 50, Rgb([255, 255, 255]));
        let detections = vec![Detection::new([200.0, 200.0, 240.0, 240.0], 0.9, 0)];

        let annotated = render_detections(&image, &detections);
        assert_eq!(annotated, image);
    }
}
