// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document-to-pages decoding
//!
//! PDF rendering is an external collaborator; the pipeline only needs a list
//! of page rasters. The default decoder handles single-image uploads (PNG,
//! JPEG); a PDF-capable decoder implements the same trait.

use image::RgbImage;
use thiserror::Error;

/// Errors from document decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("could not decode input document: {0}")]
    Image(#[from] image::ImageError),
}

/// Decodes an uploaded document into page rasters.
pub trait PageDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<Vec<RgbImage>, DecodeError>;
}

/// Single-image decoder for raster uploads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl RasterDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl PageDecoder for RasterDecoder {
    fn decode(&self, data: &[u8]) -> Result<Vec<RgbImage>, DecodeError> {
        let image = image::load_from_memory(data)?.to_rgb8();
        Ok(vec![image])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::io::Cursor;

    #[test]
    fn png_bytes_decode_to_one_page() {
        let page = RgbImage::from_pixel(32, 16, Rgb([255, 255, 255]));
        let mut bytes = Vec::new();
        page.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let pages = RasterDecoder::new().decode(&bytes).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].dimensions(), (32, 16));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        assert!(RasterDecoder::new().decode(b"not an image").is_err());
    }
}
