// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OCR collaborator contract

use image::RgbImage;
use planfuse_core::TextEntity;
use thiserror::Error;

/// Errors from the OCR collaborator.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("ocr inference failed: {0}")]
    Inference(String),
}

/// Text recognition collaborator.
///
/// Takes the full page raster and returns recognized text entities. Entries
/// below the global OCR confidence threshold are pre-filtered by the
/// implementation, so consumers can trust every entity's confidence.
pub trait Ocr: Send + Sync {
    fn analyze(&self, image: &RgbImage) -> Result<Vec<TextEntity>, OcrError>;
}
