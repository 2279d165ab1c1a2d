// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Model collaborator contracts
//!
//! The detector and segmenter are opaque, externally served models. The
//! pipeline only depends on these traits; handles are constructed once per
//! worker process and injected, never reached through globals.

use image::{GrayImage, RgbImage};
use planfuse_core::Detection;
use thiserror::Error;

/// Errors from a model collaborator call.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("inference call failed: {0}")]
    Inference(String),

    #[error("detector returned {got} result lists for {expected} crops")]
    BatchShape { expected: usize, got: usize },
}

/// Object detection collaborator.
///
/// Contract: stateless per call, deterministic for fixed weights and
/// threshold, zero or more detections per crop, boxes in local crop
/// coordinates, no shared mutable state across calls.
pub trait Detector: Send + Sync {
    fn detect_batch(
        &self,
        crops: &[RgbImage],
        confidence_threshold: f32,
    ) -> Result<Vec<Vec<Detection>>, DetectError>;
}

/// Room segmentation collaborator.
///
/// Returns a binary mask over the full page: non-zero pixels are room
/// interior.
pub trait Segmenter: Send + Sync {
    fn segment_rooms(&self, image: &RgbImage) -> Result<GrayImage, DetectError>;
}
