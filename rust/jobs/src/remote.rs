// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP model collaborators
//!
//! The detector, segmenter and OCR models run behind model-serving
//! endpoints. These clients are the heavy "model handles": constructed once
//! per worker process and injected into the orchestrator. Payloads carry
//! base64 PNG images; responses are plain JSON.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{GrayImage, RgbImage};
use planfuse_core::{Detection, TextEntity};
use planfuse_fusion::{Ocr, OcrError};
use planfuse_vision::{DetectError, Detector, Segmenter};
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;

fn encode_png(image: &RgbImage) -> Result<String, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(BASE64.encode(bytes))
}

fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder().timeout(timeout).build()
}

/// Remote object detector.
pub struct HttpDetector {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct RemoteDetection {
    bbox: [f32; 4],
    score: f32,
    class_id: u32,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    results: Vec<Vec<RemoteDetection>>,
}

impl HttpDetector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }
}

impl Detector for HttpDetector {
    fn detect_batch(
        &self,
        crops: &[RgbImage],
        confidence_threshold: f32,
    ) -> Result<Vec<Vec<Detection>>, DetectError> {
        let images: Result<Vec<String>, _> = crops.iter().map(encode_png).collect();
        let images = images.map_err(|err| DetectError::Inference(err.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "confidence_threshold": confidence_threshold,
                "images": images,
            }))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|err| DetectError::Inference(err.to_string()))?;

        let parsed: DetectResponse = response
            .json()
            .map_err(|err| DetectError::Inference(err.to_string()))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|crop| {
                crop.into_iter()
                    .map(|d| Detection::new(d.bbox, d.score, d.class_id))
                    .collect()
            })
            .collect())
    }
}

/// Remote room segmenter returning a base64 PNG mask.
pub struct HttpSegmenter {
    client: reqwest::blocking::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct SegmentResponse {
    mask: String,
}

impl HttpSegmenter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }
}

impl Segmenter for HttpSegmenter {
    fn segment_rooms(&self, image: &RgbImage) -> Result<GrayImage, DetectError> {
        let payload = encode_png(image).map_err(|err| DetectError::Inference(err.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "image": payload }))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|err| DetectError::Inference(err.to_string()))?;

        let parsed: SegmentResponse = response
            .json()
            .map_err(|err| DetectError::Inference(err.to_string()))?;

        let bytes = BASE64
            .decode(parsed.mask)
            .map_err(|err| DetectError::Inference(err.to_string()))?;
        let mask = image::load_from_memory(&bytes)
            .map_err(|err| DetectError::Inference(err.to_string()))?
            .to_luma8();
        Ok(mask)
    }
}

/// Remote OCR engine.
pub struct HttpOcr {
    client: reqwest::blocking::Client,
    endpoint: String,
    confidence_threshold: f32,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    entities: Vec<TextEntity>,
}

impl HttpOcr {
    pub fn new(
        endpoint: impl Into<String>,
        confidence_threshold: f32,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
            confidence_threshold,
        })
    }
}

impl Ocr for HttpOcr {
    fn analyze(&self, image: &RgbImage) -> Result<Vec<TextEntity>, OcrError> {
        let payload = encode_png(image).map_err(|err| OcrError::Inference(err.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "image": payload,
                "confidence_threshold": self.confidence_threshold,
            }))
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|err| OcrError::Inference(err.to_string()))?;

        let parsed: OcrResponse = response
            .json()
            .map_err(|err| OcrError::Inference(err.to_string()))?;

        // The endpoint is expected to pre-filter; enforce locally as well so
        // downstream consumers can rely on the threshold invariant.
        Ok(parsed
            .entities
            .into_iter()
            .filter(|e| e.confidence >= self.confidence_threshold)
            .collect())
    }
}
