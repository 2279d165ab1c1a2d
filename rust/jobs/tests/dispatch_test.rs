// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Worker pool dispatch semantics.

use image::{GrayImage, Rgb, RgbImage};
use planfuse_core::{Detection, PipelineConfig, TextEntity};
use planfuse_fusion::{Ocr, OcrError, VocabClassifier};
use planfuse_jobs::{
    ArtifactStore, DiskArtifactStore, DiskDedupCache, InMemoryJobStore, InMemoryProgress,
    JobConfig, JobDispatcher, JobOrchestrator, JobRequest, JobStatus, JobStore, ModelHandles,
    NotificationSink, RasterDecoder,
};
use planfuse_vision::{DetectError, Detector, Segmenter};
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Detector slow enough to observe an in-flight attempt.
struct SlowDetector;

impl Detector for SlowDetector {
    fn detect_batch(
        &self,
        crops: &[RgbImage],
        _confidence_threshold: f32,
    ) -> Result<Vec<Vec<Detection>>, DetectError> {
        std::thread::sleep(Duration::from_millis(300));
        Ok(vec![Vec::new(); crops.len()])
    }
}

struct EmptySegmenter;

impl Segmenter for EmptySegmenter {
    fn segment_rooms(&self, image: &RgbImage) -> Result<GrayImage, DetectError> {
        let (w, h) = image.dimensions();
        Ok(GrayImage::new(w, h))
    }
}

struct EmptyOcr;

impl Ocr for EmptyOcr {
    fn analyze(&self, _image: &RgbImage) -> Result<Vec<TextEntity>, OcrError> {
        Ok(Vec::new())
    }
}

struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn post(&self, _url: &str, _payload: &serde_json::Value) {}
}

fn page_bytes() -> Vec<u8> {
    let mut page = RgbImage::from_pixel(800, 800, Rgb([255, 255, 255]));
    for y in 300..500 {
        for x in 300..500 {
            page.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    let mut bytes = Vec::new();
    page.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn one_active_attempt_per_job_id() {
    let dir = tempfile::tempdir().unwrap();
    let jobs = Arc::new(InMemoryJobStore::new());
    let artifacts = Arc::new(DiskArtifactStore::new(dir.path().join("artifacts")));

    let orchestrator = Arc::new(JobOrchestrator::new(
        PipelineConfig::default(),
        JobConfig {
            scratch_root: dir.path().join("scratch"),
            ..Default::default()
        },
        jobs.clone(),
        artifacts.clone(),
        Arc::new(DiskDedupCache::new(dir.path().join("dedup"))),
        Arc::new(InMemoryProgress::new()),
        Arc::new(NullNotifier),
        ModelHandles {
            detector: Arc::new(SlowDetector),
            segmenter: Arc::new(EmptySegmenter),
            ocr: Arc::new(EmptyOcr),
            classifier: Arc::new(VocabClassifier::new()),
            decoder: Arc::new(RasterDecoder::new()),
        },
    ));

    let dispatcher = JobDispatcher::new(orchestrator, 2).unwrap();

    let input_key = "uploads/doc-1".to_string();
    artifacts.put(&input_key, &page_bytes()).unwrap();
    let job = jobs.create(&input_key).unwrap();
    let request = JobRequest {
        job_id: job.id.clone(),
        input_key,
        webhook_url: None,
        pixels_per_unit: None,
    };

    assert!(dispatcher.dispatch(request.clone()));
    assert!(dispatcher.is_active(&job.id));

    // A second delivery of the same job id is refused while in flight.
    assert!(!dispatcher.dispatch(request));
    assert_eq!(dispatcher.active_count(), 1);

    // Wait for the attempt to drain.
    let deadline = Instant::now() + Duration::from_secs(10);
    while dispatcher.is_active(&job.id) {
        assert!(Instant::now() < deadline, "attempt never finished");
        std::thread::sleep(Duration::from_millis(20));
    }

    let snapshot = jobs.read(&job.id).unwrap().unwrap();
    assert_eq!(snapshot.status, JobStatus::Completed);
}
