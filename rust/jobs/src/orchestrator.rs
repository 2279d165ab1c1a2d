// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The job state machine
//!
//! One call to [`JobOrchestrator::run`] drives a job from dispatch to a
//! terminal state. Pages are processed strictly sequentially to bound peak
//! memory on large rasters; tile-batch inference blocks the job's thread.
//! The wall-clock deadline is checked at every stage checkpoint, the only
//! cancellation mechanism a job has.

use crate::cache::{fingerprint, DedupCache};
use crate::decode::PageDecoder;
use crate::error::JobError;
use crate::notify::NotificationSink;
use crate::progress::ProgressChannel;
use crate::scratch::ScratchDir;
use crate::store::{ArtifactStore, JobStatus, JobStore, JobUpdate};
use image::RgbImage;
use planfuse_core::{JobResult, PageResult, PipelineConfig};
use planfuse_fusion::{FusionAssembler, Ocr, TextClassifier};
use planfuse_geometry::ScaleCalibrator;
use planfuse_vision::{
    render_detections, BoxFusionMerger, ContentAwareFilter, DetectionBatchCoordinator, Detector,
    Segmenter, TileGrid,
};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Orchestration parameters.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Wall-clock deadline for one attempt.
    pub deadline: Duration,
    /// Dedup cache entry lifetime.
    pub dedup_ttl: Duration,
    /// Root directory for per-attempt scratch space.
    pub scratch_root: PathBuf,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(600),
            dedup_ttl: Duration::from_secs(7 * 24 * 3600),
            scratch_root: std::env::temp_dir().join("planfuse"),
        }
    }
}

/// One unit of work delivered from the queue.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: String,
    /// Artifact key of the uploaded document.
    pub input_key: String,
    pub webhook_url: Option<String>,
    /// Optional scale calibration in pixels per linear unit.
    pub pixels_per_unit: Option<f64>,
}

/// The heavy model handles, constructed once per worker process.
#[derive(Clone)]
pub struct ModelHandles {
    pub detector: Arc<dyn Detector>,
    pub segmenter: Arc<dyn Segmenter>,
    pub ocr: Arc<dyn Ocr>,
    pub classifier: Arc<dyn TextClassifier>,
    pub decoder: Arc<dyn PageDecoder>,
}

struct RunSummary {
    result_key: String,
    meta: serde_json::Value,
    cached: bool,
}

/// Drives jobs through `QUEUED -> PROCESSING -> {COMPLETED, FAILED}`.
pub struct JobOrchestrator {
    config: PipelineConfig,
    job_config: JobConfig,
    jobs: Arc<dyn JobStore>,
    artifacts: Arc<dyn ArtifactStore>,
    dedup: Arc<dyn DedupCache>,
    progress: Arc<dyn ProgressChannel>,
    notifier: Arc<dyn NotificationSink>,
    models: ModelHandles,
}

impl JobOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: PipelineConfig,
        job_config: JobConfig,
        jobs: Arc<dyn JobStore>,
        artifacts: Arc<dyn ArtifactStore>,
        dedup: Arc<dyn DedupCache>,
        progress: Arc<dyn ProgressChannel>,
        notifier: Arc<dyn NotificationSink>,
        models: ModelHandles,
    ) -> Self {
        Self {
            config,
            job_config,
            jobs,
            artifacts,
            dedup,
            progress,
            notifier,
            models,
        }
    }

    /// Run one job attempt to a terminal state.
    ///
    /// Every side effect is an idempotent overwrite keyed by job id, so a
    /// redelivered attempt after a crash can safely repeat all of them. On
    /// error the job is recorded as `Failed` with the error message before
    /// this returns.
    pub fn run(&self, request: &JobRequest) -> Result<String, JobError> {
        let deadline = Deadline::start(self.job_config.deadline);
        tracing::info!(
            job_id = %request.job_id,
            input_key = %request.input_key,
            "processing started"
        );

        self.jobs
            .update(&request.job_id, JobStatus::Processing, JobUpdate::default())?;

        let scratch = ScratchDir::create(&self.job_config.scratch_root, &request.job_id)?;
        let outcome = self.execute(request, &deadline, &scratch);

        match outcome {
            Ok(summary) => {
                self.jobs.update(
                    &request.job_id,
                    JobStatus::Completed,
                    JobUpdate {
                        result_key: Some(summary.result_key.clone()),
                        meta: Some(summary.meta),
                        error: None,
                    },
                )?;
                self.progress.push(&request.job_id, 100, "Complete");

                if let Some(url) = &request.webhook_url {
                    self.notifier.post(
                        url,
                        &serde_json::json!({
                            "event": "job.completed",
                            "job_id": request.job_id,
                            "status": "success",
                            "result_url": format!("/api/v1/jobs/{}", request.job_id),
                        }),
                    );
                }

                tracing::info!(
                    job_id = %request.job_id,
                    result_key = %summary.result_key,
                    cached = summary.cached,
                    "job completed"
                );
                Ok(summary.result_key)
            }
            Err(err) => {
                tracing::error!(job_id = %request.job_id, error = %err, "job failed");
                let record = self.jobs.update(
                    &request.job_id,
                    JobStatus::Failed,
                    JobUpdate {
                        error: Some(err.to_string()),
                        ..Default::default()
                    },
                );
                if let Err(store_err) = record {
                    tracing::error!(
                        job_id = %request.job_id,
                        error = %store_err,
                        "could not record failure"
                    );
                }
                Err(err)
            }
        }
    }

    /// Administrative correction: persist manually supplied result data and
    /// force-set `Completed`. This is the only path out of a terminal state.
    pub fn force_complete(
        &self,
        job_id: &str,
        data: &serde_json::Value,
    ) -> Result<String, JobError> {
        let existing = self
            .jobs
            .read(job_id)?
            .and_then(|job| job.result_key);
        let result_key =
            existing.unwrap_or_else(|| format!("results/{job_id}/manual_fix.json"));

        let bytes = serde_json::to_vec(data)?;
        self.artifacts.put(&result_key, &bytes)?;
        self.jobs.force_complete(
            job_id,
            &result_key,
            serde_json::json!({"source": "human_correction"}),
        )?;
        self.progress.push(job_id, 100, "Corrected");
        Ok(result_key)
    }

    fn execute(
        &self,
        request: &JobRequest,
        deadline: &Deadline,
        scratch: &ScratchDir,
    ) -> Result<RunSummary, JobError> {
        deadline.check()?;
        self.progress.push(&request.job_id, 5, "Fetching input");
        let bytes = self.artifacts.get(&request.input_key)?.ok_or_else(|| {
            JobError::Input(format!("input artifact {} not found", request.input_key))
        })?;

        // Dedup: identical content short-circuits straight to the stored
        // artifact without touching the detector or OCR.
        let digest = fingerprint(&bytes);
        if let Some(hit) = self.dedup.get(&digest)? {
            if self.artifacts.exists(&hit) {
                tracing::info!(job_id = %request.job_id, result_key = %hit, "dedup cache hit");
                return Ok(RunSummary {
                    result_key: hit,
                    meta: serde_json::json!({"cached": true}),
                    cached: true,
                });
            }
        }

        deadline.check()?;
        self.progress.push(&request.job_id, 10, "Converting document");
        let pages = self.models.decoder.decode(&bytes)?;
        if pages.is_empty() {
            return Err(JobError::Input("document produced no pages".into()));
        }

        let calibrator = match request.pixels_per_unit {
            Some(ppu) => ScaleCalibrator::with_scale(ppu)
                .map_err(|err| JobError::Input(err.to_string()))?,
            None => ScaleCalibrator::new(),
        };
        let assembler = FusionAssembler::new(
            self.config.clone(),
            calibrator,
            Arc::clone(&self.models.classifier),
        );

        let mut results = Vec::with_capacity(pages.len());
        let mut total_rooms = 0usize;
        for (index, page) in pages.iter().enumerate() {
            deadline.check()?;
            let percent = 20 + (index * 70) / pages.len();
            self.progress.push(
                &request.job_id,
                percent as u8,
                &format!("Analyzing page {}/{}", index + 1, pages.len()),
            );

            let page_result = self.process_page(request, index, page, &assembler, scratch)?;
            total_rooms += page_result.meta.room_count;
            results.push(page_result);
        }

        deadline.check()?;
        self.progress.push(&request.job_id, 95, "Finalizing");
        let page_count = results.len();
        let output = JobResult {
            job_id: request.job_id.clone(),
            results,
        };
        let data = serde_json::to_vec(&output)?;
        std::fs::write(scratch.path().join("data.json"), &data)?;

        let result_key = format!("results/{}/data.json", request.job_id);
        self.artifacts.put(&result_key, &data)?;
        self.dedup
            .set(&digest, &result_key, self.job_config.dedup_ttl)?;

        Ok(RunSummary {
            result_key,
            meta: serde_json::json!({
                "room_count": total_rooms,
                "page_count": page_count,
            }),
            cached: false,
        })
    }

    fn process_page(
        &self,
        request: &JobRequest,
        index: usize,
        page: &RgbImage,
        assembler: &FusionAssembler,
        scratch: &ScratchDir,
    ) -> Result<PageResult, JobError> {
        let (width, height) = page.dimensions();

        let grid = TileGrid::new(self.config.tile_size, self.config.tile_overlap);
        let candidates = grid.generate(width, height);
        let filter = ContentAwareFilter::new(
            self.config.content_scale,
            self.config.content_threshold,
        );
        let tiles = filter.filter(page, &candidates);

        let coordinator = DetectionBatchCoordinator::new(
            self.config.batch_size,
            self.config.confidence_threshold,
        );
        let raw = coordinator.run(page, &tiles, self.models.detector.as_ref())?;
        let merged = BoxFusionMerger::new(self.config.iou_threshold).merge(&raw);

        let mask = self.models.segmenter.segment_rooms(page)?;
        let texts = self.models.ocr.analyze(page)?;
        let assembly = assembler.assemble((width, height), &mask, &merged, &texts)?;

        let annotated = render_detections(page, &merged);
        let mut png = Vec::new();
        annotated.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;

        let image_name = format!("{}_p{}.png", request.job_id, index + 1);
        std::fs::write(scratch.path().join(&image_name), &png)?;
        let image_key = format!("results/{}/{}", request.job_id, image_name);
        self.artifacts.put(&image_key, &png)?;

        tracing::info!(
            job_id = %request.job_id,
            page = index + 1,
            tiles = tiles.len(),
            detections = merged.len(),
            rooms = assembly.meta.room_count,
            "page analyzed"
        );

        Ok(PageResult {
            page: index + 1,
            image_key,
            meta: assembly.meta,
            data: assembly.rooms,
        })
    }
}

/// Wall-clock deadline checked between stages.
struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    fn start(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    fn check(&self) -> Result<(), JobError> {
        if self.started.elapsed() > self.limit {
            Err(JobError::DeadlineExceeded {
                limit_secs: self.limit.as_secs(),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_trips_after_the_limit() {
        let deadline = Deadline::start(Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(2));
        let err = deadline.check().unwrap_err();
        assert!(err.is_deadline());
        assert!(err.to_string().contains("deadline exceeded"));
    }

    #[test]
    fn generous_deadline_passes() {
        let deadline = Deadline::start(Duration::from_secs(600));
        assert!(deadline.check().is_ok());
    }
}
