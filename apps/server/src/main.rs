// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planfuse Server - floor plan extraction API.
//!
//! Uploads are stored, fingerprinted and dispatched onto a fixed worker
//! pool; each job runs the tiled detection, fusion and assembly pipeline to
//! a terminal state. Status queries combine the job store snapshot with the
//! live progress channel.
//!
//! # Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `POST /api/v1/uploads` - Request a presigned upload slot
//! - `POST /api/v1/jobs` - Upload a drawing (or reference a slot) and start a job
//! - `GET /api/v1/jobs/:id` - Job status, progress and result
//! - `PATCH /api/v1/admin/jobs/:id/fix` - Human correction (force-complete)
//! - `GET|PUT /api/v1/artifacts/*key` - Artifact fetch/upload (presigned links)

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

mod config;
mod error;
mod routes;
mod types;

use config::Config;
use planfuse_fusion::VocabClassifier;
use planfuse_jobs::remote::{HttpDetector, HttpOcr, HttpSegmenter};
use planfuse_jobs::{
    ArtifactStore, DiskArtifactStore, DiskDedupCache, InMemoryJobStore, InMemoryProgress,
    JobConfig, JobDispatcher, JobOrchestrator, JobStore, ModelHandles, ProgressChannel,
    RasterDecoder, WebhookNotifier,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jobs: Arc<dyn JobStore>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub progress: Arc<dyn ProgressChannel>,
    pub orchestrator: Arc<JobOrchestrator>,
    pub dispatcher: Arc<JobDispatcher>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,planfuse_server=debug".into()),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        port = config.port,
        data_dir = %config.data_dir,
        worker_threads = config.worker_threads,
        job_deadline_secs = config.job_deadline_secs,
        "Starting Planfuse Server"
    );

    let data_dir = PathBuf::from(&config.data_dir);
    let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let artifacts: Arc<dyn ArtifactStore> =
        Arc::new(DiskArtifactStore::new(data_dir.join("artifacts")));
    let dedup = Arc::new(DiskDedupCache::new(data_dir.join("dedup")));
    let progress: Arc<dyn ProgressChannel> = Arc::new(InMemoryProgress::new());

    // Heavy model handles: one set per worker process, injected everywhere.
    let model_timeout = Duration::from_secs(config.model_timeout_secs);
    let pipeline = config.pipeline();
    let models = ModelHandles {
        detector: Arc::new(
            HttpDetector::new(&config.detector_url, model_timeout)
                .expect("Failed to build detector client"),
        ),
        segmenter: Arc::new(
            HttpSegmenter::new(&config.segmenter_url, model_timeout)
                .expect("Failed to build segmenter client"),
        ),
        ocr: Arc::new(
            HttpOcr::new(
                &config.ocr_url,
                pipeline.ocr_confidence_threshold,
                model_timeout,
            )
            .expect("Failed to build OCR client"),
        ),
        classifier: Arc::new(VocabClassifier::new()),
        decoder: Arc::new(RasterDecoder::new()),
    };

    let notifier = Arc::new(
        WebhookNotifier::new(Duration::from_secs(config.notify_timeout_secs))
            .expect("Failed to build webhook client"),
    );

    let job_config = JobConfig {
        deadline: Duration::from_secs(config.job_deadline_secs),
        dedup_ttl: Duration::from_secs(config.dedup_ttl_days * 24 * 3600),
        scratch_root: data_dir.join("scratch"),
    };

    let orchestrator = Arc::new(JobOrchestrator::new(
        pipeline,
        job_config,
        jobs.clone(),
        artifacts.clone(),
        dedup,
        progress.clone(),
        notifier,
        models,
    ));

    let dispatcher = Arc::new(
        JobDispatcher::new(orchestrator.clone(), config.worker_threads)
            .expect("Failed to build worker pool"),
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        jobs,
        artifacts,
        progress,
        orchestrator,
        dispatcher,
    };

    // Build router
    let app = Router::new()
        .route("/api/v1/health", get(routes::health::check))
        .route("/api/v1/uploads", post(routes::jobs::request_upload))
        .route("/api/v1/jobs", post(routes::jobs::submit))
        .route("/api/v1/jobs/:id", get(routes::jobs::status))
        .route("/api/v1/admin/jobs/:id/fix", patch(routes::admin::fix_job))
        .route(
            "/api/v1/artifacts/*key",
            get(routes::artifacts::fetch).put(routes::artifacts::upload),
        )
        // Middleware
        .layer(DefaultBodyLimit::max(config.max_file_size_mb * 1024 * 1024))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build async runtime");

    runtime.block_on(async move {
        tracing::info!("Listening on http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind listen address");
        axum::serve(listener, app).await.expect("Server error");
    });
}
