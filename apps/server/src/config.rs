// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration loaded from environment variables.

use planfuse_core::PipelineConfig;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Root directory for artifact and dedup storage.
    pub data_dir: String,
    /// Maximum upload size in MB.
    pub max_file_size_mb: usize,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Number of job worker threads.
    pub worker_threads: usize,
    /// Wall-clock deadline per job attempt in seconds.
    pub job_deadline_secs: u64,
    /// Dedup cache entry lifetime in days.
    pub dedup_ttl_days: u64,
    /// Webhook delivery timeout in seconds.
    pub notify_timeout_secs: u64,
    /// Presigned artifact URL lifetime in seconds.
    pub presign_expiry_secs: u64,
    /// Model-serving endpoints.
    pub detector_url: String,
    pub segmenter_url: String,
    pub ocr_url: String,
    /// Model call timeout in seconds.
    pub model_timeout_secs: u64,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 8080),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| {
                std::env::current_dir()
                    .ok()
                    .and_then(|dir| dir.join(".data").to_str().map(|s| s.to_string()))
                    .unwrap_or_else(|| "./.data".into())
            }),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB", 100),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),
            worker_threads: env_parse("WORKER_THREADS", num_cpus::get()),
            job_deadline_secs: env_parse("JOB_DEADLINE_SECS", 600),
            dedup_ttl_days: env_parse("DEDUP_TTL_DAYS", 7),
            notify_timeout_secs: env_parse("NOTIFY_TIMEOUT_SECS", 5),
            presign_expiry_secs: env_parse("PRESIGN_EXPIRY_SECS", 3600),
            detector_url: std::env::var("DETECTOR_URL")
                .unwrap_or_else(|_| "http://localhost:9090/v1/detect".into()),
            segmenter_url: std::env::var("SEGMENTER_URL")
                .unwrap_or_else(|_| "http://localhost:9090/v1/segment".into()),
            ocr_url: std::env::var("OCR_URL")
                .unwrap_or_else(|_| "http://localhost:9091/v1/ocr".into()),
            model_timeout_secs: env_parse("MODEL_TIMEOUT_SECS", 60),
        }
    }

    /// Pipeline configuration with environment overrides on the defaults.
    pub fn pipeline(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            tile_size: env_parse("TILE_SIZE", defaults.tile_size),
            tile_overlap: env_parse("TILE_OVERLAP", defaults.tile_overlap),
            confidence_threshold: env_parse(
                "CONFIDENCE_THRESHOLD",
                defaults.confidence_threshold,
            ),
            iou_threshold: env_parse("IOU_THRESHOLD", defaults.iou_threshold),
            batch_size: env_parse("BATCH_SIZE", defaults.batch_size),
            min_room_area: env_parse("MIN_ROOM_AREA", defaults.min_room_area),
            ..defaults
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
