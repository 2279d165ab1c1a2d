// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Job-level error taxonomy

use crate::decode::DecodeError;
use crate::store::StoreError;
use planfuse_fusion::{FusionError, OcrError};
use planfuse_vision::DetectError;
use thiserror::Error;

/// Errors that fail a job.
///
/// Page-level failures are never partially salvaged; any of these fails the
/// whole job. [`JobError::DeadlineExceeded`] is recorded distinctly from
/// generic failures so operators can triage timeouts separately.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("input error: {0}")]
    Input(String),

    #[error("deadline exceeded after {limit_secs} s")]
    DeadlineExceeded { limit_secs: u64 },

    #[error("dependency call failed: {0}")]
    Dependency(String),

    #[error("fusion error: {0}")]
    Fusion(#[from] FusionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("scratch io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("result serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl JobError {
    /// True for the distinct deadline failure.
    pub fn is_deadline(&self) -> bool {
        matches!(self, JobError::DeadlineExceeded { .. })
    }
}

impl From<DetectError> for JobError {
    fn from(err: DetectError) -> Self {
        JobError::Dependency(err.to_string())
    }
}

impl From<OcrError> for JobError {
    fn from(err: OcrError) -> Self {
        JobError::Dependency(err.to_string())
    }
}

impl From<DecodeError> for JobError {
    fn from(err: DecodeError) -> Self {
        JobError::Input(err.to_string())
    }
}
