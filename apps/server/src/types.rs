// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Request and response types.

use chrono::{DateTime, Utc};
use planfuse_jobs::JobStatus;
use serde::Serialize;

/// Presigned upload slot.
#[derive(Debug, Serialize)]
pub struct UploadSlotResponse {
    pub file_key: String,
    pub upload_url: String,
}

/// Response to a job submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub message: &'static str,
}

/// Job status snapshot with live progress and, when completed, the result.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the job is completed but its result artifact is gone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

/// Response to an administrative fix.
#[derive(Debug, Serialize)]
pub struct FixResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub result_key: String,
}
