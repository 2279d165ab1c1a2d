// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Job submission and status endpoints.

use crate::error::ApiError;
use crate::types::{StatusResponse, SubmitResponse, UploadSlotResponse};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use planfuse_jobs::{JobRequest, JobStatus};
use std::time::Duration;
use uuid::Uuid;

struct Upload {
    file: Option<Vec<u8>>,
    /// Key of a document already uploaded through a presigned write URL.
    file_key: Option<String>,
    webhook_url: Option<String>,
    pixels_per_unit: Option<f64>,
}

/// Extract the uploaded file and optional form fields.
async fn extract_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    let mut upload = Upload {
        file: None,
        file_key: None,
        webhook_url: None,
        pixels_per_unit: None,
    };

    while let Some(field) = multipart.next_field().await? {
        match field.name().unwrap_or_default() {
            "file" => upload.file = Some(field.bytes().await?.to_vec()),
            "file_key" => upload.file_key = Some(field.text().await?),
            "webhook_url" => upload.webhook_url = Some(field.text().await?),
            "pixels_per_unit" => {
                let text = field.text().await?;
                let value: f64 = text.parse().map_err(|_| {
                    ApiError::BadRequest(format!("invalid pixels_per_unit: {text}"))
                })?;
                upload.pixels_per_unit = Some(value);
            }
            other => {
                tracing::debug!(field = other, "ignoring unknown multipart field");
            }
        }
    }

    Ok(upload)
}

/// POST /api/v1/uploads - Ask for a presigned upload slot.
///
/// The client PUTs the document to `upload_url`, then submits a job with
/// the returned `file_key`.
pub async fn request_upload(
    State(state): State<AppState>,
) -> Result<Json<UploadSlotResponse>, ApiError> {
    let file_key = format!("uploads/{}", Uuid::new_v4());
    let upload_url = state.artifacts.presigned_put(
        &file_key,
        Duration::from_secs(state.config.presign_expiry_secs),
    )?;
    Ok(Json(UploadSlotResponse {
        file_key,
        upload_url,
    }))
}

/// POST /api/v1/jobs - Start processing an uploaded document.
///
/// Accepts either an inline `file` or the `file_key` of a document already
/// placed through a presigned upload.
pub async fn submit(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let upload = extract_upload(&mut multipart).await?;

    let input_key = match (upload.file, upload.file_key) {
        (Some(file), _) => {
            if file.len() > state.config.max_file_size_mb * 1024 * 1024 {
                return Err(ApiError::FileTooLarge {
                    max_mb: state.config.max_file_size_mb,
                });
            }
            let input_key = format!("uploads/{}", Uuid::new_v4());
            state.artifacts.put(&input_key, &file)?;
            input_key
        }
        (None, Some(file_key)) => {
            if !state.artifacts.exists(&file_key) {
                return Err(ApiError::NotFound(format!(
                    "file {file_key} not in storage; was it uploaded?"
                )));
            }
            file_key
        }
        (None, None) => return Err(ApiError::MissingFile),
    };

    let job = state.jobs.create(&input_key)?;
    tracing::info!(job_id = %job.id, input_key = %input_key, "job submitted");

    let dispatched = state.dispatcher.dispatch(JobRequest {
        job_id: job.id.clone(),
        input_key,
        webhook_url: upload.webhook_url,
        pixels_per_unit: upload.pixels_per_unit,
    });
    if !dispatched {
        return Err(ApiError::AttemptActive);
    }

    Ok(Json(SubmitResponse {
        job_id: job.id,
        status: JobStatus::Queued,
        message: "Job persisted and started",
    }))
}

/// GET /api/v1/jobs/:id - Status from the store plus live progress.
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let job = state
        .jobs
        .read(&job_id)?
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id}")))?;

    let mut response = StatusResponse {
        job_id: job.id.clone(),
        status: job.status,
        created_at: job.created_at,
        completed_at: job.completed_at,
        progress: None,
        stage: None,
        result: None,
        error: job.error.clone(),
        warning: None,
    };

    if matches!(job.status, JobStatus::Queued | JobStatus::Processing) {
        if let Some(event) = state.progress.poll(&job_id) {
            response.progress = Some(event.progress);
            response.stage = Some(event.stage);
        }
    }

    if job.status == JobStatus::Completed {
        if let Some(result_key) = &job.result_key {
            match state.artifacts.get(result_key)? {
                Some(bytes) => {
                    let mut result: serde_json::Value = serde_json::from_slice(&bytes)?;
                    sign_image_urls(&state, &mut result)?;
                    response.result = Some(result);
                }
                None => {
                    response.warning = Some("completed_but_data_missing");
                }
            }
        }
    }

    Ok(Json(response))
}

/// Attach presigned image URLs next to each page's `image_key`.
fn sign_image_urls(state: &AppState, result: &mut serde_json::Value) -> Result<(), ApiError> {
    let expiry = Duration::from_secs(state.config.presign_expiry_secs);
    if let Some(pages) = result.get_mut("results").and_then(|v| v.as_array_mut()) {
        for page in pages {
            let Some(image_key) = page.get("image_key").and_then(|v| v.as_str()) else {
                continue;
            };
            let url = state.artifacts.presigned_get(image_key, expiry)?;
            page["image_url"] = serde_json::Value::String(url);
        }
    }
    Ok(())
}
