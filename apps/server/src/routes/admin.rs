// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Administrative endpoints for human-in-the-loop corrections.

use crate::error::ApiError;
use crate::types::FixResponse;
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use planfuse_jobs::JobStatus;

/// PATCH /api/v1/admin/jobs/:id/fix - Upload corrected result data and
/// force-set the job to completed.
///
/// Used when the model missed a room or the scale was wrong; this is the
/// only path out of a terminal state.
pub async fn fix_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(corrected): Json<serde_json::Value>,
) -> Result<Json<FixResponse>, ApiError> {
    state
        .jobs
        .read(&job_id)?
        .ok_or_else(|| ApiError::NotFound(format!("job {job_id}")))?;

    let result_key = state.orchestrator.force_complete(&job_id, &corrected)?;
    tracing::info!(job_id = %job_id, result_key = %result_key, "job force-completed");

    Ok(Json(FixResponse {
        job_id,
        status: JobStatus::Completed,
        result_key,
    }))
}
