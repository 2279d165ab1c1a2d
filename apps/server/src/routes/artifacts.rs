// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Artifact fetch endpoint backing presigned URLs.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ArtifactQuery {
    pub expires: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StoredResponse {
    pub key: String,
    pub size: usize,
}

/// GET /api/v1/artifacts/*key - Serve a stored artifact.
///
/// Links produced by `presigned_get` carry an `expires` timestamp; stale
/// links are refused.
pub async fn fetch(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ArtifactQuery>,
) -> Result<Response, ApiError> {
    if let Some(expires) = query.expires {
        if chrono::Utc::now().timestamp() > expires {
            return Err(ApiError::LinkExpired);
        }
    }

    let bytes = state
        .artifacts
        .get(&key)?
        .ok_or_else(|| ApiError::NotFound(format!("artifact {key}")))?;

    let content_type = if key.ends_with(".png") {
        "image/png"
    } else if key.ends_with(".jpg") || key.ends_with(".jpeg") {
        "image/jpeg"
    } else if key.ends_with(".json") {
        "application/json"
    } else {
        "application/octet-stream"
    };

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// PUT /api/v1/artifacts/*key - Direct upload backing presigned write URLs.
pub async fn upload(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ArtifactQuery>,
    body: Bytes,
) -> Result<Json<StoredResponse>, ApiError> {
    if let Some(expires) = query.expires {
        if chrono::Utc::now().timestamp() > expires {
            return Err(ApiError::LinkExpired);
        }
    }
    if body.len() > state.config.max_file_size_mb * 1024 * 1024 {
        return Err(ApiError::FileTooLarge {
            max_mb: state.config.max_file_size_mb,
        });
    }

    state.artifacts.put(&key, &body)?;
    tracing::info!(key = %key, size = body.len(), "artifact uploaded");
    Ok(Json(StoredResponse {
        key,
        size: body.len(),
    }))
}
