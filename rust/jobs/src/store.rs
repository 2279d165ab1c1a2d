// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Job and artifact store contracts
//!
//! The relational job schema and blob storage mechanics live outside this
//! system; these traits are the narrow contracts the orchestrator consumes.
//! The in-memory job store is the reference implementation used by tests and
//! single-node deployments.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Store-level failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache error: {0}")]
    Cache(String),

    #[error("artifact io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Job lifecycle states.
///
/// `Completed` and `Failed` are terminal; the only way out of a terminal
/// state is the explicit administrative force-complete, which sits outside
/// the internal transition graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self -> next` is an edge of the internal transition graph.
    /// Repeating the current state is always allowed so redelivered attempts
    /// can overwrite safely.
    fn allows(&self, next: JobStatus) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

/// A job snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    /// Artifact key of the uploaded document.
    pub document_key: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_secs: Option<f64>,
    pub result_key: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Partial update applied alongside a status transition.
#[derive(Debug, Clone, Default)]
pub struct JobUpdate {
    pub result_key: Option<String>,
    pub meta: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Job persistence contract.
pub trait JobStore: Send + Sync {
    /// Create a new `Queued` job for a stored document.
    fn create(&self, document_key: &str) -> Result<Job, StoreError>;

    /// Idempotent status update. Writes that would leave a terminal state
    /// are ignored, so repeated attempts after a crash stay safe.
    fn update(&self, job_id: &str, status: JobStatus, update: JobUpdate)
        -> Result<(), StoreError>;

    fn read(&self, job_id: &str) -> Result<Option<Job>, StoreError>;

    /// Administrative correction: force-set `Completed` with manually
    /// supplied result data, regardless of the current state.
    fn force_complete(
        &self,
        job_id: &str,
        result_key: &str,
        meta: serde_json::Value,
    ) -> Result<(), StoreError>;
}

/// Artifact persistence contract, keyed like object storage.
pub trait ArtifactStore: Send + Sync {
    /// Idempotent overwrite.
    fn put(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn exists(&self, key: &str) -> bool;

    /// A time-limited read URL for a stored artifact.
    fn presigned_get(&self, key: &str, expires_in: Duration) -> Result<String, StoreError>;

    /// A time-limited write URL a client can upload to directly.
    fn presigned_put(&self, key: &str, expires_in: Duration) -> Result<String, StoreError>;
}

/// Reference in-memory job store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<FxHashMap<String, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_guard(&self) -> std::sync::RwLockWriteGuard<'_, FxHashMap<String, Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, FxHashMap<String, Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, document_key: &str) -> Result<Job, StoreError> {
        let job = Job {
            id: Uuid::new_v4().to_string(),
            document_key: document_key.to_string(),
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            processing_secs: None,
            result_key: None,
            meta: None,
            error: None,
        };
        self.write_guard().insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn update(
        &self,
        job_id: &str,
        status: JobStatus,
        update: JobUpdate,
    ) -> Result<(), StoreError> {
        let mut jobs = self.write_guard();
        let Some(job) = jobs.get_mut(job_id) else {
            tracing::warn!(job_id, "update for unknown job ignored");
            return Ok(());
        };

        if !job.status.allows(status) {
            tracing::warn!(
                job_id,
                from = ?job.status,
                to = ?status,
                "invalid status transition ignored"
            );
            return Ok(());
        }

        job.status = status;
        if status == JobStatus::Processing && job.started_at.is_none() {
            job.started_at = Some(Utc::now());
        }
        if status.is_terminal() {
            let now = Utc::now();
            job.completed_at = Some(now);
            if let Some(started) = job.started_at {
                job.processing_secs = Some((now - started).num_milliseconds() as f64 / 1000.0);
            }
        }
        if let Some(result_key) = update.result_key {
            job.result_key = Some(result_key);
        }
        if let Some(meta) = update.meta {
            job.meta = Some(meta);
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }
        Ok(())
    }

    fn read(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.read_guard().get(job_id).cloned())
    }

    fn force_complete(
        &self,
        job_id: &str,
        result_key: &str,
        meta: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut jobs = self.write_guard();
        let Some(job) = jobs.get_mut(job_id) else {
            tracing::warn!(job_id, "force-complete for unknown job ignored");
            return Ok(());
        };

        tracing::info!(job_id, from = ?job.status, "administrative force-complete");
        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());
        job.result_key = Some(result_key.to_string());
        job.meta = Some(meta);
        job.error = None;
        Ok(())
    }
}
