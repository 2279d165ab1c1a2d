// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Crash-tolerant job orchestration
//!
//! [`JobOrchestrator`] drives one extraction job end to end through the
//! `QUEUED -> PROCESSING -> {COMPLETED, FAILED}` state machine:
//!
//! - content-fingerprint deduplication that short-circuits repeat uploads
//! - coarse progress checkpoints pollable through the progress channel
//! - a wall-clock deadline surfaced as a distinct failure for triage
//! - at-least-once redelivery safety (all writes are idempotent overwrites
//!   keyed by job id; completion is recorded only after the artifact exists)
//! - scratch directories released on every exit path
//! - best-effort webhook notification that can never change job status
//!
//! The job store, artifact store, dedup cache, progress channel and
//! notification sink are narrow trait contracts with reference
//! implementations; production deployments swap in their own backends.

pub mod cache;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod progress;
pub mod remote;
pub mod scratch;
pub mod store;

pub use cache::{fingerprint, DedupCache, DiskArtifactStore, DiskDedupCache};
pub use decode::{DecodeError, PageDecoder, RasterDecoder};
pub use dispatch::JobDispatcher;
pub use error::JobError;
pub use notify::{NotificationSink, WebhookNotifier};
pub use orchestrator::{JobConfig, JobOrchestrator, JobRequest, ModelHandles};
pub use progress::{InMemoryProgress, ProgressChannel, ProgressEvent};
pub use store::{ArtifactStore, InMemoryJobStore, Job, JobStatus, JobStore, JobUpdate, StoreError};
