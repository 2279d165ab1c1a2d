// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Out-of-band job progress channel

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// Latest progress checkpoint for a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Percentage in 0..=100, monotonically non-decreasing per job.
    pub progress: u8,
    /// Free-text stage label, e.g. "Analyzing page 2/5".
    pub stage: String,
}

/// Progress channel contract: push from the worker, poll from status queries.
pub trait ProgressChannel: Send + Sync {
    fn push(&self, job_id: &str, progress: u8, stage: &str);

    fn poll(&self, job_id: &str) -> Option<ProgressEvent>;
}

/// Latest-value in-memory channel.
///
/// Regressing percentages are clamped to the last reported value so pollers
/// always observe a monotonic sequence, even across redelivered attempts.
#[derive(Debug, Default)]
pub struct InMemoryProgress {
    latest: RwLock<FxHashMap<String, ProgressEvent>>,
}

impl InMemoryProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressChannel for InMemoryProgress {
    fn push(&self, job_id: &str, progress: u8, stage: &str) {
        let mut latest = match self.latest.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let progress = progress.min(100);
        let entry = latest.entry(job_id.to_string()).or_insert(ProgressEvent {
            progress: 0,
            stage: String::new(),
        });
        entry.progress = entry.progress.max(progress);
        entry.stage = stage.to_string();
        tracing::debug!(job_id, progress = entry.progress, stage, "progress");
    }

    fn poll(&self, job_id: &str) -> Option<ProgressEvent> {
        let latest = match self.latest.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        latest.get(job_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_poll_returns_latest_event() {
        let channel = InMemoryProgress::new();
        channel.push("j1", 10, "Converting document");
        channel.push("j1", 45, "Analyzing page 2/5");

        let event = channel.poll("j1").unwrap();
        assert_eq!(event.progress, 45);
        assert_eq!(event.stage, "Analyzing page 2/5");
        assert!(channel.poll("j2").is_none());
    }

    #[test]
    fn regressions_are_clamped_to_monotonic() {
        let channel = InMemoryProgress::new();
        channel.push("j1", 60, "Analyzing page 3/5");
        channel.push("j1", 20, "Analyzing page 1/5");

        let event = channel.poll("j1").unwrap();
        assert_eq!(event.progress, 60);
        // Stage text still reflects the latest push.
        assert_eq!(event.stage, "Analyzing page 1/5");
    }

    #[test]
    fn values_above_one_hundred_are_capped() {
        let channel = InMemoryProgress::new();
        channel.push("j1", 250, "done");
        assert_eq!(channel.poll("j1").unwrap().progress, 100);
    }
}
