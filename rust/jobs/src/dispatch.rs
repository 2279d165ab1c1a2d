// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed worker pool dispatch
//!
//! Jobs run concurrently across a fixed rayon pool. The dispatcher enforces
//! the queue contract of at most one active attempt per job id at a time;
//! redelivery after a crash starts a new, independent attempt.

use crate::orchestrator::{JobOrchestrator, JobRequest};
use rustc_hash::FxHashSet;
use std::sync::{Arc, Mutex};

/// Dispatches job requests onto a fixed-size worker pool.
pub struct JobDispatcher {
    pool: rayon::ThreadPool,
    active: Arc<Mutex<FxHashSet<String>>>,
    orchestrator: Arc<JobOrchestrator>,
}

impl JobDispatcher {
    pub fn new(
        orchestrator: Arc<JobOrchestrator>,
        workers: usize,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("planfuse-worker-{i}"))
            .build()?;
        Ok(Self {
            pool,
            active: Arc::new(Mutex::new(FxHashSet::default())),
            orchestrator,
        })
    }

    /// Dispatch a job attempt. Returns `false` when an attempt for the same
    /// job id is already running.
    pub fn dispatch(&self, request: JobRequest) -> bool {
        {
            let mut active = lock(&self.active);
            if !active.insert(request.job_id.clone()) {
                tracing::warn!(job_id = %request.job_id, "attempt already active, not dispatching");
                return false;
            }
        }

        let orchestrator = Arc::clone(&self.orchestrator);
        let active = Arc::clone(&self.active);
        self.pool.spawn(move || {
            let _ = orchestrator.run(&request);
            lock(&active).remove(&request.job_id);
        });
        true
    }

    pub fn is_active(&self, job_id: &str) -> bool {
        lock(&self.active).contains(job_id)
    }

    pub fn active_count(&self) -> usize {
        lock(&self.active).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
