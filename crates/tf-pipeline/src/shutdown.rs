//! Process lifecycle hook.
//!
//! A [`ProcessRegistry`] tracks the cancellation token of every running
//! job so that a shutdown handler can kill them all at once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tf_core::JobId;
use tokio_util::sync::CancellationToken;

/// Cancellation tokens of running jobs, keyed by job.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    jobs: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `token` until the returned guard is dropped.
    pub fn register(&self, job_id: JobId, token: CancellationToken) -> Registration {
        self.jobs.lock().insert(job_id, token);
        Registration {
            registry: self.clone(),
            job_id,
        }
    }

    /// Cancel every tracked job. Returns how many were signalled.
    pub fn terminate_all(&self) -> usize {
        let jobs = self.jobs.lock();
        for (job_id, token) in jobs.iter() {
            tracing::info!(%job_id, "Terminating job");
            token.cancel();
        }
        jobs.len()
    }

    pub fn contains(&self, job_id: &JobId) -> bool {
        self.jobs.lock().contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

/// Removes its job from the registry on drop.
#[derive(Debug)]
pub struct Registration {
    registry: ProcessRegistry,
    job_id: JobId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.jobs.lock().remove(&self.job_id);
    }
}
