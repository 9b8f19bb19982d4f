//! Shared id -> job map.
//!
//! Constructed once by the engine and shared by the submission path, the
//! query paths and the expiry tasks. All access goes through a synchronous
//! lock because listeners touch it from worker threads.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use wps_core::job::Job;
use wps_core::types::JobId;

#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. A job with the same id is replaced.
    pub fn insert(&self, job: Arc<Job>) {
        self.jobs.write().insert(job.id(), job);
    }

    pub fn get(&self, id: JobId) -> Option<Arc<Job>> {
        self.jobs.read().get(&id).cloned()
    }

    pub fn remove(&self, id: JobId) -> Option<Arc<Job>> {
        self.jobs.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }
}
