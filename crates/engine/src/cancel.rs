//! Per-job cancellation handles.
//!
//! Every dispatched job registers its [`ProgressMonitor`] here, keyed by
//! job id, until its worker finishes. A dismiss request cancels the
//! monitor; the worker observes that and forwards the request to the
//! executor.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use wps_core::progress::ProgressMonitor;
use wps_core::types::JobId;

#[derive(Default)]
pub struct CancellationRegistry {
    handles: Mutex<HashMap<JobId, Arc<ProgressMonitor>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, job_id: JobId, monitor: Arc<ProgressMonitor>) {
        self.handles.lock().insert(job_id, monitor);
    }

    /// Signal cancellation for `job_id`.
    ///
    /// Returns `true` only when this call newly cancelled a registered job.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let Some(monitor) = self.handles.lock().get(&job_id).cloned() else {
            return false;
        };
        if monitor.is_cancelled() {
            return false;
        }
        monitor.cancel();
        true
    }

    pub fn remove(&self, job_id: JobId) -> Option<Arc<ProgressMonitor>> {
        self.handles.lock().remove(&job_id)
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.handles.lock().contains_key(&job_id)
    }

    /// Number of jobs whose workers have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.handles.lock().len()
    }

    /// Cancel every registered job. Returns how many were newly cancelled.
    pub fn cancel_all(&self) -> usize {
        let monitors: Vec<_> = self.handles.lock().values().cloned().collect();
        let mut cancelled = 0;
        for monitor in monitors {
            if !monitor.is_cancelled() {
                monitor.cancel();
                cancelled += 1;
            }
        }
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_reported_once() {
        let registry = CancellationRegistry::new();
        let id = uuid::Uuid::new_v4();
        let monitor = Arc::new(ProgressMonitor::new("t"));
        registry.register(id, Arc::clone(&monitor));

        assert!(registry.cancel(id));
        assert!(!registry.cancel(id));
        assert!(monitor.is_cancelled());
    }

    #[test]
    fn unknown_job_is_not_cancelled() {
        let registry = CancellationRegistry::new();
        assert!(!registry.cancel(uuid::Uuid::new_v4()));
    }

    #[test]
    fn cancel_all_counts_fresh_cancellations() {
        let registry = CancellationRegistry::new();
        let monitors: Vec<_> = (0..3)
            .map(|_| {
                let id = uuid::Uuid::new_v4();
                let m = Arc::new(ProgressMonitor::new("t"));
                registry.register(id, Arc::clone(&m));
                (id, m)
            })
            .collect();
        registry.cancel(monitors[0].0);

        assert_eq!(registry.cancel_all(), 2);
        assert!(monitors.iter().all(|(_, m)| m.is_cancelled()));
        assert_eq!(registry.in_flight(), 3);

        registry.remove(monitors[1].0);
        assert_eq!(registry.in_flight(), 2);
        assert!(!registry.contains(monitors[1].0));
    }
}
