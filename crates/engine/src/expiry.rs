//! Deferred destruction of finished jobs.
//!
//! Once a job reaches a terminal state its outputs stay retrievable for the
//! configured retention window. [`ResultExpiry`] is attached to every job
//! as a listener; on the terminal transition it stamps the expiration time
//! on the job and spawns a fire-and-forget task that drops the job, with
//! its outputs, from the registry when the window closes.

use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use wps_core::job::{Job, JobEvent, JobListener};
use wps_core::types::{JobId, Timestamp};

use crate::registry::JobRegistry;

pub struct ResultExpiry {
    registry: Weak<JobRegistry>,
    retention: Duration,
}

impl ResultExpiry {
    pub fn new(registry: &Arc<JobRegistry>, retention: Duration) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            retention,
        }
    }

    /// Stamp the expiration on `job` and schedule its removal.
    pub fn schedule(&self, job: &Job) -> Option<Timestamp> {
        let expires_at = chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d));
        if let Some(at) = expires_at {
            job.set_expiration(at);
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(job_id = %job.id(), "No runtime available, job results will not expire");
            return expires_at;
        };

        let registry = Weak::clone(&self.registry);
        let job_id = job.id();
        let retention = self.retention;
        handle.spawn(async move {
            tokio::time::sleep(retention).await;
            expire(&registry, job_id);
        });

        tracing::debug!(
            %job_id,
            retention_ms = retention_ms(retention),
            "Result expiration scheduled",
        );
        expires_at
    }
}

impl JobListener for ResultExpiry {
    fn on_event(&self, job: &Job, event: &JobEvent) {
        if let JobEvent::StateChanged { to, .. } = event {
            if to.is_terminal() {
                self.schedule(job);
            }
        }
    }
}

/// Retention in whole milliseconds, saturating at `u64::MAX`.
fn retention_ms(retention: Duration) -> u64 {
    u64::try_from(retention.as_millis()).unwrap_or(u64::MAX)
}

fn expire(registry: &Weak<JobRegistry>, job_id: JobId) {
    let Some(registry) = registry.upgrade() else {
        return;
    };
    if registry.remove(job_id).is_some() {
        tracing::info!(%job_id, "Job results expired");
    }
}
