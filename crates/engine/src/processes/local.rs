use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use wps_core::error::CoreError;
use wps_core::executor::{ProcessError, ProcessExecutor, Properties};
use wps_core::process::{DataMap, ProcessDescription};
use wps_core::progress::ProgressMonitor;
use wps_core::types::JobId;

/// Body of a registered process.
pub type ProcessFn =
    Arc<dyn Fn(&mut DataMap, &ProgressMonitor) -> Result<(), ProcessError> + Send + Sync>;

struct RegisteredProcess {
    description: ProcessDescription,
    body: ProcessFn,
}

/// Named process functions, keyed by identifier.
#[derive(Default)]
pub struct ProcessRegistry {
    processes: BTreeMap<String, RegisteredProcess>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` under `description.identifier`.
    ///
    /// Fails if a process with that identifier is already registered.
    pub fn register<F>(&mut self, description: ProcessDescription, body: F) -> Result<(), CoreError>
    where
        F: Fn(&mut DataMap, &ProgressMonitor) -> Result<(), ProcessError> + Send + Sync + 'static,
    {
        if self.processes.contains_key(&description.identifier) {
            return Err(CoreError::Validation(format!(
                "Process '{}' is already registered",
                description.identifier
            )));
        }
        self.processes.insert(
            description.identifier.clone(),
            RegisteredProcess {
                description,
                body: Arc::new(body),
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

/// Runs processes from a [`ProcessRegistry`] on the calling thread.
pub struct LocalExecutor {
    registry: ProcessRegistry,
    /// Cancellation handles of executions currently in progress.
    running: Mutex<HashMap<JobId, CancellationToken>>,
}

impl LocalExecutor {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self {
            registry,
            running: Mutex::new(HashMap::new()),
        }
    }

    pub fn running(&self) -> usize {
        self.running.lock().len()
    }
}

impl ProcessExecutor for LocalExecutor {
    fn processes(&self) -> Vec<ProcessDescription> {
        self.registry
            .processes
            .values()
            .map(|p| p.description.clone())
            .collect()
    }

    fn describe(&self, identifier: &str) -> Option<ProcessDescription> {
        self.registry
            .processes
            .get(identifier)
            .map(|p| p.description.clone())
    }

    fn execute(
        &self,
        job_id: JobId,
        process: &ProcessDescription,
        data: &mut DataMap,
        _properties: &Properties,
        monitor: &ProgressMonitor,
    ) -> Result<(), ProcessError> {
        let body = self
            .registry
            .processes
            .get(&process.identifier)
            .map(|p| Arc::clone(&p.body))
            .ok_or_else(|| {
                ProcessError::Failed(format!(
                    "No process registered as '{}'",
                    process.identifier
                ))
            })?;

        self.running
            .lock()
            .insert(job_id, monitor.cancellation_token());
        body(data, monitor)
    }

    fn cancel(&self, job_id: JobId) {
        match self.running.lock().get(&job_id) {
            Some(token) => {
                tracing::info!(%job_id, "Cancelling local execution");
                token.cancel();
            }
            None => tracing::debug!(%job_id, "Cancel for job with no running execution"),
        }
    }

    fn on_worker_finished(&self, job_id: JobId) {
        self.running.lock().remove(&job_id);
    }
}
