//! The engine facade used by the protocol layer.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Instrument;
use wps_core::error::CoreError;
use wps_core::executor::ProcessExecutor;
use wps_core::job::{Job, JobState, LogEntry, Severity, StatusReport};
use wps_core::polling::PollingConfig;
use wps_core::process::{DataMap, DataValue, ProcessDescription};
use wps_core::types::{JobId, Timestamp};
use wps_core::version::WpsVersion;

use crate::cancel::CancellationRegistry;
use crate::config::EngineConfig;
use crate::expiry::ResultExpiry;
use crate::registry::JobRegistry;
use crate::worker::ProcessWorker;

/// How often [`JobEngine::wait_idle`] re-checks the in-flight count.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// An Execute request, independent of protocol flavour.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
    pub process_id: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, DataValue>,
    #[serde(default)]
    pub version: WpsVersion,
    /// Per-job polling window; the engine default applies when absent.
    #[serde(default)]
    pub polling: Option<PollingConfig>,
}

/// Outcome of a finished job, as answered to a GetResult request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub process_id: String,
    pub state: JobState,
    pub outputs: BTreeMap<String, DataValue>,
    /// Failure text, present when the job failed.
    pub error: Option<String>,
    pub expiration: Option<Timestamp>,
}

pub struct JobEngine {
    executor: Arc<dyn ProcessExecutor>,
    registry: Arc<JobRegistry>,
    cancellations: Arc<CancellationRegistry>,
    config: EngineConfig,
}

impl JobEngine {
    pub fn new(executor: Arc<dyn ProcessExecutor>, config: EngineConfig) -> Self {
        Self {
            executor,
            registry: Arc::new(JobRegistry::new()),
            cancellations: Arc::new(CancellationRegistry::new()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- process catalog ----

    /// Every process the executor can run (GetCapabilities).
    pub fn capabilities(&self) -> Vec<ProcessDescription> {
        self.executor.processes()
    }

    /// Full description of one process (DescribeProcess).
    pub fn describe_process(&self, identifier: &str) -> Result<ProcessDescription, CoreError> {
        self.executor
            .describe(identifier)
            .ok_or_else(|| CoreError::ProcessNotFound(identifier.to_string()))
    }

    // ---- job lifecycle ----

    /// Create a job for `request` and dispatch its worker.
    ///
    /// Returns immediately with the job's initial status; the process runs
    /// on the Tokio runtime this is called from.
    pub fn submit(&self, request: SubmitRequest) -> Result<StatusReport, CoreError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CoreError::Internal(format!("No async runtime to run jobs on: {e}")))?;

        let process = Arc::new(self.describe_process(&request.process_id)?);
        let data = DataMap::for_process(&process, request.inputs)?;
        let polling = request.polling.unwrap_or(self.config.polling);
        let polling = PollingConfig::new(polling.base_delay_ms, polling.max_delay_ms);

        let job = Arc::new(Job::new(
            uuid::Uuid::new_v4(),
            process,
            data,
            polling,
            request.version,
        ));
        job.add_listener(Arc::new(ResultExpiry::new(
            &self.registry,
            self.config.result_retention,
        )));
        job.set_state(JobState::Accepted);
        job.append_log(Severity::Info, "Job accepted");
        self.registry.insert(Arc::clone(&job));

        let worker = ProcessWorker::new(
            Arc::clone(&job),
            Arc::clone(&self.executor),
            Arc::clone(&self.cancellations),
        );
        let span = tracing::info_span!(
            "job",
            job_id = %job.id(),
            process = %job.process().identifier,
        );
        runtime.spawn(worker.run().instrument(span));

        tracing::info!(
            job_id = %job.id(),
            process = %job.process().identifier,
            version = %job.version(),
            "Job submitted",
        );

        Ok(job.status())
    }

    /// Current status of a job (GetStatus).
    pub fn status(&self, job_id: JobId) -> Result<StatusReport, CoreError> {
        Ok(self.find(job_id)?.status())
    }

    /// Outputs of a finished job (GetResult).
    ///
    /// Fails with [`CoreError::JobNotReady`] while the job is still running.
    pub fn result(&self, job_id: JobId) -> Result<JobResult, CoreError> {
        let job = self.find(job_id)?;
        let state = job.state();
        if !state.is_terminal() {
            return Err(CoreError::JobNotReady { job_id, state });
        }

        Ok(JobResult {
            job_id,
            process_id: job.process().identifier.clone(),
            state,
            outputs: job.outputs(),
            error: match state {
                JobState::Failed => job.last_error(),
                _ => None,
            },
            expiration: job.expires_at(),
        })
    }

    /// One output value of a finished job, for raw download.
    pub fn raw_output(&self, job_id: JobId, output_id: &str) -> Result<DataValue, CoreError> {
        let mut result = self.result(job_id)?;
        result.outputs.remove(output_id).ok_or_else(|| {
            CoreError::Validation(format!("Job {job_id} has no output named '{output_id}'"))
        })
    }

    /// Full log of a job.
    pub fn log(&self, job_id: JobId) -> Result<Vec<LogEntry>, CoreError> {
        Ok(self.find(job_id)?.log())
    }

    /// Request cancellation of a job (Dismiss).
    ///
    /// The job's state is not changed here; the worker moves it to
    /// `Failed` once the executor unwinds. Dismissing a finished job, or
    /// dismissing twice, simply returns the current status.
    pub fn dismiss(&self, job_id: JobId) -> Result<StatusReport, CoreError> {
        let job = self.find(job_id)?;
        if !job.state().is_terminal() && self.cancellations.cancel(job_id) {
            job.append_log(Severity::Warning, "Dismiss requested");
            tracing::info!(%job_id, "Job dismissed");
        }
        Ok(job.status())
    }

    /// Number of jobs held in the registry, finished or not.
    pub fn job_count(&self) -> usize {
        self.registry.len()
    }

    /// Number of jobs whose workers have not finished.
    pub fn in_flight(&self) -> usize {
        self.cancellations.in_flight()
    }

    // ---- shutdown ----

    /// Cancel every in-flight job. Returns how many were cancelled.
    pub fn shutdown(&self) -> usize {
        let cancelled = self.cancellations.cancel_all();
        tracing::info!(cancelled, "Job engine shutting down");
        cancelled
    }

    /// Wait until no workers are in flight, or `timeout` elapses.
    ///
    /// Returns `true` if the engine went idle in time.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let wait = async {
            while self.in_flight() > 0 {
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    fn find(&self, job_id: JobId) -> Result<Arc<Job>, CoreError> {
        self.registry
            .get(job_id)
            .ok_or(CoreError::JobNotFound(job_id))
    }
}
