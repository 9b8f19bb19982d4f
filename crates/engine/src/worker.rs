//! Asynchronous driver for a single job execution.
//!
//! A [`ProcessWorker`] owns one execution attempt. [`ProcessWorker::run`]
//! is spawned onto the runtime by the engine; it moves the job to
//! `Running`, calls the executor on a blocking thread, and records the
//! outcome. Nothing escapes `run`: executor errors and panics both end
//! as a `Failed` job.

use std::any::Any;
use std::sync::Arc;

use wps_core::executor::{ProcessExecutor, ProcessError, Properties};
use wps_core::job::{Job, JobState, Severity};
use wps_core::progress::ProgressMonitor;
use wps_core::types::JobId;
use wps_core::version::{PROPERTY_JOB_ID, PROPERTY_WPS_VERSION};

use crate::cancel::CancellationRegistry;

/// Log message recorded when a dismiss beats the worker to the start line.
const DISMISSED_BEFORE_START: &str = "Job was dismissed before execution started";

pub struct ProcessWorker {
    job: Arc<Job>,
    executor: Arc<dyn ProcessExecutor>,
    monitor: Arc<ProgressMonitor>,
    properties: Properties,
    cancellations: Arc<CancellationRegistry>,
}

impl ProcessWorker {
    /// Prepare a worker for `job`.
    ///
    /// The progress monitor is created here, named after the process title,
    /// and registered in `cancellations` straight away so a dismiss that
    /// arrives before the worker is scheduled is not lost.
    pub fn new(
        job: Arc<Job>,
        executor: Arc<dyn ProcessExecutor>,
        cancellations: Arc<CancellationRegistry>,
    ) -> Self {
        let sink_job = Arc::clone(&job);
        let monitor = Arc::new(
            ProgressMonitor::new(job.process().title.clone())
                .with_sink(Arc::new(move |percent| sink_job.set_progress(percent))),
        );
        cancellations.register(job.id(), Arc::clone(&monitor));

        let properties = Properties::from([
            (PROPERTY_JOB_ID.to_string(), job.id().to_string()),
            (
                PROPERTY_WPS_VERSION.to_string(),
                job.version().as_str().to_string(),
            ),
        ]);

        Self {
            job,
            executor,
            monitor,
            properties,
            cancellations,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job.id()
    }

    /// Drive the job to a terminal state.
    pub async fn run(self) {
        let job_id = self.job.id();
        let process_id = self.job.process().identifier.clone();

        if self.job.state().is_terminal() {
            tracing::warn!(
                %job_id,
                state = %self.job.state(),
                "Worker started for finished job, ignoring",
            );
            self.cancellations.remove(job_id);
            return;
        }

        if self.monitor.is_cancelled() {
            tracing::info!(%job_id, process = %process_id, "Job dismissed before start");
            self.job.fail(DISMISSED_BEFORE_START);
            self.finish();
            return;
        }

        self.job.set_state(JobState::Running);
        self.job
            .append_log(Severity::Info, format!("Process '{process_id}' started"));
        tracing::info!(%job_id, process = %process_id, "Process started");

        // Relay a dismiss to the executor while it runs.
        let forward = {
            let token = self.monitor.cancellation_token();
            let executor = Arc::clone(&self.executor);
            tokio::spawn(async move {
                token.cancelled().await;
                tracing::info!(%job_id, "Forwarding cancellation to executor");
                executor.cancel(job_id);
            })
        };

        let outcome = {
            let executor = Arc::clone(&self.executor);
            let process = Arc::clone(self.job.process());
            let monitor = Arc::clone(&self.monitor);
            let properties = self.properties.clone();
            let mut data = self.job.data();
            tokio::task::spawn_blocking(move || {
                let result = executor.execute(job_id, &process, &mut data, &properties, &monitor);
                (result, data)
            })
            .await
        };
        forward.abort();

        match outcome {
            Ok((Ok(()), data)) if !self.monitor.is_cancelled() => {
                self.job.complete(data, format!("Process '{process_id}' completed"));
                self.monitor.complete();
                tracing::info!(%job_id, process = %process_id, "Process succeeded");
            }
            Ok((Ok(()), _)) => {
                self.record_failure(&process_id, &ProcessError::Cancelled.to_string());
            }
            Ok((Err(err), _)) => {
                self.record_failure(&process_id, &err.to_string());
            }
            Err(join_err) if join_err.is_panic() => {
                let message = format!(
                    "Process panicked: {}",
                    panic_message(join_err.into_panic().as_ref())
                );
                self.record_failure(&process_id, &message);
            }
            Err(join_err) => {
                self.record_failure(&process_id, &format!("Worker was aborted: {join_err}"));
            }
        }

        self.finish();
    }

    fn record_failure(&self, process_id: &str, message: &str) {
        tracing::warn!(
            job_id = %self.job.id(),
            process = %process_id,
            error = %message,
            "Process failed",
        );
        self.job.fail(message);
    }

    /// Release the cancellation handle and tell the executor we are done.
    fn finish(&self) {
        let job_id = self.job.id();
        self.cancellations.remove(job_id);
        self.executor.on_worker_finished(job_id);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
