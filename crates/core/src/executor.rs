//! The contract between the job engine and whatever actually runs a process.
//!
//! The engine treats the executor as a black box: it is handed a data map
//! holding the inputs, runs the named process to completion on the calling
//! (blocking) thread, writes outputs back into the map, and honours
//! cancellation requests on a best-effort basis.

use std::collections::BTreeMap;

use crate::process::{DataMap, ProcessDescription};
use crate::progress::ProgressMonitor;
use crate::types::JobId;

/// Free-form key/value settings passed alongside each execution.
pub type Properties = BTreeMap<String, String>;

/// Errors a process execution can end with.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("{0}")]
    Failed(String),

    #[error("Process was cancelled")]
    Cancelled,

    #[error("Missing input '{0}'")]
    MissingInput(String),

    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },
}

/// Runs registered processes on behalf of the job engine.
pub trait ProcessExecutor: Send + Sync {
    /// Descriptions of every process this executor can run.
    fn processes(&self) -> Vec<ProcessDescription>;

    /// Description of a single process, if registered.
    fn describe(&self, identifier: &str) -> Option<ProcessDescription> {
        self.processes()
            .into_iter()
            .find(|p| p.identifier == identifier)
    }

    /// Run `process` to completion, writing outputs into `data`.
    ///
    /// Called from a blocking worker thread; may block for the whole
    /// duration of the process.
    fn execute(
        &self,
        job_id: JobId,
        process: &ProcessDescription,
        data: &mut DataMap,
        properties: &Properties,
        monitor: &ProgressMonitor,
    ) -> Result<(), ProcessError>;

    /// Ask the execution for `job_id` to stop. Best effort.
    fn cancel(&self, job_id: JobId);

    /// The worker for `job_id` has finished; release per-job resources.
    fn on_worker_finished(&self, job_id: JobId);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
