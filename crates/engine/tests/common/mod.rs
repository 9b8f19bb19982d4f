#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use wps_core::executor::{ProcessError, ProcessExecutor, Properties};
use wps_core::job::StatusReport;
use wps_core::process::{DataMap, ParameterDescription, ProcessDescription};
use wps_core::progress::ProgressMonitor;
use wps_core::types::JobId;
use wps_engine::{EngineConfig, JobEngine};

pub const STUB_PROCESS: &str = "test:stub";

type StubBody =
    dyn Fn(&mut DataMap, &ProgressMonitor, &AtomicBool) -> Result<(), ProcessError> + Send + Sync;

/// Executor running a single closure, recording how the engine drove it.
pub struct StubExecutor {
    body: Box<StubBody>,
    /// Set by `cancel`; the closure may poll it.
    pub cancel_flag: AtomicBool,
    pub started: AtomicBool,
    pub executions: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub finished: Mutex<Vec<JobId>>,
}

impl StubExecutor {
    pub fn new<F>(body: F) -> Arc<Self>
    where
        F: Fn(&mut DataMap, &ProgressMonitor, &AtomicBool) -> Result<(), ProcessError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            body: Box::new(body),
            cancel_flag: AtomicBool::new(false),
            started: AtomicBool::new(false),
            executions: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            finished: Mutex::new(Vec::new()),
        })
    }

    pub fn finished_count(&self, job_id: JobId) -> usize {
        self.finished.lock().iter().filter(|id| **id == job_id).count()
    }
}

pub fn stub_description() -> ProcessDescription {
    ProcessDescription::new(STUB_PROCESS, "Stub")
        .with_input(ParameterDescription::literal("in", "Input").optional())
        .with_output(ParameterDescription::literal("out", "Output"))
}

impl ProcessExecutor for StubExecutor {
    fn processes(&self) -> Vec<ProcessDescription> {
        vec![stub_description()]
    }

    fn execute(
        &self,
        _job_id: JobId,
        _process: &ProcessDescription,
        data: &mut DataMap,
        _properties: &Properties,
        monitor: &ProgressMonitor,
    ) -> Result<(), ProcessError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
        (self.body)(data, monitor, &self.cancel_flag)
    }

    fn cancel(&self, _job_id: JobId) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    fn on_worker_finished(&self, job_id: JobId) {
        self.finished.lock().push(job_id);
    }
}

pub fn engine_with(executor: Arc<dyn ProcessExecutor>) -> JobEngine {
    JobEngine::new(executor, EngineConfig::default())
}

/// Poll until the job is terminal, panicking after `timeout`.
pub async fn wait_for_terminal(
    engine: &JobEngine,
    job_id: JobId,
    timeout: Duration,
) -> StatusReport {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let status = engine.status(job_id).expect("job should exist");
        if status.state.is_terminal() {
            return status;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {job_id} still {} after {timeout:?}",
            status.state
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Poll until `flag` is set, panicking after `timeout`.
pub async fn wait_for_flag(flag: &AtomicBool, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !flag.load(Ordering::SeqCst) {
        assert!(tokio::time::Instant::now() < deadline, "flag not set after {timeout:?}");
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
