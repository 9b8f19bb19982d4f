//! The job entity: one tracked execution of a process.
//!
//! A [`Job`] is a passive state holder shared between the worker that
//! drives it and the request handlers that read it. Mutable fields live
//! behind one lock so readers always see a consistent snapshot; listeners
//! are notified synchronously on the mutating thread after the lock has
//! been released.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::polling::{estimated_total_ms, next_poll_delay_ms, PollingConfig};
use crate::process::{DataMap, DataValue, ProcessDescription};
use crate::types::{JobId, Timestamp};
use crate::version::WpsVersion;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state of a job.
///
/// ```text
/// Idle/Accepted -> Running -> Succeeded
///                          \-> Failed
/// any non-terminal --dismiss--> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Accepted,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Status name in the vocabulary of the given protocol flavour.
    pub fn status_name(self, version: WpsVersion) -> &'static str {
        match (version, self) {
            (WpsVersion::V1_0_0, Self::Idle | Self::Accepted) => "ProcessAccepted",
            (WpsVersion::V1_0_0, Self::Running) => "ProcessStarted",
            (WpsVersion::V1_0_0, Self::Succeeded) => "ProcessSucceeded",
            (WpsVersion::V1_0_0, Self::Failed) => "ProcessFailed",
            (WpsVersion::V2_0, Self::Idle | Self::Accepted) => "Accepted",
            (WpsVersion::V2_0, Self::Running) => "Running",
            (WpsVersion::V2_0, Self::Succeeded) => "Succeeded",
            (WpsVersion::V2_0, Self::Failed) => "Failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Accepted => "accepted",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
    pub timestamp: Timestamp,
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A change published by a [`Job`].
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    StateChanged { from: JobState, to: JobState },
    Progress(u8),
    Log(LogEntry),
}

/// Observer notified synchronously, on the mutating thread, of every
/// [`JobEvent`].
pub trait JobListener: Send + Sync {
    fn on_event(&self, job: &Job, event: &JobEvent);
}

impl<F> JobListener for F
where
    F: Fn(&Job, &JobEvent) + Send + Sync,
{
    fn on_event(&self, job: &Job, event: &JobEvent) {
        self(job, event)
    }
}

/// Handle returned by [`Job::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// ---------------------------------------------------------------------------
// Status report
// ---------------------------------------------------------------------------

/// Point-in-time view of a job, as answered to a GetStatus request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub job_id: JobId,
    pub process_id: String,
    pub version: WpsVersion,
    pub state: JobState,
    /// State name in the job's protocol vocabulary.
    pub status: &'static str,
    pub progress: u8,
    pub next_poll_delay_ms: u64,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
    pub estimated_completion: Option<Timestamp>,
    pub expiration: Option<Timestamp>,
    /// Last error message, present once the job has failed.
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct JobInner {
    state: JobState,
    progress: u8,
    data: DataMap,
    log: Vec<LogEntry>,
    started_at: Option<Timestamp>,
    finished_at: Option<Timestamp>,
    expires_at: Option<Timestamp>,
}

pub struct Job {
    id: JobId,
    process: Arc<ProcessDescription>,
    version: WpsVersion,
    polling: PollingConfig,
    created_at: Timestamp,
    inner: RwLock<JobInner>,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn JobListener>)>>,
    next_listener: AtomicU64,
}

impl Job {
    /// Create a job in the `Idle` state with zero progress.
    pub fn new(
        id: JobId,
        process: Arc<ProcessDescription>,
        data: DataMap,
        polling: PollingConfig,
        version: WpsVersion,
    ) -> Self {
        Self {
            id,
            process,
            version,
            polling,
            created_at: Utc::now(),
            inner: RwLock::new(JobInner {
                state: JobState::Idle,
                progress: 0,
                data,
                log: Vec::new(),
                started_at: None,
                finished_at: None,
                expires_at: None,
            }),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn process(&self) -> &Arc<ProcessDescription> {
        &self.process
    }

    pub fn version(&self) -> WpsVersion {
        self.version
    }

    pub fn polling(&self) -> PollingConfig {
        self.polling
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn state(&self) -> JobState {
        self.inner.read().state
    }

    pub fn progress(&self) -> u8 {
        self.inner.read().progress
    }

    pub fn data(&self) -> DataMap {
        self.inner.read().data.clone()
    }

    pub fn log(&self) -> Vec<LogEntry> {
        self.inner.read().log.clone()
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.inner.read().expires_at
    }

    /// Produced values for the process's declared outputs.
    pub fn outputs(&self) -> BTreeMap<String, DataValue> {
        self.inner.read().data.outputs_of(&self.process)
    }

    /// Most recent error-severity log message.
    pub fn last_error(&self) -> Option<String> {
        last_error(&self.inner.read().log)
    }

    // ---- mutation ----

    /// Move to `new_state`.
    ///
    /// Returns `false` without notifying anyone if the job is already
    /// terminal or already in `new_state`.
    pub fn set_state(&self, new_state: JobState) -> bool {
        let from = {
            let mut inner = self.inner.write();
            match transition(&mut inner, new_state) {
                Some(from) => from,
                None => {
                    tracing::debug!(
                        job_id = %self.id,
                        state = %inner.state,
                        requested = %new_state,
                        "Ignoring state transition",
                    );
                    return false;
                }
            }
        };
        self.notify(&JobEvent::StateChanged {
            from,
            to: new_state,
        });
        true
    }

    /// Record progress. Ignored unless running; never decreases.
    pub fn set_progress(&self, percent: u8) {
        let percent = percent.min(100);
        {
            let mut inner = self.inner.write();
            if inner.state != JobState::Running || percent <= inner.progress {
                return;
            }
            inner.progress = percent;
        }
        self.notify(&JobEvent::Progress(percent));
    }

    pub fn append_log(&self, severity: Severity, message: impl Into<String>) {
        let entry = LogEntry {
            severity,
            message: message.into(),
            timestamp: Utc::now(),
        };
        self.inner.write().log.push(entry.clone());
        self.notify(&JobEvent::Log(entry));
    }

    /// Store the executor's data map and move to `Succeeded` in one step,
    /// so no reader sees the terminal state without its outputs.
    ///
    /// Returns `false` if the job was already terminal; the data is then
    /// discarded.
    pub fn complete(&self, data: DataMap, message: impl Into<String>) -> bool {
        let entry = LogEntry {
            severity: Severity::Info,
            message: message.into(),
            timestamp: Utc::now(),
        };
        let (from, progressed) = {
            let mut inner = self.inner.write();
            if inner.state.is_terminal() {
                return false;
            }
            inner.data = data;
            inner.log.push(entry.clone());
            let progressed = inner.progress < 100;
            inner.progress = 100;
            let Some(from) = transition(&mut inner, JobState::Succeeded) else {
                return false;
            };
            (from, progressed)
        };
        self.notify(&JobEvent::Log(entry));
        if progressed {
            self.notify(&JobEvent::Progress(100));
        }
        self.notify(&JobEvent::StateChanged {
            from,
            to: JobState::Succeeded,
        });
        true
    }

    /// Move to `Failed` and record `message` as an error, in one step.
    ///
    /// Returns `false` if the job was already terminal.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        let entry = LogEntry {
            severity: Severity::Error,
            message: message.into(),
            timestamp: Utc::now(),
        };
        let from = {
            let mut inner = self.inner.write();
            let Some(from) = transition(&mut inner, JobState::Failed) else {
                return false;
            };
            inner.log.push(entry.clone());
            from
        };
        self.notify(&JobEvent::StateChanged {
            from,
            to: JobState::Failed,
        });
        self.notify(&JobEvent::Log(entry));
        true
    }

    pub fn set_expiration(&self, at: Timestamp) {
        self.inner.write().expires_at = Some(at);
    }

    // ---- listeners ----

    pub fn add_listener(&self, listener: Arc<dyn JobListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    fn notify(&self, event: &JobEvent) {
        // Snapshot so listeners may add/remove listeners without deadlocking.
        let listeners: Vec<Arc<dyn JobListener>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener.on_event(self, event);
        }
    }

    // ---- derived ----

    /// Recommended delay before the client polls again, as of now.
    pub fn process_polling_time(&self) -> u64 {
        self.polling_time_at(Utc::now())
    }

    pub fn polling_time_at(&self, now: Timestamp) -> u64 {
        let progress = {
            let inner = self.inner.read();
            reported_progress(&inner)
        };
        next_poll_delay_ms(self.elapsed_ms(now), progress, self.polling)
    }

    pub fn status(&self) -> StatusReport {
        self.status_at(Utc::now())
    }

    pub fn status_at(&self, now: Timestamp) -> StatusReport {
        let inner = self.inner.read();
        let progress = reported_progress(&inner);
        let elapsed_ms = self.elapsed_ms(now);

        let estimated_completion = match inner.state {
            JobState::Running => estimated_total_ms(elapsed_ms, progress)
                .and_then(|ms| i64::try_from(ms).ok())
                .map(|ms| self.created_at + chrono::Duration::milliseconds(ms)),
            _ => None,
        };

        StatusReport {
            job_id: self.id,
            process_id: self.process.identifier.clone(),
            version: self.version,
            state: inner.state,
            status: inner.state.status_name(self.version),
            progress,
            next_poll_delay_ms: next_poll_delay_ms(elapsed_ms, progress, self.polling),
            created_at: self.created_at,
            started_at: inner.started_at,
            finished_at: inner.finished_at,
            estimated_completion,
            expiration: inner.expires_at,
            message: match inner.state {
                JobState::Failed => last_error(&inner.log),
                _ => None,
            },
        }
    }

    fn elapsed_ms(&self, now: Timestamp) -> u64 {
        u64::try_from((now - self.created_at).num_milliseconds()).unwrap_or(0)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("process", &self.process.identifier)
            .field("version", &self.version)
            .field("inner", &*self.inner.read())
            .finish()
    }
}

/// Apply a state change, stamping timestamps. Returns the previous state,
/// or `None` if nothing changed.
fn transition(inner: &mut JobInner, to: JobState) -> Option<JobState> {
    let from = inner.state;
    if from.is_terminal() || from == to {
        return None;
    }
    inner.state = to;
    let now = Utc::now();
    if to == JobState::Running && inner.started_at.is_none() {
        inner.started_at = Some(now);
    }
    if to.is_terminal() {
        inner.finished_at = Some(now);
    }
    Some(from)
}

/// Progress is only meaningful while running or once succeeded.
fn reported_progress(inner: &JobInner) -> u8 {
    match inner.state {
        JobState::Running | JobState::Succeeded => inner.progress,
        _ => 0,
    }
}

fn last_error(log: &[LogEntry]) -> Option<String> {
    log.iter()
        .rev()
        .find(|e| e.severity == Severity::Error)
        .map(|e| e.message.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
