//! Progress reporting and cancellation for a running process.
//!
//! A [`ProgressMonitor`] is handed to the executor for the duration of one
//! execution. The process publishes its completion fraction and current
//! task through it, and polls [`ProgressMonitor::is_cancelled`] to learn
//! that a dismiss was requested. The worker that owns the monitor receives
//! progress through a [`ProgressSink`] and cancellation through
//! [`ProgressMonitor::cancelled`].

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Receives progress percentages (0..=100) as they change.
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, Default)]
struct MonitorState {
    fraction: f32,
    task: String,
    step_count: Option<u32>,
    steps_done: u32,
    /// Fraction reached when the current step count was declared.
    step_base: f32,
}

pub struct ProgressMonitor {
    state: Mutex<MonitorState>,
    cancel: CancellationToken,
    sink: Option<ProgressSink>,
}

impl ProgressMonitor {
    /// Create a monitor whose initial task name is `task`.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MonitorState {
                task: task.into(),
                ..MonitorState::default()
            }),
            cancel: CancellationToken::new(),
            sink: None,
        }
    }

    /// Forward every progress change to `sink`.
    pub fn with_sink(mut self, sink: ProgressSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Current completion fraction in `[0.0, 1.0]`.
    pub fn progress(&self) -> f32 {
        self.state.lock().fraction
    }

    /// Current completion as a whole percentage.
    pub fn percent(&self) -> u8 {
        fraction_to_percent(self.progress())
    }

    /// Report the completion fraction.
    ///
    /// Values are clamped to `[0.0, 1.0]` and never move progress backwards;
    /// a smaller value than the current one is ignored.
    pub fn set_progress(&self, fraction: f32) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let changed = {
            let mut state = self.state.lock();
            if fraction > state.fraction {
                state.fraction = fraction;
                true
            } else {
                false
            }
        };
        if changed {
            self.publish(fraction);
        }
    }

    pub fn task(&self) -> String {
        self.state.lock().task.clone()
    }

    pub fn set_task(&self, task: impl Into<String>) {
        self.state.lock().task = task.into();
    }

    /// Declare how many steps the remaining work is divided into.
    ///
    /// Resets the step counter. Each [`step_done`](Self::step_done) call
    /// then advances progress by an equal share of what is left between
    /// the current fraction and completion.
    pub fn set_step_count(&self, count: u32) {
        let mut state = self.state.lock();
        state.step_count = (count > 0).then_some(count);
        state.steps_done = 0;
        state.step_base = state.fraction;
    }

    /// Mark one step finished and advance progress accordingly.
    pub fn step_done(&self) {
        let fraction = {
            let mut state = self.state.lock();
            let Some(count) = state.step_count else {
                return;
            };
            state.steps_done = (state.steps_done + 1).min(count);
            let share = state.steps_done as f32 / count as f32;
            state.step_base + (1.0 - state.step_base) * share
        };
        self.set_progress(fraction);
    }

    /// Force progress to 100%.
    pub fn complete(&self) {
        let changed = {
            let mut state = self.state.lock();
            let changed = state.fraction < 1.0;
            state.fraction = 1.0;
            changed
        };
        if changed {
            self.publish(1.0);
        }
    }

    /// Request cancellation. One-way; never resets.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// A clone of the underlying token, for callers that need to await
    /// cancellation without borrowing the monitor.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn publish(&self, fraction: f32) {
        if let Some(sink) = &self.sink {
            sink(fraction_to_percent(fraction));
        }
    }
}

impl std::fmt::Debug for ProgressMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressMonitor")
            .field("state", &*self.state.lock())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

fn fraction_to_percent(fraction: f32) -> u8 {
    (fraction.clamp(0.0, 1.0) * 100.0).floor() as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
