//! Built-in processes shipped with the server.

use std::time::Duration;

use wps_core::error::CoreError;
use wps_core::executor::ProcessError;
use wps_core::process::{DataMap, DataValue, ParameterDescription, ProcessDescription};
use wps_core::progress::ProgressMonitor;

use super::ProcessRegistry;

pub const ECHO: &str = "wps:echo";
pub const SLEEP: &str = "wps:sleep";
pub const FAIL: &str = "wps:fail";

const DEFAULT_SLEEP_MS: u64 = 1_000;
/// Granularity, in milliseconds, at which `wps:sleep` checks for cancellation.
const SLEEP_SLICE_MS: u64 = 10;

/// Register every built-in process into `registry`.
pub fn register_builtins(registry: &mut ProcessRegistry) -> Result<(), CoreError> {
    registry.register(echo_description(), echo)?;
    registry.register(sleep_description(), sleep)?;
    registry.register(fail_description(), fail)?;
    Ok(())
}

/// A registry holding only the built-in processes.
pub fn builtin_registry() -> Result<ProcessRegistry, CoreError> {
    let mut registry = ProcessRegistry::new();
    register_builtins(&mut registry)?;
    Ok(registry)
}

// ---------------------------------------------------------------------------
// wps:echo
// ---------------------------------------------------------------------------

pub fn echo_description() -> ProcessDescription {
    ProcessDescription::new(ECHO, "Echo")
        .with_abstract("Returns the literal input unchanged.")
        .with_input(ParameterDescription::literal("value", "Value"))
        .with_output(ParameterDescription::literal("result", "Result"))
}

fn echo(data: &mut DataMap, _monitor: &ProgressMonitor) -> Result<(), ProcessError> {
    let value = data
        .get("value")
        .cloned()
        .ok_or_else(|| ProcessError::MissingInput("value".into()))?;
    data.set("result", value);
    Ok(())
}

// ---------------------------------------------------------------------------
// wps:sleep
// ---------------------------------------------------------------------------

pub fn sleep_description() -> ProcessDescription {
    ProcessDescription::new(SLEEP, "Sleep")
        .with_abstract(
            "Waits for the requested time, reporting progress; stops early when dismissed.",
        )
        .with_input(
            ParameterDescription::literal("duration_ms", "Duration in milliseconds").optional(),
        )
        .with_output(ParameterDescription::literal("slept_ms", "Milliseconds slept"))
}

fn sleep(data: &mut DataMap, monitor: &ProgressMonitor) -> Result<(), ProcessError> {
    let total_ms = match data.literal("duration_ms") {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| ProcessError::InvalidInput {
                input: "duration_ms".into(),
                reason: e.to_string(),
            })?,
        None => DEFAULT_SLEEP_MS,
    };

    let slice_ms = SLEEP_SLICE_MS;
    let steps = total_ms.div_ceil(slice_ms).max(1);
    monitor.set_step_count(u32::try_from(steps).unwrap_or(u32::MAX));
    monitor.set_task("sleeping");

    let mut slept_ms = 0;
    while slept_ms < total_ms {
        if monitor.is_cancelled() {
            return Err(ProcessError::Cancelled);
        }
        let chunk = slice_ms.min(total_ms - slept_ms);
        std::thread::sleep(Duration::from_millis(chunk));
        slept_ms += chunk;
        monitor.step_done();
    }

    data.set("slept_ms", DataValue::literal(slept_ms.to_string()));
    Ok(())
}

// ---------------------------------------------------------------------------
// wps:fail
// ---------------------------------------------------------------------------

pub fn fail_description() -> ProcessDescription {
    ProcessDescription::new(FAIL, "Fail")
        .with_abstract("Always fails with the given message.")
        .with_input(ParameterDescription::literal("message", "Failure message").optional())
}

fn fail(data: &mut DataMap, _monitor: &ProgressMonitor) -> Result<(), ProcessError> {
    let message = data.literal("message").unwrap_or("Requested failure");
    Err(ProcessError::Failed(message.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
