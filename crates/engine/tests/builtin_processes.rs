//! The shipped processes, run through the engine with a [`LocalExecutor`].

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::wait_for_terminal;
use wps_core::error::CoreError;
use wps_core::job::JobState;
use wps_core::process::DataValue;
use wps_core::version::WpsVersion;
use wps_engine::processes::builtin::{self, builtin_registry};
use wps_engine::processes::LocalExecutor;
use wps_engine::{EngineConfig, JobEngine, SubmitRequest};

fn local_engine() -> (JobEngine, Arc<LocalExecutor>) {
    let executor = Arc::new(LocalExecutor::new(builtin_registry().unwrap()));
    let engine = JobEngine::new(executor.clone(), EngineConfig::default());
    (engine, executor)
}

fn request(process: &str, inputs: &[(&str, &str)]) -> SubmitRequest {
    SubmitRequest {
        process_id: process.to_string(),
        inputs: inputs
            .iter()
            .map(|(k, v)| (k.to_string(), DataValue::literal(*v)))
            .collect::<BTreeMap<_, _>>(),
        ..SubmitRequest::default()
    }
}

#[tokio::test]
async fn capabilities_list_builtins() {
    let (engine, _) = local_engine();
    let ids: Vec<_> = engine
        .capabilities()
        .into_iter()
        .map(|p| p.identifier)
        .collect();
    assert!(ids.contains(&builtin::ECHO.to_string()));
    assert!(ids.contains(&builtin::SLEEP.to_string()));
    assert!(ids.contains(&builtin::FAIL.to_string()));

    assert_eq!(engine.describe_process(builtin::ECHO).unwrap().title, "Echo");
    assert_matches!(engine.describe_process("wps:nope"), Err(CoreError::ProcessNotFound(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn echo_round_trips_value() {
    let (engine, executor) = local_engine();
    let job_id = engine
        .submit(request(builtin::ECHO, &[("value", "hello")]))
        .unwrap()
        .job_id;

    let status = wait_for_terminal(&engine, job_id, Duration::from_secs(1)).await;
    assert_eq!(status.state, JobState::Succeeded);
    assert_eq!(
        engine.raw_output(job_id, "result").unwrap(),
        DataValue::literal("hello")
    );
    assert_matches!(engine.raw_output(job_id, "missing"), Err(CoreError::Validation(_)));
    assert_eq!(executor.running(), 0);
}

#[tokio::test]
async fn echo_without_required_input_is_rejected() {
    let (engine, _) = local_engine();
    assert_matches!(
        engine.submit(request(builtin::ECHO, &[])),
        Err(CoreError::Validation(_))
    );
    assert_eq!(engine.job_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fail_reports_message() {
    let (engine, _) = local_engine();
    let job_id = engine
        .submit(request(builtin::FAIL, &[("message", "on purpose")]))
        .unwrap()
        .job_id;

    let status = wait_for_terminal(&engine, job_id, Duration::from_secs(1)).await;
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(status.message.as_deref(), Some("on purpose"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sleep_can_be_dismissed() {
    let (engine, executor) = local_engine();
    let job_id = engine
        .submit(request(builtin::SLEEP, &[("duration_ms", "30000")]))
        .unwrap()
        .job_id;

    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.dismiss(job_id).unwrap();

    let status = wait_for_terminal(&engine, job_id, Duration::from_secs(1)).await;
    assert_eq!(status.state, JobState::Failed);
    assert_eq!(executor.running(), 0);
}

#[tokio::test]
async fn legacy_version_uses_legacy_status_names() {
    let (engine, _) = local_engine();
    let status = engine
        .submit(SubmitRequest {
            version: WpsVersion::V1_0_0,
            ..request(builtin::SLEEP, &[("duration_ms", "10")])
        })
        .unwrap();
    assert_eq!(status.status, "ProcessAccepted");

    let done = wait_for_terminal(&engine, status.job_id, Duration::from_secs(1)).await;
    assert_eq!(done.status, "ProcessSucceeded");
}
