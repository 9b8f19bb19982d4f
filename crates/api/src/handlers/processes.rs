//! Handlers for the `/processes` resource: GetCapabilities, DescribeProcess
//! and Execute.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use wps_core::polling::PollingConfig;
use wps_core::process::{DataValue, ProcessDescription};
use wps_core::version::WpsVersion;
use wps_engine::SubmitRequest;

use crate::error::AppResult;
use crate::extract::{JsonBody, PathParam};
use crate::response::DataResponse;
use crate::state::AppState;

/// Catalog entry returned by GetCapabilities.
#[derive(Debug, Serialize)]
pub struct ProcessSummary {
    pub identifier: String,
    pub title: String,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
}

impl From<ProcessDescription> for ProcessSummary {
    fn from(description: ProcessDescription) -> Self {
        Self {
            identifier: description.identifier,
            title: description.title,
            abstract_text: description.abstract_text,
        }
    }
}

/// Body of an Execute request.
#[derive(Debug, Default, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub inputs: BTreeMap<String, DataValue>,
    /// Protocol flavour used for status names (default `2.0`).
    #[serde(default)]
    pub version: WpsVersion,
    /// Per-job polling window override.
    #[serde(default)]
    pub polling: Option<PollingConfig>,
}

/// GET /api/v1/processes
pub async fn list_processes(
    State(state): State<AppState>,
) -> Json<DataResponse<Vec<ProcessSummary>>> {
    let processes = state
        .engine
        .capabilities()
        .into_iter()
        .map(ProcessSummary::from)
        .collect();
    Json(DataResponse { data: processes })
}

/// GET /api/v1/processes/{id}
pub async fn describe_process(
    State(state): State<AppState>,
    PathParam(process_id): PathParam<String>,
) -> AppResult<impl IntoResponse> {
    let description = state.engine.describe_process(&process_id)?;
    Ok(Json(DataResponse { data: description }))
}

/// POST /api/v1/processes/{id}/execution
///
/// Creates a job and returns 201 with its initial status. The process runs
/// asynchronously; poll `/jobs/{job_id}` for progress.
pub async fn execute(
    State(state): State<AppState>,
    PathParam(process_id): PathParam<String>,
    JsonBody(input): JsonBody<ExecuteRequest>,
) -> AppResult<impl IntoResponse> {
    let status = state.engine.submit(SubmitRequest {
        process_id,
        inputs: input.inputs,
        version: input.version,
        polling: input.polling,
    })?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: status })))
}
