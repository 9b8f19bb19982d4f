//! Handlers for the `/jobs` resource: GetStatus, GetResult, Dismiss and the
//! job log.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::PathParam;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/jobs/{id}
pub async fn get_status(
    State(state): State<AppState>,
    PathParam(job_id): PathParam<Uuid>,
) -> AppResult<impl IntoResponse> {
    let status = state.engine.status(job_id)?;
    Ok(Json(DataResponse { data: status }))
}

/// GET /api/v1/jobs/{id}/results
///
/// Answers 409 `JOB_NOT_READY` until the job has finished.
pub async fn get_result(
    State(state): State<AppState>,
    PathParam(job_id): PathParam<Uuid>,
) -> AppResult<impl IntoResponse> {
    let result = state.engine.result(job_id)?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/jobs/{id}/results/{output}
pub async fn get_output(
    State(state): State<AppState>,
    PathParam((job_id, output)): PathParam<(Uuid, String)>,
) -> AppResult<impl IntoResponse> {
    let value = state.engine.raw_output(job_id, &output)?;
    Ok(Json(DataResponse { data: value }))
}

/// GET /api/v1/jobs/{id}/log
pub async fn get_log(
    State(state): State<AppState>,
    PathParam(job_id): PathParam<Uuid>,
) -> AppResult<impl IntoResponse> {
    let log = state.engine.log(job_id)?;
    Ok(Json(DataResponse { data: log }))
}

/// DELETE /api/v1/jobs/{id}
///
/// Requests cancellation and returns the job's status at that moment. The
/// job reaches `failed` once its process has unwound.
pub async fn dismiss(
    State(state): State<AppState>,
    PathParam(job_id): PathParam<Uuid>,
) -> AppResult<impl IntoResponse> {
    let status = state.engine.dismiss(job_id)?;
    tracing::info!(%job_id, state = %status.state, "Dismiss handled");
    Ok(Json(DataResponse { data: status }))
}
