pub mod health;
pub mod jobs;
pub mod processes;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /processes                          GetCapabilities
/// /processes/{id}                     DescribeProcess
/// /processes/{id}/execution           Execute (POST)
///
/// /jobs/{id}                          GetStatus, Dismiss (DELETE)
/// /jobs/{id}/results                  GetResult
/// /jobs/{id}/results/{output}         raw output
/// /jobs/{id}/log                      job log
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/processes", processes::router())
        .nest("/jobs", jobs::router())
}
