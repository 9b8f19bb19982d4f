//! Route definitions for the `/jobs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Routes mounted at `/jobs`.
///
/// ```text
/// GET    /{id}                    -> get_status
/// DELETE /{id}                    -> dismiss
/// GET    /{id}/results            -> get_result
/// GET    /{id}/results/{output}   -> get_output
/// GET    /{id}/log                -> get_log
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(jobs::get_status).delete(jobs::dismiss))
        .route("/{id}/results", get(jobs::get_result))
        .route("/{id}/results/{output}", get(jobs::get_output))
        .route("/{id}/log", get(jobs::get_log))
}
