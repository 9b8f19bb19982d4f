use std::sync::Arc;

use wps_engine::JobEngine;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The job engine serving every WPS operation.
    pub engine: Arc<JobEngine>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
