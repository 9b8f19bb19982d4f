//! Concurrent job engine for the WPS server.
//!
//! [`JobEngine`] is the entry point used by the protocol layer: it creates
//! jobs, dispatches a [`ProcessWorker`] per job onto the Tokio runtime,
//! answers status and result queries from the shared [`JobRegistry`], and
//! relays dismiss requests through the [`CancellationRegistry`].

pub mod cancel;
pub mod config;
pub mod engine;
pub mod expiry;
pub mod processes;
pub mod registry;
pub mod worker;

pub use cancel::CancellationRegistry;
pub use config::EngineConfig;
pub use engine::{JobEngine, JobResult, SubmitRequest};
pub use registry::JobRegistry;
pub use worker::ProcessWorker;
