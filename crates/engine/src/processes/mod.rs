//! In-process executor backed by an explicit registry of named process
//! functions.
//!
//! [`ProcessRegistry`] maps identifiers to a description plus a plain
//! function over the data map; [`LocalExecutor`] implements the engine's
//! executor contract on top of it. [`builtin`] provides a few processes
//! useful for smoke-testing a deployment.

pub mod builtin;
pub mod local;

pub use local::{LocalExecutor, ProcessFn, ProcessRegistry};
