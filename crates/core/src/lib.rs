//! Domain types and pure logic for the WPS job engine.
//!
//! Nothing in this crate spawns tasks or touches the network. The engine
//! crate wires these pieces into a concurrent service.

pub mod duration;
pub mod error;
pub mod executor;
pub mod job;
pub mod polling;
pub mod process;
pub mod progress;
pub mod types;
pub mod version;
