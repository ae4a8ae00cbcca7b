//! External Integrations Module
//!
//! Best-effort side effects around the core operations: dataset version
//! control (an external `dvc` binary) and experiment tracking (an HTTP
//! API). Failures here are logged and swallowed, never surfaced as
//! request failures.

pub mod dvc;
pub mod tracking;

pub use dvc::DvcClient;
pub use tracking::{TrackingClient, TrainingRun};
