//! Modelyard Dashboard Module
//!
//! A terminal dashboard over the REST API: browse datasets and trained
//! models, probe service health, and delete entries.

pub mod app;
pub mod client;
pub mod ui;

pub use app::{run_dashboard, DashboardApp};
pub use client::{ApiClient, ApiError, DatasetSummary, ModelSummary, TrainParams};
