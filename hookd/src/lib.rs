//! hookd - dbt Cloud run-completion webhook
//!
//! Hosts a single endpoint that authenticates dbt Cloud's completion
//! notification, filters for successful runs, guards against duplicate
//! deliveries via a time-windowed query of recent Azure Data Factory runs,
//! and triggers the configured ADF pipeline with merged parameters.

pub mod adf;
pub mod auth;
pub mod cli;
pub mod config;
pub mod event;
pub mod handler;
pub mod server;

pub use adf::{AdfClient, AdfError, PipelineService};
pub use config::{Settings, TriggerConfig};
pub use event::CompletionEvent;
pub use handler::{AppState, WebhookOutcome};
