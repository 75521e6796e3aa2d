//! The run-completion webhook handler
//!
//! A straight line with terminal early exits: authenticate, filter by run
//! status, load configuration, guard against a duplicate trigger, then
//! create the pipeline run. The guard is best effort; dbt Cloud redelivers
//! the event when the handler responds slowly, and two near-simultaneous
//! deliveries can still race past the check.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::adf::{AdfError, PipelineService, RunWindow};
use crate::auth;
use crate::config::{AUTH_TOKEN_ENV, ConfigError, Settings, TriggerConfig};
use crate::event::CompletionPayload;

/// How far back the duplicate guard looks. Generous relative to dbt
/// Cloud's redelivery timeout so a slow cold start is still covered.
pub const DUPLICATE_WINDOW_MINUTES: i64 = 15;

/// Parameter key the annotation tag is merged under
pub const ANNOTATIONS_PARAMETER: &str = "annotations";

/// Shared handler state. The service client lives for the process; the
/// trigger config is re-read per invocation.
pub struct AppState {
    pub service: Arc<dyn PipelineService>,
    pub config_path: PathBuf,
}

/// Terminal outcome of one webhook invocation. The quiet paths are
/// reported with 200 so the upstream notifier does not retry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    Unauthenticated,
    Ignored { run_status: String },
    Duplicate { annotations: String },
    Triggered { run_id: String },
}

/// Failures that surface to the caller as handler-level errors
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("pipeline service call failed: {0}")]
    Pipeline(#[from] AdfError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::Payload(_) => StatusCode::BAD_REQUEST,
            WebhookError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError::Pipeline(_) => StatusCode::BAD_GATEWAY,
        };
        warn!(error = %self, "webhook invocation failed");
        (status, self.to_string()).into_response()
    }
}

/// Process one completion event end to end.
///
/// Pure over its inputs apart from environment reads, so tests drive it
/// directly with a stub [`PipelineService`].
pub async fn process_event(
    state: &AppState,
    auth_header: Option<&str>,
    body: &[u8],
) -> Result<WebhookOutcome, WebhookError> {
    let secret = std::env::var(AUTH_TOKEN_ENV).ok();
    if !auth::is_authentic(secret.as_deref(), auth_header, body) {
        warn!("dbt webhook not authenticated");
        return Ok(WebhookOutcome::Unauthenticated);
    }

    let payload: CompletionPayload = serde_json::from_slice(body)?;
    let event = payload.data;
    info!(run_id = %event.run_id, job_id = %event.job_id, run_status = %event.run_status, "dbt run completed");

    if !event.is_success() {
        warn!(run_status = %event.run_status, "dbt run not successful, nothing to trigger");
        return Ok(WebhookOutcome::Ignored {
            run_status: event.run_status,
        });
    }

    let config = TriggerConfig::load(&state.config_path)?;
    let settings = Settings::from_env()?;

    let tag = event.annotation_tag();
    let mut parameters = config.pipeline_parameters.clone();
    parameters.insert(ANNOTATIONS_PARAMETER.to_string(), tag.clone());

    let window = RunWindow::trailing(DUPLICATE_WINDOW_MINUTES);
    let runs = state
        .service
        .query_active_runs(&settings, &config.pipeline_name, &window)
        .await?;

    if runs.iter().any(|run| run.annotated_exactly(&tag)) {
        warn!(annotations = %tag, "pipeline already running for this dbt run, not triggering again");
        return Ok(WebhookOutcome::Duplicate { annotations: tag });
    }

    let run_id = state
        .service
        .create_run(&settings, &config.pipeline_name, &parameters)
        .await?;
    info!(%run_id, pipeline = %config.pipeline_name, "pipeline run triggered");

    Ok(WebhookOutcome::Triggered { run_id })
}

/// Axum handler for `POST /webhooks/dbt/run-completed`
pub async fn run_completed(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookOutcome>, WebhookError> {
    let auth_header = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let outcome = process_event(&state, auth_header, &body).await?;
    Ok(Json(outcome))
}
