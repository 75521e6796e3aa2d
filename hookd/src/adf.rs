//! Azure Data Factory management API client
//!
//! The webhook needs exactly two operations: list recent runs of a
//! pipeline (for the duplicate-trigger guard) and create a new run. They
//! sit behind the [`PipelineService`] trait so the handler can be tested
//! against a stub. Calls are not retried; a failed trigger is the
//! terminal outcome of the invocation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{MGMT_TOKEN_ENV, Settings};

/// ADF management REST API version used for both calls
pub const API_VERSION: &str = "2018-06-01";

/// Run statuses that count as "already in flight" for the duplicate guard
pub const ACTIVE_STATUSES: [&str; 2] = ["Queued", "InProgress"];

const MANAGEMENT_BASE_URL: &str = "https://management.azure.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the ADF management API
#[derive(Debug, Error)]
pub enum AdfError {
    #[error("ADF API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("environment variable {0} is not set")]
    MissingToken(&'static str),
}

/// Trailing time window for the duplicate-run query
#[derive(Debug, Clone)]
pub struct RunWindow {
    pub after: DateTime<Utc>,
    pub before: DateTime<Utc>,
}

impl RunWindow {
    /// Window ending now and reaching `minutes` into the past
    pub fn trailing(minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            after: now - chrono::Duration::minutes(minutes),
            before: now,
        }
    }
}

/// One pipeline run as reported by the query endpoint. Annotations arrive
/// as a list of strings alongside the documented run fields.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineRun {
    #[serde(rename = "runId")]
    pub run_id: String,

    pub status: Option<String>,

    #[serde(default)]
    pub annotations: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PipelineRun {
    /// The guard matches only a single-element annotation list equal to the
    /// tag; a run annotated with anything else was not triggered by us.
    pub fn annotated_exactly(&self, tag: &str) -> bool {
        self.annotations.len() == 1 && self.annotations[0].as_str() == Some(tag)
    }
}

/// The two ADF operations the webhook performs
#[async_trait]
pub trait PipelineService: Send + Sync {
    /// Runs of `pipeline` with status in [`ACTIVE_STATUSES`] last updated
    /// inside `window`.
    async fn query_active_runs(
        &self,
        settings: &Settings,
        pipeline: &str,
        window: &RunWindow,
    ) -> Result<Vec<PipelineRun>, AdfError>;

    /// Submit a new run of `pipeline`; returns the run id.
    async fn create_run(
        &self,
        settings: &Settings,
        pipeline: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<String, AdfError>;
}

/// Production client for the ADF management REST API
pub struct AdfClient {
    http: Client,
    base_url: String,
    token: String,
}

impl AdfClient {
    /// Build a client with the bearer token from the environment.
    /// Token acquisition/refresh is the deployment's concern.
    pub fn from_env() -> Result<Self, AdfError> {
        let token = std::env::var(MGMT_TOKEN_ENV).map_err(|_| AdfError::MissingToken(MGMT_TOKEN_ENV))?;
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: MANAGEMENT_BASE_URL.to_string(),
            token,
        })
    }

    #[cfg(test)]
    fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    fn factory_url(&self, settings: &Settings, suffix: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DataFactory/factories/{}/{}?api-version={}",
            self.base_url,
            settings.subscription_id,
            settings.resource_group,
            settings.factory_name,
            suffix,
            API_VERSION
        )
    }

    fn query_body(pipeline: &str, window: &RunWindow) -> Value {
        serde_json::json!({
            "lastUpdatedAfter": window.after.to_rfc3339(),
            "lastUpdatedBefore": window.before.to_rfc3339(),
            "filters": [
                {
                    "operand": "PipelineName",
                    "operator": "Equals",
                    "values": [pipeline],
                },
                {
                    "operand": "Status",
                    "operator": "In",
                    "values": ACTIVE_STATUSES,
                },
            ],
        })
    }
}

#[derive(Debug, Deserialize)]
struct QueryRunsResponse {
    value: Vec<PipelineRun>,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    #[serde(rename = "runId")]
    run_id: String,
}

#[async_trait]
impl PipelineService for AdfClient {
    async fn query_active_runs(
        &self,
        settings: &Settings,
        pipeline: &str,
        window: &RunWindow,
    ) -> Result<Vec<PipelineRun>, AdfError> {
        let url = self.factory_url(settings, "queryPipelineRuns");
        debug!(%pipeline, "querying active pipeline runs");

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&Self::query_body(pipeline, window))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdfError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: QueryRunsResponse = response.json().await?;
        info!(%pipeline, count = parsed.value.len(), "active run query complete");
        Ok(parsed.value)
    }

    async fn create_run(
        &self,
        settings: &Settings,
        pipeline: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<String, AdfError> {
        let url = self.factory_url(settings, &format!("pipelines/{pipeline}/createRun"));
        info!(%pipeline, ?parameters, "triggering pipeline run");

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(parameters)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdfError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: CreateRunResponse = response.json().await?;
        Ok(parsed.run_id)
    }
}
