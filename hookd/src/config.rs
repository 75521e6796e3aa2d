//! Trigger configuration and environment settings
//!
//! The pipeline to trigger and its static parameters live in a YAML file;
//! deployment-scoped identifiers come from the process environment. Both
//! are re-read per invocation so a redeploy never serves stale values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Shared secret used to authenticate dbt Cloud deliveries
pub const AUTH_TOKEN_ENV: &str = "DBT_CLOUD_AUTH_TOKEN";
/// Azure subscription hosting the data factory
pub const SUBSCRIPTION_ID_ENV: &str = "SUBSCRIPTION_ID";
/// Resource group of the data factory
pub const RESOURCE_GROUP_ENV: &str = "RESOURCE_GROUP";
/// Name of the data factory holding the pipeline
pub const FACTORY_NAME_ENV: &str = "FACTORY_NAME";
/// Bearer token for the Azure management API
pub const MGMT_TOKEN_ENV: &str = "AZURE_MGMT_TOKEN";
/// Optional telemetry export hint; acknowledged but handled by the host
pub const APP_INSIGHTS_ENV: &str = "APPLICATIONINSIGHTS_CONNECTION_STRING";

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("failed to read trigger config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse trigger config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Static trigger configuration: which pipeline to run and with what
/// parameters. Immutable for one invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    pub pipeline_name: String,

    #[serde(default)]
    pub pipeline_parameters: BTreeMap<String, String>,
}

impl TriggerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(pipeline = %config.pipeline_name, "trigger config loaded");
        Ok(config)
    }
}

/// Deployment identifiers resolved from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub subscription_id: String,
    pub resource_group: String,
    pub factory_name: String,
}

impl Settings {
    /// Read the required variables; a missing one is a fatal
    /// misconfiguration, not something to retry around.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut subscription_id = require_env(SUBSCRIPTION_ID_ENV)?;
        // Some deployments store the full ARM path instead of the bare id
        if let Some(bare) = subscription_id.strip_prefix("/subscriptions/") {
            subscription_id = bare.to_string();
        }

        Ok(Self {
            subscription_id,
            resource_group: require_env(RESOURCE_GROUP_ENV)?,
            factory_name: require_env(FACTORY_NAME_ENV)?,
        })
    }
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnv(name)),
    }
}
