//! dbt Cloud completion event payload

use serde::Deserialize;

/// Run status dbt Cloud reports for a successful job
pub const SUCCESS_STATUS: &str = "Success";

/// Envelope dbt Cloud posts to the webhook
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionPayload {
    pub data: CompletionEvent,
}

/// The completion notification itself. Transient; lives for one request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub run_id: String,
    pub job_id: String,
    pub run_status: String,
}

impl CompletionEvent {
    pub fn is_success(&self) -> bool {
        self.run_status == SUCCESS_STATUS
    }

    /// Correlation tag recorded as an annotation on the triggered ADF run
    /// and matched against in the duplicate-run guard.
    pub fn annotation_tag(&self) -> String {
        format!("RunId={}, JobId={}", self.run_id, self.job_id)
    }
}
