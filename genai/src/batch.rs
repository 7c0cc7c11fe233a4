//! Batch jobs: asynchronous bulk content generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use crate::generation::model::GenerateContentRequest;

/// Lifecycle state of a batch job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchJobState {
    BatchStatePending,
    BatchStateRunning,
    BatchStateSucceeded,
    BatchStateFailed,
    BatchStateCancelled,
    #[serde(other)]
    Unknown,
}

impl BatchJobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::BatchStateSucceeded | Self::BatchStateFailed | Self::BatchStateCancelled
        )
    }
}

/// A batch job resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    /// Resource name in `batches/{id}` format.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<BatchJobState>,
    #[serde(with = "time::serde::rfc3339::option", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<OffsetDateTime>,
    /// Inlined results, present once the job is done and small enough.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// One request in a batch, tagged with a caller-chosen key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinedRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub request: GenerateContentRequest,
}

/// Request body for creating a batch job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchJobRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub requests: Vec<InlinedRequest>,
}
