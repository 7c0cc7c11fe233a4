//! Fine-tuning jobs: creation, inspection and cancellation.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Lifecycle state of a tuning job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TuningJobState {
    JobStateQueued,
    JobStatePending,
    JobStateRunning,
    JobStateSucceeded,
    JobStateFailed,
    JobStateCancelling,
    JobStateCancelled,
    #[serde(other)]
    Unknown,
}

impl TuningJobState {
    /// Whether the job has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::JobStateSucceeded | Self::JobStateFailed | Self::JobStateCancelled
        )
    }
}

/// A fine-tuning job resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningJob {
    /// Resource name in `tuningJobs/{id}` format.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TuningJobState>,
    pub base_model: String,
    /// Resource name of the produced tuned model, once the job succeeds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tuned_model: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option", default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<OffsetDateTime>,
}

/// One supervised training example.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningExample {
    pub text_input: String,
    pub output: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningDataset {
    #[serde(default)]
    pub examples: Vec<TuningExample>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TuningHyperparameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
}

/// Request body for creating a tuning job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTuningJobRequest {
    pub base_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub training_dataset: TuningDataset,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperparameters: Option<TuningHyperparameters>,
}
