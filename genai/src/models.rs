//! Model catalog: metadata about the models the service exposes.

use serde::{Deserialize, Serialize};

/// Information about one model in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name in `models/{model}` format.
    pub name: String,
    #[serde(default)]
    pub base_model_id: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub input_token_limit: u32,
    #[serde(default)]
    pub output_token_limit: u32,
    /// Supported generation methods (e.g. `generateContent`, `embedContent`).
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl ModelInfo {
    /// Returns true if this model supports `generateContent`.
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods.iter().any(|m| m == "generateContent")
    }

    /// Returns true if this model supports `embedContent`.
    pub fn supports_embed_content(&self) -> bool {
        self.supported_generation_methods.iter().any(|m| m == "embedContent")
    }
}
