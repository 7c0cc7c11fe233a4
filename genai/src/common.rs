//! Core content primitives shared across the request modules.
//!
//! Everything the service exchanges is built from these records: a
//! [`Content`] is an ordered list of [`Part`]s attributed to a [`Role`],
//! and a [`Part`] is either text, inline binary data, or one side of a
//! function-call round trip.

use std::fmt::{self, Formatter};

use serde::{Deserialize, Serialize};

use crate::tools::{FunctionCall, FunctionResponse};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Message from the user.
    User,
    /// Message from the model.
    Model,
}

/// Content part that can be included in a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    /// Text content.
    Text {
        /// The text content.
        text: String,
        /// Whether this part is a thought summary.
        #[serde(skip_serializing_if = "Option::is_none")]
        thought: Option<bool>,
    },
    /// Inline binary data.
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    /// Function call issued by the model.
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    /// Result of executing a function call, sent back by the client.
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
}

/// Binary payload with a MIME type, base64-encoded on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// The MIME type of the data.
    pub mime_type: String,
    /// Base64 encoded data.
    pub data: String,
}

impl Blob {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self { mime_type: mime_type.into(), data: data.into() }
    }
}

/// Content of a message: ordered parts plus an optional role.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<Part>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl Content {
    /// Create a new text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: Some(vec![Part::Text { text: text.into(), thought: None }]),
            role: None,
        }
    }

    /// Create a new content with inline binary data.
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            parts: Some(vec![Part::InlineData { inline_data: Blob::new(mime_type, data) }]),
            role: None,
        }
    }

    /// Create a new content with a function call.
    pub fn function_call(function_call: FunctionCall) -> Self {
        Self { parts: Some(vec![Part::FunctionCall { function_call }]), role: None }
    }

    /// Create a new content with a function response.
    pub fn function_response(function_response: FunctionResponse) -> Self {
        Self { parts: Some(vec![Part::FunctionResponse { function_response }]), role: None }
    }

    /// Create a new content with a function response from a name and JSON value.
    pub fn function_response_json(name: impl Into<String>, response: serde_json::Value) -> Self {
        Self::function_response(FunctionResponse::new(name, response))
    }

    /// Add a role to this content.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

/// Output format the model is asked to produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    ModalityUnspecified,
    Text,
    Image,
    Audio,
    /// Unknown or future modality types.
    #[serde(other)]
    Unknown,
}

/// Model identifier in `models/{model}` resource form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Model(String);

impl Default for Model {
    fn default() -> Self {
        Self::GEMINI_2_5_FLASH.into()
    }
}

impl Model {
    pub const GEMINI_2_5_FLASH: &'static str = "models/gemini-2.5-flash";
    pub const GEMINI_2_5_FLASH_LITE: &'static str = "models/gemini-2.5-flash-lite";
    pub const GEMINI_2_5_PRO: &'static str = "models/gemini-2.5-pro";
    pub const TEXT_EMBEDDING_004: &'static str = "models/text-embedding-004";

    pub fn new(model: impl Into<String>) -> Self {
        Self(model.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bare model id without the `models/` resource prefix.
    pub fn id(&self) -> &str {
        self.0.strip_prefix("models/").unwrap_or(&self.0)
    }

    /// Fully-qualified resource path for the cloud project/location mode.
    pub fn vertex_model_path(&self, project_id: &str, location: &str) -> String {
        let model = self.as_str();
        if model.starts_with("projects/") {
            return model.to_string();
        }
        if model.starts_with("publishers/") {
            return format!("projects/{project_id}/locations/{location}/{model}");
        }
        format!(
            "projects/{project_id}/locations/{location}/publishers/google/models/{}",
            self.id()
        )
    }
}

impl From<String> for Model {
    fn from(model: String) -> Self {
        Self(model)
    }
}

impl From<&str> for Model {
    fn from(model: &str) -> Self {
        Self(model.to_string())
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_text_serializes_as_single_part() {
        let content = Content::text("hello").with_role(Role::User);
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"parts": [{"text": "hello"}], "role": "user"})
        );
    }

    #[test]
    fn vertex_model_path_qualifies_bare_models() {
        let model = Model::new("models/gemini-2.5-flash");
        assert_eq!(
            model.vertex_model_path("proj", "us-central1"),
            "projects/proj/locations/us-central1/publishers/google/models/gemini-2.5-flash"
        );

        let qualified = Model::new("projects/p/locations/l/publishers/google/models/m");
        assert_eq!(qualified.vertex_model_path("x", "y"), qualified.as_str());
    }
}
