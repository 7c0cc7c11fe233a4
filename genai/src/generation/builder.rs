use std::sync::Arc;

use futures::stream::BoxStream;
use schemars::JsonSchema;
use serde_json::Value;

use crate::client::ClientInner;
use crate::common::{Content, Modality, Role};
use crate::error::Error;
use crate::generation::model::{
    GenerateContentRequest, GenerationConfig, GenerationResponse, HarmBlockThreshold,
    HarmCategory, SafetySetting, SpeechConfig,
};
use crate::tools::Tool;

/// Fluent builder for a content generation request.
pub struct ContentBuilder {
    inner: Arc<ClientInner>,
    request: GenerateContentRequest,
}

impl ContentBuilder {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner, request: GenerateContentRequest::default() }
    }

    /// Append a user turn with text content.
    pub fn with_user_message(mut self, text: impl Into<String>) -> Self {
        self.request.contents.push(Content::text(text).with_role(Role::User));
        self
    }

    /// Append a model turn with text content.
    pub fn with_model_message(mut self, text: impl Into<String>) -> Self {
        self.request.contents.push(Content::text(text).with_role(Role::Model));
        self
    }

    /// Append an arbitrary content turn.
    pub fn with_content(mut self, content: Content) -> Self {
        self.request.contents.push(content);
        self
    }

    /// Set the system instruction.
    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.request.system_instruction = Some(Content::text(text));
        self
    }

    /// Make a tool available to the model.
    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.request.tools.get_or_insert_default().push(tool);
        self
    }

    pub fn with_safety_setting(
        mut self,
        category: HarmCategory,
        threshold: HarmBlockThreshold,
    ) -> Self {
        self.request
            .safety_settings
            .get_or_insert_default()
            .push(SafetySetting { category, threshold });
        self
    }

    /// Replace the whole generation config.
    pub fn with_generation_config(mut self, config: GenerationConfig) -> Self {
        self.request.generation_config = Some(config);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config_mut().temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: i32) -> Self {
        self.config_mut().max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_response_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.config_mut().response_mime_type = Some(mime_type.into());
        self
    }

    pub fn with_response_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.config_mut().response_modalities = Some(modalities);
        self
    }

    pub fn with_speech_config(mut self, speech_config: SpeechConfig) -> Self {
        self.config_mut().speech_config = Some(speech_config);
        self
    }

    /// Constrain the response to a JSON schema derived from `T` and set
    /// the response MIME type to JSON.
    pub fn with_response_schema<T: JsonSchema>(mut self) -> Self {
        let config = self.config_mut();
        config.response_mime_type = Some("application/json".to_string());
        config.response_schema = Some(schemars::schema_for!(T).to_value());
        self
    }

    /// Constrain the response to an explicit JSON schema.
    pub fn with_response_schema_value(mut self, schema: Value) -> Self {
        let config = self.config_mut();
        config.response_mime_type = Some("application/json".to_string());
        config.response_schema = Some(schema);
        self
    }

    /// Prepend previously cached content by resource name.
    pub fn with_cached_content(mut self, name: impl Into<String>) -> Self {
        self.request.cached_content = Some(name.into());
        self
    }

    fn config_mut(&mut self) -> &mut GenerationConfig {
        self.request.generation_config.get_or_insert_default()
    }

    /// Build the request without dispatching it.
    pub fn build(self) -> GenerateContentRequest {
        self.request
    }

    /// Execute the request.
    pub async fn execute(self) -> Result<GenerationResponse, Error> {
        self.inner.backend.generate_content(self.request).await
    }

    /// Execute the request, streaming response chunks over SSE.
    pub async fn execute_stream(
        self,
    ) -> Result<BoxStream<'static, Result<GenerationResponse, Error>>, Error> {
        self.inner.backend.stream_generate_content(self.request).await
    }

    /// Count the tokens this request would consume, without generating.
    pub async fn count_tokens(self) -> Result<u32, Error> {
        self.inner.backend.count_tokens(self.request).await
    }
}
