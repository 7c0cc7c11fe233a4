//! Content embedding: request/response records and the fluent builder.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::ClientInner;
use crate::common::Content;
use crate::error::Error;

/// Downstream task the embedding will be used for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalQuery,
    RetrievalDocument,
    SemanticSimilarity,
    Classification,
    Clustering,
    QuestionAnswering,
    FactVerification,
    CodeRetrievalQuery,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedContentRequest {
    pub content: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    /// Document title, only valid with [`TaskType::RetrievalDocument`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dimensionality: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEmbedding {
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEmbeddingResponse {
    pub embedding: ContentEmbedding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEmbedContentsRequest {
    pub requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchContentEmbeddingResponse {
    #[serde(default)]
    pub embeddings: Vec<ContentEmbedding>,
}

/// Fluent builder for embedding requests.
pub struct EmbedBuilder {
    inner: Arc<ClientInner>,
    contents: Vec<Content>,
    task_type: Option<TaskType>,
    title: Option<String>,
    output_dimensionality: Option<i32>,
}

impl EmbedBuilder {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self {
            inner,
            contents: Vec::new(),
            task_type: None,
            title: None,
            output_dimensionality: None,
        }
    }

    /// Add a text to embed. Adding more than one switches execution to
    /// the batch endpoint.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.contents.push(Content::text(text));
        self
    }

    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_output_dimensionality(mut self, dims: i32) -> Self {
        self.output_dimensionality = Some(dims);
        self
    }

    fn request_for(&self, content: Content) -> EmbedContentRequest {
        EmbedContentRequest {
            content,
            task_type: self.task_type,
            title: self.title.clone(),
            output_dimensionality: self.output_dimensionality,
        }
    }

    /// Embed a single content.
    pub async fn execute(mut self) -> Result<ContentEmbeddingResponse, Error> {
        let content = if self.contents.is_empty() {
            Content::default()
        } else {
            self.contents.remove(0)
        };
        let request = self.request_for(content);
        self.inner.backend.embed_content(request).await
    }

    /// Embed every added content in one batch call.
    pub async fn execute_batch(self) -> Result<BatchContentEmbeddingResponse, Error> {
        let requests = self
            .contents
            .iter()
            .cloned()
            .map(|content| self.request_for(content))
            .collect();
        self.inner
            .backend
            .batch_embed_contents(BatchEmbedContentsRequest { requests })
            .await
    }
}
