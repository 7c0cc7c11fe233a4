//! Backend abstraction: one trait, two wire modes.
//!
//! Whether requests go to the direct API-key endpoint
//! ([`StudioBackend`]) or the cloud project/location endpoint
//! ([`VertexBackend`]) is decided once at client construction; calling
//! code never needs to know which mode is active.

use async_trait::async_trait;
use futures::stream::BoxStream;
use mime::Mime;
use reqwest::Response;
use serde::Deserialize;
use serde_json::Value;

use crate::batch::{BatchJob, CreateBatchJobRequest};
use crate::cache::model::{CacheExpirationRequest, CachedContent, CreateCachedContentRequest};
use crate::common::Model;
use crate::embedding::{
    BatchContentEmbeddingResponse, BatchEmbedContentsRequest, ContentEmbeddingResponse,
    EmbedContentRequest,
};
use crate::error::{BadResponseSnafu, Error};
use crate::files::model::File;
use crate::generation::model::{GenerateContentRequest, GenerationResponse};
use crate::models::ModelInfo;
use crate::pager::{ListParams, PagedItem};
use crate::tuning::{CreateTuningJobRequest, TuningJob};

pub mod auth;
pub mod studio;
pub mod vertex;

pub use studio::StudioBackend;
pub use vertex::VertexBackend;

#[async_trait]
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// The model unary generation requests are routed to.
    fn model(&self) -> &Model;

    async fn generate_content(
        &self,
        req: GenerateContentRequest,
    ) -> Result<GenerationResponse, Error>;

    /// Streaming generation. Returns a type-erased stream so callers
    /// never depend on the concrete transport.
    async fn stream_generate_content(
        &self,
        req: GenerateContentRequest,
    ) -> Result<BoxStream<'static, Result<GenerationResponse, Error>>, Error>;

    async fn count_tokens(&self, req: GenerateContentRequest) -> Result<u32, Error>;

    async fn embed_content(
        &self,
        req: EmbedContentRequest,
    ) -> Result<ContentEmbeddingResponse, Error>;

    async fn batch_embed_contents(
        &self,
        req: BatchEmbedContentsRequest,
    ) -> Result<BatchContentEmbeddingResponse, Error>;

    async fn create_cached_content(
        &self,
        req: CreateCachedContentRequest,
    ) -> Result<CachedContent, Error>;

    async fn get_cached_content(&self, name: &str) -> Result<CachedContent, Error>;

    async fn update_cached_content(
        &self,
        name: &str,
        expiration: CacheExpirationRequest,
    ) -> Result<CachedContent, Error>;

    async fn delete_cached_content(&self, name: &str) -> Result<(), Error>;

    async fn create_tuning_job(&self, req: CreateTuningJobRequest) -> Result<TuningJob, Error>;

    async fn get_tuning_job(&self, name: &str) -> Result<TuningJob, Error>;

    async fn cancel_tuning_job(&self, name: &str) -> Result<(), Error>;

    async fn create_batch(&self, req: CreateBatchJobRequest) -> Result<BatchJob, Error>;

    async fn get_batch(&self, name: &str) -> Result<BatchJob, Error>;

    async fn cancel_batch(&self, name: &str) -> Result<(), Error>;

    async fn delete_batch(&self, name: &str) -> Result<(), Error>;

    async fn upload_file(
        &self,
        display_name: Option<String>,
        file_bytes: Vec<u8>,
        mime_type: Mime,
    ) -> Result<File, Error>;

    async fn get_file(&self, name: &str) -> Result<File, Error>;

    async fn delete_file(&self, name: &str) -> Result<(), Error>;

    async fn download_file(&self, name: &str) -> Result<Vec<u8>, Error>;

    async fn get_model(&self, name: &str) -> Result<ModelInfo, Error>;

    /// One unary list call for `kind`, returning the raw response
    /// envelope for the pager to decode.
    async fn list(&self, kind: PagedItem, params: ListParams) -> Result<Value, Error>;
}

/// REST collection path for a list kind.
pub(crate) fn list_path(kind: PagedItem) -> &'static str {
    match kind {
        PagedItem::BatchJobs => "batches",
        PagedItem::Models => "models",
        PagedItem::TuningJobs => "tuningJobs",
        PagedItem::Files => "files",
        PagedItem::CachedContents => "cachedContents",
    }
}

/// Append list params as query parameters.
pub(crate) fn apply_list_params(url: &mut url::Url, params: &ListParams) {
    if let Some(size) = params.page_size {
        url.query_pairs_mut().append_pair("pageSize", &size.to_string());
    }
    if let Some(token) = &params.page_token {
        url.query_pairs_mut().append_pair("pageToken", token);
    }
    if let Some(filter) = &params.filter {
        url.query_pairs_mut().append_pair("filter", filter);
    }
}

/// Check the response status code and return an error if it is not
/// successful.
pub(crate) async fn check_response(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if !status.is_success() {
        let description = response.text().await.ok();
        BadResponseSnafu { code: status.as_u16(), description }.fail()
    } else {
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CountTokensResponse {
    #[serde(default)]
    pub total_tokens: u32,
}
