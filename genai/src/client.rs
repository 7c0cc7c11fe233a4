//! The public client surface.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::backend::Backend;
use crate::batch::{BatchJob, CreateBatchJobRequest};
use crate::cache::builder::CacheBuilder;
use crate::cache::handle::CachedContentHandle;
use crate::cache::model::CachedContent;
use crate::common::Model;
use crate::embedding::EmbedBuilder;
use crate::error::Error;
use crate::files::builder::FileBuilder;
use crate::files::handle::FileHandle;
use crate::files::model::File;
use crate::generation::builder::ContentBuilder;
use crate::generation::model::GenerateContentRequest;
use crate::models::ModelInfo;
use crate::pager::{ListParams, ListRequestFn, PagedItem, Pager};
use crate::tuning::{CreateTuningJobRequest, TuningJob};

pub(crate) struct ClientInner {
    pub(crate) backend: Box<dyn Backend>,
}

/// Client for the generative AI service.
///
/// Cheap to clone; all clones share one backend. Whether requests use
/// the direct API-key endpoint or the cloud project/location endpoint
/// was decided when the client was built (see
/// [`ClientBuilder`](crate::builder::ClientBuilder)).
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub(crate) fn new(backend: Box<dyn Backend>) -> Self {
        Self { inner: Arc::new(ClientInner { backend }) }
    }

    /// The model unary generation requests are routed to.
    pub fn model(&self) -> &Model {
        self.inner.backend.model()
    }

    /// Start building a content generation request.
    pub fn generate_content(&self) -> ContentBuilder {
        ContentBuilder::new(self.inner.clone())
    }

    /// Start building a content embedding request.
    pub fn embed_content(&self) -> EmbedBuilder {
        EmbedBuilder::new(self.inner.clone())
    }

    /// Count the tokens a request would consume.
    pub async fn count_tokens(&self, request: GenerateContentRequest) -> Result<u32, Error> {
        self.inner.backend.count_tokens(request).await
    }

    /// Start building cached content for the client's model.
    pub fn create_cache(&self) -> CacheBuilder {
        let model = self.model().as_str().to_string();
        CacheBuilder::new(self.inner.clone(), model)
    }

    /// Get a handle to cached content by its name.
    pub fn get_cached_content(&self, name: &str) -> CachedContentHandle {
        CachedContentHandle::new(self.inner.clone(), name.to_string())
    }

    /// List cached contents one page at a time.
    pub async fn list_cached_contents(
        &self,
        params: ListParams,
    ) -> Result<Pager<CachedContent>, Error> {
        self.pager(PagedItem::CachedContents, params).await
    }

    /// Start building a file upload.
    pub fn create_file<B: Into<Vec<u8>>>(&self, bytes: B) -> FileBuilder {
        FileBuilder::new(self.inner.clone(), bytes)
    }

    /// Get a handle to a file by its name.
    pub async fn get_file(&self, name: &str) -> Result<FileHandle, Error> {
        let file = self.inner.backend.get_file(name).await?;
        Ok(FileHandle::new(self.inner.clone(), file))
    }

    /// List files one page at a time.
    pub async fn list_files(&self, params: ListParams) -> Result<Pager<File>, Error> {
        self.pager(PagedItem::Files, params).await
    }

    /// Create a fine-tuning job.
    pub async fn create_tuning_job(
        &self,
        request: CreateTuningJobRequest,
    ) -> Result<TuningJob, Error> {
        self.inner.backend.create_tuning_job(request).await
    }

    pub async fn get_tuning_job(&self, name: &str) -> Result<TuningJob, Error> {
        self.inner.backend.get_tuning_job(name).await
    }

    pub async fn cancel_tuning_job(&self, name: &str) -> Result<(), Error> {
        self.inner.backend.cancel_tuning_job(name).await
    }

    /// List tuning jobs one page at a time.
    pub async fn list_tuning_jobs(&self, params: ListParams) -> Result<Pager<TuningJob>, Error> {
        self.pager(PagedItem::TuningJobs, params).await
    }

    /// Create a batch generation job.
    pub async fn create_batch(&self, request: CreateBatchJobRequest) -> Result<BatchJob, Error> {
        self.inner.backend.create_batch(request).await
    }

    pub async fn get_batch(&self, name: &str) -> Result<BatchJob, Error> {
        self.inner.backend.get_batch(name).await
    }

    pub async fn cancel_batch(&self, name: &str) -> Result<(), Error> {
        self.inner.backend.cancel_batch(name).await
    }

    pub async fn delete_batch(&self, name: &str) -> Result<(), Error> {
        self.inner.backend.delete_batch(name).await
    }

    /// List batch jobs one page at a time.
    pub async fn list_batches(&self, params: ListParams) -> Result<Pager<BatchJob>, Error> {
        self.pager(PagedItem::BatchJobs, params).await
    }

    /// Fetch catalog metadata for one model.
    pub async fn get_model(&self, name: &str) -> Result<ModelInfo, Error> {
        self.inner.backend.get_model(name).await
    }

    /// List the model catalog one page at a time.
    pub async fn list_models(&self, params: ListParams) -> Result<Pager<ModelInfo>, Error> {
        self.pager(PagedItem::Models, params).await
    }

    /// Fetch the first page for `kind` and wrap the cursor.
    async fn pager<T: DeserializeOwned + Clone + Send>(
        &self,
        kind: PagedItem,
        params: ListParams,
    ) -> Result<Pager<T>, Error> {
        let request = self.list_request(kind);
        let first_page = request(params.clone()).await?;
        Pager::new(kind, request, &first_page, params)
    }

    fn list_request(&self, kind: PagedItem) -> ListRequestFn {
        let inner = self.inner.clone();
        Box::new(move |params| {
            let inner = inner.clone();
            Box::pin(async move { inner.backend.list(kind, params).await })
        })
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("backend", &self.inner.backend).finish()
    }
}
