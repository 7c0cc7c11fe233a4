//! Cloud project/location backend talking to the regional REST surface.
//!
//! Same wire records as the direct mode; only URL shapes and
//! authentication differ. File storage is not part of this surface, so
//! the file operations report [`Error::Unsupported`].

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use mime::Mime;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use snafu::ResultExt;
use tracing::instrument;
use url::Url;

use crate::backend::auth::ServiceAccountTokenSource;
use crate::backend::{
    apply_list_params, check_response, list_path, Backend, CountTokensResponse,
};
use crate::batch::{BatchJob, CreateBatchJobRequest};
use crate::cache::model::{CacheExpirationRequest, CachedContent, CreateCachedContentRequest};
use crate::common::Model;
use crate::embedding::{
    BatchContentEmbeddingResponse, BatchEmbedContentsRequest, ContentEmbeddingResponse,
    EmbedContentRequest,
};
use crate::error::{
    BadPartSnafu, ConstructUrlSnafu, DecodeResponseSnafu, DeserializeSnafu, Error,
    PerformRequestNewSnafu, PerformRequestSnafu, UnsupportedSnafu, UrlParseSnafu,
};
use crate::files::model::File;
use crate::generation::model::{GenerateContentRequest, GenerationResponse};
use crate::models::ModelInfo;
use crate::pager::{ListParams, PagedItem};
use crate::tuning::{CreateTuningJobRequest, TuningJob};

/// Bearer-token source for the cloud mode.
#[derive(Debug, Clone)]
pub(crate) enum VertexAuth {
    /// Caller-supplied token; refresh is the caller's concern.
    BearerToken(String),
    ServiceAccount(ServiceAccountTokenSource),
}

#[derive(Debug)]
pub struct VertexBackend {
    http_client: Client,
    base_url: Url,
    project_id: String,
    location: String,
    auth: VertexAuth,
    model: Model,
}

impl VertexBackend {
    pub(crate) fn new(
        http_client: Client,
        base_url: Option<Url>,
        project_id: String,
        location: String,
        auth: VertexAuth,
        model: Model,
    ) -> Result<Self, Error> {
        let base_url = match base_url {
            Some(url) => url,
            None => Url::parse(&format!("https://{location}-aiplatform.googleapis.com/v1/"))
                .context(UrlParseSnafu)?,
        };
        Ok(Self { http_client, base_url, project_id, location, auth, model })
    }

    fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project_id, self.location)
    }

    /// Build a URL for a model-scoped endpoint on the fully-qualified
    /// publisher model path.
    fn build_model_url(&self, endpoint: &str) -> Result<Url, Error> {
        let suffix = format!(
            "{}:{endpoint}",
            self.model.vertex_model_path(&self.project_id, &self.location)
        );
        self.build_url_with_suffix(&suffix)
    }

    fn build_url_with_suffix(&self, suffix: &str) -> Result<Url, Error> {
        self.base_url.join(suffix).context(ConstructUrlSnafu { suffix: suffix.to_string() })
    }

    /// Build a URL for a named resource under this project/location,
    /// accepting either fully-qualified or bare names.
    fn build_resource_url(&self, collection: &str, name: &str) -> Result<Url, Error> {
        let suffix = if name.starts_with("projects/") {
            name.to_string()
        } else {
            let prefix = format!("{collection}/");
            let bare = name.strip_prefix(&prefix).unwrap_or(name);
            format!("{}/{collection}/{bare}", self.parent())
        };
        self.build_url_with_suffix(&suffix)
    }

    async fn bearer_token(&self) -> Result<String, Error> {
        match &self.auth {
            VertexAuth::BearerToken(token) => Ok(token.clone()),
            VertexAuth::ServiceAccount(source) => source.access_token(&self.http_client).await,
        }
    }

    async fn perform_request<
        B: FnOnce(&Client) -> RequestBuilder,
        D: AsyncFn(Response) -> Result<T, Error>,
        T,
    >(
        &self,
        builder: B,
        deserializer: D,
    ) -> Result<T, Error> {
        let token = self.bearer_token().await?;
        let request = builder(&self.http_client)
            .bearer_auth(token)
            .build()
            .context(PerformRequestNewSnafu)?;
        let url = request.url().clone();

        let response = self
            .http_client
            .execute(request)
            .await
            .context(PerformRequestSnafu { url })?;

        let response = check_response(response).await?;
        deserializer(response).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        self.perform_request(|c| c.get(url), async |r| r.json().await.context(DecodeResponseSnafu))
            .await
    }

    async fn post_json<Req: serde::Serialize, Res: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        body: &Req,
    ) -> Result<Res, Error> {
        self.perform_request(
            |c| c.post(url).json(body),
            async |r| r.json().await.context(DecodeResponseSnafu),
        )
        .await
    }
}

#[async_trait]
impl Backend for VertexBackend {
    fn model(&self) -> &Model {
        &self.model
    }

    #[instrument(skip_all, fields(
        model = %self.model,
        location = %self.location,
        contents.count = req.contents.len(),
    ), err)]
    async fn generate_content(
        &self,
        req: GenerateContentRequest,
    ) -> Result<GenerationResponse, Error> {
        let url = self.build_model_url("generateContent")?;
        self.post_json(url, &req).await
    }

    #[instrument(skip_all, fields(model = %self.model, location = %self.location), err)]
    async fn stream_generate_content(
        &self,
        req: GenerateContentRequest,
    ) -> Result<BoxStream<'static, Result<GenerationResponse, Error>>, Error> {
        let mut url = self.build_model_url("streamGenerateContent")?;
        url.query_pairs_mut().append_pair("alt", "sse");

        let stream = self
            .perform_request(|c| c.post(url).json(&req), async |r| Ok(r.bytes_stream()))
            .await?;

        let stream = stream
            .eventsource()
            .map(|event| event.context(BadPartSnafu))
            .map_ok(|event| {
                serde_json::from_str::<GenerationResponse>(&event.data).context(DeserializeSnafu)
            })
            .map(|r| r.flatten());

        Ok(Box::pin(stream))
    }

    async fn count_tokens(&self, req: GenerateContentRequest) -> Result<u32, Error> {
        let url = self.build_model_url("countTokens")?;
        let body = json!({"contents": req.contents});
        let response: CountTokensResponse = self.post_json(url, &body).await?;
        Ok(response.total_tokens)
    }

    async fn embed_content(
        &self,
        req: EmbedContentRequest,
    ) -> Result<ContentEmbeddingResponse, Error> {
        let url = self.build_model_url("embedContent")?;
        self.post_json(url, &req).await
    }

    async fn batch_embed_contents(
        &self,
        req: BatchEmbedContentsRequest,
    ) -> Result<BatchContentEmbeddingResponse, Error> {
        let url = self.build_model_url("batchEmbedContents")?;
        self.post_json(url, &req).await
    }

    async fn create_cached_content(
        &self,
        req: CreateCachedContentRequest,
    ) -> Result<CachedContent, Error> {
        let url = self.build_url_with_suffix(&format!("{}/cachedContents", self.parent()))?;
        self.post_json(url, &req).await
    }

    async fn get_cached_content(&self, name: &str) -> Result<CachedContent, Error> {
        let url = self.build_resource_url("cachedContents", name)?;
        self.get_json(url).await
    }

    async fn update_cached_content(
        &self,
        name: &str,
        expiration: CacheExpirationRequest,
    ) -> Result<CachedContent, Error> {
        let url = self.build_resource_url("cachedContents", name)?;

        let update_payload = match expiration {
            CacheExpirationRequest::Ttl { ttl } => json!({ "ttl": ttl }),
            CacheExpirationRequest::ExpireTime { expire_time } => {
                let formatted = expire_time
                    .format(&time::format_description::well_known::Rfc3339)
                    .map_err(|_| Error::BadResponse {
                        code: 400,
                        description: Some("expire_time not representable as RFC 3339".to_string()),
                    })?;
                json!({ "expireTime": formatted })
            }
        };

        self.perform_request(
            |c| c.patch(url).json(&update_payload),
            async |r| r.json().await.context(DecodeResponseSnafu),
        )
        .await
    }

    async fn delete_cached_content(&self, name: &str) -> Result<(), Error> {
        let url = self.build_resource_url("cachedContents", name)?;
        self.perform_request(|c| c.delete(url), async |_r| Ok(())).await
    }

    async fn create_tuning_job(&self, req: CreateTuningJobRequest) -> Result<TuningJob, Error> {
        let url = self.build_url_with_suffix(&format!("{}/tuningJobs", self.parent()))?;
        self.post_json(url, &req).await
    }

    async fn get_tuning_job(&self, name: &str) -> Result<TuningJob, Error> {
        let url = self.build_resource_url("tuningJobs", name)?;
        self.get_json(url).await
    }

    async fn cancel_tuning_job(&self, name: &str) -> Result<(), Error> {
        let url = self.build_resource_url("tuningJobs", format!("{name}:cancel").as_str())?;
        self.perform_request(|c| c.post(url).json(&json!({})), async |_r| Ok(())).await
    }

    async fn create_batch(&self, req: CreateBatchJobRequest) -> Result<BatchJob, Error> {
        let url = self.build_url_with_suffix(&format!("{}/batches", self.parent()))?;
        self.post_json(url, &req).await
    }

    async fn get_batch(&self, name: &str) -> Result<BatchJob, Error> {
        let url = self.build_resource_url("batches", name)?;
        self.get_json(url).await
    }

    async fn cancel_batch(&self, name: &str) -> Result<(), Error> {
        let url = self.build_resource_url("batches", format!("{name}:cancel").as_str())?;
        self.perform_request(|c| c.post(url).json(&json!({})), async |_r| Ok(())).await
    }

    async fn delete_batch(&self, name: &str) -> Result<(), Error> {
        let url = self.build_resource_url("batches", name)?;
        self.perform_request(|c| c.delete(url), async |_r| Ok(())).await
    }

    async fn upload_file(
        &self,
        _display_name: Option<String>,
        _file_bytes: Vec<u8>,
        _mime_type: Mime,
    ) -> Result<File, Error> {
        UnsupportedSnafu { operation: "files.upload" }.fail()
    }

    async fn get_file(&self, _name: &str) -> Result<File, Error> {
        UnsupportedSnafu { operation: "files.get" }.fail()
    }

    async fn delete_file(&self, _name: &str) -> Result<(), Error> {
        UnsupportedSnafu { operation: "files.delete" }.fail()
    }

    async fn download_file(&self, _name: &str) -> Result<Vec<u8>, Error> {
        UnsupportedSnafu { operation: "files.download" }.fail()
    }

    async fn get_model(&self, name: &str) -> Result<ModelInfo, Error> {
        let model = Model::new(name);
        let suffix = model.vertex_model_path(&self.project_id, &self.location);
        let url = self.build_url_with_suffix(&suffix)?;
        self.get_json(url).await
    }

    #[instrument(skip_all, fields(
        kind = %kind,
        page.size = params.page_size,
        page.token.present = params.page_token.is_some(),
    ), err)]
    async fn list(&self, kind: PagedItem, params: ListParams) -> Result<Value, Error> {
        if kind == PagedItem::Files {
            return UnsupportedSnafu { operation: "files.list" }.fail();
        }
        let suffix = match kind {
            // The catalog lives under the publisher, not the project.
            PagedItem::Models => "publishers/google/models".to_string(),
            _ => format!("{}/{}", self.parent(), list_path(kind)),
        };
        let mut url = self.build_url_with_suffix(&suffix)?;
        apply_list_params(&mut url, &params);
        self.get_json(url).await
    }
}
