//! Direct API-key backend talking to the public REST surface.

use std::sync::LazyLock;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use mime::Mime;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use serde_json::{json, Value};
use snafu::{OptionExt, ResultExt};
use tracing::instrument;
use url::Url;

use crate::backend::auth::AuthConfig;
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
    InvalidApiKeySnafu, MissingResponseHeaderSnafu, PerformRequestNewSnafu, PerformRequestSnafu,
    UrlParseSnafu,
};
use crate::files::model::File;
use crate::generation::model::{GenerateContentRequest, GenerationResponse};
use crate::models::ModelInfo;
use crate::pager::{ListParams, PagedItem};
use crate::tuning::{CreateTuningJobRequest, TuningJob};

pub(crate) static DEFAULT_BASE_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://generativelanguage.googleapis.com/v1beta/")
        .expect("unreachable error: failed to parse default base URL")
});

#[derive(Debug)]
pub struct StudioBackend {
    http_client: Client,
    base_url: Url,
    auth: AuthConfig,
    model: Model,
}

impl StudioBackend {
    /// Create a backend authenticating with an API key.
    pub fn new(api_key: String, base_url: Option<Url>, model: Model) -> Result<Self, Error> {
        let headers = HeaderMap::from_iter([(
            HeaderName::from_static("x-goog-api-key"),
            HeaderValue::from_str(&api_key).context(InvalidApiKeySnafu)?,
        )]);

        let http_client = ClientBuilder::new()
            .default_headers(headers)
            .build()
            .context(PerformRequestNewSnafu)?;

        Ok(Self::new_with_client(
            http_client,
            base_url.unwrap_or_else(|| DEFAULT_BASE_URL.clone()),
            model,
            AuthConfig::ApiKey(api_key),
        ))
    }

    /// Create a backend from an already-configured HTTP client.
    pub(crate) fn new_with_client(
        http_client: Client,
        base_url: Url,
        model: Model,
        auth: AuthConfig,
    ) -> Self {
        Self { http_client, base_url, auth, model }
    }

    /// Build a URL for a model-scoped endpoint, e.g.
    /// `models/{model}:generateContent`.
    fn build_url(&self, endpoint: &str) -> Result<Url, Error> {
        let suffix = format!("{}:{endpoint}", self.model);
        self.build_url_with_suffix(&suffix)
    }

    fn build_url_with_suffix(&self, suffix: &str) -> Result<Url, Error> {
        self.base_url.join(suffix).context(ConstructUrlSnafu { suffix: suffix.to_string() })
    }

    /// Build a URL for a named resource, prepending the collection
    /// prefix when the caller passed a bare id.
    fn build_resource_url(&self, collection: &str, name: &str) -> Result<Url, Error> {
        let prefix = format!("{collection}/");
        let suffix = if name.starts_with(&prefix) {
            name.to_string()
        } else {
            format!("{prefix}{name}")
        };
        self.build_url_with_suffix(&suffix)
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
        let mut request_builder = builder(&self.http_client);

        if let AuthConfig::ServiceAccount(source) = &self.auth {
            let token = source.access_token(&self.http_client).await?;
            request_builder = request_builder.bearer_auth(token);
        }

        let request = request_builder.build().context(PerformRequestNewSnafu)?;
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

    async fn patch_json<Req: serde::Serialize, Res: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        body: &Req,
    ) -> Result<Res, Error> {
        self.perform_request(
            |c| c.patch(url).json(body),
            async |r| r.json().await.context(DecodeResponseSnafu),
        )
        .await
    }

    /// Open a resumable upload session and return the upload URL.
    async fn create_upload(
        &self,
        bytes: usize,
        display_name: Option<String>,
        mime_type: &Mime,
    ) -> Result<Url, Error> {
        let url = self
            .base_url
            .join("/upload/v1beta/files")
            .context(ConstructUrlSnafu { suffix: "/upload/v1beta/files".to_string() })?;

        self.perform_request(
            |c| {
                c.post(url)
                    .header("X-Goog-Upload-Protocol", "resumable")
                    .header("X-Goog-Upload-Command", "start")
                    .header("X-Goog-Upload-Content-Length", bytes.to_string())
                    .header("X-Goog-Upload-Header-Content-Type", mime_type.to_string())
                    .json(&json!({"file": {"displayName": display_name}}))
            },
            async |r| {
                r.headers()
                    .get("X-Goog-Upload-URL")
                    .context(MissingResponseHeaderSnafu { header: "X-Goog-Upload-URL" })
                    .and_then(|upload_url| {
                        upload_url.to_str().map(str::to_string).map_err(|_| Error::BadResponse {
                            code: 500,
                            description: Some("malformed upload URL in response".to_string()),
                        })
                    })
                    .and_then(|url| Url::parse(&url).context(UrlParseSnafu))
            },
        )
        .await
    }
}

#[async_trait]
impl Backend for StudioBackend {
    fn model(&self) -> &Model {
        &self.model
    }

    #[instrument(skip_all, fields(
        model = %self.model,
        contents.count = req.contents.len(),
        tools.present = req.tools.is_some(),
        cached.content.present = req.cached_content.is_some(),
    ), err)]
    async fn generate_content(
        &self,
        req: GenerateContentRequest,
    ) -> Result<GenerationResponse, Error> {
        let url = self.build_url("generateContent")?;
        self.post_json(url, &req).await
    }

    #[instrument(skip_all, fields(model = %self.model), err)]
    async fn stream_generate_content(
        &self,
        req: GenerateContentRequest,
    ) -> Result<BoxStream<'static, Result<GenerationResponse, Error>>, Error> {
        let mut url = self.build_url("streamGenerateContent")?;
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

    #[instrument(skip_all, fields(model = %self.model), err)]
    async fn count_tokens(&self, req: GenerateContentRequest) -> Result<u32, Error> {
        let url = self.build_url("countTokens")?;
        let body = json!({"contents": req.contents});
        let response: CountTokensResponse = self.post_json(url, &body).await?;
        Ok(response.total_tokens)
    }

    #[instrument(skip_all, fields(model = %self.model))]
    async fn embed_content(
        &self,
        req: EmbedContentRequest,
    ) -> Result<ContentEmbeddingResponse, Error> {
        let url = self.build_url("embedContent")?;
        self.post_json(url, &req).await
    }

    #[instrument(skip_all, fields(batch.size = req.requests.len()))]
    async fn batch_embed_contents(
        &self,
        req: BatchEmbedContentsRequest,
    ) -> Result<BatchContentEmbeddingResponse, Error> {
        let url = self.build_url("batchEmbedContents")?;
        self.post_json(url, &req).await
    }

    async fn create_cached_content(
        &self,
        req: CreateCachedContentRequest,
    ) -> Result<CachedContent, Error> {
        let url = self.build_url_with_suffix("cachedContents")?;
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

        self.patch_json(url, &update_payload).await
    }

    async fn delete_cached_content(&self, name: &str) -> Result<(), Error> {
        let url = self.build_resource_url("cachedContents", name)?;
        self.perform_request(|c| c.delete(url), async |_r| Ok(())).await
    }

    #[instrument(skip_all, fields(job.base_model = %req.base_model), err)]
    async fn create_tuning_job(&self, req: CreateTuningJobRequest) -> Result<TuningJob, Error> {
        let url = self.build_url_with_suffix("tuningJobs")?;
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

    #[instrument(skip_all, fields(batch.size = req.requests.len()), err)]
    async fn create_batch(&self, req: CreateBatchJobRequest) -> Result<BatchJob, Error> {
        let url = self.build_url("batchGenerateContent")?;
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

    /// Upload a file using the resumable upload protocol.
    #[instrument(skip_all, fields(
        file.size = file_bytes.len(),
        mime.type = %mime_type,
        file.display_name = display_name.as_deref(),
    ), err)]
    async fn upload_file(
        &self,
        display_name: Option<String>,
        file_bytes: Vec<u8>,
        mime_type: Mime,
    ) -> Result<File, Error> {
        // Step 1: Create resumable upload session
        let upload_url = self
            .create_upload(file_bytes.len(), display_name, &mime_type)
            .await?;

        // Step 2: Upload file content
        let upload_response = self
            .http_client
            .post(upload_url.clone())
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .body(file_bytes)
            .send()
            .await
            .context(PerformRequestSnafu { url: upload_url })?;

        let final_response = check_response(upload_response).await?;

        #[derive(serde::Deserialize)]
        struct UploadResponse {
            file: File,
        }

        let upload_response: UploadResponse =
            final_response.json().await.context(DecodeResponseSnafu)?;
        Ok(upload_response.file)
    }

    async fn get_file(&self, name: &str) -> Result<File, Error> {
        let url = self.build_resource_url("files", name)?;
        self.get_json(url).await
    }

    async fn delete_file(&self, name: &str) -> Result<(), Error> {
        let url = self.build_resource_url("files", name)?;
        self.perform_request(|c| c.delete(url), async |_r| Ok(())).await
    }

    #[instrument(skip_all, fields(file.name = name), err)]
    async fn download_file(&self, name: &str) -> Result<Vec<u8>, Error> {
        let suffix = format!("/download/v1beta/{name}:download");
        let mut url = self
            .base_url
            .join(&suffix)
            .context(ConstructUrlSnafu { suffix })?;
        url.query_pairs_mut().append_pair("alt", "media");

        self.perform_request(
            |c| c.get(url),
            async |r| r.bytes().await.context(DecodeResponseSnafu).map(|bytes| bytes.to_vec()),
        )
        .await
    }

    async fn get_model(&self, name: &str) -> Result<ModelInfo, Error> {
        let url = self.build_resource_url("models", name)?;
        self.get_json(url).await
    }

    #[instrument(skip_all, fields(
        kind = %kind,
        page.size = params.page_size,
        page.token.present = params.page_token.is_some(),
    ), err)]
    async fn list(&self, kind: PagedItem, params: ListParams) -> Result<Value, Error> {
        let mut url = self.build_url_with_suffix(list_path(kind))?;
        apply_list_params(&mut url, &params);
        self.get_json(url).await
    }
}
