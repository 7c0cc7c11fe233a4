use std::sync::Arc;

use time::OffsetDateTime;

use crate::cache::handle::CachedContentHandle;
use crate::cache::model::{CachedContent, CreateCachedContentRequest};
use crate::client::ClientInner;
use crate::common::Content;
use crate::error::Error;
use crate::tools::Tool;

/// Fluent builder for creating cached content.
pub struct CacheBuilder {
    inner: Arc<ClientInner>,
    request: CreateCachedContentRequest,
}

impl CacheBuilder {
    pub(crate) fn new(inner: Arc<ClientInner>, model: String) -> Self {
        Self {
            inner,
            request: CreateCachedContentRequest { model, ..Default::default() },
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.request.display_name = Some(display_name.into());
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.request.contents.push(content);
        self
    }

    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.request.system_instruction = Some(Content::text(text));
        self
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.request.tools.get_or_insert_default().push(tool);
        self
    }

    /// Lifetime as a duration string, e.g. `"300s"`.
    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.request.ttl = Some(ttl.into());
        self.request.expire_time = None;
        self
    }

    pub fn with_expire_time(mut self, expire_time: OffsetDateTime) -> Self {
        self.request.expire_time = Some(expire_time);
        self.request.ttl = None;
        self
    }

    /// Create the cached content and return a handle plus the record.
    pub async fn execute(self) -> Result<(CachedContentHandle, CachedContent), Error> {
        let cached = self.inner.backend.create_cached_content(self.request).await?;
        let handle = CachedContentHandle::new(self.inner, cached.name.clone());
        Ok((handle, cached))
    }
}
