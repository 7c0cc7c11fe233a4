use std::sync::Arc;

use crate::cache::model::{CacheExpirationRequest, CachedContent};
use crate::client::ClientInner;
use crate::error::Error;

/// Handle to a cached-content resource by name.
pub struct CachedContentHandle {
    inner: Arc<ClientInner>,
    name: String,
}

impl CachedContentHandle {
    pub(crate) fn new(inner: Arc<ClientInner>, name: String) -> Self {
        Self { inner, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fetch the current record.
    pub async fn get(&self) -> Result<CachedContent, Error> {
        self.inner.backend.get_cached_content(&self.name).await
    }

    /// Update the expiration (TTL or absolute expire time).
    pub async fn update_expiration(
        &self,
        expiration: CacheExpirationRequest,
    ) -> Result<CachedContent, Error> {
        self.inner.backend.update_cached_content(&self.name, expiration).await
    }

    /// Delete the cached content, consuming the handle.
    pub async fn delete(self) -> Result<(), Error> {
        self.inner.backend.delete_cached_content(&self.name).await
    }
}

impl std::fmt::Debug for CachedContentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedContentHandle").field("name", &self.name).finish()
    }
}
