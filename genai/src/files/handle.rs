use std::sync::Arc;

use crate::client::ClientInner;
use crate::error::Error;
use crate::files::model::File;

/// A file record coupled with the client that produced it.
pub struct FileHandle {
    inner: Arc<ClientInner>,
    file: File,
}

impl FileHandle {
    pub(crate) fn new(inner: Arc<ClientInner>, file: File) -> Self {
        Self { inner, file }
    }

    /// The underlying file record.
    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }

    /// Re-fetch the record, e.g. to observe a state transition.
    pub async fn refresh(&mut self) -> Result<&File, Error> {
        self.file = self.inner.backend.get_file(&self.file.name).await?;
        Ok(&self.file)
    }

    /// Download the file's raw bytes.
    pub async fn download(&self) -> Result<Vec<u8>, Error> {
        self.inner.backend.download_file(&self.file.name).await
    }

    /// Delete the file resource, consuming the handle.
    pub async fn delete(self) -> Result<(), Error> {
        self.inner.backend.delete_file(&self.file.name).await
    }
}

impl std::fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileHandle").field("file", &self.file).finish()
    }
}
