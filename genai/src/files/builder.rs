use std::sync::Arc;

use mime::Mime;

use crate::client::ClientInner;
use crate::error::Error;
use crate::files::handle::FileHandle;

/// Fluent builder for uploading a file.
pub struct FileBuilder {
    inner: Arc<ClientInner>,
    bytes: Vec<u8>,
    display_name: Option<String>,
    mime_type: Option<Mime>,
}

impl FileBuilder {
    pub(crate) fn new(inner: Arc<ClientInner>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { inner, bytes: bytes.into(), display_name: None, mime_type: None }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: Mime) -> Self {
        self.mime_type = Some(mime_type);
        self
    }

    /// Guess the MIME type from a file name or path.
    pub fn with_guessed_mime_type(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.mime_type = Some(mime_guess::from_path(path).first_or_octet_stream());
        self
    }

    /// Upload the bytes via the resumable upload protocol.
    pub async fn upload(self) -> Result<FileHandle, Error> {
        let mime_type = self.mime_type.unwrap_or(mime::APPLICATION_OCTET_STREAM);
        let file = self
            .inner
            .backend
            .upload_file(self.display_name, self.bytes, mime_type)
            .await?;
        Ok(FileHandle::new(self.inner, file))
    }
}
