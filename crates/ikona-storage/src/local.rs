//! Local filesystem source provider

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::fs;

use crate::traits::{
    collect, ByteStream, ScopedResolver, SimpleResolver, SourceRequest, StreamConsumer,
    StreamError, StreamResult,
};

/// Serves source images from a directory tree, keyed by image identifier.
///
/// Implements both provider conventions over the same backing files so a
/// deployment can pick either and tests can compare them.
#[derive(Clone)]
pub struct LocalSource {
    base_path: PathBuf,
}

impl LocalSource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Map an identifier to a filesystem path, rejecting identifiers that
    /// could escape the base directory.
    fn id_to_path(&self, id: &str) -> StreamResult<PathBuf> {
        if id.is_empty() || id.contains("..") || id.starts_with('/') {
            return Err(StreamError::InvalidId(id.to_string()));
        }
        Ok(self.base_path.join(id))
    }

    async fn open(&self, request: &SourceRequest) -> StreamResult<(PathBuf, fs::File)> {
        let path = self.id_to_path(&request.id)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StreamError::NotFound(request.id.clone()));
        }

        let file = fs::File::open(&path).await.map_err(|e| {
            StreamError::Provider(format!("failed to open {}: {}", path.display(), e))
        })?;

        Ok((path, file))
    }

    fn file_stream(path: &Path, file: fs::File) -> ByteStream {
        let path_display = path.display().to_string();
        let reader = tokio_util::io::ReaderStream::new(file);
        let stream = reader.map(move |result| {
            result.map_err(|e| {
                StreamError::Provider(format!("failed to read chunk from {}: {}", path_display, e))
            })
        });
        Box::pin(stream)
    }
}

#[async_trait]
impl SimpleResolver for LocalSource {
    async fn resolve(&self, request: &SourceRequest) -> StreamResult<ByteStream> {
        let (path, file) = self.open(request).await?;

        tracing::debug!(
            id = %request.id,
            path = %path.display(),
            "local source stream opened"
        );

        Ok(Self::file_stream(&path, file))
    }
}

#[async_trait]
impl ScopedResolver for LocalSource {
    async fn with_stream(
        &self,
        request: &SourceRequest,
        consumer: StreamConsumer,
    ) -> StreamResult<Bytes> {
        let (path, file) = self.open(request).await?;

        tracing::debug!(
            id = %request.id,
            path = %path.display(),
            "local source scoped stream opened"
        );

        // The file handle lives inside the stream; it is released when the
        // consumer returns and the stream drops, within this call.
        let result = consumer(Self::file_stream(&path, file)).await;

        tracing::debug!(id = %request.id, ok = result.is_ok(), "local source scoped stream closed");
        result
    }
}
