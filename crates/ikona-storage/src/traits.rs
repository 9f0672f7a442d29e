//! Stream provider abstraction
//!
//! A provider resolves an image identifier to source bytes. Two calling
//! conventions exist: `Simple` hands back a stream the caller drains, and
//! `Scoped` keeps ownership of the underlying handle and runs a consumer
//! against the stream, releasing the handle when the consumer returns. The
//! convention is chosen explicitly at configuration time via the enum
//! variant, and both drain to identical bytes.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use ikona_core::IiifError;
use thiserror::Error;

/// Stream acquisition errors
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Invalid source identifier: {0}")]
    InvalidId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provider error: {0}")]
    Provider(String),
}

pub type StreamResult<T> = Result<T, StreamError>;

impl From<StreamError> for IiifError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::NotFound(id) => IiifError::NotFound(id),
            other => IiifError::StreamResolution(other.to_string()),
        }
    }
}

/// What a provider needs to locate a source
#[derive(Debug, Clone)]
pub struct SourceRequest {
    /// Percent-decoded image identifier
    pub id: String,
    /// Base URL of the request, for providers that key on it
    pub base_url: String,
}

/// Chunked source bytes
pub type ByteStream = Pin<Box<dyn Stream<Item = StreamResult<Bytes>> + Send>>;

/// Consumer handed to a scoped provider; runs while the provider keeps the
/// underlying handle alive.
pub type StreamConsumer =
    Box<dyn FnOnce(ByteStream) -> BoxFuture<'static, StreamResult<Bytes>> + Send>;

/// Plain convention: resolve to a stream the caller owns and drains
#[async_trait]
pub trait SimpleResolver: Send + Sync {
    async fn resolve(&self, request: &SourceRequest) -> StreamResult<ByteStream>;
}

/// Scoped convention: the provider opens the source, runs the consumer
/// against it, and releases the handle before returning.
#[async_trait]
pub trait ScopedResolver: Send + Sync {
    async fn with_stream(
        &self,
        request: &SourceRequest,
        consumer: StreamConsumer,
    ) -> StreamResult<Bytes>;
}

/// The configured provider, one explicit variant per calling convention
#[derive(Clone)]
pub enum StreamProvider {
    Simple(Arc<dyn SimpleResolver>),
    Scoped(Arc<dyn ScopedResolver>),
}

impl StreamProvider {
    /// Drain the source to a single buffer, whichever convention is
    /// configured.
    pub async fn read_fully(&self, request: &SourceRequest) -> StreamResult<Bytes> {
        match self {
            StreamProvider::Simple(resolver) => {
                let stream = resolver.resolve(request).await?;
                collect(stream).await
            }
            StreamProvider::Scoped(resolver) => {
                resolver
                    .with_stream(request, Box::new(|stream| Box::pin(collect(stream))))
                    .await
            }
        }
    }
}

/// Drain a byte stream into one contiguous buffer
pub async fn collect(mut stream: ByteStream) -> StreamResult<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}
