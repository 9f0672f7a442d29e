//! Dimension resolution
//!
//! Resolves the native size of a source, plus a pyramid level for every
//! resolution page the source exposes. A custom strategy can be injected;
//! when it yields nothing the resolver degrades to the default probe with
//! a warning, and when it fails the error propagates untouched.

use std::sync::Arc;

use async_trait::async_trait;
use ikona_core::dimensions::{pyramid, Dimensions};
use ikona_core::{IiifError, IiifResult};
use ikona_storage::{SourceRequest, StreamProvider};

use crate::engine::RasterEngine;

/// What a custom strategy may hand back: one native size (normalized to a
/// one-element set) or a full pyramid.
#[derive(Debug, Clone)]
pub enum DimensionInput {
    Single(Dimensions),
    Set(Vec<Dimensions>),
}

/// Injected dimension lookup, e.g. backed by a catalog database instead of
/// probing the source bytes.
#[async_trait]
pub trait DimensionStrategy: Send + Sync {
    /// `Ok(None)` means "no answer here" and falls back to the default
    /// probe; `Err` aborts dimension resolution.
    async fn dimensions(&self, request: &SourceRequest) -> anyhow::Result<Option<DimensionInput>>;
}

pub struct DimensionResolver {
    provider: StreamProvider,
    engine: Arc<dyn RasterEngine>,
    custom: Option<Arc<dyn DimensionStrategy>>,
}

impl DimensionResolver {
    pub fn new(
        provider: StreamProvider,
        engine: Arc<dyn RasterEngine>,
        custom: Option<Arc<dyn DimensionStrategy>>,
    ) -> Self {
        Self {
            provider,
            engine,
            custom,
        }
    }

    /// Resolve the dimension set for a source. Index 0 is the native size;
    /// the executor memoizes the result per request.
    pub async fn resolve(&self, request: &SourceRequest) -> IiifResult<Vec<Dimensions>> {
        if let Some(custom) = &self.custom {
            match custom.dimensions(request).await {
                Ok(Some(input)) => return normalize(input),
                Ok(None) => {
                    tracing::warn!(
                        id = %request.id,
                        "custom dimension strategy returned nothing, falling back to probe"
                    );
                }
                Err(err) => return Err(IiifError::DimensionResolution(err)),
            }
        }

        self.probe(request).await
    }

    async fn probe(&self, request: &SourceRequest) -> IiifResult<Vec<Dimensions>> {
        let data = self.provider.read_fully(request).await?;
        let info = self.engine.probe(&data).await?;

        tracing::debug!(
            id = %request.id,
            width = info.width,
            height = info.height,
            pages = info.pages,
            "probed source dimensions"
        );

        Ok(pyramid(Dimensions::new(info.width, info.height), info.pages))
    }
}

fn normalize(input: DimensionInput) -> IiifResult<Vec<Dimensions>> {
    let set = match input {
        DimensionInput::Single(dimensions) => vec![dimensions],
        DimensionInput::Set(set) => set,
    };

    if set.is_empty() {
        return Err(IiifError::DimensionResolution(anyhow::anyhow!(
            "custom dimension strategy returned an empty set"
        )));
    }
    for pair in set.windows(2) {
        if pair[1].width > pair[0].width || pair[1].height > pair[0].height {
            return Err(IiifError::DimensionResolution(anyhow::anyhow!(
                "pyramid levels must be non-increasing: {:?} follows {:?}",
                pair[1],
                pair[0]
            )));
        }
    }

    Ok(set)
}
