//! Request executor
//!
//! `Processor` owns the configured collaborators (stream provider, raster
//! engine, version registry, optional dimension strategy) and runs one
//! request at a time: version resolution, descriptor parsing, dimension
//! resolution, then either info-document assembly or pipeline execution.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::OnceCell;

use ikona_core::dimensions::Dimensions;
use ikona_core::version::resolve_version;
use ikona_core::{IiifError, IiifResult, ParsedPath, ProcessorOptions, RequestContext};
use ikona_processing::{
    size_pyramid, BuildOptions, DimensionResolver, DimensionStrategy, ImageEngine, Pipeline,
    RasterEngine,
};
use ikona_storage::{SourceRequest, StreamProvider};
use ikona_versions::{InfoParams, VersionBundle, VersionRegistry};

/// What one request resolves to: a serialized document or encoded bytes,
/// plus the links a transport layer turns into headers.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub content_type: String,
    pub body: Bytes,
    pub canonical_link: Option<String>,
    pub profile_link: Option<String>,
}

pub struct Processor {
    options: ProcessorOptions,
    provider: StreamProvider,
    engine: Arc<dyn RasterEngine>,
    registry: VersionRegistry,
    dimension_strategy: Option<Arc<dyn DimensionStrategy>>,
}

impl Processor {
    /// Create a processor with the default engine and version registry.
    /// Misconfiguration fails here, synchronously, before any request.
    pub fn new(provider: StreamProvider, options: ProcessorOptions) -> IiifResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            provider,
            engine: Arc::new(ImageEngine::new()),
            registry: VersionRegistry::with_defaults(),
            dimension_strategy: None,
        })
    }

    pub fn with_engine(mut self, engine: Arc<dyn RasterEngine>) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_registry(mut self, registry: VersionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_dimension_strategy(mut self, strategy: Arc<dyn DimensionStrategy>) -> Self {
        self.dimension_strategy = Some(strategy);
        self
    }

    /// Process one request URL to a response envelope.
    pub async fn execute(&self, url: &str) -> IiifResult<ResponseEnvelope> {
        let resolved = resolve_version(url, self.options.version, self.options.path_prefix.as_deref())?;
        let bundle = self.registry.get(resolved.version)?;
        let ctx = crate::descriptor::parse_descriptor(url, &resolved, bundle.as_ref())?;

        tracing::debug!(
            version = %ctx.version,
            id = %ctx.image_id,
            filename = %ctx.filename,
            "request parsed"
        );

        let source = SourceRequest {
            id: ctx.decoded_id(),
            base_url: ctx.base_url.clone(),
        };
        let run = RequestRun {
            resolver: DimensionResolver::new(
                self.provider.clone(),
                self.engine.clone(),
                self.dimension_strategy.clone(),
            ),
            source,
            dimensions: OnceCell::new(),
        };

        match &ctx.parsed {
            ParsedPath::Info => self.info_response(&ctx, bundle.as_ref(), &run).await,
            ParsedPath::Image(_) => self.image_response(&ctx, bundle.as_ref(), &run).await,
        }
    }

    async fn info_response(
        &self,
        ctx: &RequestContext,
        bundle: &dyn VersionBundle,
        run: &RequestRun,
    ) -> IiifResult<ResponseEnvelope> {
        let dimensions = run.dimensions().await?;
        let native = dimensions[0];

        let document = bundle.info_document(&InfoParams {
            id: ctx.canonical_id(),
            width: native.width,
            height: native.height,
            sizes: size_pyramid(native),
            max: self.options.max,
        });
        let body = serde_json::to_vec(&document)?;

        tracing::info!(
            id = %ctx.image_id,
            width = native.width,
            height = native.height,
            "info document served"
        );

        Ok(ResponseEnvelope {
            content_type: "application/json".to_string(),
            body: Bytes::from(body),
            canonical_link: None,
            profile_link: None,
        })
    }

    async fn image_response(
        &self,
        ctx: &RequestContext,
        bundle: &dyn VersionBundle,
        run: &RequestRun,
    ) -> IiifResult<ResponseEnvelope> {
        let ParsedPath::Image(params) = &ctx.parsed else {
            unreachable!("image_response called for info request");
        };

        let dimensions = run.dimensions().await?;
        let pipeline = Pipeline::build(
            ctx.version,
            dimensions,
            params,
            &BuildOptions {
                max: self.options.max,
                density: self.options.density,
                include_metadata: self.options.include_metadata,
            },
        )?;

        let data = self.provider.read_fully(&run.source).await?;
        let rendered = self.engine.render(&data, &pipeline).await?;

        let canonical_path = bundle.canonical_path(&ctx.image_id, pipeline.canonical_segments());
        let canonical_link = format!("{}{}", ctx.base_url, canonical_path);

        tracing::info!(
            id = %ctx.image_id,
            canonical = %canonical_link,
            content_type = rendered.content_type,
            bytes = rendered.bytes.len(),
            "image rendered"
        );

        Ok(ResponseEnvelope {
            content_type: rendered.content_type.to_string(),
            body: rendered.bytes,
            canonical_link: Some(canonical_link),
            profile_link: Some(bundle.profile_link().to_string()),
        })
    }
}

/// Per-request state: the dimension set is computed at most once for the
/// lifetime of the request and never shared beyond it.
struct RequestRun {
    resolver: DimensionResolver,
    source: SourceRequest,
    dimensions: OnceCell<Vec<Dimensions>>,
}

impl RequestRun {
    async fn dimensions(&self) -> IiifResult<&Vec<Dimensions>> {
        self.dimensions
            .get_or_try_init(|| self.resolver.resolve(&self.source))
            .await
    }
}
