//! Raster processing
//!
//! The operation pipeline builder (region → size → rotation → quality →
//! format → metadata), the dimension resolver with its pluggable strategy,
//! the info-document size pyramid, and the raster engine seam with a
//! default `image`-crate implementation.

pub mod dimensions;
pub mod engine;
pub mod info;
pub mod pipeline;

pub use dimensions::{DimensionInput, DimensionResolver, DimensionStrategy};
pub use engine::{ImageEngine, RasterEngine, Rendered, SourceInfo};
pub use info::size_pyramid;
pub use pipeline::{
    BuildOptions, OutputFormat, Pipeline, Quality, RegionOp, RotationOp, SizeOp,
};
