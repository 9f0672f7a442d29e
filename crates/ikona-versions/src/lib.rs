//! Version implementation bundles
//!
//! Everything version-specific about a concrete IIIF Image API release
//! lives here: the request-path grammar, the info-document shape, the
//! profile URI, and the canonical-path assembly rule. The rest of the
//! workspace only depends on the `VersionBundle` contract.

pub mod bundle;
pub mod registry;
pub mod v2;
pub mod v3;

pub use bundle::{InfoParams, VersionBundle};
pub use registry::VersionRegistry;
pub use v2::V2Bundle;
pub use v3::V3Bundle;
