//! The version bundle contract
//!
//! A bundle owns all version-specific behavior for one IIIF Image API release.
//! Bundles are registered once at startup and looked up per request; the
//! trait keeps every implementation structurally complete (no runtime
//! shape-checking of partial bundles).

use ikona_core::{CanonicalSegments, Dimensions, IiifResult, MaxSize, ParsedPath};
use ikona_core::version::ApiVersion;

/// Inputs to info-document assembly. `sizes` is the pyramid in ascending
/// order; `id` is the canonical image id (a full URL).
#[derive(Debug, Clone)]
pub struct InfoParams {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub sizes: Vec<Dimensions>,
    pub max: Option<MaxSize>,
}

pub trait VersionBundle: std::fmt::Debug + Send + Sync {
    /// The version this bundle implements
    fn version(&self) -> ApiVersion;

    /// Parse and validate the request path after the image identifier:
    /// `info.json` or `<region>/<size>/<rotation>/<quality>.<format>`.
    /// Tokens are validated against this version's grammar but left
    /// uninterpreted.
    fn parse_path(&self, path: &str) -> IiifResult<ParsedPath>;

    /// Assemble the version-shaped capability document. Absent fields are
    /// omitted, never serialized as null; set-valued fields keep insertion
    /// order.
    fn info_document(&self, params: &InfoParams) -> serde_json::Value;

    /// Join canonical parameter tokens into a canonical request path
    fn canonical_path(&self, image_id: &str, segments: &CanonicalSegments) -> String;

    /// Profile URI identifying the compliance level of this implementation
    fn profile_link(&self) -> &'static str;
}
