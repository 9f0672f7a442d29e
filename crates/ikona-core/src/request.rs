//! Request descriptors
//!
//! `ParsedPath` is what a version bundle produces from the request path:
//! either an info request or the five image parameters as
//! unparsed-but-validated token strings. `RequestContext` is the
//! immutable-after-construction value one processing invocation owns.

use percent_encoding::percent_decode_str;

use crate::version::ApiVersion;

/// The five IIIF image parameters as validated token strings.
///
/// Interpretation (pixel math, clamping) happens later in the pipeline
/// builder; bundles only guarantee the tokens match their version grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageParams {
    pub region: String,
    pub size: String,
    pub rotation: String,
    pub quality: String,
    pub format: String,
}

/// Parsed request path: a capability-document request or an image request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPath {
    Info,
    Image(ImageParams),
}

/// Everything one processing invocation needs to know about its request.
/// Constructed once by the descriptor parser; never mutated, never shared.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub version: ApiVersion,
    pub path_prefix: String,
    /// Base URL up to and including the path prefix, single trailing slash
    pub base_url: String,
    /// Image identifier as it appeared in the URL (still percent-encoded)
    pub image_id: String,
    /// Logical filename: `info.json` or `<quality>.<format>`
    pub filename: String,
    pub parsed: ParsedPath,
}

impl RequestContext {
    /// Percent-decoded identifier, for handing to stream providers
    pub fn decoded_id(&self) -> String {
        percent_decode_str(&self.image_id)
            .decode_utf8_lossy()
            .into_owned()
    }

    /// Canonical image id: base URL joined with the encoded identifier
    pub fn canonical_id(&self) -> String {
        format!("{}{}", self.base_url, self.image_id)
    }
}

/// Canonical tokens emitted by the pipeline stages, one per parameter.
/// The version bundle joins these into a canonical request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalSegments {
    pub region: String,
    pub size: String,
    pub rotation: String,
    pub quality: String,
    pub format: String,
}

/// Strip leading and trailing slashes for internal path joins
pub fn trim_slashes(s: &str) -> &str {
    s.trim_start_matches('/').trim_end_matches('/')
}

/// Normalize to exactly one trailing slash (canonical-id construction)
pub fn with_trailing_slash(s: &str) -> String {
    format!("{}/", s.trim_end_matches('/'))
}
