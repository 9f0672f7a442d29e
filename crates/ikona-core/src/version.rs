//! IIIF Image API version resolution
//!
//! A request URL carries its target API version in a path segment pair of
//! the form `/iiif/<digit>/`. Resolution is a pure function of the URL plus
//! any explicitly configured version and path prefix.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{IiifError, IiifResult};

/// Supported IIIF Image API major versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    V2,
    V3,
}

impl ApiVersion {
    /// Parse a single version digit as it appears in the URL path
    pub fn from_digit(digit: &str) -> Option<Self> {
        match digit {
            "2" => Some(ApiVersion::V2),
            "3" => Some(ApiVersion::V3),
            _ => None,
        }
    }

    pub fn as_digit(&self) -> u8 {
        match self {
            ApiVersion::V2 => 2,
            ApiVersion::V3 => 3,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_digit())
    }
}

/// Outcome of version resolution: the version plus the path prefix that
/// separates server routing from the IIIF request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: ApiVersion,
    pub path_prefix: String,
}

fn version_segment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/iiif/(\d)/").expect("static regex"))
}

/// Strip query string and fragment so trailing `?...`/`#...` never affect
/// the segment scan.
fn strip_query_and_fragment(url: &str) -> &str {
    let url = url.split('?').next().unwrap_or(url);
    url.split('#').next().unwrap_or(url)
}

/// Determine the API version and path prefix for a request URL.
///
/// An explicitly configured version wins over the URL. The prefix defaults
/// to `iiif/<version>/` when not supplied.
pub fn resolve_version(
    url: &str,
    explicit_version: Option<ApiVersion>,
    explicit_prefix: Option<&str>,
) -> IiifResult<ResolvedVersion> {
    let path = strip_query_and_fragment(url);

    let version = match explicit_version {
        Some(v) => v,
        None => {
            let captures = version_segment_re()
                .captures(path)
                .ok_or_else(|| IiifError::VersionResolution(url.to_string()))?;
            let digit = captures.get(1).expect("capture group").as_str();
            ApiVersion::from_digit(digit)
                .ok_or_else(|| IiifError::UnsupportedVersion(digit.to_string()))?
        }
    };

    let path_prefix = match explicit_prefix {
        Some(prefix) => prefix.to_string(),
        None => format!("iiif/{}/", version),
    };

    Ok(ResolvedVersion {
        version,
        path_prefix,
    })
}
