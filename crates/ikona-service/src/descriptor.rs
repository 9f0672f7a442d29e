//! Request descriptor parsing
//!
//! Splits a full request URL into base URL, image identifier, and request
//! path, anchored on the resolved path prefix, then delegates the path to
//! the version bundle's grammar.

use ikona_core::request::{trim_slashes, with_trailing_slash};
use ikona_core::version::ResolvedVersion;
use ikona_core::{IiifError, IiifResult, ParsedPath, RequestContext};
use ikona_versions::VersionBundle;

fn strip_query_and_fragment(url: &str) -> &str {
    let url = url.split('?').next().unwrap_or(url);
    url.split('#').next().unwrap_or(url)
}

/// Parse a full request URL into a `RequestContext`.
///
/// The URL must anchor as `http(s)://<host>/<path_prefix>/<id>/<rest>`;
/// anything else is a malformed URL.
pub fn parse_descriptor(
    url: &str,
    resolved: &ResolvedVersion,
    bundle: &dyn VersionBundle,
) -> IiifResult<RequestContext> {
    let stripped = strip_query_and_fragment(url);

    let after_scheme = stripped
        .strip_prefix("https://")
        .or_else(|| stripped.strip_prefix("http://"))
        .ok_or_else(|| IiifError::MalformedUrl(format!("{}: expected http(s) scheme", url)))?;

    let (host, path) = after_scheme
        .split_once('/')
        .ok_or_else(|| IiifError::MalformedUrl(format!("{}: no path", url)))?;
    if host.is_empty() {
        return Err(IiifError::MalformedUrl(format!("{}: empty host", url)));
    }

    let prefix = trim_slashes(&resolved.path_prefix);
    let rest = path
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .ok_or_else(|| {
            IiifError::MalformedUrl(format!("{}: path does not start with {:?}", url, prefix))
        })?;

    let (image_id, request_path) = rest
        .split_once('/')
        .ok_or_else(|| IiifError::MalformedUrl(format!("{}: missing request path", url)))?;
    if image_id.is_empty() {
        return Err(IiifError::MalformedUrl(format!("{}: empty identifier", url)));
    }

    let parsed = bundle.parse_path(request_path)?;
    let filename = match &parsed {
        ParsedPath::Info => "info.json".to_string(),
        ParsedPath::Image(params) => format!("{}.{}", params.quality, params.format),
    };

    let scheme = if stripped.starts_with("https://") {
        "https"
    } else {
        "http"
    };
    let base_url = with_trailing_slash(&format!("{}://{}/{}", scheme, host, prefix));

    Ok(RequestContext {
        version: resolved.version,
        path_prefix: resolved.path_prefix.clone(),
        base_url,
        image_id: image_id.to_string(),
        filename,
        parsed,
    })
}
