//! IIIF Image API 2.1 bundle
//!
//! Grammar reference: <https://iiif.io/api/image/2.1/>. Region `square` is
//! the 2.1 addition; size accepts both `full` and `max`.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use ikona_core::version::ApiVersion;
use ikona_core::{
    CanonicalSegments, Dimensions, IiifError, IiifResult, ImageParams, ParsedPath,
};

use crate::bundle::{InfoParams, VersionBundle};

const CONTEXT: &str = "http://iiif.io/api/image/2/context.json";
const PROTOCOL: &str = "http://iiif.io/api/image";
const PROFILE: &str = "http://iiif.io/api/image/2/level2.json";

const FORMATS: [&str; 5] = ["jpg", "png", "webp", "gif", "tif"];
const QUALITIES: [&str; 4] = ["default", "color", "gray", "bitonal"];
const SUPPORTS: [&str; 6] = [
    "regionByPct",
    "regionSquare",
    "sizeByPct",
    "sizeByConfinedWh",
    "sizeByDistortedWh",
    "mirroring",
];

fn region_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(full|square|\d+,\d+,\d+,\d+|pct:\d+(\.\d+)?,\d+(\.\d+)?,\d+(\.\d+)?,\d+(\.\d+)?)$")
            .expect("static regex")
    })
}

fn size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(full|max|\d+,|,\d+|pct:\d+(\.\d+)?|!?\d+,\d+)$").expect("static regex")
    })
}

fn rotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^!?\d+(\.\d+)?$").expect("static regex"))
}

/// Split `<region>/<size>/<rotation>/<quality>.<format>` into its five
/// tokens. Structural mismatches (wrong segment count, missing dot) are
/// malformed-URL errors; token-level validation happens against the
/// version grammar afterwards.
fn split_image_path(path: &str) -> IiifResult<(String, String, String, String, String)> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() != 4 {
        return Err(IiifError::MalformedUrl(format!(
            "expected <region>/<size>/<rotation>/<quality>.<format>, got {:?}",
            path
        )));
    }
    let (quality, format) = segments[3]
        .rsplit_once('.')
        .ok_or_else(|| IiifError::MalformedUrl(format!("missing format extension in {:?}", path)))?;
    Ok((
        segments[0].to_string(),
        segments[1].to_string(),
        segments[2].to_string(),
        quality.to_string(),
        format.to_string(),
    ))
}

#[derive(Serialize)]
struct Info2 {
    #[serde(rename = "@context")]
    context: &'static str,
    #[serde(rename = "@id")]
    id: String,
    protocol: &'static str,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sizes: Vec<Dimensions>,
    profile: (&'static str, ProfileFeatures2),
}

#[derive(Serialize)]
struct ProfileFeatures2 {
    formats: Vec<&'static str>,
    qualities: Vec<&'static str>,
    supports: Vec<&'static str>,
    #[serde(rename = "maxWidth", skip_serializing_if = "Option::is_none")]
    max_width: Option<u32>,
    #[serde(rename = "maxHeight", skip_serializing_if = "Option::is_none")]
    max_height: Option<u32>,
}

#[derive(Debug)]
pub struct V2Bundle;

impl VersionBundle for V2Bundle {
    fn version(&self) -> ApiVersion {
        ApiVersion::V2
    }

    fn parse_path(&self, path: &str) -> IiifResult<ParsedPath> {
        let path = path.trim_matches('/');
        if path == "info.json" {
            return Ok(ParsedPath::Info);
        }

        let (region, size, rotation, quality, format) = split_image_path(path)?;

        if !region_re().is_match(&region) {
            return Err(IiifError::InvalidRegion(region));
        }
        if !size_re().is_match(&size) {
            return Err(IiifError::InvalidSize(size));
        }
        if !rotation_re().is_match(&rotation) {
            return Err(IiifError::InvalidRotation(rotation));
        }
        if !QUALITIES.contains(&quality.as_str()) {
            return Err(IiifError::InvalidQuality(quality));
        }
        if !FORMATS.contains(&format.as_str()) {
            return Err(IiifError::InvalidFormat(format));
        }

        Ok(ParsedPath::Image(ImageParams {
            region,
            size,
            rotation,
            quality,
            format,
        }))
    }

    fn info_document(&self, params: &InfoParams) -> serde_json::Value {
        let max = params.max.unwrap_or_default();
        let info = Info2 {
            context: CONTEXT,
            id: params.id.clone(),
            protocol: PROTOCOL,
            width: params.width,
            height: params.height,
            sizes: params.sizes.clone(),
            profile: (
                PROFILE,
                ProfileFeatures2 {
                    formats: FORMATS.to_vec(),
                    qualities: QUALITIES.to_vec(),
                    supports: SUPPORTS.to_vec(),
                    max_width: max.width,
                    max_height: max.height,
                },
            ),
        };
        serde_json::to_value(info).expect("info document serializes")
    }

    fn canonical_path(&self, image_id: &str, segments: &CanonicalSegments) -> String {
        format!(
            "{}/{}/{}/{}/{}.{}",
            image_id,
            segments.region,
            segments.size,
            segments.rotation,
            segments.quality,
            segments.format
        )
    }

    fn profile_link(&self) -> &'static str {
        PROFILE
    }
}
