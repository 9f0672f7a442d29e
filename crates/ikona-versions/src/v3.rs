//! IIIF Image API 3.0 bundle
//!
//! Grammar reference: <https://iiif.io/api/image/3.0/>. Size `full` is gone
//! in 3.0; upscaling requires the `^` prefix.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use ikona_core::version::ApiVersion;
use ikona_core::{
    CanonicalSegments, Dimensions, IiifError, IiifResult, ImageParams, ParsedPath,
};

use crate::bundle::{InfoParams, VersionBundle};

const CONTEXT: &str = "http://iiif.io/api/image/3/context.json";
const PROTOCOL: &str = "http://iiif.io/api/image";
const PROFILE: &str = "http://iiif.io/api/image/3/level2.json";
const SERVICE_TYPE: &str = "ImageService3";

const FORMATS: [&str; 5] = ["jpg", "png", "webp", "gif", "tif"];
const QUALITIES: [&str; 4] = ["default", "color", "gray", "bitonal"];
const EXTRA_FORMATS: [&str; 4] = ["png", "webp", "gif", "tif"];
const EXTRA_QUALITIES: [&str; 3] = ["color", "gray", "bitonal"];
const EXTRA_FEATURES: [&str; 6] = [
    "regionByPct",
    "regionSquare",
    "sizeByPct",
    "sizeByConfinedWh",
    "sizeUpscaling",
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
        Regex::new(r"^\^?(max|\d+,|,\d+|pct:\d+(\.\d+)?|!?\d+,\d+)$").expect("static regex")
    })
}

fn rotation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^!?\d+(\.\d+)?$").expect("static regex"))
}

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
struct Info3 {
    #[serde(rename = "@context")]
    context: &'static str,
    id: String,
    #[serde(rename = "type")]
    type_: &'static str,
    protocol: &'static str,
    profile: &'static str,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sizes: Vec<Dimensions>,
    #[serde(rename = "extraFormats")]
    extra_formats: Vec<&'static str>,
    #[serde(rename = "extraQualities")]
    extra_qualities: Vec<&'static str>,
    #[serde(rename = "extraFeatures")]
    extra_features: Vec<&'static str>,
    #[serde(rename = "maxWidth", skip_serializing_if = "Option::is_none")]
    max_width: Option<u32>,
    #[serde(rename = "maxHeight", skip_serializing_if = "Option::is_none")]
    max_height: Option<u32>,
}

#[derive(Debug)]
pub struct V3Bundle;

impl VersionBundle for V3Bundle {
    fn version(&self) -> ApiVersion {
        ApiVersion::V3
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
        let info = Info3 {
            context: CONTEXT,
            id: params.id.clone(),
            type_: SERVICE_TYPE,
            protocol: PROTOCOL,
            profile: "level2",
            width: params.width,
            height: params.height,
            sizes: params.sizes.clone(),
            extra_formats: EXTRA_FORMATS.to_vec(),
            extra_qualities: EXTRA_QUALITIES.to_vec(),
            extra_features: EXTRA_FEATURES.to_vec(),
            max_width: max.width,
            max_height: max.height,
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
