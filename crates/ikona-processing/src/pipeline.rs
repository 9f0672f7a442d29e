//! Operation pipeline builder
//!
//! Turns validated parameter tokens into a fully resolved, immutable
//! `Pipeline` in one pass. Stage order is fixed: the size stage validates
//! against the region stage's output extent, rotation applies after
//! crop/scale, quality after the geometric transforms, and the
//! format/metadata stages close the plan. Each stage also emits its
//! canonical token, so the pipeline doubles as the normalized form of the
//! request.

use ikona_core::version::ApiVersion;
use ikona_core::{CanonicalSegments, Dimensions, IiifError, IiifResult, ImageParams, MaxSize};

/// Crop rectangle resolved against the native dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionOp {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// True when the rectangle covers the whole native image
    pub full: bool,
}

/// Output dimensions resolved against the post-region extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeOp {
    pub width: u32,
    pub height: u32,
    /// True when the output exceeds the region extent
    pub upscaled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationOp {
    /// Degrees clockwise, normalized to [0, 360)
    pub degrees: f32,
    /// Horizontal mirror, applied before rotation
    pub mirror: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Default,
    Color,
    Gray,
    Bitonal,
}

impl Quality {
    pub fn from_token(token: &str) -> IiifResult<Self> {
        match token {
            "default" => Ok(Quality::Default),
            "color" => Ok(Quality::Color),
            "gray" => Ok(Quality::Gray),
            "bitonal" => Ok(Quality::Bitonal),
            other => Err(IiifError::InvalidQuality(other.to_string())),
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Quality::Default => "default",
            Quality::Color => "color",
            Quality::Gray => "gray",
            Quality::Bitonal => "bitonal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpg,
    Png,
    Webp,
    Gif,
    Tif,
}

impl OutputFormat {
    pub fn from_token(token: &str) -> IiifResult<Self> {
        match token {
            "jpg" => Ok(OutputFormat::Jpg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            "gif" => Ok(OutputFormat::Gif),
            "tif" => Ok(OutputFormat::Tif),
            other => Err(IiifError::InvalidFormat(other.to_string())),
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Gif => "gif",
            OutputFormat::Tif => "tif",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputFormat::Jpg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Gif => "image/gif",
            OutputFormat::Tif => "image/tiff",
        }
    }
}

/// Per-processor knobs the builder folds into the plan
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub max: Option<MaxSize>,
    pub density: Option<u32>,
    pub include_metadata: bool,
}

/// Fully resolved transform plan. Built once, consumed once by the raster
/// engine; the canonical segments are the normalized form of the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub region: RegionOp,
    pub size: SizeOp,
    pub rotation: RotationOp,
    pub quality: Quality,
    pub format: OutputFormat,
    pub density: Option<u32>,
    pub include_metadata: bool,
    canonical: CanonicalSegments,
}

impl Pipeline {
    /// Resolve and validate all parameters against the native dimensions
    /// in one pass.
    pub fn build(
        version: ApiVersion,
        dimensions: &[Dimensions],
        params: &ImageParams,
        options: &BuildOptions,
    ) -> IiifResult<Pipeline> {
        let native = *dimensions
            .first()
            .ok_or_else(|| IiifError::Engine("empty dimension set".to_string()))?;
        let max = options.max.unwrap_or_default();

        let (region, region_token) = resolve_region(&params.region, native)?;
        let extent = Dimensions::new(region.width, region.height);
        let (size, size_token) = resolve_size(version, &params.size, extent, max)?;
        let (rotation, rotation_token) = resolve_rotation(&params.rotation)?;
        let quality = Quality::from_token(&params.quality)?;
        let format = OutputFormat::from_token(&params.format)?;

        tracing::debug!(
            region = %region_token,
            size = %size_token,
            rotation = %rotation_token,
            quality = quality.token(),
            format = format.token(),
            "pipeline resolved"
        );

        Ok(Pipeline {
            region,
            size,
            rotation,
            quality,
            format,
            density: options.density,
            include_metadata: options.include_metadata,
            canonical: CanonicalSegments {
                region: region_token,
                size: size_token,
                rotation: rotation_token,
                quality: quality.token().to_string(),
                format: format.token().to_string(),
            },
        })
    }

    /// Canonical tokens, one per parameter, for the version bundle to join
    pub fn canonical_segments(&self) -> &CanonicalSegments {
        &self.canonical
    }
}

fn parse_u32_list(s: &str, n: usize) -> Option<Vec<u32>> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != n {
        return None;
    }
    parts.iter().map(|p| p.parse::<u32>().ok()).collect()
}

fn parse_f64_list(s: &str, n: usize) -> Option<Vec<f64>> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != n {
        return None;
    }
    parts.iter().map(|p| p.parse::<f64>().ok()).collect()
}

fn resolve_region(token: &str, native: Dimensions) -> IiifResult<(RegionOp, String)> {
    let (nw, nh) = (native.width, native.height);

    let (x, y, w, h) = if token == "full" {
        (0, 0, nw, nh)
    } else if token == "square" {
        let side = nw.min(nh);
        ((nw - side) / 2, (nh - side) / 2, side, side)
    } else if let Some(rest) = token.strip_prefix("pct:") {
        let values = parse_f64_list(rest, 4)
            .ok_or_else(|| IiifError::InvalidRegion(token.to_string()))?;
        let px = |v: f64, extent: u32| ((extent as f64) * v / 100.0).round() as u32;
        (px(values[0], nw), px(values[1], nh), px(values[2], nw), px(values[3], nh))
    } else {
        let values = parse_u32_list(token, 4)
            .ok_or_else(|| IiifError::InvalidRegion(token.to_string()))?;
        (values[0], values[1], values[2], values[3])
    };

    if w == 0 || h == 0 {
        return Err(IiifError::InvalidRegion(format!("{}: zero extent", token)));
    }
    if x >= nw || y >= nh {
        return Err(IiifError::InvalidRegion(format!(
            "{}: origin outside {}x{}",
            token, nw, nh
        )));
    }

    // Clamp, never pass an out-of-range rectangle through
    let w = w.min(nw - x);
    let h = h.min(nh - y);
    let full = x == 0 && y == 0 && w == nw && h == nh;

    let canonical = if full {
        "full".to_string()
    } else {
        format!("{},{},{},{}", x, y, w, h)
    };

    Ok((
        RegionOp {
            x,
            y,
            width: w,
            height: h,
            full,
        },
        canonical,
    ))
}

/// Derive the missing dimension preserving aspect ratio, rounding to
/// nearest.
fn scale_to(value: u32, numerator: u32, denominator: u32) -> u32 {
    ((value as f64) * (numerator as f64) / (denominator as f64)).round() as u32
}

/// Proportional floor-clamp so `width` lands exactly on `limit`
fn clamp_width(width: u32, height: u32, limit: u32) -> (u32, u32) {
    let clamped_height = (height as u64 * limit as u64 / width as u64) as u32;
    (limit, clamped_height)
}

fn resolve_size(
    version: ApiVersion,
    token: &str,
    extent: Dimensions,
    max: MaxSize,
) -> IiifResult<(SizeOp, String)> {
    let (rw, rh) = (extent.width, extent.height);
    let (upscale_requested, body) = match token.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let invalid = || IiifError::InvalidSize(token.to_string());

    // Aspect-preserving forms matter for the v2 canonical token
    let (mut w, mut h, aspect) = if body == "full" || body == "max" {
        if body == "max" && upscale_requested {
            // ^max scales the region extent up to the configured ceiling
            match max.width {
                Some(limit) => (limit, scale_to(limit, rh, rw), true),
                None => (rw, rh, true),
            }
        } else {
            (rw, rh, true)
        }
    } else if let Some(rest) = body.strip_prefix("pct:") {
        let pct: f64 = rest.parse().map_err(|_| invalid())?;
        if pct <= 0.0 {
            return Err(invalid());
        }
        (
            ((rw as f64) * pct / 100.0).round() as u32,
            ((rh as f64) * pct / 100.0).round() as u32,
            true,
        )
    } else if let Some(rest) = body.strip_prefix('!') {
        let values = parse_u32_list(rest, 2).ok_or_else(|| invalid())?;
        let (bw, bh) = (values[0], values[1]);
        if bw == 0 || bh == 0 {
            return Err(invalid());
        }
        // Best fit inside bw x bh, preserving aspect
        let scale = f64::min(bw as f64 / rw as f64, bh as f64 / rh as f64);
        (
            ((rw as f64) * scale).round() as u32,
            ((rh as f64) * scale).round() as u32,
            true,
        )
    } else if let Some(width) = body.strip_suffix(',') {
        let width: u32 = width.parse().map_err(|_| invalid())?;
        (width, scale_to(width, rh, rw), true)
    } else if let Some(height) = body.strip_prefix(',') {
        let height: u32 = height.parse().map_err(|_| invalid())?;
        (scale_to(height, rw, rh), height, true)
    } else {
        let values = parse_u32_list(body, 2).ok_or_else(|| invalid())?;
        (values[0], values[1], false)
    };

    if w == 0 || h == 0 {
        return Err(invalid());
    }

    // v3 requests without the upscale prefix are clamped to the region
    // extent; v2 may upscale freely.
    if version == ApiVersion::V3 && !upscale_requested && (w > rw || h > rh) {
        tracing::debug!(
            requested_width = w,
            requested_height = h,
            region_width = rw,
            region_height = rh,
            "clamping non-upscale size request to region extent"
        );
        if (w as u64) * (rh as u64) >= (h as u64) * (rw as u64) {
            let (cw, ch) = clamp_width(w, h, rw);
            w = cw;
            h = ch;
        } else {
            let (ch, cw) = clamp_width(h, w, rh);
            w = cw;
            h = ch;
        }
    }

    // Enforce the configured ceiling, flooring the derived dimension
    if let Some(limit) = max.width {
        if w > limit {
            let (cw, ch) = clamp_width(w, h, limit);
            w = cw;
            h = ch;
        }
    }
    if let Some(limit) = max.height {
        if h > limit {
            let (ch, cw) = clamp_width(h, w, limit);
            w = cw;
            h = ch;
        }
    }

    if w == 0 || h == 0 {
        return Err(invalid());
    }

    let upscaled = w > rw || h > rh;

    // The canonical keyword stands for "as large as permitted": the region
    // extent run through the same ceiling clamp.
    let keyword_size = {
        let (mut kw, mut kh) = (rw, rh);
        if let Some(limit) = max.width {
            if kw > limit {
                let (cw, ch) = clamp_width(kw, kh, limit);
                kw = cw;
                kh = ch;
            }
        }
        if let Some(limit) = max.height {
            if kh > limit {
                let (ch, cw) = clamp_width(kh, kw, limit);
                kw = cw;
                kh = ch;
            }
        }
        (kw, kh)
    };

    let canonical = if !upscaled && (w, h) == keyword_size {
        match version {
            ApiVersion::V2 => "full".to_string(),
            ApiVersion::V3 => "max".to_string(),
        }
    } else {
        match version {
            ApiVersion::V2 if aspect => format!("{},", w),
            ApiVersion::V2 => format!("{},{}", w, h),
            ApiVersion::V3 if upscaled => format!("^{},{}", w, h),
            ApiVersion::V3 => format!("{},{}", w, h),
        }
    };

    Ok((
        SizeOp {
            width: w,
            height: h,
            upscaled,
        },
        canonical,
    ))
}

fn resolve_rotation(token: &str) -> IiifResult<(RotationOp, String)> {
    let (mirror, body) = match token.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let degrees: f32 = body
        .parse()
        .map_err(|_| IiifError::InvalidRotation(token.to_string()))?;
    if !(0.0..=360.0).contains(&degrees) {
        return Err(IiifError::InvalidRotation(format!(
            "{}: angle must be within 0..=360",
            token
        )));
    }
    let degrees = degrees % 360.0;

    let formatted = if degrees.fract() == 0.0 {
        format!("{}", degrees as u32)
    } else {
        format!("{}", degrees)
    };
    let canonical = if mirror {
        format!("!{}", formatted)
    } else {
        formatted
    };

    Ok((RotationOp { degrees, mirror }, canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(region: &str, size: &str, rotation: &str, quality: &str, format: &str) -> ImageParams {
        ImageParams {
            region: region.to_string(),
            size: size.to_string(),
            rotation: rotation.to_string(),
            quality: quality.to_string(),
            format: format.to_string(),
        }
    }

    fn build(version: ApiVersion, native: (u32, u32), p: ImageParams) -> IiifResult<Pipeline> {
        Pipeline::build(
            version,
            &[Dimensions::new(native.0, native.1)],
            &p,
            &BuildOptions::default(),
        )
    }

    fn build_with_max(
        version: ApiVersion,
        native: (u32, u32),
        p: ImageParams,
        max: MaxSize,
    ) -> IiifResult<Pipeline> {
        Pipeline::build(
            version,
            &[Dimensions::new(native.0, native.1)],
            &p,
            &BuildOptions {
                max: Some(max),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_full_region_full_size() {
        let pipeline = build(
            ApiVersion::V2,
            (1000, 800),
            params("full", "full", "0", "default", "jpg"),
        )
        .unwrap();
        assert!(pipeline.region.full);
        assert_eq!((pipeline.size.width, pipeline.size.height), (1000, 800));
        assert_eq!(pipeline.canonical_segments().region, "full");
        assert_eq!(pipeline.canonical_segments().size, "full");
    }

    #[test]
    fn test_square_region_is_centered() {
        let pipeline = build(
            ApiVersion::V3,
            (1000, 800),
            params("square", "max", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!(
            (pipeline.region.x, pipeline.region.y, pipeline.region.width, pipeline.region.height),
            (100, 0, 800, 800)
        );
        assert_eq!(pipeline.canonical_segments().region, "100,0,800,800");
    }

    #[test]
    fn test_absolute_region_is_clamped_to_bounds() {
        let pipeline = build(
            ApiVersion::V2,
            (1000, 800),
            params("900,700,500,500", "full", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!(
            (pipeline.region.width, pipeline.region.height),
            (100, 100)
        );
        assert_eq!(pipeline.canonical_segments().region, "900,700,100,100");
    }

    #[test]
    fn test_region_outside_bounds_is_invalid() {
        let result = build(
            ApiVersion::V2,
            (1000, 800),
            params("1000,0,10,10", "full", "0", "default", "jpg"),
        );
        assert!(matches!(result, Err(IiifError::InvalidRegion(_))));
    }

    #[test]
    fn test_zero_extent_region_is_invalid() {
        let result = build(
            ApiVersion::V2,
            (1000, 800),
            params("0,0,0,100", "full", "0", "default", "jpg"),
        );
        assert!(matches!(result, Err(IiifError::InvalidRegion(_))));
    }

    #[test]
    fn test_pct_region() {
        let pipeline = build(
            ApiVersion::V2,
            (1000, 800),
            params("pct:10,10,50,50", "full", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!(
            (pipeline.region.x, pipeline.region.y, pipeline.region.width, pipeline.region.height),
            (100, 80, 500, 400)
        );
    }

    #[test]
    fn test_size_width_only_preserves_aspect() {
        let pipeline = build(
            ApiVersion::V2,
            (1000, 800),
            params("full", "500,", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!((pipeline.size.width, pipeline.size.height), (500, 400));
        assert_eq!(pipeline.canonical_segments().size, "500,");
    }

    #[test]
    fn test_size_height_only_preserves_aspect() {
        let pipeline = build(
            ApiVersion::V3,
            (1000, 800),
            params("full", ",400", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!((pipeline.size.width, pipeline.size.height), (500, 400));
        assert_eq!(pipeline.canonical_segments().size, "500,400");
    }

    #[test]
    fn test_size_pct() {
        let pipeline = build(
            ApiVersion::V2,
            (1000, 800),
            params("full", "pct:25", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!((pipeline.size.width, pipeline.size.height), (250, 200));
    }

    #[test]
    fn test_size_best_fit() {
        let pipeline = build(
            ApiVersion::V2,
            (1000, 800),
            params("full", "!300,300", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!((pipeline.size.width, pipeline.size.height), (300, 240));
    }

    #[test]
    fn test_size_exact_distorts() {
        let pipeline = build(
            ApiVersion::V2,
            (1000, 800),
            params("full", "300,300", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!((pipeline.size.width, pipeline.size.height), (300, 300));
        assert_eq!(pipeline.canonical_segments().size, "300,300");
    }

    #[test]
    fn test_size_resolves_against_region_extent() {
        let pipeline = build(
            ApiVersion::V2,
            (1000, 800),
            params("0,0,500,400", "pct:50", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!((pipeline.size.width, pipeline.size.height), (250, 200));
    }

    #[test]
    fn test_v3_without_caret_clamps_to_region_extent() {
        let pipeline = build(
            ApiVersion::V3,
            (1000, 800),
            params("full", "2000,1600", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!((pipeline.size.width, pipeline.size.height), (1000, 800));
        assert!(!pipeline.size.upscaled);
        assert_eq!(pipeline.canonical_segments().size, "max");
    }

    #[test]
    fn test_v3_caret_upscales() {
        let pipeline = build(
            ApiVersion::V3,
            (1000, 800),
            params("full", "^2000,1600", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!((pipeline.size.width, pipeline.size.height), (2000, 1600));
        assert!(pipeline.size.upscaled);
        assert_eq!(pipeline.canonical_segments().size, "^2000,1600");
    }

    #[test]
    fn test_v2_upscale_is_allowed_without_prefix() {
        let pipeline = build(
            ApiVersion::V2,
            (1000, 800),
            params("full", "2000,", "0", "default", "jpg"),
        )
        .unwrap();
        assert_eq!((pipeline.size.width, pipeline.size.height), (2000, 1600));
        assert!(pipeline.size.upscaled);
    }

    #[test]
    fn test_max_width_clamps_exactly_with_floored_height() {
        let pipeline = build_with_max(
            ApiVersion::V2,
            (1000, 800),
            params("full", "full", "0", "default", "jpg"),
            MaxSize {
                width: Some(500),
                height: None,
            },
        )
        .unwrap();
        assert_eq!(pipeline.size.width, 500);
        assert_eq!(pipeline.size.height, 400);
        // still the maximum permitted size, so the keyword stays canonical
        assert_eq!(pipeline.canonical_segments().size, "full");
    }

    #[test]
    fn test_max_height_clamps_after_width() {
        let pipeline = build_with_max(
            ApiVersion::V3,
            (1000, 800),
            params("full", "max", "0", "default", "jpg"),
            MaxSize {
                width: Some(500),
                height: Some(300),
            },
        )
        .unwrap();
        assert_eq!(pipeline.size.height, 300);
        assert_eq!(pipeline.size.width, 375);
    }

    #[test]
    fn test_v3_caret_max_scales_to_ceiling() {
        let pipeline = build_with_max(
            ApiVersion::V3,
            (1000, 800),
            params("full", "^max", "0", "default", "jpg"),
            MaxSize {
                width: Some(2000),
                height: None,
            },
        )
        .unwrap();
        assert_eq!((pipeline.size.width, pipeline.size.height), (2000, 1600));
        assert!(pipeline.size.upscaled);
    }

    #[test]
    fn test_rotation_variants() {
        let pipeline = build(
            ApiVersion::V2,
            (100, 100),
            params("full", "full", "!90", "default", "jpg"),
        )
        .unwrap();
        assert!(pipeline.rotation.mirror);
        assert_eq!(pipeline.rotation.degrees, 90.0);
        assert_eq!(pipeline.canonical_segments().rotation, "!90");

        let pipeline = build(
            ApiVersion::V2,
            (100, 100),
            params("full", "full", "22.5", "default", "jpg"),
        )
        .unwrap();
        assert_eq!(pipeline.rotation.degrees, 22.5);
        assert_eq!(pipeline.canonical_segments().rotation, "22.5");
    }

    #[test]
    fn test_rotation_360_normalizes_to_zero() {
        let pipeline = build(
            ApiVersion::V2,
            (100, 100),
            params("full", "full", "360", "default", "jpg"),
        )
        .unwrap();
        assert_eq!(pipeline.rotation.degrees, 0.0);
        assert_eq!(pipeline.canonical_segments().rotation, "0");
    }

    #[test]
    fn test_rotation_out_of_range() {
        let result = build(
            ApiVersion::V2,
            (100, 100),
            params("full", "full", "361", "default", "jpg"),
        );
        assert!(matches!(result, Err(IiifError::InvalidRotation(_))));
    }

    #[test]
    fn test_quality_and_format_resolution() {
        let pipeline = build(
            ApiVersion::V3,
            (100, 100),
            params("full", "max", "0", "bitonal", "png"),
        )
        .unwrap();
        assert_eq!(pipeline.quality, Quality::Bitonal);
        assert_eq!(pipeline.format, OutputFormat::Png);
        assert_eq!(pipeline.format.mime(), "image/png");
    }

    #[test]
    fn test_options_flow_through() {
        let pipeline = Pipeline::build(
            ApiVersion::V2,
            &[Dimensions::new(100, 100)],
            &params("full", "full", "0", "default", "jpg"),
            &BuildOptions {
                max: None,
                density: Some(300),
                include_metadata: true,
            },
        )
        .unwrap();
        assert_eq!(pipeline.density, Some(300));
        assert!(pipeline.include_metadata);
    }
}
