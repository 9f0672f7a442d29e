//! Raster engine seam
//!
//! The engine is an opaque asynchronous collaborator: a metadata probe and
//! an encode pipeline taking the resolved plan. `ImageEngine` is the
//! default implementation on the `image` crate; deployments with other
//! backends (vips, GPU) implement the trait instead.

use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba};
use ikona_core::{IiifError, IiifResult};

use crate::pipeline::{OutputFormat, Pipeline, Quality};

/// What the metadata probe reports about a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Resolution pages the source exposes; 1 for flat rasters
    pub pages: u32,
}

/// Encoded output plus its MIME type
#[derive(Debug, Clone)]
pub struct Rendered {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

#[async_trait]
pub trait RasterEngine: Send + Sync {
    /// Probe native dimensions and the resolution-page count
    async fn probe(&self, data: &[u8]) -> IiifResult<SourceInfo>;

    /// Decode, apply the resolved plan, and encode
    async fn render(&self, data: &[u8], pipeline: &Pipeline) -> IiifResult<Rendered>;
}

/// Default engine on the `image` crate. Flat rasters only: the probe
/// always reports a single page.
#[derive(Clone, Default)]
pub struct ImageEngine;

impl ImageEngine {
    pub fn new() -> Self {
        Self
    }

    fn decode(data: &[u8]) -> IiifResult<DynamicImage> {
        image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| IiifError::Engine(format!("format detection failed: {}", e)))?
            .decode()
            .map_err(|e| IiifError::Engine(format!("decode failed: {}", e)))
    }

    fn apply_rotation(img: DynamicImage, degrees: f32, mirror: bool) -> DynamicImage {
        let img = if mirror { img.fliph() } else { img };
        match degrees {
            d if d == 0.0 => img,
            d if d == 90.0 => img.rotate90(),
            d if d == 180.0 => img.rotate180(),
            d if d == 270.0 => img.rotate270(),
            d => {
                // Arbitrary angles rotate about the center on a fixed
                // canvas; corners outside the canvas are clipped.
                let rgba = img.to_rgba8();
                let rotated = imageproc::geometric_transformations::rotate_about_center(
                    &rgba,
                    d.to_radians(),
                    imageproc::geometric_transformations::Interpolation::Bilinear,
                    Rgba([0, 0, 0, 0]),
                );
                DynamicImage::ImageRgba8(rotated)
            }
        }
    }

    fn apply_quality(img: DynamicImage, quality: Quality) -> DynamicImage {
        match quality {
            Quality::Default | Quality::Color => img,
            Quality::Gray => DynamicImage::ImageLuma8(img.to_luma8()),
            Quality::Bitonal => {
                let mut luma = img.to_luma8();
                for pixel in luma.pixels_mut() {
                    pixel.0[0] = if pixel.0[0] >= 128 { 255 } else { 0 };
                }
                DynamicImage::ImageLuma8(luma)
            }
        }
    }

    fn encode(img: &DynamicImage, format: OutputFormat) -> IiifResult<Vec<u8>> {
        let (image_format, img) = match format {
            // The jpeg encoder has no alpha support
            OutputFormat::Jpg => (
                ImageFormat::Jpeg,
                match img {
                    DynamicImage::ImageLuma8(_) => img.clone(),
                    _ => DynamicImage::ImageRgb8(img.to_rgb8()),
                },
            ),
            OutputFormat::Png => (ImageFormat::Png, img.clone()),
            // The webp encoder takes RGB8/RGBA8 only
            OutputFormat::Webp => (
                ImageFormat::WebP,
                match img {
                    DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img.clone(),
                    _ => DynamicImage::ImageRgb8(img.to_rgb8()),
                },
            ),
            OutputFormat::Gif => (ImageFormat::Gif, DynamicImage::ImageRgba8(img.to_rgba8())),
            OutputFormat::Tif => (ImageFormat::Tiff, img.clone()),
        };

        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image_format)
            .map_err(|e| IiifError::Engine(format!("encode failed: {}", e)))?;
        Ok(buffer)
    }

    /// Copy the source EXIF block into the encoded output where the
    /// container supports it (jpeg, png, webp).
    fn carry_metadata(source: &[u8], encoded: Vec<u8>) -> Vec<u8> {
        use img_parts::{DynImage, ImageEXIF};

        let exif = match DynImage::from_bytes(Bytes::copy_from_slice(source)) {
            Ok(Some(src)) => src.exif(),
            _ => None,
        };
        let Some(exif) = exif else {
            return encoded;
        };

        match DynImage::from_bytes(Bytes::from(encoded.clone())) {
            Ok(Some(mut out)) => {
                out.set_exif(Some(exif));
                let mut buffer = Vec::with_capacity(encoded.len());
                if out.encoder().write_to(&mut buffer).is_ok() {
                    buffer
                } else {
                    encoded
                }
            }
            _ => {
                tracing::debug!("output container does not carry EXIF, skipping metadata");
                encoded
            }
        }
    }
}

#[async_trait]
impl RasterEngine for ImageEngine {
    async fn probe(&self, data: &[u8]) -> IiifResult<SourceInfo> {
        let (width, height) = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| IiifError::Engine(format!("format detection failed: {}", e)))?
            .into_dimensions()
            .map_err(|e| IiifError::Engine(format!("metadata probe failed: {}", e)))?;

        Ok(SourceInfo {
            width,
            height,
            pages: 1,
        })
    }

    async fn render(&self, data: &[u8], pipeline: &Pipeline) -> IiifResult<Rendered> {
        let mut img = Self::decode(data)?;

        let region = pipeline.region;
        if !region.full {
            img = img.crop_imm(region.x, region.y, region.width, region.height);
        }

        let size = pipeline.size;
        if (size.width, size.height) != (region.width, region.height) {
            img = img.resize_exact(size.width, size.height, FilterType::Lanczos3);
        }

        img = Self::apply_rotation(img, pipeline.rotation.degrees, pipeline.rotation.mirror);
        img = Self::apply_quality(img, pipeline.quality);

        if let Some(density) = pipeline.density {
            // No portable density write path in the image crate
            tracing::debug!(density = density, "pixel density not embedded by ImageEngine");
        }

        let mut encoded = Self::encode(&img, pipeline.format)?;
        if pipeline.include_metadata {
            encoded = Self::carry_metadata(data, encoded);
        }

        tracing::debug!(
            width = size.width,
            height = size.height,
            format = pipeline.format.token(),
            bytes = encoded.len(),
            "render complete"
        );

        Ok(Rendered {
            bytes: Bytes::from(encoded),
            content_type: pipeline.format.mime(),
        })
    }
}
