//! Shared fixtures for processor integration tests

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbImage};
use tempfile::TempDir;

use ikona_core::ProcessorOptions;
use ikona_service::Processor;
use ikona_storage::{LocalSource, StreamProvider};

/// Horizontal-gradient PNG so crops, flips, and scales are observable
pub fn fixture_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, _| {
        image::Rgb([(x * 255 / width.max(1)) as u8, 64, 192])
    });
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

pub fn write_source(dir: &Path, name: &str, data: &[u8]) {
    std::fs::write(dir.join(name), data).unwrap();
}

/// Tempdir-backed processor with a simple local provider and defaults
pub fn processor(dir: &TempDir, options: ProcessorOptions) -> Processor {
    let provider = StreamProvider::Simple(Arc::new(LocalSource::new(dir.path())));
    Processor::new(provider, options).unwrap()
}

/// Same backing directory, scoped provider convention
pub fn scoped_processor(dir: &TempDir, options: ProcessorOptions) -> Processor {
    let provider = StreamProvider::Scoped(Arc::new(LocalSource::new(dir.path())));
    Processor::new(provider, options).unwrap()
}
