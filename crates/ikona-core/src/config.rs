//! Configuration module
//!
//! Programmatic processor options plus an environment-driven loader. All
//! validation is synchronous and happens before any request is processed;
//! a bad configuration never gets as far as an async call.

use std::env;

use serde::Deserialize;

use crate::error::{IiifError, IiifResult};
use crate::version::ApiVersion;

/// Output size ceiling. Invariant: `height` must never be set without
/// `width`; `validate` enforces this at construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct MaxSize {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl MaxSize {
    pub fn validate(&self) -> IiifResult<()> {
        if self.height.is_some() && self.width.is_none() {
            return Err(IiifError::Config(
                "max.height requires max.width to be set".to_string(),
            ));
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(IiifError::Config("max dimensions must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Construction surface for a processor instance
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    /// Explicit API version; when unset the version is taken from the URL
    pub version: Option<ApiVersion>,
    /// Path prefix separating server routing from the IIIF request path;
    /// defaults to `iiif/<version>/`
    pub path_prefix: Option<String>,
    /// Optional output size ceiling
    pub max: Option<MaxSize>,
    /// Preserve source metadata (EXIF) in the output encode
    pub include_metadata: bool,
    /// Pixel density attached to the encode step when set
    pub density: Option<u32>,
}

impl ProcessorOptions {
    /// Fail-fast validation, run synchronously by `Processor::new`
    pub fn validate(&self) -> IiifResult<()> {
        if let Some(max) = &self.max {
            max.validate()?;
        }
        if let Some(prefix) = &self.path_prefix {
            if prefix.is_empty() {
                return Err(IiifError::Config("path_prefix must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

fn env_u32(name: &str) -> IiifResult<Option<u32>> {
    match env::var(name) {
        Ok(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| IiifError::Config(format!("{} must be an integer, got {:?}", name, value))),
        Err(_) => Ok(None),
    }
}

/// Environment-driven configuration, mirroring `ProcessorOptions`
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub options: ProcessorOptions,
    /// Root directory for the local source resolver, when one is used
    pub source_root: Option<String>,
}

impl ProcessorConfig {
    /// Load from `IKONA_*` environment variables.
    ///
    /// Recognized: `IKONA_IIIF_VERSION`, `IKONA_PATH_PREFIX`,
    /// `IKONA_MAX_WIDTH`, `IKONA_MAX_HEIGHT`, `IKONA_INCLUDE_METADATA`,
    /// `IKONA_DENSITY`, `IKONA_SOURCE_ROOT`.
    pub fn from_env() -> IiifResult<Self> {
        let version = match env::var("IKONA_IIIF_VERSION") {
            Ok(value) => Some(ApiVersion::from_digit(value.trim()).ok_or_else(|| {
                IiifError::Config(format!("IKONA_IIIF_VERSION must be 2 or 3, got {:?}", value))
            })?),
            Err(_) => None,
        };

        let max_width = env_u32("IKONA_MAX_WIDTH")?;
        let max_height = env_u32("IKONA_MAX_HEIGHT")?;
        let max = if max_width.is_some() || max_height.is_some() {
            Some(MaxSize {
                width: max_width,
                height: max_height,
            })
        } else {
            None
        };

        let include_metadata = env::var("IKONA_INCLUDE_METADATA")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let options = ProcessorOptions {
            version,
            path_prefix: env::var("IKONA_PATH_PREFIX").ok(),
            max,
            include_metadata,
            density: env_u32("IKONA_DENSITY")?,
        };
        options.validate()?;

        Ok(Self {
            options,
            source_root: env::var("IKONA_SOURCE_ROOT").ok(),
        })
    }
}
