//! Error types module
//!
//! All request-processing failures are unified under the `IiifError` enum.
//! Parameter errors map to client-facing 400s, missing sources to 404, and
//! collaborator failures (engine, stream provider) to the 500 family. Every
//! variant is surfaced to the caller as-is; nothing in this crate retries.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum IiifError {
    #[error("Could not determine IIIF version from {0}")]
    VersionResolution(String),

    #[error("Unsupported IIIF version: {0}")]
    UnsupportedVersion(String),

    #[error("Malformed request URL: {0}")]
    MalformedUrl(String),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Invalid rotation: {0}")]
    InvalidRotation(String),

    #[error("Invalid quality: {0}")]
    InvalidQuality(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Stream resolution failed: {0}")]
    StreamResolution(String),

    #[error("Source not found: {0}")]
    NotFound(String),

    #[error("Dimension resolution failed")]
    DimensionResolution(#[source] anyhow::Error),

    #[error("Raster engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for request-processing operations
pub type IiifResult<T> = Result<T, IiifError>;

impl From<io::Error> for IiifError {
    fn from(err: io::Error) -> Self {
        IiifError::StreamResolution(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for IiifError {
    fn from(err: serde_json::Error) -> Self {
        IiifError::Engine(format!("JSON serialization error: {}", err))
    }
}

/// Static metadata per variant: (http_status, error_code).
/// Client message stays on the Display impl; transports that need a status
/// line read it from here, the same way for every variant.
fn static_metadata(err: &IiifError) -> (u16, &'static str) {
    match err {
        IiifError::VersionResolution(_) => (400, "VERSION_RESOLUTION"),
        IiifError::UnsupportedVersion(_) => (400, "UNSUPPORTED_VERSION"),
        IiifError::MalformedUrl(_) => (400, "MALFORMED_URL"),
        IiifError::InvalidRegion(_) => (400, "INVALID_REGION"),
        IiifError::InvalidSize(_) => (400, "INVALID_SIZE"),
        IiifError::InvalidRotation(_) => (400, "INVALID_ROTATION"),
        IiifError::InvalidQuality(_) => (400, "INVALID_QUALITY"),
        IiifError::InvalidFormat(_) => (400, "INVALID_FORMAT"),
        IiifError::StreamResolution(_) => (502, "STREAM_RESOLUTION"),
        IiifError::NotFound(_) => (404, "NOT_FOUND"),
        IiifError::DimensionResolution(_) => (500, "DIMENSION_RESOLUTION"),
        IiifError::Engine(_) => (500, "ENGINE_ERROR"),
        IiifError::Config(_) => (500, "CONFIGURATION_ERROR"),
    }
}

impl IiifError {
    /// HTTP status code a transport should answer with
    pub fn http_status(&self) -> u16 {
        static_metadata(self).0
    }

    /// Machine-readable error code (e.g., "INVALID_REGION")
    pub fn error_code(&self) -> &'static str {
        static_metadata(self).1
    }

    /// Full message including the source error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }
        details
    }
}
