//! Ikona request executor
//!
//! Ties the workspace together: URL in, capability document or transformed
//! image out. Transport, caching, and authentication live outside; this
//! crate ends at the `ResponseEnvelope`.

pub mod descriptor;
pub mod processor;
pub mod telemetry;

pub use descriptor::parse_descriptor;
pub use processor::{Processor, ResponseEnvelope};
