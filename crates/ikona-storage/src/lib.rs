//! Source stream providers
//!
//! Resolving an image identifier to a readable byte stream is an external
//! concern; this crate defines the capability (`StreamProvider` with its
//! two calling conventions) and ships a traversal-checked local filesystem
//! implementation.

pub mod local;
pub mod traits;

pub use local::LocalSource;
pub use traits::{
    ByteStream, ScopedResolver, SimpleResolver, SourceRequest, StreamConsumer, StreamError,
    StreamProvider, StreamResult,
};
