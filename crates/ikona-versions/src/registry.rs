//! Version bundle registry
//!
//! A startup-time map from version identifier to its bundle. The registry
//! is built once and read-only afterwards, so request-time lookups need no
//! locking.

use std::collections::HashMap;
use std::sync::Arc;

use ikona_core::version::ApiVersion;
use ikona_core::{IiifError, IiifResult};

use crate::bundle::VersionBundle;
use crate::v2::V2Bundle;
use crate::v3::V3Bundle;

#[derive(Clone, Default)]
pub struct VersionRegistry {
    bundles: HashMap<ApiVersion, Arc<dyn VersionBundle>>,
}

impl VersionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            bundles: HashMap::new(),
        }
    }

    /// Registry with the stock v2 and v3 bundles registered
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(V2Bundle));
        registry.register(Arc::new(V3Bundle));
        registry
    }

    /// Register a bundle under the version it reports. Re-registering a
    /// version replaces the previous bundle.
    pub fn register(&mut self, bundle: Arc<dyn VersionBundle>) {
        let version = bundle.version();
        tracing::debug!(version = %version, "registering IIIF version bundle");
        self.bundles.insert(version, bundle);
    }

    /// Look up the bundle for a version
    pub fn get(&self, version: ApiVersion) -> IiifResult<Arc<dyn VersionBundle>> {
        self.bundles
            .get(&version)
            .cloned()
            .ok_or_else(|| IiifError::UnsupportedVersion(version.to_string()))
    }

    pub fn contains(&self, version: ApiVersion) -> bool {
        self.bundles.contains_key(&version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_both_versions() {
        let registry = VersionRegistry::with_defaults();
        assert!(registry.contains(ApiVersion::V2));
        assert!(registry.contains(ApiVersion::V3));
        assert_eq!(registry.get(ApiVersion::V2).unwrap().version(), ApiVersion::V2);
        assert_eq!(registry.get(ApiVersion::V3).unwrap().version(), ApiVersion::V3);
    }

    #[test]
    fn test_lookup_miss_names_the_version() {
        let registry = VersionRegistry::new();
        let err = registry.get(ApiVersion::V3).unwrap_err();
        assert!(matches!(err, IiifError::UnsupportedVersion(ref v) if v == "3"));
    }
}
