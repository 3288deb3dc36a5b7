//! Ordered search across the configured registries
//!
//! The aggregator owns the run's registry list, built once from
//! configuration and shared read-only across all concurrent document tasks.
//! [`RegistryAggregator::find_package`] walks the list in priority order and
//! stops at the first feed that yields an exact-title match; a feed that is
//! unreachable or returns malformed data is logged and treated as having no
//! candidate.

use std::sync::Arc;

use tracing::{debug, warn};

use super::client::{NuGetRegistry, PackageCandidate, PackageRegistry, RegistryError};
use crate::config::PackrefConfig;

/// A candidate together with the registry that produced it, so the caller
/// can fetch the version list from the same feed.
pub struct FoundPackage {
    pub candidate: PackageCandidate,
    pub registry: Arc<dyn PackageRegistry>,
}

pub struct RegistryAggregator {
    registries: Vec<Arc<dyn PackageRegistry>>,
    page_size: usize,
}

impl RegistryAggregator {
    pub fn new(registries: Vec<Arc<dyn PackageRegistry>>, page_size: usize) -> Self {
        Self {
            registries,
            page_size,
        }
    }

    /// Builds one NuGet client per configured source, keeping the
    /// configured order as the search priority.
    pub fn from_config(config: &PackrefConfig) -> Result<Self, RegistryError> {
        let mut registries: Vec<Arc<dyn PackageRegistry>> = Vec::new();
        for source in &config.sources {
            registries.push(Arc::new(NuGetRegistry::new(
                source.clone(),
                config.request_timeout(),
            )?));
        }
        Ok(Self::new(registries, config.search_page_size))
    }

    pub fn registries(&self) -> &[Arc<dyn PackageRegistry>] {
        &self.registries
    }

    /// Searches the registries in order for a package whose title equals
    /// `name` exactly (case-sensitive), short-circuiting on the first hit.
    pub async fn find_package(
        &self,
        name: &str,
        include_prerelease: bool,
    ) -> Option<FoundPackage> {
        for registry in &self.registries {
            match registry
                .search(name, include_prerelease, 0, self.page_size)
                .await
            {
                Ok(candidates) => {
                    if let Some(candidate) = candidates.into_iter().find(|c| c.title == name) {
                        debug!(
                            package = %candidate.id,
                            registry = registry.name(),
                            "found matching package"
                        );
                        return Some(FoundPackage {
                            candidate,
                            registry: Arc::clone(registry),
                        });
                    }
                }
                Err(err) => {
                    warn!(
                        registry = registry.name(),
                        error = %err,
                        "registry search failed, trying next source"
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::mock::MockRegistry;

    fn aggregator_of(mocks: &[&Arc<MockRegistry>]) -> RegistryAggregator {
        let registries = mocks
            .iter()
            .map(|mock| Arc::clone(mock) as Arc<dyn PackageRegistry>)
            .collect();
        RegistryAggregator::new(registries, 10)
    }

    #[tokio::test]
    async fn first_matching_registry_short_circuits() {
        let primary = Arc::new(MockRegistry::new("primary").with_package("Newtonsoft.Json", &["13.0.3"]));
        let secondary =
            Arc::new(MockRegistry::new("secondary").with_package("Newtonsoft.Json", &["12.0.3"]));
        let aggregator = aggregator_of(&[&primary, &secondary]);

        let found = aggregator
            .find_package("Newtonsoft.Json", false)
            .await
            .expect("package found");
        assert_eq!(found.registry.name(), "primary");
        assert_eq!(found.candidate.title, "Newtonsoft.Json");
        assert_eq!(primary.search_count(), 1);
        assert_eq!(secondary.search_count(), 0, "second registry never queried");
    }

    #[tokio::test]
    async fn title_match_is_exact_and_case_sensitive() {
        let registry = Arc::new(
            MockRegistry::new("mock")
                .with_titled_package("newtonsoft.json", "newtonsoft.json", &["13.0.3"])
                .with_package("Newtonsoft.Json.Bson", &["1.0.2"]),
        );
        let aggregator = aggregator_of(&[&registry]);

        assert!(aggregator.find_package("Newtonsoft.Json", false).await.is_none());
    }

    #[tokio::test]
    async fn unreachable_registry_falls_through_to_next() {
        let broken = Arc::new(MockRegistry::new("broken").failing());
        let healthy = Arc::new(MockRegistry::new("healthy").with_package("Serilog", &["3.1.1"]));
        let aggregator = aggregator_of(&[&broken, &healthy]);

        let found = aggregator
            .find_package("Serilog", false)
            .await
            .expect("healthy registry answers");
        assert_eq!(found.registry.name(), "healthy");
        assert_eq!(broken.search_count(), 1);
    }

    #[tokio::test]
    async fn all_registries_failing_degrades_to_none() {
        let a = Arc::new(MockRegistry::new("a").failing());
        let b = Arc::new(MockRegistry::new("b").failing());
        let aggregator = aggregator_of(&[&a, &b]);

        assert!(aggregator.find_package("Anything", false).await.is_none());
        assert_eq!(a.search_count(), 1);
        assert_eq!(b.search_count(), 1);
    }

    #[tokio::test]
    async fn empty_registry_list_finds_nothing() {
        let aggregator = RegistryAggregator::new(Vec::new(), 10);
        assert!(aggregator.find_package("Anything", false).await.is_none());
    }
}
