//! Scripted in-memory registry for tests

use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{PackageCandidate, PackageRegistry, RegistryError};

#[derive(Debug, Clone)]
pub struct MockPackage {
    pub id: String,
    pub title: String,
    pub versions: Vec<String>,
}

/// A [`PackageRegistry`] backed by a fixed package list. Records every
/// search and version request so tests can assert on call order and
/// short-circuiting.
pub struct MockRegistry {
    name: String,
    packages: Vec<MockPackage>,
    fail_search: bool,
    fail_versions: bool,
    search_queries: Mutex<Vec<String>>,
    version_requests: Mutex<Vec<String>>,
}

impl MockRegistry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            packages: Vec::new(),
            fail_search: false,
            fail_versions: false,
            search_queries: Mutex::new(Vec::new()),
            version_requests: Mutex::new(Vec::new()),
        }
    }

    /// Adds a package whose title equals its id.
    pub fn with_package(self, id: impl Into<String>, versions: &[&str]) -> Self {
        let id = id.into();
        let title = id.clone();
        self.with_titled_package(id, title, versions)
    }

    pub fn with_titled_package(
        mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        versions: &[&str],
    ) -> Self {
        self.packages.push(MockPackage {
            id: id.into(),
            title: title.into(),
            versions: versions.iter().map(|v| v.to_string()).collect(),
        });
        self
    }

    /// Every search (and probe) fails, simulating an unreachable feed.
    pub fn failing(mut self) -> Self {
        self.fail_search = true;
        self
    }

    /// Version lookups fail even though search succeeds.
    pub fn failing_versions(mut self) -> Self {
        self.fail_versions = true;
        self
    }

    pub fn search_count(&self) -> usize {
        self.search_queries.lock().unwrap().len()
    }

    pub fn search_queries(&self) -> Vec<String> {
        self.search_queries.lock().unwrap().clone()
    }

    pub fn version_requests(&self) -> Vec<String> {
        self.version_requests.lock().unwrap().clone()
    }

    fn unavailable(&self) -> RegistryError {
        RegistryError::Status {
            name: self.name.clone(),
            status: 503,
            url: format!("mock://{}", self.name),
        }
    }
}

#[async_trait]
impl PackageRegistry for MockRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        query: &str,
        _include_prerelease: bool,
        skip: usize,
        take: usize,
    ) -> Result<Vec<PackageCandidate>, RegistryError> {
        self.search_queries.lock().unwrap().push(query.to_string());
        if self.fail_search {
            return Err(self.unavailable());
        }

        let query_lower = query.to_lowercase();
        Ok(self
            .packages
            .iter()
            .filter(|package| package.id.to_lowercase().contains(&query_lower))
            .skip(skip)
            .take(take)
            .map(|package| PackageCandidate {
                id: package.id.clone(),
                title: package.title.clone(),
            })
            .collect())
    }

    async fn versions(&self, package_id: &str) -> Result<Vec<String>, RegistryError> {
        self.version_requests
            .lock()
            .unwrap()
            .push(package_id.to_string());
        if self.fail_versions {
            return Err(self.unavailable());
        }

        self.packages
            .iter()
            .find(|package| package.id.eq_ignore_ascii_case(package_id))
            .map(|package| package.versions.clone())
            .ok_or_else(|| RegistryError::Status {
                name: self.name.clone(),
                status: 404,
                url: format!("mock://{}/{}", self.name, package_id),
            })
    }

    async fn probe(&self) -> Result<(), RegistryError> {
        if self.fail_search {
            Err(self.unavailable())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_loose_matches_like_a_real_search() {
        let registry = MockRegistry::new("mock")
            .with_package("Newtonsoft.Json", &["13.0.3"])
            .with_package("Newtonsoft.Json.Bson", &["1.0.2"])
            .with_package("Serilog", &["3.1.1"]);

        let hits = registry
            .search("newtonsoft.json", false, 0, 10)
            .await
            .expect("search succeeds");
        assert_eq!(hits.len(), 2);
        assert_eq!(registry.search_queries(), vec!["newtonsoft.json"]);
    }

    #[tokio::test]
    async fn respects_skip_and_take() {
        let registry = MockRegistry::new("mock")
            .with_package("Pkg.A", &["1.0.0"])
            .with_package("Pkg.B", &["1.0.0"])
            .with_package("Pkg.C", &["1.0.0"]);

        let hits = registry.search("Pkg", false, 1, 1).await.expect("search succeeds");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "Pkg.B");
    }

    #[tokio::test]
    async fn failing_registry_errors_and_still_counts_calls() {
        let registry = MockRegistry::new("down").failing();
        assert!(registry.search("x", false, 0, 10).await.is_err());
        assert!(registry.probe().await.is_err());
        assert_eq!(registry.search_count(), 1);
    }

    #[tokio::test]
    async fn unknown_package_versions_is_an_error() {
        let registry = MockRegistry::new("mock").with_package("Known", &["1.0.0"]);
        assert!(registry.versions("Known").await.is_ok());
        assert!(registry.versions("Unknown").await.is_err());
        assert_eq!(registry.version_requests(), vec!["Known", "Unknown"]);
    }
}
