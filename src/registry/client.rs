//! NuGet V3 registry client
//!
//! [`PackageRegistry`] is the seam between the conversion engine and the
//! wire: search a feed for candidates, list a package's published versions.
//! [`NuGetRegistry`] implements it over the NuGet V3 protocol — the service
//! index is fetched lazily once per run and the `SearchQueryService` and
//! `PackageBaseAddress` resources are resolved from it.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::source::PackageSource;

/// Errors talking to one registry. Always localized to that registry — the
/// aggregator degrades them to "no candidate from this source".
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{name} returned HTTP {status} for {url}")]
    Status {
        name: String,
        status: u16,
        url: String,
    },

    #[error("service index of {name} has no {resource} resource")]
    MissingResource {
        name: String,
        resource: &'static str,
    },
}

/// One package returned by a registry search. Transient — lives only for the
/// declaration being converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageCandidate {
    /// Registry identity, used for version lookups.
    pub id: String,
    /// Display title. Feeds that omit it fall back to the id; matching
    /// against the candidate name is done on this field, case-sensitively.
    pub title: String,
}

/// A queryable source of published packages.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Display name of the underlying source.
    fn name(&self) -> &str;

    /// Searches the feed, returning up to `take` candidates from `skip`.
    async fn search(
        &self,
        query: &str,
        include_prerelease: bool,
        skip: usize,
        take: usize,
    ) -> Result<Vec<PackageCandidate>, RegistryError>;

    /// Published versions of a package, in the order the registry returns
    /// them. No client-side reordering is applied.
    async fn versions(&self, package_id: &str) -> Result<Vec<String>, RegistryError>;

    /// Cheap reachability check, used by `packref sources --check`.
    async fn probe(&self) -> Result<(), RegistryError>;
}

#[derive(Debug, Clone)]
struct ServiceEndpoints {
    search: String,
    flat_container: String,
}

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    resource_type: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

impl From<SearchHit> for PackageCandidate {
    fn from(hit: SearchHit) -> Self {
        let title = match hit.title {
            Some(title) if !title.is_empty() => title,
            _ => hit.id.clone(),
        };
        Self { id: hit.id, title }
    }
}

#[derive(Debug, Deserialize)]
struct FlatContainerIndex {
    versions: Vec<String>,
}

/// Reqwest-backed NuGet V3 feed client.
pub struct NuGetRegistry {
    source: PackageSource,
    client: reqwest::Client,
    endpoints: OnceCell<ServiceEndpoints>,
}

impl NuGetRegistry {
    pub fn new(source: PackageSource, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("packref/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RegistryError::Client)?;
        Ok(Self {
            source,
            client,
            endpoints: OnceCell::new(),
        })
    }

    pub fn source(&self) -> &PackageSource {
        &self.source
    }

    async fn endpoints(&self) -> Result<&ServiceEndpoints, RegistryError> {
        self.endpoints
            .get_or_try_init(|| self.fetch_endpoints())
            .await
    }

    async fn fetch_endpoints(&self) -> Result<ServiceEndpoints, RegistryError> {
        let index: ServiceIndex = self.get_json(&self.source.url).await?;

        let search = find_resource(&index, "SearchQueryService").ok_or_else(|| {
            RegistryError::MissingResource {
                name: self.source.name.clone(),
                resource: "SearchQueryService",
            }
        })?;
        let flat_container =
            find_resource(&index, "PackageBaseAddress/3.0.0").ok_or_else(|| {
                RegistryError::MissingResource {
                    name: self.source.name.clone(),
                    resource: "PackageBaseAddress/3.0.0",
                }
            })?;

        Ok(ServiceEndpoints {
            search,
            flat_container: flat_container.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, RegistryError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| RegistryError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                name: self.source.name.clone(),
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.json().await.map_err(|source| RegistryError::Http {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl PackageRegistry for NuGetRegistry {
    fn name(&self) -> &str {
        &self.source.name
    }

    async fn search(
        &self,
        query: &str,
        include_prerelease: bool,
        skip: usize,
        take: usize,
    ) -> Result<Vec<PackageCandidate>, RegistryError> {
        let endpoints = self.endpoints().await?;
        let skip = skip.to_string();
        let take = take.to_string();
        let prerelease = if include_prerelease { "true" } else { "false" };

        let response = self
            .client
            .get(&endpoints.search)
            .query(&[
                ("q", query),
                ("prerelease", prerelease),
                ("skip", skip.as_str()),
                ("take", take.as_str()),
                ("semVerLevel", "2.0.0"),
            ])
            .send()
            .await
            .map_err(|source| RegistryError::Http {
                url: endpoints.search.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status {
                name: self.source.name.clone(),
                status: status.as_u16(),
                url: endpoints.search.clone(),
            });
        }

        let results: SearchResponse =
            response.json().await.map_err(|source| RegistryError::Http {
                url: endpoints.search.clone(),
                source,
            })?;

        Ok(results.data.into_iter().map(PackageCandidate::from).collect())
    }

    async fn versions(&self, package_id: &str) -> Result<Vec<String>, RegistryError> {
        let endpoints = self.endpoints().await?;
        let url = format!(
            "{}/{}/index.json",
            endpoints.flat_container,
            package_id.to_lowercase()
        );
        let index: FlatContainerIndex = self.get_json(&url).await?;
        Ok(index.versions)
    }

    async fn probe(&self) -> Result<(), RegistryError> {
        self.endpoints().await.map(|_| ())
    }
}

fn find_resource(index: &ServiceIndex, kind: &str) -> Option<String> {
    index
        .resources
        .iter()
        .find(|resource| resource.resource_type.starts_with(kind))
        .map(|resource| resource.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE_INDEX: &str = r#"{
        "version": "3.0.0",
        "resources": [
            { "@id": "https://azuresearch-usnc.nuget.org/query", "@type": "SearchQueryService" },
            { "@id": "https://azuresearch-usnc.nuget.org/query", "@type": "SearchQueryService/3.5.0" },
            { "@id": "https://api.nuget.org/v3-flatcontainer/", "@type": "PackageBaseAddress/3.0.0" }
        ]
    }"#;

    #[test]
    fn service_index_resources_resolve() {
        let index: ServiceIndex = serde_json::from_str(SERVICE_INDEX).expect("index parses");
        assert_eq!(
            find_resource(&index, "SearchQueryService").as_deref(),
            Some("https://azuresearch-usnc.nuget.org/query")
        );
        assert_eq!(
            find_resource(&index, "PackageBaseAddress/3.0.0").as_deref(),
            Some("https://api.nuget.org/v3-flatcontainer/")
        );
        assert_eq!(find_resource(&index, "RegistrationsBaseUrl"), None);
    }

    #[test]
    fn search_response_parses() {
        let json = r#"{
            "totalHits": 2,
            "data": [
                { "id": "Newtonsoft.Json", "title": "Newtonsoft.Json", "version": "13.0.3" },
                { "id": "Newtonsoft.Json.Bson", "title": "" }
            ]
        }"#;
        let response: SearchResponse = serde_json::from_str(json).expect("response parses");
        let candidates: Vec<PackageCandidate> =
            response.data.into_iter().map(PackageCandidate::from).collect();

        assert_eq!(candidates[0].title, "Newtonsoft.Json");
        assert_eq!(
            candidates[1].title, "Newtonsoft.Json.Bson",
            "empty title falls back to the id"
        );
    }

    #[test]
    fn flat_container_index_parses_in_feed_order() {
        let json = r#"{ "versions": ["12.0.1", "12.0.3", "13.0.3"] }"#;
        let index: FlatContainerIndex = serde_json::from_str(json).expect("index parses");
        assert_eq!(index.versions, vec!["12.0.1", "12.0.3", "13.0.3"]);
    }

    #[test]
    fn registry_is_constructible_without_network() {
        let registry = NuGetRegistry::new(
            PackageSource::new("nuget.org", "https://api.nuget.org/v3/index.json"),
            Duration::from_secs(5),
        )
        .expect("client builds");
        assert_eq!(registry.name(), "nuget.org");
        assert_eq!(registry.source().url, "https://api.nuget.org/v3/index.json");
    }
}
