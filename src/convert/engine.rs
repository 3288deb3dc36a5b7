//! The conversion engine
//!
//! One independent unit of work per project document: documents run
//! concurrently, declarations within a document strictly sequentially so
//! every mutation sees a consistent item list, and each document is saved
//! exactly once after its last declaration. A declaration is either fully
//! converted (reference removed, package reference with a resolved version
//! added) or left untouched.

use std::path::{Path, PathBuf};

use futures_util::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::matcher::{self, MatchRules};
use crate::config::Properties;
use crate::project::{Declaration, ProjectDocument, PACKAGE_REFERENCE_ITEM};
use crate::registry::RegistryAggregator;

/// What happened to one eligible declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    /// The reference was replaced by a package reference.
    Converted {
        reference: String,
        package: String,
        version: String,
    },
    /// No configured registry published a matching package; the reference
    /// stays. Expected and non-fatal.
    NoCandidate { reference: String },
    /// A candidate matched but its version list was empty or unfetchable;
    /// the reference stays rather than gaining a versionless package entry.
    NoVersions { reference: String, package: String },
}

impl ConversionOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionOutcome::Converted { .. })
    }
}

/// Per-document result: the outcome of every eligible declaration, plus a
/// load or save error when one occurred.
#[derive(Debug, Serialize)]
pub struct DocumentReport {
    pub path: PathBuf,
    pub outcomes: Vec<ConversionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentReport {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            outcomes: Vec::new(),
            error: None,
        }
    }

    pub fn converted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_converted()).count()
    }
}

/// Aggregated result of one run across all discovered documents.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub documents: Vec<DocumentReport>,
}

impl RunSummary {
    pub fn converted(&self) -> usize {
        self.documents.iter().map(DocumentReport::converted).sum()
    }

    pub fn skipped(&self) -> usize {
        self.documents
            .iter()
            .flat_map(|d| &d.outcomes)
            .filter(|o| !o.is_converted())
            .count()
    }

    pub fn failed_documents(&self) -> usize {
        self.documents.iter().filter(|d| d.error.is_some()).count()
    }
}

/// Drives the whole conversion: discovery output in, [`RunSummary`] out.
pub struct Converter {
    aggregator: RegistryAggregator,
    rules: MatchRules,
    include_prerelease: bool,
    properties: Properties,
}

impl Converter {
    pub fn new(
        aggregator: RegistryAggregator,
        rules: MatchRules,
        include_prerelease: bool,
        properties: Properties,
    ) -> Self {
        Self {
            aggregator,
            rules,
            include_prerelease,
            properties,
        }
    }

    /// Converts every document concurrently. Document order in the summary
    /// matches the input order regardless of completion order.
    pub async fn run(&self, projects: &[PathBuf]) -> RunSummary {
        let documents = join_all(projects.iter().map(|path| self.convert_document(path))).await;
        RunSummary { documents }
    }

    /// Processes one document: select, convert sequentially, save once.
    /// Failures here never affect sibling documents.
    pub async fn convert_document(&self, path: &Path) -> DocumentReport {
        let mut report = DocumentReport::new(path.to_path_buf());

        let mut document = match ProjectDocument::load(path, &self.properties) {
            Ok(document) => document,
            Err(err) => {
                error!(path = %path.display(), error = %err, "failed to load project");
                report.error = Some(err.to_string());
                return report;
            }
        };

        let eligible = matcher::select_eligible(&document, &self.rules);
        if eligible.is_empty() {
            debug!(path = %path.display(), "no convertible assembly references");
            return report;
        }

        for declaration in &eligible {
            let outcome = self.convert_declaration(&mut document, declaration).await;
            report.outcomes.push(outcome);
        }

        if let Err(err) = document.save() {
            error!(path = %path.display(), error = %err, "failed to save project");
            report.error = Some(err.to_string());
        }
        report
    }

    async fn convert_declaration(
        &self,
        document: &mut ProjectDocument,
        declaration: &Declaration,
    ) -> ConversionOutcome {
        let reference = declaration.evaluated_include().to_string();
        let name = matcher::derive_package_name(declaration);

        let Some(found) = self.aggregator.find_package(name, self.include_prerelease).await
        else {
            debug!(reference = %reference, "no package candidate, leaving reference in place");
            return ConversionOutcome::NoCandidate { reference };
        };

        let versions = match found.registry.versions(&found.candidate.id).await {
            Ok(versions) => versions,
            Err(err) => {
                warn!(
                    package = %found.candidate.id,
                    registry = found.registry.name(),
                    error = %err,
                    "failed to fetch versions, leaving reference in place"
                );
                return ConversionOutcome::NoVersions {
                    reference,
                    package: found.candidate.title,
                };
            }
        };

        let Some(version) = versions.first() else {
            warn!(
                package = %found.candidate.id,
                registry = found.registry.name(),
                "registry returned no versions, leaving reference in place"
            );
            return ConversionOutcome::NoVersions {
                reference,
                package: found.candidate.title,
            };
        };

        document.add_item(
            PACKAGE_REFERENCE_ITEM,
            &found.candidate.title,
            &[("Version", version)],
        );
        document.remove_item(declaration);
        info!(
            reference = %reference,
            package = %found.candidate.title,
            version = %version,
            "converted assembly reference"
        );
        ConversionOutcome::Converted {
            reference,
            package: found.candidate.title,
            version: version.clone(),
        }
    }
}
