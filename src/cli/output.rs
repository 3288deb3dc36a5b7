//! Output formatting for multiple formats
//!
//! Formats a conversion run's [`RunSummary`] (and the sources listing) as
//! JSON, YAML, or human-readable text. Reports go to stdout; logging stays
//! on stderr.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::convert::{ConversionOutcome, RunSummary};
use crate::registry::PackageSource;

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
}

/// Availability of one configured source, as listed by `packref sources`.
#[derive(Debug, Serialize)]
pub struct SourceStatus {
    pub name: String,
    pub url: String,
    /// `None` when the source was not probed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceStatus {
    pub fn unchecked(source: &PackageSource) -> Self {
        Self {
            name: source.name.clone(),
            url: source.url.clone(),
            available: None,
            error: None,
        }
    }

    pub fn reachable(source: &PackageSource) -> Self {
        Self {
            available: Some(true),
            ..Self::unchecked(source)
        }
    }

    pub fn unreachable(source: &PackageSource, error: String) -> Self {
        Self {
            available: Some(false),
            error: Some(error),
            ..Self::unchecked(source)
        }
    }
}

/// Formatter for conversion reports and source listings.
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_summary(&self, summary: &RunSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(summary)
                .context("Failed to serialize conversion summary to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(summary)
                .context("Failed to serialize conversion summary to YAML"),
            OutputFormat::Human => Ok(human_summary(summary)),
        }
    }

    pub fn format_sources(&self, statuses: &[SourceStatus]) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(statuses)
                .context("Failed to serialize source list to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(statuses)
                .context("Failed to serialize source list to YAML"),
            OutputFormat::Human => Ok(human_sources(statuses)),
        }
    }
}

fn human_summary(summary: &RunSummary) -> String {
    let mut output = String::new();
    let converted = summary.converted();
    let total = converted + summary.skipped();

    output.push_str(&format!(
        "Converted {} of {} assembly reference{} across {} project{}",
        converted,
        total,
        if total == 1 { "" } else { "s" },
        summary.documents.len(),
        if summary.documents.len() == 1 { "" } else { "s" },
    ));
    let failed = summary.failed_documents();
    if failed > 0 {
        output.push_str(&format!(
            " ({} project{} failed)",
            failed,
            if failed == 1 { "" } else { "s" }
        ));
    }
    output.push('\n');

    for document in &summary.documents {
        if document.outcomes.is_empty() && document.error.is_none() {
            continue;
        }
        output.push('\n');
        output.push_str(&format!("{}\n", document.path.display()));

        if let Some(error) = &document.error {
            output.push_str(&format!("  \u{2717} {}\n", error));
        }
        for outcome in &document.outcomes {
            match outcome {
                ConversionOutcome::Converted {
                    reference,
                    package,
                    version,
                } => {
                    output.push_str(&format!(
                        "  \u{2713} {} \u{2192} {} {}\n",
                        reference, package, version
                    ));
                }
                ConversionOutcome::NoCandidate { reference } => {
                    output.push_str(&format!("  - {} (no matching package)\n", reference));
                }
                ConversionOutcome::NoVersions { reference, package } => {
                    output.push_str(&format!(
                        "  \u{26A0} {} \u{2192} {} (no published versions)\n",
                        reference, package
                    ));
                }
            }
        }
    }
    output
}

fn human_sources(statuses: &[SourceStatus]) -> String {
    let mut output = String::from("Configured package sources (priority order):\n");
    for (index, status) in statuses.iter().enumerate() {
        output.push_str(&format!("  {}. {}  {}", index + 1, status.name, status.url));
        match status.available {
            Some(true) => output.push_str("  \u{2713} reachable"),
            Some(false) => {
                output.push_str("  \u{2717} unreachable");
                if let Some(error) = &status.error {
                    output.push_str(&format!(": {}", error));
                }
            }
            None => {}
        }
        output.push('\n');
    }
    output
}
