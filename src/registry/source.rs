//! Configured package sources

use serde::{Deserialize, Serialize};

/// One configured NuGet V3 feed. The position in the configured list is the
/// feed's priority: earlier sources win. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSource {
    /// Display name, e.g. `nuget.org`.
    pub name: String,
    /// Service index URL, e.g. `https://api.nuget.org/v3/index.json`.
    pub url: String,
}

impl PackageSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Parses a `name=url` entry, or a bare URL whose name falls back to the
    /// URL's host.
    pub fn parse(entry: &str) -> Result<Self, String> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err("empty source entry".to_string());
        }

        let (name, url) = if entry.starts_with("http://") || entry.starts_with("https://") {
            (host_of(entry).unwrap_or(entry).to_string(), entry.to_string())
        } else {
            match entry.split_once('=') {
                Some((name, url)) if !name.trim().is_empty() && !url.trim().is_empty() => {
                    (name.trim().to_string(), url.trim().to_string())
                }
                _ => return Err(format!("expected 'name=url' or a bare URL, got '{entry}'")),
            }
        };

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("source URL must be http(s): '{url}'"));
        }
        Ok(Self { name, url })
    }
}

fn host_of(url: &str) -> Option<&str> {
    let rest = url.split("//").nth(1)?;
    let host = rest.split('/').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}
