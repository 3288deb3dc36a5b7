//! packref - convert assembly references to NuGet package references
//!
//! This library inspects MSBuild project files (`.csproj`, `.fsproj`,
//! `.vbproj`) for `<Reference>` items that point directly at compiled `.dll`
//! files, searches the configured NuGet feeds for a package with a matching
//! name, and rewrites each match into a `<PackageReference>` pinned to the
//! feed's current version. Project files are edited in place with their
//! original formatting and line endings preserved.
//!
//! # Core Concepts
//!
//! - **Project documents**: an in-memory, mutable view of one project file;
//!   mutations are queued and applied as a single format-preserving save
//! - **Registries**: configured NuGet V3 feeds, searched in priority order
//!   with the first exact-title match winning
//! - **Conversion**: one independent unit of work per document — documents
//!   run concurrently, declarations within a document sequentially
//!
//! # Example Usage
//!
//! ```ignore
//! use packref::{Converter, MatchRules, PackrefConfig, RegistryAggregator};
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PackrefConfig::load()?;
//! config.validate()?;
//!
//! let aggregator = RegistryAggregator::from_config(&config)?;
//! let converter = Converter::new(
//!     aggregator,
//!     MatchRules::default(),
//!     false,
//!     Default::default(),
//! );
//!
//! let summary = converter.run(&[PathBuf::from("src/App/App.csproj")]).await;
//! println!("converted {} references", summary.converted());
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`project`]: project document parsing, mutation, and discovery
//! - [`registry`]: NuGet V3 clients and the ordered registry aggregator
//! - [`convert`]: eligibility matching and the conversion engine
//! - [`config`]: run configuration loaded once from files and environment
//! - [`cli`]: command-line surface

// Public modules
pub mod cli;
pub mod config;
pub mod convert;
pub mod project;
pub mod registry;
pub mod util;

// Re-export key types for convenient access
pub use config::{ConfigError, PackrefConfig, Properties};
pub use convert::{ConversionOutcome, Converter, MatchRules, RunSummary};
pub use project::{Declaration, DocumentError, ProjectDocument};
pub use registry::{
    NuGetRegistry, PackageCandidate, PackageRegistry, PackageSource, RegistryAggregator,
    RegistryError,
};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_packref() {
        assert_eq!(NAME, "packref");
    }
}
