//! Package registries
//!
//! Configured NuGet V3 feeds, the client protocol implementation, and the
//! ordered aggregator the conversion engine searches through. The registry
//! list is loaded once per run and shared read-only afterwards.

pub mod aggregator;
pub mod client;
pub mod mock;
pub mod source;

pub use aggregator::{FoundPackage, RegistryAggregator};
pub use client::{NuGetRegistry, PackageCandidate, PackageRegistry, RegistryError};
pub use source::PackageSource;
