//! Assembly-reference-to-package conversion
//!
//! [`matcher`] decides which declarations qualify and what package name to
//! search for; [`engine`] drives the registries and rewrites the documents.

pub mod engine;
pub mod matcher;

pub use engine::{ConversionOutcome, Converter, DocumentReport, RunSummary};
pub use matcher::{
    derive_package_name, select_eligible, MatchRules, HINT_PATH_METADATA, LIBRARY_FILE_EXTENSION,
};
