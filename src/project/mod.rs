//! MSBuild project documents
//!
//! The in-memory model of one project file: parsing, dependency declaration
//! enumeration, mutation, and a format-preserving save. Project files are
//! discovered with [`discover::discover_projects`].

pub mod declaration;
pub mod discover;
pub mod document;

pub use declaration::{Declaration, FILE_REFERENCE_ITEM, PACKAGE_REFERENCE_ITEM};
pub use discover::{discover_projects, is_project_file, PROJECT_EXTENSIONS};
pub use document::{DocumentError, LineEnding, ProjectDocument};
