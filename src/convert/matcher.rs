//! Selecting the assembly references worth converting
//!
//! A `Reference` item qualifies when it points at a compiled `.dll` through
//! its `HintPath` metadata (or unconditionally with
//! `include_without_hint_path`), and, when a name pattern is set, its
//! evaluated include matches it. Selection order is document order so runs
//! are deterministic.

use regex::Regex;

use crate::project::{Declaration, ProjectDocument};

/// Metadata entry carrying the on-disk path of a referenced assembly.
pub const HINT_PATH_METADATA: &str = "HintPath";

/// Extension a hint path must end in to mark a convertible library file.
/// The comparison is case-sensitive, matching the original MSBuild tooling.
pub const LIBRARY_FILE_EXTENSION: &str = ".dll";

/// The run's matching rules, fixed at startup from the command line.
#[derive(Debug, Clone, Default)]
pub struct MatchRules {
    pub include_without_hint_path: bool,
    pub name_pattern: Option<Regex>,
}

impl MatchRules {
    fn matches(&self, declaration: &Declaration) -> bool {
        if !declaration.is_file_reference() {
            return false;
        }

        let has_library_hint = declaration
            .metadata_value(HINT_PATH_METADATA)
            .is_some_and(|path| path.ends_with(LIBRARY_FILE_EXTENSION));
        if !self.include_without_hint_path && !has_library_hint {
            return false;
        }

        match &self.name_pattern {
            Some(pattern) => pattern.is_match(declaration.evaluated_include()),
            None => true,
        }
    }
}

/// Returns the document's convertible declarations, in document order.
pub fn select_eligible(document: &ProjectDocument, rules: &MatchRules) -> Vec<Declaration> {
    document
        .items()
        .filter(|declaration| rules.matches(declaration))
        .cloned()
        .collect()
}

/// Derives the package name to search for: everything before the first comma
/// of the evaluated include (assembly references commonly append
/// `Version=`, `Culture=`, and `PublicKeyToken=` after it), or the whole
/// string when there is no comma.
pub fn derive_package_name(declaration: &Declaration) -> &str {
    let include = declaration.evaluated_include();
    match include.find(',') {
        Some(comma) => &include[..comma],
        None => include,
    }
}
