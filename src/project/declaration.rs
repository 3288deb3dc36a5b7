//! Dependency declarations inside a project document

use std::ops::Range;

/// MSBuild item type for a direct assembly reference.
pub const FILE_REFERENCE_ITEM: &str = "Reference";

/// MSBuild item type for a NuGet package reference.
pub const PACKAGE_REFERENCE_ITEM: &str = "PackageReference";

/// One dependency entry of a project document.
///
/// A declaration is owned by the [`ProjectDocument`](super::ProjectDocument)
/// it was parsed from; removing it detaches it from the document but does not
/// persist it anywhere else.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub(crate) item_type: String,
    pub(crate) evaluated_include: String,
    pub(crate) metadata: Vec<(String, String)>,
    /// Byte span of the element in the document text.
    pub(crate) span: Range<usize>,
    /// Index of the owning `<ItemGroup>`.
    pub(crate) group: usize,
}

impl Declaration {
    /// The item type, e.g. `Reference` or `PackageReference`.
    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    /// The `Include` attribute with `$(property)` expansion applied.
    pub fn evaluated_include(&self) -> &str {
        &self.evaluated_include
    }

    /// Direct metadata pairs in document order. Child elements and
    /// attributes other than `Include` and `Condition` both count.
    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    /// Looks up a single metadata value by name.
    pub fn metadata_value(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_file_reference(&self) -> bool {
        self.item_type == FILE_REFERENCE_ITEM
    }

    pub fn is_package_reference(&self) -> bool {
        self.item_type == PACKAGE_REFERENCE_ITEM
    }
}
