//! Mutable, format-preserving view of one MSBuild project file
//!
//! A [`ProjectDocument`] parses the XML once (roxmltree) and remembers the
//! byte span of every item element. Mutations are queued as text splices and
//! applied on [`ProjectDocument::save`], so everything outside the touched
//! items — comments, attribute order, indentation, line endings — survives
//! the rewrite byte-for-byte.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::declaration::Declaration;
use crate::config::Properties;

/// Errors raised while loading, parsing, or writing a project document.
///
/// All of them are fatal for that document only; sibling documents keep
/// converting.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read project {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse project {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("failed to write project {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Line-ending convention of a document, preserved across a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }

    fn detect(text: &str) -> Self {
        if text.contains("\r\n") {
            LineEnding::Crlf
        } else {
            LineEnding::Lf
        }
    }
}

#[derive(Debug)]
struct ItemGroupInfo {
    /// Offset of the `</ItemGroup>` close tag, `None` for self-closing groups.
    close_at: Option<usize>,
    item_indent: String,
    item_types: Vec<String>,
}

#[derive(Debug, Clone)]
struct SpliceOp {
    at: usize,
    len: usize,
    text: String,
}

#[derive(Debug)]
struct PendingGroup {
    item_type: String,
    elements: Vec<String>,
}

/// In-memory representation of one project file.
#[derive(Debug)]
pub struct ProjectDocument {
    path: PathBuf,
    text: String,
    line_ending: LineEnding,
    items: Vec<Declaration>,
    groups: Vec<ItemGroupInfo>,
    group_indent: String,
    /// Insertion point for a brand-new `<ItemGroup>` (start of the line
    /// holding the root close tag).
    root_insert_at: usize,
    removed: HashSet<usize>,
    edits: Vec<SpliceOp>,
    pending_groups: Vec<PendingGroup>,
}

impl ProjectDocument {
    /// Reads and parses the project file at `path`. `properties` are the
    /// run's global properties, substituted into `$(name)` occurrences.
    pub fn load(path: &Path, properties: &Properties) -> Result<Self, DocumentError> {
        let text = fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, text, properties)
    }

    /// Parses already-read project text. Used by [`load`](Self::load) and by
    /// tests that build documents from string fixtures.
    pub fn parse(
        path: &Path,
        text: String,
        properties: &Properties,
    ) -> Result<Self, DocumentError> {
        let (root_insert_at, items, groups, group_indent) = {
            let doc = roxmltree::Document::parse(&text).map_err(|source| DocumentError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

            let root = doc.root_element();
            let root_span = root.range();
            let root_insert_at = text[root_span.clone()]
                .rfind("</")
                .map(|offset| line_start(&text, root_span.start + offset))
                .unwrap_or(text.len());

            let mut items = Vec::new();
            let mut groups: Vec<ItemGroupInfo> = Vec::new();
            let mut group_indent = None;

            for node in root
                .descendants()
                .filter(|n| n.is_element() && n.tag_name().name() == "ItemGroup")
            {
                let span = node.range();
                if group_indent.is_none() {
                    group_indent = Some(leading_indent(&text, span.start).to_string());
                }
                let close_at = text[span.clone()].rfind("</").map(|offset| span.start + offset);
                let group_index = groups.len();

                let mut item_indent = None;
                let mut item_types = Vec::new();

                for child in node.children().filter(|n| n.is_element()) {
                    let child_span = child.range();
                    let item_type = child.tag_name().name().to_string();
                    if item_indent.is_none() {
                        item_indent = Some(leading_indent(&text, child_span.start).to_string());
                    }
                    item_types.push(item_type.clone());

                    // Items declared with Update/Remove instead of Include are
                    // not dependency declarations.
                    let Some(include) = child.attribute("Include") else {
                        continue;
                    };

                    let mut metadata = Vec::new();
                    for attr in child.attributes() {
                        let name = attr.name();
                        if name == "Include" || name == "Condition" {
                            continue;
                        }
                        metadata.push((
                            name.to_string(),
                            expand_properties(attr.value(), properties),
                        ));
                    }
                    for meta in child.children().filter(|n| n.is_element()) {
                        let value = meta.text().unwrap_or_default().trim();
                        metadata.push((
                            meta.tag_name().name().to_string(),
                            expand_properties(value, properties),
                        ));
                    }

                    items.push(Declaration {
                        item_type,
                        evaluated_include: expand_properties(include, properties),
                        metadata,
                        span: child_span,
                        group: group_index,
                    });
                }

                let fallback_indent = format!("{}  ", leading_indent(&text, span.start));
                groups.push(ItemGroupInfo {
                    close_at,
                    item_indent: item_indent.unwrap_or(fallback_indent),
                    item_types,
                });
            }

            (root_insert_at, items, groups, group_indent)
        };

        let line_ending = LineEnding::detect(&text);
        Ok(Self {
            path: path.to_path_buf(),
            text,
            line_ending,
            items,
            groups,
            group_indent: group_indent.unwrap_or_else(|| "  ".to_string()),
            root_insert_at,
            removed: HashSet::new(),
            edits: Vec::new(),
            pending_groups: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Declarations still present, in document order.
    pub fn items(&self) -> impl Iterator<Item = &Declaration> {
        self.items
            .iter()
            .filter(|item| !self.removed.contains(&item.span.start))
    }

    /// Queues removal of a declaration together with its line. Returns
    /// `false` when the declaration is unknown or already removed.
    pub fn remove_item(&mut self, declaration: &Declaration) -> bool {
        let key = declaration.span.start;
        let known = self.items.iter().any(|item| item.span.start == key);
        if !known || !self.removed.insert(key) {
            return false;
        }

        let range = self.removal_range(&declaration.span);
        self.edits.push(SpliceOp {
            at: range.0,
            len: range.1 - range.0,
            text: String::new(),
        });
        true
    }

    /// Queues insertion of a new self-closing item element with the given
    /// metadata rendered as attributes. The element lands in the last
    /// `<ItemGroup>` already holding items of `item_type`, or in a new group
    /// before the root close tag when no such group exists.
    pub fn add_item(&mut self, item_type: &str, include: &str, metadata: &[(&str, &str)]) {
        let mut element = format!("<{} Include=\"{}\"", item_type, escape_attribute(include));
        for (name, value) in metadata {
            element.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
        }
        element.push_str(" />");

        let target = self.groups.iter().rev().find_map(|group| match group.close_at {
            Some(close_at) if group.item_types.iter().any(|t| t == item_type) => {
                Some((close_at, group.item_indent.clone()))
            }
            _ => None,
        });

        match target {
            Some((close_at, item_indent)) => {
                let start = line_start(&self.text, close_at);
                if self.text[start..close_at].trim().is_empty() {
                    self.edits.push(SpliceOp {
                        at: start,
                        len: 0,
                        text: format!("{}{}{}", item_indent, element, self.line_ending.as_str()),
                    });
                } else {
                    // Close tag shares a line with content; tuck the new
                    // element onto its own line right before it.
                    self.edits.push(SpliceOp {
                        at: close_at,
                        len: 0,
                        text: format!("{}{}{}", self.line_ending.as_str(), item_indent, element),
                    });
                }
            }
            None => {
                if let Some(pending) = self
                    .pending_groups
                    .iter_mut()
                    .find(|group| group.item_type == item_type)
                {
                    pending.elements.push(element);
                } else {
                    self.pending_groups.push(PendingGroup {
                        item_type: item_type.to_string(),
                        elements: vec![element],
                    });
                }
            }
        }
    }

    pub fn has_pending_changes(&self) -> bool {
        !self.edits.is_empty() || !self.pending_groups.is_empty()
    }

    /// Applies all queued edits and writes the result back to the original
    /// path. A document with no queued edits is left untouched on disk.
    /// Further mutation after a save is not supported; the document is meant
    /// to be dropped once saved.
    pub fn save(&mut self) -> Result<(), DocumentError> {
        if !self.has_pending_changes() {
            return Ok(());
        }
        let rendered = self.rendered();
        fs::write(&self.path, &rendered).map_err(|source| DocumentError::Write {
            path: self.path.clone(),
            source,
        })?;
        self.text = rendered;
        self.edits.clear();
        self.pending_groups.clear();
        Ok(())
    }

    /// Expands an element span to cover its whole line, including leading
    /// indentation and the trailing newline.
    fn removal_range(&self, span: &std::ops::Range<usize>) -> (usize, usize) {
        let mut start = span.start;
        let ls = line_start(&self.text, start);
        if self.text[ls..start].trim().is_empty() {
            start = ls;
        }

        let bytes = self.text.as_bytes();
        let mut end = span.end;
        while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
            end += 1;
        }
        if self.text[end..].starts_with("\r\n") {
            end += 2;
        } else if self.text[end..].starts_with('\n') {
            end += 1;
        }
        (start, end)
    }

    fn rendered(&self) -> String {
        let le = self.line_ending.as_str();
        let mut ops = self.edits.to_vec();

        for group in &self.pending_groups {
            let item_indent = format!("{}  ", self.group_indent);
            let mut block = format!("{}<ItemGroup>{}", self.group_indent, le);
            for element in &group.elements {
                block.push_str(&format!("{}{}{}", item_indent, element, le));
            }
            block.push_str(&format!("{}</ItemGroup>{}", self.group_indent, le));
            ops.push(SpliceOp {
                at: self.root_insert_at,
                len: 0,
                text: block,
            });
        }

        // Apply back-to-front so earlier offsets stay valid; later-queued
        // edits at the same offset go first, keeping queue order in the
        // output.
        let mut indexed: Vec<(usize, SpliceOp)> = ops.into_iter().enumerate().collect();
        indexed.sort_by(|(seq_a, a), (seq_b, b)| b.at.cmp(&a.at).then(seq_b.cmp(seq_a)));

        let mut out = self.text.clone();
        for (_, op) in indexed {
            out.replace_range(op.at..op.at + op.len, &op.text);
        }
        out
    }
}

fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

fn leading_indent(text: &str, pos: usize) -> &str {
    let start = line_start(text, pos);
    let prefix = &text[start..pos];
    if prefix.trim().is_empty() {
        prefix
    } else {
        ""
    }
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Substitutes `$(name)` occurrences from the run's global properties.
/// Unknown properties are left verbatim, as are unterminated `$(` sequences.
pub(crate) fn expand_properties(input: &str, properties: &Properties) -> String {
    if !input.contains("$(") {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("$(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find(')') {
            Some(end) => {
                let name = &after[..end];
                match properties.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("$(");
                        out.push_str(name);
                        out.push(')');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::declaration::{FILE_REFERENCE_ITEM, PACKAGE_REFERENCE_ITEM};
    use std::collections::HashMap;

    const LEGACY_PROJECT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="15.0" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <OutputType>Library</OutputType>
  </PropertyGroup>
  <ItemGroup>
    <Reference Include="Newtonsoft.Json, Version=12.0.0.0, Culture=neutral, PublicKeyToken=30ad4fe6b2a6aeed">
      <HintPath>..\packages\Newtonsoft.Json.12.0.3\lib\net45\Newtonsoft.Json.dll</HintPath>
    </Reference>
    <Reference Include="System.Xml" />
  </ItemGroup>
  <ItemGroup>
    <Compile Include="Program.cs" />
  </ItemGroup>
</Project>
"#;

    const SDK_PROJECT: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>net8.0</TargetFramework>
  </PropertyGroup>
  <ItemGroup>
    <PackageReference Include="Serilog" Version="3.1.1" />
  </ItemGroup>
  <ItemGroup>
    <Reference Include="Contoso.Core">
      <HintPath>$(LibDir)\Contoso.Core.dll</HintPath>
    </Reference>
  </ItemGroup>
</Project>
"#;

    fn no_properties() -> Properties {
        HashMap::new()
    }

    fn parse(text: &str) -> ProjectDocument {
        ProjectDocument::parse(Path::new("test.csproj"), text.to_string(), &no_properties())
            .expect("fixture parses")
    }

    #[test]
    fn parses_items_with_metadata() {
        let doc = parse(LEGACY_PROJECT);
        let items: Vec<_> = doc.items().collect();
        assert_eq!(items.len(), 3);

        let json = &items[0];
        assert_eq!(json.item_type(), FILE_REFERENCE_ITEM);
        assert!(json.evaluated_include().starts_with("Newtonsoft.Json,"));
        assert!(json
            .metadata_value("HintPath")
            .expect("hint path present")
            .ends_with("Newtonsoft.Json.dll"));

        assert_eq!(items[1].evaluated_include(), "System.Xml");
        assert_eq!(items[1].metadata_value("HintPath"), None);
        assert_eq!(items[2].item_type(), "Compile");
    }

    #[test]
    fn attribute_metadata_is_collected() {
        let doc = parse(SDK_PROJECT);
        let serilog = doc
            .items()
            .find(|i| i.evaluated_include() == "Serilog")
            .expect("Serilog item");
        assert_eq!(serilog.item_type(), PACKAGE_REFERENCE_ITEM);
        assert_eq!(serilog.metadata_value("Version"), Some("3.1.1"));
    }

    #[test]
    fn expands_global_properties() {
        let mut properties = HashMap::new();
        properties.insert("LibDir".to_string(), r"..\libs".to_string());
        let doc = ProjectDocument::parse(
            Path::new("test.csproj"),
            SDK_PROJECT.to_string(),
            &properties,
        )
        .expect("fixture parses");

        let contoso = doc
            .items()
            .find(|i| i.evaluated_include() == "Contoso.Core")
            .expect("Contoso item");
        assert_eq!(
            contoso.metadata_value("HintPath"),
            Some(r"..\libs\Contoso.Core.dll")
        );
    }

    #[test]
    fn unknown_properties_stay_verbatim() {
        let props = no_properties();
        assert_eq!(expand_properties("$(Missing)\\a.dll", &props), "$(Missing)\\a.dll");
        assert_eq!(expand_properties("no properties here", &props), "no properties here");
        assert_eq!(expand_properties("$(unterminated", &props), "$(unterminated");
    }

    #[test]
    fn remove_item_drops_whole_element() {
        let mut doc = parse(LEGACY_PROJECT);
        let json = doc.items().next().expect("first item").clone();
        assert!(doc.remove_item(&json));
        assert!(!doc.remove_item(&json), "second removal is a no-op");

        let rendered = doc.rendered();
        assert!(!rendered.contains("Newtonsoft.Json"));
        assert!(rendered.contains("System.Xml"), "sibling items survive");
        assert_eq!(doc.items().count(), 2);
    }

    #[test]
    fn add_item_joins_existing_group_of_same_type() {
        let mut doc = parse(SDK_PROJECT);
        doc.add_item(
            PACKAGE_REFERENCE_ITEM,
            "Newtonsoft.Json",
            &[("Version", "13.0.3")],
        );

        let rendered = doc.rendered();
        let expected = "    <PackageReference Include=\"Newtonsoft.Json\" Version=\"13.0.3\" />";
        assert!(rendered.contains(expected));
        let serilog_at = rendered.find("Serilog").expect("existing item kept");
        let new_at = rendered.find("Newtonsoft.Json").expect("new item added");
        assert!(new_at > serilog_at, "new item appended after existing ones");
    }

    #[test]
    fn add_item_creates_group_when_none_matches() {
        let mut doc = parse(LEGACY_PROJECT);
        doc.add_item(
            PACKAGE_REFERENCE_ITEM,
            "Newtonsoft.Json",
            &[("Version", "13.0.3")],
        );
        doc.add_item(PACKAGE_REFERENCE_ITEM, "Serilog", &[("Version", "3.1.1")]);

        let rendered = doc.rendered();
        assert_eq!(
            rendered.matches("<ItemGroup>").count(),
            3,
            "exactly one new group for both added items"
        );
        let close = rendered.rfind("</Project>").expect("root close tag");
        let group = rendered.rfind("<ItemGroup>").expect("new group");
        assert!(group < close);
        assert!(rendered.contains("<PackageReference Include=\"Newtonsoft.Json\" Version=\"13.0.3\" />"));
        assert!(rendered.contains("<PackageReference Include=\"Serilog\" Version=\"3.1.1\" />"));
    }

    #[test]
    fn preserves_crlf_line_endings() {
        let crlf = SDK_PROJECT.replace('\n', "\r\n");
        let mut doc = ProjectDocument::parse(
            Path::new("test.csproj"),
            crlf,
            &no_properties(),
        )
        .expect("fixture parses");
        assert_eq!(doc.line_ending(), LineEnding::Crlf);

        doc.add_item(PACKAGE_REFERENCE_ITEM, "Dapper", &[("Version", "2.1.35")]);
        let rendered = doc.rendered();
        assert!(rendered.contains("Dapper\" Version=\"2.1.35\" />\r\n"));
        assert!(!rendered.replace("\r\n", "").contains('\r'));
    }

    #[test]
    fn replace_reference_with_package_reference() {
        let mut doc = parse(LEGACY_PROJECT);
        let json = doc.items().next().expect("first item").clone();
        doc.add_item(
            PACKAGE_REFERENCE_ITEM,
            "Newtonsoft.Json",
            &[("Version", "13.0.3")],
        );
        assert!(doc.remove_item(&json));

        let rendered = doc.rendered();
        assert!(rendered.contains("<PackageReference Include=\"Newtonsoft.Json\" Version=\"13.0.3\" />"));
        assert!(!rendered.contains("<Reference Include=\"Newtonsoft.Json"));
        assert!(!rendered.contains("HintPath"));
    }

    #[test]
    fn save_writes_edits_and_skips_unchanged_documents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("app.csproj");
        fs::write(&path, LEGACY_PROJECT).expect("write fixture");

        let mut doc = ProjectDocument::load(&path, &no_properties()).expect("loads");
        assert!(!doc.has_pending_changes());
        doc.save().expect("no-op save succeeds");
        assert_eq!(fs::read_to_string(&path).expect("read back"), LEGACY_PROJECT);

        let json = doc.items().next().expect("first item").clone();
        doc.remove_item(&json);
        doc.save().expect("save succeeds");

        let on_disk = fs::read_to_string(&path).expect("read back");
        assert!(!on_disk.contains("Newtonsoft.Json"));
        assert!(on_disk.contains("System.Xml"));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ProjectDocument::load(Path::new("/nonexistent/app.csproj"), &no_properties())
            .expect_err("missing file fails");
        assert!(matches!(err, DocumentError::Io { .. }));
    }

    #[test]
    fn malformed_xml_is_parse_error() {
        let err = ProjectDocument::parse(
            Path::new("bad.csproj"),
            "<Project><ItemGroup></Project>".to_string(),
            &no_properties(),
        )
        .expect_err("malformed XML fails");
        assert!(matches!(err, DocumentError::Parse { .. }));
    }

    #[test]
    fn escape_attribute_handles_xml_specials() {
        assert_eq!(escape_attribute(r#"a "b" & <c>"#), "a &quot;b&quot; &amp; &lt;c&gt;");
        assert_eq!(escape_attribute("plain"), "plain");
    }
}
