//! Project file discovery
//!
//! Expands the command line's project arguments into concrete file paths.
//! Directories are walked with the `ignore` crate so `.gitignore`d trees are
//! skipped; `bin/` and `obj/` output directories are always skipped. Explicit
//! file paths are passed through untouched — a bad path surfaces later as a
//! per-document load error, not a discovery failure.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::warn;

/// File extensions recognized as MSBuild project documents.
pub const PROJECT_EXTENSIONS: &[&str] = &["csproj", "fsproj", "vbproj"];

/// Returns true for `.csproj`, `.fsproj`, and `.vbproj` paths.
pub fn is_project_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| PROJECT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Expands `paths` into a sorted list of project files. With no arguments the
/// current directory is scanned.
pub fn discover_projects(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut projects = Vec::new();

    if paths.is_empty() {
        scan_directory(Path::new("."), &mut projects);
    } else {
        for path in paths {
            if path.is_dir() {
                scan_directory(path, &mut projects);
            } else {
                // Files (and nonexistent paths) go straight through; the
                // document loader reports the error against the exact path.
                projects.push(path.clone());
            }
        }
    }

    projects.sort();
    projects.dedup();
    projects
}

fn scan_directory(dir: &Path, projects: &mut Vec<PathBuf>) {
    let walker = WalkBuilder::new(dir)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.file_type().is_some_and(|t| t.is_dir()) && (name == "bin" || name == "obj"))
        })
        .build();

    for entry in walker {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_some_and(|t| t.is_file()) && is_project_file(path) {
                    projects.push(path.to_path_buf());
                }
            }
            Err(err) => warn!(error = %err, "skipping unreadable entry during project discovery"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, rel: &str) -> PathBuf {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, "<Project />").expect("write file");
        path
    }

    #[test]
    fn recognizes_project_extensions() {
        assert!(is_project_file(Path::new("App.csproj")));
        assert!(is_project_file(Path::new("Lib.fsproj")));
        assert!(is_project_file(Path::new("Old.vbproj")));
        assert!(!is_project_file(Path::new("App.sln")));
        assert!(!is_project_file(Path::new("csproj")));
    }

    #[test]
    fn scans_directories_recursively() {
        let dir = TempDir::new().expect("temp dir");
        let a = touch(&dir, "App/App.csproj");
        let b = touch(&dir, "Lib/Lib.fsproj");
        touch(&dir, "App/Program.cs");

        let found = discover_projects(&[dir.path().to_path_buf()]);
        assert_eq!(found, {
            let mut expected = vec![a, b];
            expected.sort();
            expected
        });
    }

    #[test]
    fn skips_bin_and_obj_directories() {
        let dir = TempDir::new().expect("temp dir");
        let real = touch(&dir, "App/App.csproj");
        touch(&dir, "App/bin/Debug/App.csproj");
        touch(&dir, "App/obj/App.csproj");

        let found = discover_projects(&[dir.path().to_path_buf()]);
        assert_eq!(found, vec![real]);
    }

    #[test]
    fn explicit_files_pass_through_unchecked() {
        let missing = PathBuf::from("/does/not/exist/App.csproj");
        let found = discover_projects(&[missing.clone()]);
        assert_eq!(found, vec![missing]);
    }

    #[test]
    fn mixed_arguments_are_merged_and_deduplicated() {
        let dir = TempDir::new().expect("temp dir");
        let a = touch(&dir, "App/App.csproj");

        let found = discover_projects(&[dir.path().to_path_buf(), a.clone()]);
        assert_eq!(found, vec![a]);
    }
}
