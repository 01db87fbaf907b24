//! Font manifest: a Sass partial with one `@include font(...)` per family.
//!
//! The manifest is written once. A manifest with any content is treated as
//! hand-maintained and left alone.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::paths::ProjectPaths;
use crate::task::{write_output, TaskError};

/// Whether the manifest still needs generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestState {
    Empty,
    Populated,
}

/// Read the manifest state; a missing file counts as empty.
pub fn state(path: &Path) -> Result<ManifestState, TaskError> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(ManifestState::Populated),
        Ok(_) => Ok(ManifestState::Empty),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(ManifestState::Empty),
        Err(e) => Err(TaskError::read(path, e)),
    }
}

/// Generate the manifest from the built fonts folder if it is empty.
///
/// Returns the manifest path when it was written.
pub fn run(paths: &ProjectPaths) -> Result<Option<PathBuf>, TaskError> {
    let manifest = &paths.font_manifest;

    if state(manifest)? == ManifestState::Populated {
        tracing::debug!("Font manifest {} already populated", manifest.display());
        return Ok(None);
    }

    let entries = list_fonts(&paths.build.fonts)?;
    write_output(manifest, generate(&entries))?;

    Ok(Some(manifest.clone()))
}

/// Entry names in `dir`, sorted; a missing folder is empty.
fn list_fonts(dir: &Path) -> Result<Vec<String>, TaskError> {
    let reader = match fs::read_dir(dir) {
        Ok(reader) => reader,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TaskError::read(dir, e)),
    };

    let mut names = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|e| TaskError::read(dir, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    Ok(names)
}

/// Manifest text for sorted `entries`.
///
/// Consecutive entries sharing a family name produce one line.
pub fn generate<S: AsRef<str>>(entries: &[S]) -> String {
    let mut out = String::new();
    let mut previous: Option<&str> = None;

    for entry in entries {
        let name = family_name(entry.as_ref());
        if previous != Some(name) {
            out.push_str(&font_directive(name));
        }
        previous = Some(name);
    }

    out
}

/// Family name of a font file: everything before the first `.`.
pub fn family_name(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

pub fn font_directive(name: &str) -> String {
    format!("@include font(\"{name}\", \"{name}\", \"400\", \"normal\");\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathsConfig;
    use tempfile::tempdir;

    #[test]
    fn suppresses_consecutive_duplicates() {
        let out = generate(&["a.woff", "a.woff2", "b.woff"]);

        assert_eq!(
            out,
            "@include font(\"a\", \"a\", \"400\", \"normal\");\r\n\
             @include font(\"b\", \"b\", \"400\", \"normal\");\r\n"
        );
    }

    #[test]
    fn family_is_cut_at_first_dot() {
        assert_eq!(family_name("Roboto.Bold.woff2"), "Roboto");
        assert_eq!(family_name("noext"), "noext");
    }

    fn project() -> (tempfile::TempDir, ProjectPaths) {
        let temp = tempdir().unwrap();
        let root = temp.path().join("site");
        let paths = ProjectPaths::new(&root, &PathsConfig::default());

        fs::create_dir_all(&paths.build.fonts).unwrap();
        for name in ["b.woff", "a.woff2", "a.woff"] {
            fs::write(paths.build.fonts.join(name), b"").unwrap();
        }

        (temp, paths)
    }

    #[test]
    fn writes_sorted_manifest_when_missing() {
        let (_temp, paths) = project();

        let written = run(&paths).unwrap();

        assert_eq!(written.as_deref(), Some(paths.font_manifest.as_path()));
        let manifest = fs::read_to_string(&paths.font_manifest).unwrap();
        assert_eq!(manifest, generate(&["a.woff", "a.woff2", "b.woff"]));
        assert_eq!(manifest.lines().count(), 2);
    }

    #[test]
    fn leaves_populated_manifest_alone() {
        let (_temp, paths) = project();
        write_output(&paths.font_manifest, "// custom\n").unwrap();

        assert_eq!(state(&paths.font_manifest).unwrap(), ManifestState::Populated);
        assert_eq!(run(&paths).unwrap(), None);
        assert_eq!(
            fs::read_to_string(&paths.font_manifest).unwrap(),
            "// custom\n"
        );
    }

    #[test]
    fn missing_fonts_folder_yields_empty_manifest() {
        let temp = tempdir().unwrap();
        let paths = ProjectPaths::new(temp.path().join("site"), &PathsConfig::default());

        run(&paths).unwrap();

        assert_eq!(state(&paths.font_manifest).unwrap(), ManifestState::Empty);
        assert!(paths.font_manifest.exists());
    }
}
