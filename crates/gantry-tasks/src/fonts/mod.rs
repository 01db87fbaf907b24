//! Fonts task: WOFF/WOFF2 wrappers for sfnt fonts, plus the otf2ttf helper.

pub mod sfnt;
pub mod woff;
pub mod woff2;

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::paths::ProjectPaths;
use crate::task::{write_output, Batch, TaskError};
use sfnt::Font;

/// Convert or copy every font in the source set into the fonts output folder.
pub fn run(paths: &ProjectPaths) -> Batch {
    let sources = paths.source.fonts.walk(paths.root());
    let src_dir = paths.fonts_src_dir();

    let results: Vec<Vec<Result<PathBuf, TaskError>>> = sources
        .par_iter()
        .map(|source| {
            let relative = source.strip_prefix(&src_dir).unwrap_or(source);
            let target = paths.build.fonts.join(relative);

            if is_sfnt(source) {
                convert(source, &target)
            } else {
                vec![copy(source, &target)]
            }
        })
        .collect();

    Batch::collect(results.into_iter().flatten())
}

fn is_sfnt(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("ttf"))
}

/// Write `<target>.woff` and `<target>.woff2` for one sfnt font.
///
/// The two containers are encoded in parallel and fail independently.
pub fn convert(source: &Path, target: &Path) -> Vec<Result<PathBuf, TaskError>> {
    let bytes = match fs::read(source) {
        Ok(bytes) => bytes,
        Err(e) => return vec![Err(TaskError::read(source, e))],
    };

    let font = match Font::parse(&bytes) {
        Ok(font) => font,
        Err(e) => return vec![Err(TaskError::convert(source, e))],
    };

    let (woff, woff2) = rayon::join(
        || write_container(source, &target.with_extension("woff"), woff::encode(&font)),
        || write_container(source, &target.with_extension("woff2"), woff2::encode(&font)),
    );

    vec![woff, woff2]
}

fn write_container(
    source: &Path,
    target: &Path,
    encoded: std::io::Result<Vec<u8>>,
) -> Result<PathBuf, TaskError> {
    let encoded = encoded.map_err(|e| TaskError::convert(source, e))?;
    write_output(target, encoded)?;
    Ok(target.to_path_buf())
}

fn copy(source: &Path, target: &Path) -> Result<PathBuf, TaskError> {
    let bytes = fs::read(source).map_err(|e| TaskError::read(source, e))?;
    write_output(target, bytes)?;
    Ok(target.to_path_buf())
}

/// Rewrite TrueType-flavoured `.otf` files as `.ttf` next to the source.
///
/// CFF-flavoured fonts have no lossless TrueType form and are reported
/// per file.
pub fn otf2ttf(paths: &ProjectPaths) -> Batch {
    let sources = paths.source.otf.walk(paths.root());

    let results: Vec<Result<PathBuf, TaskError>> = sources
        .par_iter()
        .map(|source| rewrap_otf(source))
        .collect();

    Batch::collect(results)
}

fn rewrap_otf(source: &Path) -> Result<PathBuf, TaskError> {
    let bytes = fs::read(source).map_err(|e| TaskError::read(source, e))?;
    let font = Font::parse(&bytes).map_err(|e| TaskError::convert(source, e))?;

    if font.flavor == sfnt::CFF {
        return Err(TaskError::convert(
            source,
            "CFF outlines cannot be converted to TrueType",
        ));
    }

    let target = source.with_extension("ttf");
    write_output(&target, &bytes)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathsConfig;
    use tempfile::tempdir;

    fn project() -> (tempfile::TempDir, ProjectPaths) {
        let temp = tempdir().unwrap();
        let root = temp.path().join("site");
        let fonts = root.join("src/fonts");
        fs::create_dir_all(&fonts).unwrap();

        let glyf = vec![3u8; 256];
        let ttf = sfnt::build(sfnt::TRUETYPE, &[(b"glyf", &glyf), (b"head", &[0u8; 54])]);
        fs::write(fonts.join("Roboto-Regular.ttf"), &ttf).unwrap();
        fs::write(fonts.join("Legacy.eot"), b"eot bytes").unwrap();

        let paths = ProjectPaths::new(&root, &PathsConfig::default());
        (temp, paths)
    }

    #[test]
    fn wraps_ttf_and_copies_web_fonts() {
        let (_temp, paths) = project();

        let batch = run(&paths);

        assert_eq!(batch.failed, 0);
        assert_eq!(batch.outputs.len(), 3);

        let woff = fs::read(paths.build.fonts.join("Roboto-Regular.woff")).unwrap();
        let woff2 = fs::read(paths.build.fonts.join("Roboto-Regular.woff2")).unwrap();
        assert_eq!(&woff[..4], b"wOFF");
        assert_eq!(&woff2[..4], b"wOF2");
        assert_eq!(
            fs::read(paths.build.fonts.join("Legacy.eot")).unwrap(),
            b"eot bytes"
        );
    }

    #[test]
    fn isolates_unreadable_fonts() {
        let (_temp, paths) = project();
        fs::write(paths.fonts_src_dir().join("Broken.ttf"), b"nope").unwrap();

        let batch = run(&paths);

        assert_eq!(batch.failed, 1);
        assert!(paths.build.fonts.join("Roboto-Regular.woff2").exists());
    }

    #[test]
    fn rewraps_truetype_otf_only() {
        let (_temp, paths) = project();
        let fonts = paths.fonts_src_dir();
        let truetype = sfnt::build(sfnt::TRUETYPE, &[(b"glyf", b"abcd")]);
        let cff = sfnt::build(sfnt::CFF, &[(b"CFF ", b"abcd")]);
        fs::write(fonts.join("Sans.otf"), &truetype).unwrap();
        fs::write(fonts.join("Serif.otf"), &cff).unwrap();

        let batch = otf2ttf(&paths);

        assert_eq!(batch.failed, 1);
        assert_eq!(fs::read(fonts.join("Sans.ttf")).unwrap(), truetype);
        assert!(!fonts.join("Serif.ttf").exists());
    }
}
