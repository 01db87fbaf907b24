//! CSS task: Sass entry point to prefixed, grouped, minified stylesheets.

pub mod media;
pub mod webp;

use std::path::{Path, PathBuf};

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::paths::ProjectPaths;
use crate::task::{write_output, TaskError};

pub use media::group_media_queries;
pub use webp::add_webp_variants;

/// Unminified and minified renderings of one stylesheet.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledCss {
    pub expanded: String,
    pub minified: String,
}

/// Compile the stylesheet entry and write `style.css` and `style.min.css`.
pub fn run(paths: &ProjectPaths) -> Result<Vec<PathBuf>, TaskError> {
    let entry = &paths.source.css;
    if !entry.is_file() {
        return Err(TaskError::read(entry, "stylesheet entry point not found"));
    }

    let compiled = compile(entry)?;

    let stem = entry
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("style");

    let expanded_path = paths.build.css.join(format!("{}.css", stem));
    let minified_path = paths.build.css.join(format!("{}.min.css", stem));

    write_output(&expanded_path, &compiled.expanded)?;
    write_output(&minified_path, &compiled.minified)?;

    Ok(vec![expanded_path, minified_path])
}

/// Compile a Sass file and run the post-processing chain.
pub fn compile(entry: &Path) -> Result<CompiledCss, TaskError> {
    let mut options = grass::Options::default().style(grass::OutputStyle::Expanded);
    if let Some(dir) = entry.parent() {
        options = options.load_path(dir);
    }

    let css = grass::from_path(entry, &options).map_err(|e| TaskError::compile(entry, e))?;

    postprocess(&css, &entry.display().to_string()).map_err(|e| TaskError::compile(entry, e))
}

/// Webp variants, media grouping, vendor prefixes, then both printings.
///
/// Prefixing runs through the minify pass, so the expanded copy carries
/// normalized values (`#ff0000` prints as `red`) with readable layout.
pub fn postprocess(css: &str, filename: &str) -> Result<CompiledCss, String> {
    let css = add_webp_variants(css);

    let mut sheet = StyleSheet::parse(
        &css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| e.to_string())?;

    group_media_queries(&mut sheet).map_err(|e| e.to_string())?;

    let targets = default_targets();

    sheet
        .minify(MinifyOptions {
            targets,
            ..MinifyOptions::default()
        })
        .map_err(|e| e.to_string())?;

    let expanded = sheet
        .to_css(PrinterOptions {
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?
        .code;

    let minified = sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?
        .code;

    Ok(CompiledCss { expanded, minified })
}

/// Browser floor used for prefixing and syntax lowering.
pub fn default_targets() -> Targets {
    let version = |major: u32| major << 16;

    Targets::from(Browsers {
        android: Some(version(90)),
        chrome: Some(version(80)),
        edge: Some(version(80)),
        firefox: Some(version(78)),
        ios_saf: Some(version(12)),
        opera: Some(version(67)),
        safari: Some(version(12)),
        samsung: Some(version(12)),
        ..Browsers::default()
    })
}
