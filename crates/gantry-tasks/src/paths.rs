//! Project path convention.
//!
//! Every source glob, output directory and auxiliary location is derived
//! from the project root and two names: the source folder (`src`) and the
//! distribution folder (the project folder's own name unless configured).

use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::Deserialize;

use crate::pattern::AssetGlob;
use crate::task::Task;

const IMAGE_EXTENSIONS: &str = "{jpg,png,svg,gif,ico,webp}";
const FONT_EXTENSIONS: &str = "{eot,woff,woff2,ttf,svg}";

/// Folder names the convention is built from.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Source folder, relative to the root
    #[serde(default = "default_src")]
    pub src: String,

    /// Output folder, relative to the root; defaults to the root's name
    #[serde(default)]
    pub dist: Option<String>,
}

fn default_src() -> String {
    "src".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            dist: None,
        }
    }
}

/// Output directories, one per asset class.
#[derive(Debug, Clone)]
pub struct BuildDirs {
    pub html: PathBuf,
    pub css: PathBuf,
    pub js: PathBuf,
    pub img: PathBuf,
    pub fonts: PathBuf,
}

/// Source sets, one per asset class.
#[derive(Debug, Clone)]
pub struct SourceSets {
    pub html: AssetGlob,
    pub css: PathBuf,
    pub js: PathBuf,
    pub img: AssetGlob,
    pub fonts: AssetGlob,
    pub otf: AssetGlob,
    pub sprite: AssetGlob,
}

/// Globs whose changes re-run a task in watch mode.
#[derive(Debug, Clone)]
pub struct WatchSets {
    pub html: AssetGlob,
    pub scss: AssetGlob,
    pub js: AssetGlob,
    pub img: AssetGlob,
}

/// Resolved project layout.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
    src: PathBuf,
    dist: PathBuf,

    pub build: BuildDirs,
    pub source: SourceSets,
    pub watch: WatchSets,

    /// Generated `@include font(...)` list
    pub font_manifest: PathBuf,

    /// Stack sprite written by the sprite task
    pub sprite_output: PathBuf,
}

impl ProjectPaths {
    /// Derive the layout for a project rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, config: &PathsConfig) -> Self {
        let root = root.into();

        let dist_name = config.dist.clone().unwrap_or_else(|| {
            root.file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string)
                .unwrap_or_else(|| "dist".to_string())
        });

        let src = root.join(&config.src);
        let dist = root.join(&dist_name);

        let s = escape_relative(&config.src);

        let build = BuildDirs {
            html: dist.clone(),
            css: dist.join("css"),
            js: dist.join("js"),
            img: dist.join("img"),
            fonts: dist.join("fonts"),
        };

        let source = SourceSets {
            html: AssetGlob::new([format!("{}/*.html", s), format!("!{}/_*.html", s)]),
            css: src.join("scss").join("style.scss"),
            js: src.join("js").join("script.js"),
            img: AssetGlob::new([format!("{}/img/**/*.{}", s, IMAGE_EXTENSIONS)]),
            fonts: AssetGlob::new([format!("{}/fonts/**/*.{}", s, FONT_EXTENSIONS)]),
            otf: AssetGlob::new([format!("{}/fonts/*.otf", s)]),
            sprite: AssetGlob::new([format!("{}/iconsprite/*.svg", s)]),
        };

        let watch = WatchSets {
            html: AssetGlob::new([format!("{}/**/*.html", s)]),
            scss: AssetGlob::new([format!("{}/scss/**/*.scss", s)]),
            js: AssetGlob::new([format!("{}/js/**/*.js", s)]),
            img: AssetGlob::new([format!("{}/img/**/*.{}", s, IMAGE_EXTENSIONS)]),
        };

        Self {
            font_manifest: src.join("scss").join("fonts.scss"),
            sprite_output: build.img.join("icons").join("icons.svg"),
            root,
            src,
            dist,
            build,
            source,
            watch,
        }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Source folder.
    pub fn src_dir(&self) -> &Path {
        &self.src
    }

    /// Distribution folder; also the `clean` target.
    pub fn dist_dir(&self) -> &Path {
        &self.dist
    }

    /// Source folder of the image set, used to mirror subfolders.
    pub fn img_src_dir(&self) -> PathBuf {
        self.src.join("img")
    }

    /// Source folder of the font set.
    pub fn fonts_src_dir(&self) -> PathBuf {
        self.src.join("fonts")
    }

    /// Map a changed file to the task that rebuilds it.
    ///
    /// Accepts absolute paths under the root or root-relative paths.
    pub fn classify(&self, path: &Path) -> Option<Task> {
        let relative = if path.is_absolute() {
            path.strip_prefix(&self.root).ok()?
        } else {
            path
        };

        if self.watch.html.matches(relative) {
            Some(Task::Html)
        } else if self.watch.scss.matches(relative) {
            Some(Task::Css)
        } else if self.watch.js.matches(relative) {
            Some(Task::Js)
        } else if self.watch.img.matches(relative) {
            Some(Task::Images)
        } else {
            None
        }
    }
}

/// Escape each component of a relative folder for use inside a pattern.
fn escape_relative(folder: &str) -> String {
    folder
        .split(['/', '\\'])
        .filter(|c| !c.is_empty() && *c != ".")
        .map(Pattern::escape)
        .collect::<Vec<_>>()
        .join("/")
}
