//! Stack-mode SVG sprite: every icon nested in one document, shown via `:target`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use minijinja::{context, Environment};
use regex::Regex;
use serde::Serialize;

use crate::paths::ProjectPaths;
use crate::task::{write_output, TaskError};

static SVG_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<svg\b([^>]*)>").expect("Invalid svg regex"));

static VIEW_BOX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bviewBox\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Invalid viewBox regex")
});

static SVG_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</svg\s*>").expect("Invalid svg close regex"));

const SPRITE_TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink">
<style>:root>svg{display:none}:root>svg:target{display:block}</style>
{%- for icon in icons %}
<svg id="{{ icon.id }}"{% if icon.view_box %} viewBox="{{ icon.view_box }}"{% endif %}>{{ icon.body | safe }}</svg>
{%- endfor %}
</svg>
"#;

/// One icon of the sprite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Icon {
    /// Fragment id; the source file stem
    pub id: String,
    pub view_box: Option<String>,
    /// Markup inside the icon's root element
    pub body: String,
}

impl Icon {
    /// Extract an icon from an SVG document.
    pub fn parse(id: &str, svg: &str) -> Option<Self> {
        let open = SVG_OPEN_RE.captures(svg)?;
        let whole = open.get(0)?;
        let attributes = open.get(1).map_or("", |m| m.as_str());

        let view_box = VIEW_BOX_RE.captures(attributes).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
        });

        let body = if attributes.trim_end().ends_with('/') {
            String::new()
        } else {
            let rest = &svg[whole.end()..];
            let close = SVG_CLOSE_RE
                .find_iter(rest)
                .last()
                .map_or(rest.len(), |m| m.start());
            rest[..close].trim().to_string()
        };

        Some(Self {
            id: id.to_string(),
            view_box,
            body,
        })
    }
}

/// Render the sprite document.
pub fn render(icons: &[Icon]) -> Result<String, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("sprite.xml", SPRITE_TEMPLATE)?;

    env.get_template("sprite.xml")?
        .render(context! { icons => icons })
}

/// Pack the icon set into the sprite file.
///
/// Unreadable or malformed icons are logged and left out. Returns `None`
/// when there are no icons.
pub fn run(paths: &ProjectPaths) -> Result<Option<PathBuf>, TaskError> {
    let sources = paths.source.sprite.walk(paths.root());
    if sources.is_empty() {
        return Ok(None);
    }

    let icons: Vec<Icon> = sources
        .iter()
        .filter_map(|source| match load_icon(source) {
            Ok(icon) => Some(icon),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        })
        .collect();

    let target = &paths.sprite_output;
    let sprite = render(&icons).map_err(|e| TaskError::compile(target, e))?;
    write_output(target, sprite)?;

    Ok(Some(target.clone()))
}

fn load_icon(source: &Path) -> Result<Icon, TaskError> {
    let svg = fs::read_to_string(source).map_err(|e| TaskError::read(source, e))?;
    let id = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| TaskError::convert(source, "file name is not valid UTF-8"))?;

    Icon::parse(id, &svg).ok_or_else(|| TaskError::convert(source, "no <svg> element found"))
}
