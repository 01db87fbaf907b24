//! HTML task: includes resolved, `<img>` upgraded to webp `<picture>`.

use std::path::PathBuf;
use std::sync::LazyLock;

use gantry_include::Resolver;
use regex::{Captures, Regex};

use crate::paths::ProjectPaths;
use crate::task::{write_output, TaskError};

static IMG_OR_PICTURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<picture\b.*?</picture>|<img\b[^>]*>").expect("Invalid img regex")
});

static SRC_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("Invalid src regex")
});

const WEBP_SOURCE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Build every page in the html source set.
pub fn run(paths: &ProjectPaths) -> Result<Vec<PathBuf>, TaskError> {
    let resolver = Resolver::new();
    let mut outputs = Vec::new();

    for source in paths.source.html.walk(paths.root()) {
        let resolved = resolver.resolve_file(&source)?;
        let html = webp_picture(&resolved);

        let Some(name) = source.file_name() else {
            continue;
        };
        let output = paths.build.html.join(name);
        write_output(&output, html)?;

        tracing::debug!("Built {}", output.display());
        outputs.push(output);
    }

    Ok(outputs)
}

/// Wrap raster `<img>` tags in a `<picture>` offering a webp source.
///
/// Tags already inside a `<picture>` are left alone.
pub fn webp_picture(html: &str) -> String {
    IMG_OR_PICTURE_RE
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            if tag.get(..8).is_some_and(|p| p.eq_ignore_ascii_case("<picture")) {
                return tag.to_string();
            }

            match webp_src(tag) {
                Some(webp) => format!(
                    r#"<picture><source srcset="{}" type="image/webp">{}</picture>"#,
                    webp, tag
                ),
                None => tag.to_string(),
            }
        })
        .into_owned()
}

/// The webp counterpart of an `<img>` tag's `src`, if it is a raster image.
fn webp_src(tag: &str) -> Option<String> {
    let caps = SRC_ATTR_RE.captures(tag)?;
    let src = caps.get(1).or_else(|| caps.get(2))?.as_str();

    let (path, suffix) = match src.find(['?', '#']) {
        Some(i) => src.split_at(i),
        None => (src, ""),
    };

    let dot = path.rfind('.')?;
    let ext = &path[dot + 1..];
    if !WEBP_SOURCE_EXTENSIONS
        .iter()
        .any(|e| e.eq_ignore_ascii_case(ext))
    {
        return None;
    }

    Some(format!("{}.webp{}", &path[..dot], suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathsConfig;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn wraps_raster_images() {
        let html = webp_picture(r#"<p><img src="img/hero.jpg" alt="Hero"></p>"#);

        assert_eq!(
            html,
            r#"<p><picture><source srcset="img/hero.webp" type="image/webp"><img src="img/hero.jpg" alt="Hero"></picture></p>"#
        );
    }

    #[test]
    fn keeps_query_strings() {
        let html = webp_picture("<img src='a.PNG?v=2'>");

        assert!(html.contains(r#"srcset="a.webp?v=2""#));
    }

    #[test]
    fn skips_vector_and_existing_pictures() {
        let svg = r#"<img src="logo.svg">"#;
        assert_eq!(webp_picture(svg), svg);

        let picture = r#"<picture><source srcset="x.webp"><img src="x.jpg"></picture>"#;
        assert_eq!(webp_picture(picture), picture);
    }

    #[test]
    fn builds_one_page_per_source_without_partials() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("site");
        let src = root.join("src");
        fs::create_dir_all(src.join("html")).unwrap();

        fs::write(
            src.join("index.html"),
            "<body>@@include('html/_header.html')<img src=\"img/a.png\"></body>",
        )
        .unwrap();
        fs::write(src.join("about.html"), "<body>@@include('_footer.html')</body>").unwrap();
        fs::write(src.join("_footer.html"), "<footer>f</footer>").unwrap();
        fs::write(src.join("html/_header.html"), "<header>h</header>").unwrap();

        let paths = ProjectPaths::new(&root, &PathsConfig::default());
        let outputs = run(&paths).unwrap();

        assert_eq!(outputs.len(), 2);
        assert!(!root.join("site/_footer.html").exists());

        let index = fs::read_to_string(root.join("site/index.html")).unwrap();
        assert!(index.contains("<header>h</header>"));
        assert!(index.contains("img/a.webp"));
        assert!(!index.contains("@@include"));

        let about = fs::read_to_string(root.join("site/about.html")).unwrap();
        assert_eq!(about, "<body><footer>f</footer></body>");
    }

    #[test]
    fn fails_on_unresolved_include() {
        let temp = tempdir().unwrap();
        let root = temp.path().join("site");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/index.html"), "@@include('_missing.html')").unwrap();

        let paths = ProjectPaths::new(&root, &PathsConfig::default());
        let err = run(&paths).unwrap_err();

        assert!(err.to_string().contains("index.html"));
        assert!(err.to_string().contains("_missing.html"));
    }
}
