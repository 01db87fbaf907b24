//! Glob sets with brace alternatives and `!` exclusions.

use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A set of root-relative glob patterns.
///
/// Supports `*`, `**`, `?`, character classes and `{a,b}` alternatives.
/// Patterns prefixed with `!` exclude matches.
#[derive(Debug, Clone)]
pub struct AssetGlob {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    sources: Vec<String>,
}

impl AssetGlob {
    /// Build a glob set from pattern strings.
    ///
    /// Patterns are built from escaped path components, so an invalid
    /// pattern can only come from a programming error; it is logged and
    /// dropped.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        let mut sources = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            sources.push(pattern.to_string());

            let (negated, body) = match pattern.strip_prefix('!') {
                Some(body) => (true, body),
                None => (false, pattern),
            };

            for expanded in expand_braces(body) {
                match Pattern::new(&expanded) {
                    Ok(p) if negated => exclude.push(p),
                    Ok(p) => include.push(p),
                    Err(e) => tracing::warn!("Ignoring invalid glob '{}': {}", expanded, e),
                }
            }
        }

        Self {
            include,
            exclude,
            sources,
        }
    }

    /// The pattern strings this set was built from.
    pub fn patterns(&self) -> &[String] {
        &self.sources
    }

    /// Check a root-relative path against the set.
    pub fn matches(&self, relative: &Path) -> bool {
        let candidate = to_slash(relative);

        self.include
            .iter()
            .any(|p| p.matches_with(&candidate, MATCH_OPTIONS))
            && !self
                .exclude
                .iter()
                .any(|p| p.matches_with(&candidate, MATCH_OPTIONS))
    }

    /// Walk `root` and return every matching file, sorted.
    pub fn walk(&self, root: &Path) -> Vec<PathBuf> {
        let mut bases: Vec<PathBuf> = self
            .include
            .iter()
            .map(|p| literal_prefix(p.as_str()))
            .collect();
        bases.sort();
        bases.dedup();

        let mut files = Vec::new();

        for base in bases {
            let dir = root.join(&base);
            if !dir.is_dir() {
                continue;
            }

            for entry in WalkDir::new(&dir)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.path();
                let relative = path.strip_prefix(root).unwrap_or(path);
                if self.matches(relative) {
                    files.push(path.to_path_buf());
                }
            }
        }

        files.sort();
        files.dedup();
        files
    }
}

/// Expand `{a,b}` alternatives into separate patterns.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();

    for (i, c) in pattern[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(open + i),
            _ => {}
        }
    }

    // Unbalanced braces are taken literally
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| {
            let alternative = &pattern[w[0] + 1..w[1]];
            expand_braces(&format!("{}{}{}", prefix, alternative, suffix))
        })
        .collect()
}

/// Leading components of a pattern that contain no wildcards.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut components = pattern.split('/').peekable();

    while let Some(component) = components.next() {
        // The last component names files, not a directory to walk
        if components.peek().is_none() || component.contains(['*', '?', '[']) {
            break;
        }
        prefix.push(component);
    }

    prefix
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn expands_brace_alternatives() {
        assert_eq!(
            expand_braces("img/**/*.{jpg,png}"),
            vec!["img/**/*.jpg", "img/**/*.png"]
        );
        assert_eq!(expand_braces("a{b,c}d{e,f}").len(), 4);
        assert_eq!(expand_braces("plain/*.html"), vec!["plain/*.html"]);
        assert_eq!(expand_braces("broken{a,b"), vec!["broken{a,b"]);
    }

    #[test]
    fn excludes_negated_patterns() {
        let glob = AssetGlob::new(["src/*.html", "!src/_*.html"]);

        assert!(glob.matches(Path::new("src/index.html")));
        assert!(!glob.matches(Path::new("src/_header.html")));
        assert!(!glob.matches(Path::new("src/html/page.html")));
    }

    #[test]
    fn double_star_matches_any_depth() {
        let glob = AssetGlob::new(["src/**/*.html"]);

        assert!(glob.matches(Path::new("src/index.html")));
        assert!(glob.matches(Path::new("src/html/parts/_nav.html")));
        assert!(!glob.matches(Path::new("other/index.html")));
    }

    #[test]
    fn walks_matching_files_sorted() {
        let temp = tempdir().unwrap();
        let img = temp.path().join("src/img/icons");
        fs::create_dir_all(&img).unwrap();
        fs::write(temp.path().join("src/img/b.png"), b"").unwrap();
        fs::write(temp.path().join("src/img/a.jpg"), b"").unwrap();
        fs::write(img.join("c.svg"), b"").unwrap();
        fs::write(temp.path().join("src/img/notes.txt"), b"").unwrap();

        let glob = AssetGlob::new(["src/img/**/*.{jpg,png,svg}"]);
        let files = glob.walk(temp.path());

        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            names,
            vec![
                PathBuf::from("src/img/a.jpg"),
                PathBuf::from("src/img/b.png"),
                PathBuf::from("src/img/icons/c.svg"),
            ]
        );
    }

    #[test]
    fn finds_literal_prefix() {
        assert_eq!(literal_prefix("src/img/**/*.png"), PathBuf::from("src/img"));
        assert_eq!(literal_prefix("src/*.html"), PathBuf::from("src"));
        assert_eq!(literal_prefix("*.html"), PathBuf::new());
    }
}
