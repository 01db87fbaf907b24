//! Webp variants for background images.
//!
//! Rules with a `background`/`background-image` pointing at a jpeg or png
//! are split: the image declarations move to a `.no-webp` scoped copy and a
//! `.webp` scoped copy references the `.webp` file instead. Compiled Sass
//! output is flat, so a small brace-aware scanner is enough here.

use std::sync::LazyLock;

use regex::{Captures, Regex};

pub const WEBP_CLASS: &str = ".webp";
pub const NO_WEBP_CLASS: &str = ".no-webp";

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^'"()\s]*))\s*\)"#)
        .expect("Invalid url regex")
});

const RASTER_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// At-rules whose children are not style rules.
const OPAQUE_AT_RULES: [&str; 4] = ["@keyframes", "@-webkit-keyframes", "@font-face", "@page"];

#[derive(Debug, PartialEq)]
enum Node<'a> {
    /// Comment or block-less statement, emitted as-is
    Raw(&'a str),
    Block {
        prelude: &'a str,
        /// Source text between the braces
        inner: &'a str,
        body: Body<'a>,
    },
}

#[derive(Debug, PartialEq)]
enum Body<'a> {
    Declarations(&'a str),
    Nested(Vec<Node<'a>>),
}

/// Add `.webp`/`.no-webp` rule variants to `css`.
pub fn add_webp_variants(css: &str) -> String {
    let nodes = parse(css);
    let mut out = String::with_capacity(css.len());
    write_nodes(&nodes, &mut out);
    out
}

fn write_nodes(nodes: &[Node<'_>], out: &mut String) {
    for node in nodes {
        match node {
            Node::Raw(text) => {
                out.push_str(text);
                out.push('\n');
            }
            Node::Block {
                prelude,
                inner,
                body,
            } => write_block(prelude, inner, body, out),
        }
    }
}

fn write_block(prelude: &str, inner: &str, body: &Body<'_>, out: &mut String) {
    let opaque = OPAQUE_AT_RULES
        .iter()
        .any(|at| prelude.to_ascii_lowercase().starts_with(at));

    match body {
        Body::Nested(children) if !opaque => {
            out.push_str(prelude);
            out.push_str(" {\n");
            write_nodes(children, out);
            out.push_str("}\n");
        }
        Body::Declarations(decls) if !opaque && !prelude.starts_with('@') => {
            write_style_rule(prelude, decls, out);
        }
        Body::Nested(_) | Body::Declarations(_) => {
            out.push_str(prelude);
            out.push_str(" {");
            out.push_str(inner);
            out.push_str("}\n");
        }
    }
}

fn write_style_rule(selectors: &str, decls: &str, out: &mut String) {
    let (images, rest): (Vec<&str>, Vec<&str>) = split_top_level(decls, ';')
        .into_iter()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .partition(|d| is_raster_background(d));

    if images.is_empty() {
        out.push_str(selectors);
        out.push_str(" {");
        out.push_str(decls);
        out.push_str("}\n");
        return;
    }

    if !rest.is_empty() {
        push_rule(out, selectors, rest.iter().map(|d| d.to_string()));
    }

    let list = split_top_level(selectors, ',');

    push_rule(
        out,
        &scope_selectors(&list, NO_WEBP_CLASS),
        images.iter().map(|d| d.to_string()),
    );
    push_rule(
        out,
        &scope_selectors(&list, WEBP_CLASS),
        images.iter().map(|d| to_webp_urls(d)),
    );
}

fn push_rule(out: &mut String, selectors: &str, decls: impl Iterator<Item = String>) {
    out.push_str(selectors);
    out.push_str(" {\n");
    for decl in decls {
        out.push_str("  ");
        out.push_str(&decl);
        out.push_str(";\n");
    }
    out.push_str("}\n");
}

fn is_raster_background(decl: &str) -> bool {
    let Some((property, value)) = decl.split_once(':') else {
        return false;
    };

    let property = property.trim().to_ascii_lowercase();
    if property != "background" && property != "background-image" {
        return false;
    }

    URL_RE
        .captures_iter(value)
        .any(|caps| url_target(&caps).is_some_and(is_raster))
}

fn url_target<'c>(caps: &Captures<'c>) -> Option<&'c str> {
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
}

/// Split a url into path and `?query`/`#fragment` suffix.
fn split_suffix(url: &str) -> (&str, &str) {
    match url.find(['?', '#']) {
        Some(i) => url.split_at(i),
        None => (url, ""),
    }
}

fn is_raster(url: &str) -> bool {
    let (path, _) = split_suffix(url);
    path.rsplit_once('.').is_some_and(|(_, ext)| {
        RASTER_EXTENSIONS
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    })
}

fn to_webp_urls(decl: &str) -> String {
    URL_RE
        .replace_all(decl, |caps: &Captures| {
            let Some(url) = url_target(caps) else {
                return caps[0].to_string();
            };
            if !is_raster(url) {
                return caps[0].to_string();
            }

            let (path, suffix) = split_suffix(url);
            let stem = path.rsplit_once('.').map_or(path, |(stem, _)| stem);
            format!("url(\"{}.webp{}\")", stem, suffix)
        })
        .into_owned()
}

/// Scope every selector under `class`; `html` and `:root` take the class
/// directly since the class is set on the root element.
fn scope_selectors(selectors: &[&str], class: &str) -> String {
    selectors
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            for root in ["html", ":root"] {
                if let Some(rest) = s.strip_prefix(root) {
                    let boundary = rest
                        .chars()
                        .next()
                        .is_none_or(|c| !(c.is_alphanumeric() || c == '-' || c == '_'));
                    if boundary {
                        return format!("{}{}{}", root, class, rest);
                    }
                }
            }
            format!("{} {}", class, s)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn parse(input: &str) -> Vec<Node<'_>> {
    let mut nodes = Vec::new();
    let mut pos = 0;

    loop {
        let rest = &input[pos..];
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        pos += rest.len() - trimmed.len();

        if trimmed.starts_with("/*") {
            let end = trimmed.find("*/").map_or(input.len(), |i| pos + i + 2);
            nodes.push(Node::Raw(&input[pos..end]));
            pos = end;
            continue;
        }

        match scan_to(input, pos, &['{', ';', '}']) {
            Some((i, ';')) => {
                nodes.push(Node::Raw(&input[pos..=i]));
                pos = i + 1;
            }
            Some((i, '{')) => {
                let Some(close) = matching_brace(input, i) else {
                    nodes.push(Node::Raw(input[pos..].trim_end()));
                    break;
                };

                let prelude = input[pos..i].trim();
                let inner = &input[i + 1..close];
                let body = if scan_to(inner, 0, &['{']).is_some() {
                    Body::Nested(parse(inner))
                } else {
                    Body::Declarations(inner)
                };

                nodes.push(Node::Block {
                    prelude,
                    inner,
                    body,
                });
                pos = close + 1;
            }
            _ => {
                // Trailing declaration without `;`, or a stray brace
                nodes.push(Node::Raw(input[pos..].trim_end()));
                break;
            }
        }
    }

    nodes
}

/// Find the first of `targets` at or after `from`, outside strings,
/// comments and parentheses.
fn scan_to(input: &str, from: usize, targets: &[char]) -> Option<(usize, char)> {
    let bytes = input.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];

        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'"' | b'\'' => quote = Some(b),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = input[i + 2..].find("*/").map_or(bytes.len(), |e| i + 2 + e + 2);
                continue;
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && b.is_ascii() && targets.contains(&(b as char)) => {
                return Some((i, b as char));
            }
            _ => {}
        }

        i += 1;
    }

    None
}

/// Index of the `}` closing the `{` at `open`.
fn matching_brace(input: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut pos = open;

    while let Some((i, c)) = scan_to(input, pos, &['{', '}']) {
        if c == '{' {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        pos = i + 1;
    }

    None
}

/// Split on `sep` outside strings, comments and parentheses.
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;

    while let Some((i, _)) = scan_to(input, start, &[sep]) {
        parts.push(&input[start..i]);
        start = i + 1;
    }
    parts.push(&input[start..]);

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_background_rules() {
        let css = ".hero {\n  background: url(\"../img/hero.jpg\") no-repeat;\n  color: red;\n}\n";

        let out = add_webp_variants(css);

        assert!(out.contains(".hero {\n  color: red;\n}"));
        assert!(out.contains(
            ".no-webp .hero {\n  background: url(\"../img/hero.jpg\") no-repeat;\n}"
        ));
        assert!(out.contains(
            ".webp .hero {\n  background: url(\"../img/hero.webp\") no-repeat;\n}"
        ));
    }

    #[test]
    fn scopes_every_selector_in_a_list() {
        let css = "a, html, .b:not(.c, .d) { background-image: url(x.png?v=1); }";

        let out = add_webp_variants(css);

        assert!(out.contains(".webp a, html.webp, .webp .b:not(.c, .d) {"));
        assert!(out.contains("url(\"x.webp?v=1\")"));
    }

    #[test]
    fn rewrites_inside_media_queries() {
        let css = "@media (max-width: 600px) {\n  .a {\n    background-image: url('a.png');\n  }\n}\n";

        let out = add_webp_variants(css);

        assert!(out.starts_with("@media (max-width: 600px) {\n"));
        assert!(out.contains(".webp .a {"));
    }

    #[test]
    fn leaves_other_rules_untouched() {
        let css = "@charset \"UTF-8\";\n.a {\n  background: url(icon.svg);\n}\n@font-face {\n  src: url(a.png);\n}\n";

        let out = add_webp_variants(css);

        assert!(!out.contains(".webp"));
        assert!(out.contains("@charset \"UTF-8\";"));
        assert!(out.contains("@font-face {"));
    }

    #[test]
    fn keeps_keyframe_steps_verbatim() {
        let css = "@keyframes fade { from { background-image: url(\"a.png\"); } to { opacity: 0; } }";

        let out = add_webp_variants(css);

        assert_eq!(
            out,
            "@keyframes fade { from { background-image: url(\"a.png\"); } to { opacity: 0; } }\n"
        );
    }

    #[test]
    fn ignores_braces_in_strings_and_comments() {
        let css = ".a::after { content: \"{\"; } /* } */ .b { color: red; }";

        let nodes = parse(css);

        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[1], Node::Raw("/* } */")));
    }
}
