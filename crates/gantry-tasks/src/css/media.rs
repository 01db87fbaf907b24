//! Media query grouping.

use lightningcss::error::PrinterError;
use lightningcss::rules::media::MediaRule;
use lightningcss::rules::CssRule;
use lightningcss::stylesheet::{PrinterOptions, StyleSheet};
use lightningcss::traits::ToCss;

/// Merge top-level `@media` blocks with identical queries.
///
/// Grouped blocks are moved after all other top-level rules, in order of
/// each query's first appearance.
pub fn group_media_queries(sheet: &mut StyleSheet<'_, '_>) -> Result<(), PrinterError> {
    let rules = std::mem::take(&mut sheet.rules.0);
    sheet.rules.0 = group_rules(rules)?;
    Ok(())
}

fn group_rules<'i, R>(rules: Vec<CssRule<'i, R>>) -> Result<Vec<CssRule<'i, R>>, PrinterError> {
    let mut plain = Vec::with_capacity(rules.len());
    let mut groups: Vec<(String, MediaRule<'i, R>)> = Vec::new();

    for rule in rules {
        match rule {
            CssRule::Media(media) => {
                let key = media.query.to_css_string(PrinterOptions::default())?;

                match groups.iter_mut().find(|(query, _)| *query == key) {
                    Some((_, existing)) => existing.rules.0.extend(media.rules.0),
                    None => groups.push((key, media)),
                }
            }
            other => plain.push(other),
        }
    }

    plain.extend(groups.into_iter().map(|(_, media)| CssRule::Media(media)));

    Ok(plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightningcss::stylesheet::ParserOptions;

    #[test]
    fn merges_identical_queries_at_the_end() {
        let css = r#"
.a { color: red; }
@media (max-width: 600px) { .a { color: blue; } }
.b { color: green; }
@media (max-width: 600px) { .b { color: black; } }
@media print { .c { display: none; } }
"#;

        let mut sheet = StyleSheet::parse(css, ParserOptions::default()).unwrap();
        group_media_queries(&mut sheet).unwrap();

        let out = sheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .unwrap()
            .code;

        assert_eq!(out.matches("@media").count(), 2);
        assert!(out.find(".b{").unwrap() < out.find("@media").unwrap());
        assert!(out.find("color:").unwrap() < out.find("@media print").unwrap());
        assert!(out.ends_with("@media print{.c{display:none}}"));
    }
}
