//! Scanning of `@@include(...)` directives.

use std::ops::Range;

use serde_json::Value;

const MARKER: &str = "@@include";

/// A single include directive found in a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Byte range of the whole directive, marker through closing paren
    pub span: Range<usize>,

    /// Target path exactly as written
    pub path: String,

    /// Optional JSON object passed as the include context
    pub context: Option<Value>,

    /// 1-based line the directive starts on
    pub line: usize,
}

/// A malformed directive.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct DirectiveError {
    pub line: usize,
    pub message: String,
}

/// Find every include directive in `source`, in order of appearance.
///
/// Identifiers that merely start with the marker (`@@include_once`,
/// `@@includes`) are not directives and are skipped.
pub fn scan(source: &str) -> Result<Vec<Directive>, DirectiveError> {
    let mut directives = Vec::new();
    let mut offset = 0;

    while let Some(found) = source[offset..].find(MARKER) {
        let start = offset + found;
        let after = start + MARKER.len();
        let rest = &source[after..];
        let trimmed = rest.trim_start_matches([' ', '\t']);

        if !trimmed.starts_with('(') {
            offset = after;
            continue;
        }

        let line = line_of(source, start);
        let open = after + (rest.len() - trimmed.len());
        let close = find_closing_paren(source, open).ok_or_else(|| DirectiveError {
            line,
            message: "unterminated argument list".to_string(),
        })?;

        let (path, context) = parse_arguments(&source[open + 1..close])
            .map_err(|message| DirectiveError { line, message })?;

        directives.push(Directive {
            span: start..close + 1,
            path,
            context,
            line,
        });

        offset = close + 1;
    }

    Ok(directives)
}

/// 1-based line number of a byte offset.
fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Find the paren matching the one at `open`, skipping quoted strings.
fn find_closing_paren(source: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in source[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse `'path'` or `"path", { ...json }`.
fn parse_arguments(args: &str) -> Result<(String, Option<Value>), String> {
    let args = args.trim();

    let mut chars = args.char_indices();
    let quote = match chars.next() {
        Some((_, c @ ('\'' | '"'))) => c,
        _ => return Err("include path must be a quoted string".to_string()),
    };

    let mut path = String::new();
    let mut escaped = false;
    let mut end = None;

    for (i, c) in chars {
        if escaped {
            path.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            end = Some(i);
            break;
        } else {
            path.push(c);
        }
    }

    let end = end.ok_or_else(|| "unterminated include path".to_string())?;
    if path.trim().is_empty() {
        return Err("include path is empty".to_string());
    }

    let rest = args[end + 1..].trim();
    if rest.is_empty() {
        return Ok((path, None));
    }

    let Some(json) = rest.strip_prefix(',') else {
        return Err(format!("unexpected text after include path: {}", rest));
    };

    let json = json.trim();
    if json.is_empty() {
        return Ok((path, None));
    }

    let context: Value =
        serde_json::from_str(json).map_err(|e| format!("invalid include context: {}", e))?;

    if !context.is_object() {
        return Err("include context must be a JSON object".to_string());
    }

    Ok((path, Some(context)))
}
