//! Include context variables (`@@name`, `@@card.title`).

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@@([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)")
        .expect("Invalid variable regex")
});

/// Replace `@@key` tokens with values from `context`.
///
/// Dotted keys walk nested objects. When the full dotted key does not
/// resolve, the longest resolvable prefix is used and the remainder is kept
/// as literal text, so `@@page.html` with only `page` defined renders as
/// `<value>.html`. Unknown tokens are left untouched.
pub fn substitute(text: &str, context: &Value) -> String {
    if !text.contains("@@") {
        return text.to_string();
    }

    VARIABLE_RE
        .replace_all(text, |caps: &Captures| {
            let segments: Vec<&str> = caps[1].split('.').collect();

            for take in (1..=segments.len()).rev() {
                if let Some(value) = lookup(context, &segments[..take]) {
                    let mut rendered = render(value);
                    for rest in &segments[take..] {
                        rendered.push('.');
                        rendered.push_str(rest);
                    }
                    return rendered;
                }
            }

            caps[0].to_string()
        })
        .into_owned()
}

/// Merge `child` over `parent`; keys in `child` win.
pub fn merge(parent: &Value, child: &Value) -> Value {
    let mut merged = match parent {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    if let Value::Object(map) = child {
        for (key, value) in map {
            merged.insert(key.clone(), value.clone());
        }
    }

    Value::Object(merged)
}

fn lookup<'v>(context: &'v Value, segments: &[&str]) -> Option<&'v Value> {
    segments
        .iter()
        .try_fold(context, |value, segment| value.get(*segment))
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
