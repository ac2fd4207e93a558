//! Narrow adapter over untyped JSON trees.
//!
//! Page data arrives as arbitrary `serde_json::Value` trees. The rest of the
//! crate inspects them only through [`NodeKind`], [`lookup_path`] and
//! [`extract_balanced_json`].

use serde_json::{Map, Value};

/// Runtime shape of a node in an untyped tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind<'a> {
    /// `null`, or a string that is empty after trimming.
    Absent,
    Text(&'a str),
    List(&'a [Value]),
    Object(&'a Map<String, Value>),
    /// Numbers and booleans.
    Other,
}

impl<'a> NodeKind<'a> {
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Null => NodeKind::Absent,
            Value::String(s) if s.trim().is_empty() => NodeKind::Absent,
            Value::String(s) => NodeKind::Text(s),
            Value::Array(items) => NodeKind::List(items),
            Value::Object(map) => NodeKind::Object(map),
            Value::Bool(_) | Value::Number(_) => NodeKind::Other,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, NodeKind::Absent)
    }
}

/// Whether a value is an object in the page-script sense: a map or an array.
pub fn is_object_like(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Walk a dotted path (`props.pageProps.results`) from `root`.
///
/// Numeric segments index into arrays. An empty path returns `root`.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

/// Extract a balanced JSON object or array literal from the start of `s`.
///
/// Scans character by character tracking bracket depth, respecting string
/// literals and escape sequences. Returns the shortest prefix of `s` that
/// closes the opening bracket, or `None` when `s` does not start with `{` or
/// `[` or the literal is unterminated.
pub fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with(['{', '[']) {
        return None;
    }
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match c {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
