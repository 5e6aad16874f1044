//! Query path parsing
//!
//! Queries address a node inside a structured document. They use dot
//! notation with optional bracket segments:
//!
//! - `fleet.name`
//! - `services["api.v2"].path` (quoted keys may contain dots)
//! - `services.api.tags[0]`
//! - `fleet\.name` (escaped dot, a literal key `fleet.name`)

use std::fmt;

/// One step of a query path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// A mapping key
    Key(String),
    /// A sequence index
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

/// Parse a query string into segments.
///
/// An empty query (or `.`) addresses the document root.
///
/// # Examples
///
/// ```
/// use manifest_fleet::document::query::{parse_query, Segment};
///
/// let segments = parse_query(r#"services["api.v2"].path"#);
/// assert_eq!(segments[1], Segment::Key("api.v2".to_string()));
/// assert_eq!(segments.len(), 3);
/// ```
pub fn parse_query(query: &str) -> Vec<Segment> {
    let query = query.trim();
    if query.is_empty() || query == "." {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = query.chars().peekable();
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }

        match ch {
            '\\' => escaped = true,
            '.' => flush_key(&mut current, &mut segments),
            '[' => {
                flush_key(&mut current, &mut segments);

                match chars.peek().copied() {
                    Some(quote @ ('"' | '\'')) => {
                        chars.next();
                        let mut key = String::new();
                        let mut key_escaped = false;
                        for ch in chars.by_ref() {
                            if key_escaped {
                                key.push(ch);
                                key_escaped = false;
                            } else if ch == '\\' {
                                key_escaped = true;
                            } else if ch == quote {
                                break;
                            } else {
                                key.push(ch);
                            }
                        }
                        // consume the closing bracket
                        if chars.peek() == Some(&']') {
                            chars.next();
                        }
                        segments.push(Segment::Key(key));
                    }
                    _ => {
                        let mut inner = String::new();
                        for ch in chars.by_ref() {
                            if ch == ']' {
                                break;
                            }
                            inner.push(ch);
                        }
                        let inner = inner.trim();
                        if let Ok(idx) = inner.parse::<usize>() {
                            segments.push(Segment::Index(idx));
                        } else if !inner.is_empty() {
                            segments.push(Segment::Key(inner.to_string()));
                        }
                    }
                }
            }
            _ => current.push(ch),
        }
    }

    flush_key(&mut current, &mut segments);
    segments
}

fn flush_key(current: &mut String, segments: &mut Vec<Segment>) {
    if !current.is_empty() {
        segments.push(Segment::Key(std::mem::take(current)));
    }
}

/// Build a query string addressing `key` under `parent`, quoting the key
/// when it contains characters with meaning in query syntax.
pub fn child_query(parent: &str, key: &str) -> String {
    let needs_quotes = key
        .chars()
        .any(|c| matches!(c, '.' | '[' | ']' | '\\' | '"'));
    let child = if needs_quotes {
        format!("[\"{}\"]", key.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        key.to_string()
    };

    if parent.is_empty() {
        child
    } else if needs_quotes {
        format!("{}{}", parent, child)
    } else {
        format!("{}.{}", parent, child)
    }
}

/// Render segments as a `yq` expression.
pub fn to_yq_expression(segments: &[Segment]) -> String {
    if segments.is_empty() {
        return ".".to_string();
    }
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Key(key) => format!("[\"{}\"]", key.replace('"', "\\\"")),
            Segment::Index(idx) => format!("[{}]", idx),
        })
        .fold(String::from("."), |mut expr, part| {
            expr.push_str(&part);
            expr
        })
}
