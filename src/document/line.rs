//! Line-oriented fallback parser
//!
//! Understands just enough of a YAML document to answer top-level scalar
//! lookups (`name: value`) and to list the keys one indentation level below a
//! top-level key. Anything deeper is out of reach: callers get their default
//! back, and the reader logs a single degradation warning per run.

/// A top-level key together with its inline value and nested key names.
#[derive(Debug, Default)]
struct TopLevelEntry {
    key: String,
    value: Option<String>,
    children: Vec<String>,
}

/// Parsed view of a document as seen by the line-oriented fallback.
#[derive(Debug, Default)]
pub struct LineDocument {
    entries: Vec<TopLevelEntry>,
}

impl LineDocument {
    pub fn parse(content: &str) -> Self {
        let mut entries: Vec<TopLevelEntry> = Vec::new();
        let mut child_indent: Option<usize> = None;

        for raw in content.lines() {
            let line = strip_comment(raw);
            if line.trim().is_empty() || line.trim_start().starts_with("---") {
                continue;
            }

            let indent = line.len() - line.trim_start().len();
            let Some((key, value)) = split_key_value(line.trim()) else {
                continue;
            };

            if indent == 0 {
                entries.push(TopLevelEntry {
                    key,
                    value,
                    children: Vec::new(),
                });
                child_indent = None;
            } else if let Some(parent) = entries.last_mut() {
                // The first nested line fixes the indentation of direct children.
                let level = *child_indent.get_or_insert(indent);
                if indent == level {
                    parent.children.push(key);
                }
            }
        }

        Self { entries }
    }

    /// Value of a top-level scalar key.
    pub fn top_level_value(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.key == key)
            .and_then(|entry| entry.value.as_deref())
    }

    /// Keys directly under a top-level key.
    pub fn child_keys(&self, key: &str) -> Vec<String> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.key == key)
            .map(|entry| entry.children.clone())
            .unwrap_or_default()
    }
}

/// Drop a trailing `# comment`. Quotes only shield a `#` when they open a
/// scalar, so apostrophes inside plain values are ordinary characters.
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (idx, ch) in line.char_indices() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') if opens_scalar(&line[..idx]) => quote = Some(ch),
            (None, '#') if idx == 0 || line[..idx].ends_with(char::is_whitespace) => {
                return line[..idx].trim_end();
            }
            _ => {}
        }
    }
    line.trim_end()
}

/// Whether a quote following `before` starts a key or a value.
fn opens_scalar(before: &str) -> bool {
    let before = before.trim_end();
    before.is_empty() || before.ends_with(':') || before.ends_with('-')
}

fn split_key_value(line: &str) -> Option<(String, Option<String>)> {
    if line.starts_with('-') {
        return None;
    }
    let pos = line.find(':')?;
    let key = unquote(line[..pos].trim());
    if key.is_empty() {
        return None;
    }
    let value = line[pos + 1..].trim();
    let value = if value.is_empty() || value == "~" || value == "null" {
        None
    } else {
        Some(unquote(value))
    };
    Some((key, value))
}

fn unquote(value: &str) -> String {
    let bytes = value.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}
