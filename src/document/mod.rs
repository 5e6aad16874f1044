//! # Structured-Data Access Layer
//!
//! This module answers two questions about a declarative document:
//!
//! - `get_value(document, query, default)`: the scalar at a query path, or
//!   the supplied default when the path is missing.
//! - `list_map_keys(document, query)`: the keys of the mapping at a path.
//!
//! ## Parser Capability
//!
//! The layer does not assume one parsing backend. On first use a
//! [`DocumentReader`] probes for a capability and memoizes the result for its
//! lifetime:
//!
//! 1. [`ParserCapability::Yq`]: a dedicated `yq` engine on `PATH`. It is
//!    opt-in through `--parser yq` or `MANIFEST_FLEET_PARSER=yq`; the `auto`
//!    preference never looks for it.
//! 2. [`ParserCapability::Embedded`]: the linked-in YAML library. This is the
//!    default and answers every query.
//! 3. [`ParserCapability::LineOriented`]: a minimal fallback that resolves
//!    top-level scalar keys and lists one level of keys. Deeper queries
//!    silently return the default; a single warning per reader records that
//!    the run is degraded.
//!
//! Tests inject a fixed capability with [`DocumentReader::with_capability`].
//! Re-probing only happens through an explicit [`DocumentReader::reprobe`].
//!
//! A missing document is never defaulted: both operations return
//! [`Error::DocumentNotFound`].

pub mod line;
pub mod query;
pub mod yq;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{Error, Result};
use line::LineDocument;
use query::{parse_query, Segment};

/// The parsing backend selected by the capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParserCapability {
    Yq,
    Embedded,
    LineOriented,
}

impl ParserCapability {
    /// Whether nested paths are answered faithfully.
    pub fn supports_nested(self) -> bool {
        !matches!(self, ParserCapability::LineOriented)
    }
}

impl fmt::Display for ParserCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserCapability::Yq => "yq",
            ParserCapability::Embedded => "embedded",
            ParserCapability::LineOriented => "line-oriented",
        };
        write!(f, "{}", name)
    }
}

/// Which backend the operator asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserPreference {
    #[default]
    Auto,
    Yq,
    Embedded,
    Line,
}

impl FromStr for ParserPreference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ParserPreference::Auto),
            "yq" => Ok(ParserPreference::Yq),
            "embedded" | "native" => Ok(ParserPreference::Embedded),
            "line" | "fallback" => Ok(ParserPreference::Line),
            other => Err(format!(
                "unknown parser '{}' (expected auto, yq, embedded or line)",
                other
            )),
        }
    }
}

impl fmt::Display for ParserPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserPreference::Auto => "auto",
            ParserPreference::Yq => "yq",
            ParserPreference::Embedded => "embedded",
            ParserPreference::Line => "line",
        };
        write!(f, "{}", name)
    }
}

/// Resolve a preference into a concrete capability.
///
/// `yq_available` is only consulted when the preference asks for `yq`;
/// `auto` resolves to the embedded parser.
pub fn probe(preference: ParserPreference, yq_available: impl FnOnce() -> bool) -> ParserCapability {
    match preference {
        ParserPreference::Auto | ParserPreference::Embedded => ParserCapability::Embedded,
        ParserPreference::Yq => {
            if yq_available() {
                ParserCapability::Yq
            } else {
                info!("yq not found on PATH, using the embedded YAML parser");
                ParserCapability::Embedded
            }
        }
        ParserPreference::Line => ParserCapability::LineOriented,
    }
}

enum ParsedDocument {
    Yaml(Value),
    Lines(LineDocument),
}

/// Reads values out of declarative documents through the probed backend.
pub struct DocumentReader {
    preference: ParserPreference,
    capability: OnceLock<ParserCapability>,
    cache: Mutex<HashMap<PathBuf, Arc<ParsedDocument>>>,
    degraded_reported: AtomicBool,
}

impl DocumentReader {
    /// A reader that probes lazily according to `preference`.
    pub fn new(preference: ParserPreference) -> Self {
        Self {
            preference,
            capability: OnceLock::new(),
            cache: Mutex::new(HashMap::new()),
            degraded_reported: AtomicBool::new(false),
        }
    }

    /// A reader pinned to `capability`, skipping the probe.
    pub fn with_capability(capability: ParserCapability) -> Self {
        let reader = Self::new(ParserPreference::Auto);
        let _ = reader.capability.set(capability);
        reader
    }

    /// The memoized capability, probing on first call.
    pub fn capability(&self) -> ParserCapability {
        let capability = *self
            .capability
            .get_or_init(|| probe(self.preference, yq::is_available));
        if capability == ParserCapability::LineOriented
            && !self.degraded_reported.swap(true, Ordering::SeqCst)
        {
            warn!(
                "ParserCapabilityDegraded: using the line-oriented fallback parser; \
                 nested document paths will resolve to their defaults"
            );
        }
        capability
    }

    /// Forget the memoized capability and parsed documents.
    pub fn reprobe(&mut self) {
        self.capability = OnceLock::new();
        self.degraded_reported = AtomicBool::new(false);
        if let Ok(cache) = self.cache.get_mut() {
            cache.clear();
        }
    }

    /// Returns the scalar at `query`, or `default` when it is missing.
    pub fn get_value(&self, document: &Path, query: &str, default: &str) -> Result<String> {
        ensure_exists(document)?;
        let segments = parse_query(query);

        let value = match self.capability() {
            ParserCapability::Yq => yq::get_value(document, &segments)?,
            ParserCapability::Embedded => match &*self.load(document, ParserCapability::Embedded)? {
                ParsedDocument::Yaml(root) => navigate(root, &segments).and_then(scalar_to_string),
                ParsedDocument::Lines(_) => None,
            },
            ParserCapability::LineOriented => {
                match &*self.load(document, ParserCapability::LineOriented)? {
                    ParsedDocument::Lines(lines) => match segments.as_slice() {
                        [Segment::Key(key)] => lines.top_level_value(key).map(str::to_string),
                        _ => {
                            debug!("Nested query '{}' unsupported by line-oriented parser", query);
                            None
                        }
                    },
                    ParsedDocument::Yaml(_) => None,
                }
            }
        };

        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    /// Returns the sorted keys of the mapping at `query`.
    pub fn list_map_keys(&self, document: &Path, query: &str) -> Result<Vec<String>> {
        ensure_exists(document)?;
        let segments = parse_query(query);

        let keys = match self.capability() {
            ParserCapability::Yq => yq::list_map_keys(document, &segments)?,
            ParserCapability::Embedded => match &*self.load(document, ParserCapability::Embedded)? {
                ParsedDocument::Yaml(root) => navigate(root, &segments)
                    .map(mapping_keys)
                    .unwrap_or_default(),
                ParsedDocument::Lines(_) => Vec::new(),
            },
            ParserCapability::LineOriented => {
                match &*self.load(document, ParserCapability::LineOriented)? {
                    ParsedDocument::Lines(lines) => match segments.as_slice() {
                        [Segment::Key(key)] => {
                            let mut keys = lines.child_keys(key);
                            keys.sort();
                            keys
                        }
                        _ => {
                            debug!("Key listing '{}' unsupported by line-oriented parser", query);
                            Vec::new()
                        }
                    },
                    ParsedDocument::Yaml(_) => Vec::new(),
                }
            }
        };

        Ok(keys)
    }

    fn load(&self, document: &Path, capability: ParserCapability) -> Result<Arc<ParsedDocument>> {
        let mut cache = self.cache.lock().map_err(|_| Error::LockPoisoned {
            context: "document cache".to_string(),
        })?;

        if let Some(parsed) = cache.get(document) {
            return Ok(Arc::clone(parsed));
        }

        let content = fs::read_to_string(document)?;
        let parsed = match capability {
            ParserCapability::LineOriented => ParsedDocument::Lines(LineDocument::parse(&content)),
            _ => {
                let value: Value =
                    serde_yaml::from_str(&content).map_err(|e| Error::DocumentParse {
                        path: document.to_path_buf(),
                        message: e.to_string(),
                    })?;
                ParsedDocument::Yaml(value)
            }
        };

        let parsed = Arc::new(parsed);
        cache.insert(document.to_path_buf(), Arc::clone(&parsed));
        Ok(parsed)
    }
}

impl Default for DocumentReader {
    fn default() -> Self {
        Self::new(ParserPreference::Auto)
    }
}

fn ensure_exists(document: &Path) -> Result<()> {
    if document.is_file() {
        Ok(())
    } else {
        Err(Error::document_not_found(document))
    }
}

fn navigate<'a>(root: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, segment| match segment {
        Segment::Key(key) => node.get(key.as_str()),
        Segment::Index(idx) => node.get(*idx),
    })
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn mapping_keys(value: &Value) -> Vec<String> {
    let Some(mapping) = value.as_mapping() else {
        return Vec::new();
    };
    let mut keys: Vec<String> = mapping.keys().filter_map(scalar_to_string).collect();
    keys.sort();
    keys
}
