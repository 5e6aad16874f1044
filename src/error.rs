//! # Error Handling
//!
//! This module defines the centralized error type for the `manifest-fleet`
//! library. It uses `thiserror` to describe every fatal failure mode of the
//! resolver, the document access layer and the discovery engine.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant carries enough context (paths,
//!   keys, service names) to print a useful message without a backtrace.
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Conditions that must never abort a run (a degraded parser, an unreadable
//! subdirectory, a service path that does not exist yet) are not errors.
//! They are logged or returned as data, for example as
//! [`crate::validate::Finding`] values.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for manifest-fleet operations
#[derive(Error, Debug)]
pub enum Error {
    /// The declarative fleet document does not exist.
    ///
    /// Raised by the document access layer for any query against a missing
    /// file, and by root detection when a fleet is required but absent.
    #[error("Fleet document not found: {}{}", path.display(), hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    DocumentNotFound {
        path: PathBuf,
        /// Optional hint for how to create or locate the document
        hint: Option<String>,
    },

    /// An explicit fleet root override points at a directory that does not exist.
    #[error("Fleet root does not exist: {}", path.display())]
    FleetRootNotFound { path: PathBuf },

    /// The document exists but could not be parsed by the active backend.
    #[error("Failed to parse {}: {message}", path.display())]
    DocumentParse { path: PathBuf, message: String },

    /// A declared value is outside the set of accepted values.
    #[error("Invalid value '{value}' for {field}{}", context.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    InvalidValue {
        field: String,
        value: String,
        /// Where the value came from, e.g. a service name or a file
        context: Option<String>,
    },

    /// A key/value settings file could not be read.
    #[error("Settings error in {}: {message}", path.display())]
    Settings { path: PathBuf, message: String },

    /// A git command failed to run or exited unsuccessfully.
    #[error("Git command failed in {}: {command} - {stderr}", repo.display())]
    GitCommand {
        command: String,
        repo: PathBuf,
        stderr: String,
    },

    /// An external document engine failed to answer a query.
    #[error("Document engine '{engine}' failed: {message}")]
    Engine { engine: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// A thread pool could not be built for parallel discovery.
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for a [`Error::DocumentNotFound`] without a hint.
    pub fn document_not_found(path: impl Into<PathBuf>) -> Self {
        Error::DocumentNotFound {
            path: path.into(),
            hint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_document_not_found() {
        let error = Error::document_not_found("/work/manifest.fleet.yaml");
        let display = format!("{}", error);
        assert!(display.contains("Fleet document not found"));
        assert!(display.contains("/work/manifest.fleet.yaml"));
        assert!(!display.contains("hint:"));
    }

    #[test]
    fn test_error_display_document_not_found_with_hint() {
        let error = Error::DocumentNotFound {
            path: PathBuf::from("manifest.fleet.yaml"),
            hint: Some("Run 'manifest-fleet init'".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("hint:"));
        assert!(display.contains("manifest-fleet init"));
    }

    #[test]
    fn test_error_display_invalid_value() {
        let error = Error::InvalidValue {
            field: "type".to_string(),
            value: "daemon".to_string(),
            context: Some("service 'api'".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Invalid value 'daemon' for type"));
        assert!(display.contains("(service 'api')"));
    }

    #[test]
    fn test_error_display_invalid_value_without_context() {
        let error = Error::InvalidValue {
            field: "versioning".to_string(),
            value: "calver".to_string(),
            context: None,
        };
        assert_eq!(
            format!("{}", error),
            "Invalid value 'calver' for versioning"
        );
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "remote get-url origin".to_string(),
            repo: PathBuf::from("/work/api"),
            stderr: "No such remote".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git command failed"));
        assert!(display.contains("/work/api"));
        assert!(display.contains("No such remote"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }

    #[test]
    fn test_error_from_regex_error() {
        let regex_error = regex::Error::Syntax("Invalid regex".to_string());
        let error: Error = regex_error.into();
        assert!(format!("{}", error).contains("Regex error"));
    }
}
