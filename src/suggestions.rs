//! # Error Suggestions
//!
//! This module provides helper functions for generating helpful error
//! messages with hints and suggestions. Errors should tell users what went
//! wrong AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use manifest_fleet::suggestions;
//!
//! // Instead of:
//! anyhow::bail!("Fleet document not found: {}", path.display());
//!
//! // Use:
//! return Err(suggestions::document_not_found(path));
//! ```

use std::path::Path;

use crate::error::Error;

/// Generate an error for when no fleet document could be found.
pub fn document_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Fleet document not found: {path}\n\n\
         hint: Run 'manifest-fleet init' in the workspace root to create one\n\
         hint: Use --fleet-root to point at an existing fleet\n\
         hint: Use --fleet-mode false to run without a fleet",
        path = path.display()
    )
}

/// Generate an error for a `--fleet-root` that does not exist.
pub fn fleet_root_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Fleet root does not exist: {path}\n\n\
         hint: Check the --fleet-root flag and the MANIFEST_FLEET_ROOT environment variable",
        path = path.display()
    )
}

/// Generate an error for when `init` would overwrite a document.
pub fn document_exists(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Fleet document already exists: {path}\n\n\
         hint: Use --force to overwrite it\n\
         hint: Use 'manifest-fleet discover --fragment' to add new services instead",
        path = path.display()
    )
}

/// Generate an error for a command that needs a fleet while fleet mode is off.
pub fn fleet_required(command: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "'{command}' needs a fleet document, but fleet mode is disabled\n\n\
         hint: Drop --fleet-mode false, or use 'manifest-fleet discover --no-fleet'"
    )
}

/// Generate an error for a `discover --check` run that found drift.
pub fn drift_detected(summary: &str) -> anyhow::Error {
    anyhow::anyhow!(
        "Fleet document is out of date ({summary})\n\n\
         hint: Run 'manifest-fleet discover --fragment' to print entries for new repositories"
    )
}

/// Generate an error for a failed validation run.
pub fn validation_failed(errors: usize, warnings: usize, strict: bool) -> anyhow::Error {
    if strict && errors == 0 {
        anyhow::anyhow!(
            "Validation failed with {warnings} warning(s) in strict mode\n\n\
             hint: Run without --strict to treat warnings as non-fatal"
        )
    } else {
        anyhow::anyhow!(
            "Validation failed with {errors} error(s) and {warnings} warning(s)\n\n\
             hint: Every service needs a path or a url in the fleet document"
        )
    }
}

/// Convert a library error into a user-facing error, adding hints where a
/// fix is known.
pub fn from_library(error: Error) -> anyhow::Error {
    match error {
        Error::DocumentNotFound { path, .. } => document_not_found(&path),
        Error::FleetRootNotFound { path } => fleet_root_not_found(&path),
        Error::InvalidValue { field, value, context } => {
            let accepted = match field.as_str() {
                "type" => "service, library, infrastructure, tool",
                "versioning" => "none, date, semver, increment",
                _ => "",
            };
            let location = context.map(|c| format!(" in {}", c)).unwrap_or_default();
            if accepted.is_empty() {
                anyhow::anyhow!("Invalid value '{value}' for {field}{location}")
            } else {
                anyhow::anyhow!(
                    "Invalid value '{value}' for {field}{location}\n\n\
                     hint: Accepted values are: {accepted}"
                )
            }
        }
        other => anyhow::Error::new(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_not_found_has_hints() {
        let msg = document_not_found(Path::new("/work/manifest.fleet.yaml")).to_string();
        assert!(msg.contains("/work/manifest.fleet.yaml"));
        assert!(msg.contains("hint: Run 'manifest-fleet init'"));
    }

    #[test]
    fn test_validation_failed_strict_wording() {
        assert!(validation_failed(0, 2, true).to_string().contains("strict"));
        assert!(validation_failed(1, 0, false).to_string().contains("1 error(s)"));
    }

    #[test]
    fn test_from_library_invalid_type() {
        let err = from_library(Error::InvalidValue {
            field: "type".to_string(),
            value: "daemon".to_string(),
            context: Some("service 'api'".to_string()),
        });
        let msg = err.to_string();
        assert!(msg.contains("in service 'api'"));
        assert!(msg.contains("hint: Accepted values are: service"));
    }

    #[test]
    fn test_from_library_passthrough() {
        let err = from_library(Error::LockPoisoned {
            context: "x".to_string(),
        });
        assert!(err.to_string().contains("Lock poisoned"));
    }
}
