//! External `yq` engine backend
//!
//! Delegates queries to a `yq` (v4) binary on `PATH`. Only used when the
//! operator asks for it; the embedded YAML library is the default.

use std::path::Path;
use std::process::Command;

use log::debug;

use super::query::{to_yq_expression, Segment};
use crate::error::{Error, Result};

const YQ_BINARY: &str = "yq";

/// Returns true when a usable `yq` answers `--version`.
pub fn is_available() -> bool {
    match Command::new(YQ_BINARY).arg("--version").output() {
        Ok(output) => output.status.success(),
        Err(e) => {
            debug!("yq probe failed: {}", e);
            false
        }
    }
}

fn run(expression: &str, document: &Path) -> Result<String> {
    let output = Command::new(YQ_BINARY)
        .args(["eval", expression])
        .arg(document)
        .output()
        .map_err(|e| Error::Engine {
            engine: YQ_BINARY.to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::Engine {
            engine: YQ_BINARY.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Scalar at `segments`, `None` for missing nodes and non-scalars.
pub fn get_value(document: &Path, segments: &[Segment]) -> Result<Option<String>> {
    let expression = format!(
        "{} | select(tag != \"!!map\" and tag != \"!!seq\")",
        to_yq_expression(segments)
    );
    let stdout = run(&expression, document)?;
    Ok(parse_scalar_output(&stdout))
}

/// Keys of the mapping at `segments`.
pub fn list_map_keys(document: &Path, segments: &[Segment]) -> Result<Vec<String>> {
    let expression = format!(
        "{} | select(tag == \"!!map\") | keys | .[]",
        to_yq_expression(segments)
    );
    let stdout = run(&expression, document)?;
    Ok(parse_key_output(&stdout))
}

fn parse_scalar_output(stdout: &str) -> Option<String> {
    let value = stdout.trim_end_matches('\n');
    if value.is_empty() || value == "null" {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_key_output(stdout: &str) -> Vec<String> {
    let mut keys: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.trim_matches('"').to_string())
        .collect();
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_output() {
        assert_eq!(parse_scalar_output("main\n"), Some("main".to_string()));
        assert_eq!(parse_scalar_output("null\n"), None);
        assert_eq!(parse_scalar_output(""), None);
    }

    #[test]
    fn test_parse_key_output_sorted() {
        assert_eq!(parse_key_output("worker\napi\n\n"), vec!["api", "worker"]);
    }
}
