//! Canonical repository names.

use std::path::Path;

/// Basenames too generic to identify a repository on their own.
const GENERIC_NAMES: &[&str] = &["src", "app", "api"];

/// Used when a directory name has no alphanumeric characters at all.
const FALLBACK_NAME: &str = "repo";

/// Lower-case `raw` and collapse every run of non-alphanumerics to one hyphen.
///
/// The result has no leading or trailing hyphen and may be empty.
pub fn clean_name(raw: &str) -> String {
    let mut name = String::with_capacity(raw.len());
    for ch in raw.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            name.push(ch);
        } else if !name.is_empty() && !name.ends_with('-') {
            name.push('-');
        }
    }
    if name.ends_with('-') {
        name.pop();
    }
    name
}

/// Canonical name for the repository at `path`.
///
/// Generic basenames (`src`, `app`, `api`) are prefixed with the cleaned
/// parent directory name, so `billing/api` becomes `billing-api`.
pub fn canonical_name(path: &Path) -> String {
    let base = path
        .file_name()
        .map(|n| clean_name(&n.to_string_lossy()))
        .unwrap_or_default();

    if GENERIC_NAMES.contains(&base.as_str()) {
        let parent = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| clean_name(&n.to_string_lossy()))
            .unwrap_or_default();
        if !parent.is_empty() {
            return format!("{}-{}", parent, base);
        }
    }

    if base.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("Payment_Service"), "payment-service");
        assert_eq!(clean_name("--my..repo--"), "my-repo");
        assert_eq!(clean_name("API v2 (beta)"), "api-v2-beta");
        assert_eq!(clean_name("___"), "");
    }

    #[test]
    fn test_canonical_name_prefixes_generic_basenames() {
        assert_eq!(canonical_name(Path::new("/work/billing/api")), "billing-api");
        assert_eq!(canonical_name(Path::new("/work/Web App/src")), "web-app-src");
        assert_eq!(canonical_name(Path::new("/work/services/Orders")), "orders");
    }

    #[test]
    fn test_canonical_name_fallback() {
        assert_eq!(canonical_name(Path::new("/work/@@@")), "repo");
        assert_eq!(canonical_name(Path::new("api")), "api");
    }

    proptest! {
        #[test]
        fn clean_name_is_idempotent(raw in "\\PC{0,40}") {
            let once = clean_name(&raw);
            prop_assert_eq!(clean_name(&once), once.clone());
        }

        #[test]
        fn clean_name_uses_single_inner_hyphens(raw in "[A-Za-z0-9 _./-]{0,40}") {
            let name = clean_name(&raw);
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!name.starts_with('-'));
            prop_assert!(!name.ends_with('-'));
            prop_assert!(!name.contains("--"));
        }
    }
}
