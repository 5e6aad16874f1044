//! Shared test utilities for the CLI end-to-end tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_document(documents::TWO_SERVICES)
//!         .with_repo("services/api");
//!     fixture.command().arg("status").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::documents;
    pub use super::TestFixture;
}

/// Fleet documents used across tests.
#[allow(dead_code)]
pub mod documents {
    /// Two path-backed services.
    pub const TWO_SERVICES: &str = r#"fleet:
  name: payments
  description: Payment platform
  versioning: none
  default_branch: main
services:
  api:
    path: services/api
    url: git@github.com:acme/api.git
    type: service
    branch: main
  shared:
    path: libs/shared
    type: library
    branch: main
"#;

    /// Matches the repositories created by [`super::TestFixture::with_clean_repos`].
    pub const CLEAN: &str = r#"fleet:
  name: clean
services:
  billing:
    path: services/billing
    type: service
  shared-lib:
    path: libs/shared-lib
    type: library
"#;

    /// A fleet with no services.
    pub const EMPTY: &str = r#"fleet:
  name: empty
services: {}
"#;

    /// One service with neither path nor url.
    pub const INVALID_SERVICE: &str = r#"fleet:
  name: broken
services:
  ghost:
    type: service
"#;

    /// One remote-only service whose checkout is absent.
    pub const REMOTE_ONLY: &str = r#"fleet:
  name: remote
services:
  docs:
    path: sites/docs
    url: https://github.com/acme/docs.git
"#;

    /// A document with an unknown service type.
    pub const BAD_TYPE: &str = r#"fleet:
  name: typo
services:
  api:
    path: services/api
    type: microservice
"#;
}

/// A temporary workspace, optionally holding a fleet document and fake
/// repositories.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write `manifest.fleet.yaml` with the given content.
    pub fn with_document(self, content: &str) -> Self {
        self.with_file("manifest.fleet.yaml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Create a repository at `path` with `main` checked out.
    pub fn with_repo(self, path: &str) -> Self {
        self.with_file(&format!("{}/.git/HEAD", path), "ref: refs/heads/main\n")
    }

    /// Create a repository at `path` whose `origin` points at `url`.
    pub fn with_remote_repo(self, path: &str, url: &str) -> Self {
        self.with_repo(path).with_file(
            &format!("{}/.git/config", path),
            &format!("[remote \"origin\"]\n\turl = {}\n", url),
        )
    }

    /// The repositories [`documents::CLEAN`] declares.
    pub fn with_clean_repos(self) -> Self {
        self.with_repo("services/billing").with_repo("libs/shared-lib")
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the path to the fleet document.
    pub fn document_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("manifest.fleet.yaml")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A command running in this fixture, isolated from the caller's
    /// configuration and environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("manifest-fleet");
        cmd.current_dir(self.path())
            .env(
                "MANIFEST_FLEET_USER_CONFIG",
                self.path().join(".no-user-config"),
            )
            .env_remove("MANIFEST_FLEET_ROOT")
            .env_remove("MANIFEST_FLEET_PARSER")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_repo_creates_git_head() {
        let fixture = TestFixture::new().with_repo("services/api");
        assert!(fixture.path().join("services/api/.git/HEAD").is_file());
    }

    #[test]
    fn test_documents_are_valid_yaml() {
        for doc in [
            documents::TWO_SERVICES,
            documents::CLEAN,
            documents::EMPTY,
            documents::INVALID_SERVICE,
            documents::REMOTE_ONLY,
            documents::BAD_TYPE,
        ] {
            let parsed: Result<serde_yaml::Value, _> = serde_yaml::from_str(doc);
            assert!(parsed.is_ok(), "Document should be valid YAML: {}", doc);
        }
    }
}
