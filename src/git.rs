//! # Git Metadata
//!
//! Read-only inspection of git repositories found by discovery. Two
//! implementations of [`RepoInspector`] are provided:
//!
//! - [`GitDirInspector`] reads `.git` directly (config, `HEAD`, loose refs and
//!   `packed-refs`) and never spawns a process. This is the default.
//! - [`GitCliInspector`] asks the `git` binary, which also understands
//!   reftables, includes and other configuration the file reader skips.
//!
//! Every lookup is best-effort: failures are logged at debug level and
//! reported as "unknown" so one odd repository never aborts a discovery pass.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use ini::{Ini, ParseOption};
use log::debug;
use regex::Regex;
use semver::Version;
use walkdir::WalkDir;

use crate::defaults;
use crate::error::{Error, Result};

/// Release tags look like `1.2.3` or `v1.2.3`.
const RELEASE_TAG_PATTERN: &str = r"^v?\d+\.\d+\.\d+$";

/// Metadata lookups on a single repository.
///
/// The branch fallback chain is shared by all implementations through
/// [`RepoInspector::default_branch`].
pub trait RepoInspector: Send + Sync {
    /// URL of the `origin` remote.
    fn remote_url(&self, repo: &Path) -> Option<String>;

    /// Branch that `refs/remotes/origin/HEAD` points at.
    fn remote_head(&self, repo: &Path) -> Option<String>;

    fn has_local_branch(&self, repo: &Path, branch: &str) -> bool;

    /// Checked-out branch, `None` when `HEAD` is detached.
    fn current_branch(&self, repo: &Path) -> Option<String>;

    /// Version of the newest release tag, without any `v` prefix.
    fn latest_release_tag(&self, repo: &Path) -> Option<String>;

    /// Remote default, then `main`, then `master`, then the current branch.
    fn default_branch(&self, repo: &Path) -> String {
        if let Some(branch) = self.remote_head(repo) {
            return branch;
        }
        for candidate in ["main", "master"] {
            if self.has_local_branch(repo, candidate) {
                return candidate.to_string();
            }
        }
        self.current_branch(repo)
            .unwrap_or_else(|| defaults::DEFAULT_BRANCH.to_string())
    }
}

/// Whether `dir` is a repository: a `.git` entry, or a bare layout.
pub fn is_repository(dir: &Path) -> bool {
    dir.join(".git").exists() || is_bare_repository(dir)
}

pub fn is_bare_repository(dir: &Path) -> bool {
    dir.join("HEAD").is_file() && dir.join("objects").is_dir() && dir.join("refs").is_dir()
}

/// Whether `dir/.git` is a gitdir pointer file.
///
/// Submodule checkouts and linked worktrees both use one.
pub fn has_gitdir_file(dir: &Path) -> bool {
    dir.join(".git").is_file()
}

/// Whether `dir/.git` points into a parent repository's `modules/`
/// storage. Linked worktrees point into `worktrees/` and do not count.
pub fn is_submodule_checkout(dir: &Path) -> bool {
    gitdir_pointer(dir).is_some_and(|target| {
        target
            .components()
            .any(|c| c.as_os_str() == "modules")
    })
}

/// Target of the `gitdir:` pointer file at `repo/.git`, joined onto `repo`
/// when relative.
fn gitdir_pointer(repo: &Path) -> Option<PathBuf> {
    let dot_git = repo.join(".git");
    if !dot_git.is_file() {
        return None;
    }
    let content = fs::read_to_string(&dot_git).ok()?;
    let target = Path::new(content.trim().strip_prefix("gitdir:")?.trim());
    Some(if target.is_absolute() {
        target.to_path_buf()
    } else {
        repo.join(target)
    })
}

/// The git directory of the repository at `repo`.
///
/// Follows `gitdir:` pointer files and `commondir` links.
pub fn git_dir(repo: &Path) -> Option<PathBuf> {
    let dot_git = repo.join(".git");
    let dir = if dot_git.is_dir() {
        dot_git
    } else if dot_git.is_file() {
        gitdir_pointer(repo)?
    } else if is_bare_repository(repo) {
        repo.to_path_buf()
    } else {
        return None;
    };
    Some(dir)
}

/// Directory holding shared refs and config; differs from the git dir for
/// linked worktrees.
fn common_dir(git_dir: &Path) -> PathBuf {
    match fs::read_to_string(git_dir.join("commondir")) {
        Ok(content) => git_dir.join(content.trim()),
        Err(_) => git_dir.to_path_buf(),
    }
}

fn git_ini_options() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

/// Paths listed in the `.gitmodules` file of `repo`, relative to `repo`.
pub fn submodule_paths(repo: &Path) -> Vec<String> {
    let file = repo.join(".gitmodules");
    if !file.is_file() {
        return Vec::new();
    }
    match Ini::load_from_file_opt(&file, git_ini_options()) {
        Ok(ini) => ini
            .iter()
            .filter(|(section, _)| section.is_some_and(|s| s.starts_with("submodule")))
            .filter_map(|(_, props)| props.get("path"))
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .collect(),
        Err(e) => {
            debug!("Unreadable {}: {}", file.display(), e);
            Vec::new()
        }
    }
}

/// Parse a tag into a semantic version, accepting an optional `v` prefix.
pub fn parse_semver_tag(tag: &str) -> Option<Version> {
    let version_str = tag.strip_prefix('v').unwrap_or(tag);
    Version::parse(version_str).ok()
}

/// The highest `v?MAJOR.MINOR.PATCH` tag among `tags`, prefix stripped.
pub fn highest_release_tag<'a>(tags: impl IntoIterator<Item = &'a str>) -> Result<Option<String>> {
    let pattern = Regex::new(RELEASE_TAG_PATTERN)?;
    Ok(tags
        .into_iter()
        .filter(|tag| pattern.is_match(tag))
        .filter_map(parse_semver_tag)
        .max()
        .map(|v| v.to_string()))
}

/// Reads repository metadata straight from the git directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitDirInspector;

impl GitDirInspector {
    fn common(&self, repo: &Path) -> Option<PathBuf> {
        git_dir(repo).map(|dir| common_dir(&dir))
    }

    fn packed_refs(&self, common: &Path) -> Vec<String> {
        fs::read_to_string(common.join("packed-refs"))
            .map(|content| {
                content
                    .lines()
                    .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
                    .filter_map(|line| line.split_whitespace().nth(1))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn read_symbolic_ref(path: &Path) -> Option<String> {
        let content = fs::read_to_string(path).ok()?;
        content
            .trim()
            .strip_prefix("ref:")
            .map(|target| target.trim().to_string())
    }
}

impl RepoInspector for GitDirInspector {
    fn remote_url(&self, repo: &Path) -> Option<String> {
        let config = self.common(repo)?.join("config");
        let ini = match Ini::load_from_file_opt(&config, git_ini_options()) {
            Ok(ini) => ini,
            Err(e) => {
                debug!("Unreadable git config {}: {}", config.display(), e);
                return None;
            }
        };
        ini.section(Some(r#"remote "origin""#))
            .and_then(|props| props.get("url"))
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
    }

    fn remote_head(&self, repo: &Path) -> Option<String> {
        let common = self.common(repo)?;
        let target = Self::read_symbolic_ref(&common.join("refs/remotes/origin/HEAD"))?;
        target
            .strip_prefix("refs/remotes/origin/")
            .map(str::to_string)
    }

    fn has_local_branch(&self, repo: &Path, branch: &str) -> bool {
        let Some(common) = self.common(repo) else {
            return false;
        };
        let reference = format!("refs/heads/{}", branch);
        common.join(&reference).is_file() || self.packed_refs(&common).contains(&reference)
    }

    fn current_branch(&self, repo: &Path) -> Option<String> {
        let dir = git_dir(repo)?;
        let target = Self::read_symbolic_ref(&dir.join("HEAD"))?;
        target.strip_prefix("refs/heads/").map(str::to_string)
    }

    fn latest_release_tag(&self, repo: &Path) -> Option<String> {
        let common = self.common(repo)?;
        let tags_dir = common.join("refs/tags");

        let mut tags: Vec<String> = WalkDir::new(&tags_dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&tags_dir)
                    .ok()
                    .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        tags.extend(
            self.packed_refs(&common)
                .iter()
                .filter_map(|r| r.strip_prefix("refs/tags/"))
                .map(str::to_string),
        );

        match highest_release_tag(tags.iter().map(String::as_str)) {
            Ok(tag) => tag,
            Err(e) => {
                debug!("Tag scan failed in {}: {}", repo.display(), e);
                None
            }
        }
    }
}

/// Reads repository metadata by running the `git` binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCliInspector;

impl GitCliInspector {
    fn run(&self, repo: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(args)
            .output()
            .map_err(|e| Error::GitCommand {
                command: args.join(" "),
                repo: repo.to_path_buf(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::GitCommand {
                command: args.join(" "),
                repo: repo.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn query(&self, repo: &Path, args: &[&str]) -> Option<String> {
        match self.run(repo, args) {
            Ok(out) if !out.is_empty() => Some(out),
            Ok(_) => None,
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }
}

impl RepoInspector for GitCliInspector {
    fn remote_url(&self, repo: &Path) -> Option<String> {
        self.query(repo, &["config", "--get", "remote.origin.url"])
    }

    fn remote_head(&self, repo: &Path) -> Option<String> {
        self.query(repo, &["symbolic-ref", "--quiet", "refs/remotes/origin/HEAD"])
            .and_then(|r| r.strip_prefix("refs/remotes/origin/").map(str::to_string))
    }

    fn has_local_branch(&self, repo: &Path, branch: &str) -> bool {
        let reference = format!("refs/heads/{}", branch);
        self.run(repo, &["show-ref", "--verify", "--quiet", &reference])
            .is_ok()
    }

    fn current_branch(&self, repo: &Path) -> Option<String> {
        self.query(repo, &["symbolic-ref", "--quiet", "--short", "HEAD"])
    }

    /// Most recently created release tag, as git sorts them.
    fn latest_release_tag(&self, repo: &Path) -> Option<String> {
        let tags = self.query(repo, &["tag", "--list", "--sort=-creatordate"])?;
        let pattern = match Regex::new(RELEASE_TAG_PATTERN) {
            Ok(p) => p,
            Err(e) => {
                debug!("{}", e);
                return None;
            }
        };
        tags.lines()
            .map(str::trim)
            .find(|tag| pattern.is_match(tag))
            .and_then(parse_semver_tag)
            .map(|v| v.to_string())
    }
}
