//! # Repository Discovery Engine
//!
//! Scans a workspace for git repositories without consulting the fleet
//! document.
//!
//! ## Walk
//!
//! Each direct child of the root is walked as its own subtree on a bounded
//! rayon pool. Within a subtree the walk is a depth-limited `walkdir`
//! traversal that never enters ignored directories (see [`IgnoreSet`]).
//! A directory is a repository when it has a `.git` entry or a bare layout
//! (`HEAD`, `objects/`, `refs/`). Repositories are recorded and, when nested
//! discovery is on, the walk continues inside them.
//!
//! ## Output
//!
//! At most one [`DiscoveredRepo`] per relative path, sorted by relative path.
//! Metadata comes from a [`RepoInspector`]; see [`metadata`] for versions and
//! [`classify`] for the type heuristics.

pub mod classify;
pub mod metadata;
pub mod naming;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use glob::Pattern;
use log::{debug, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::git::{self, RepoInspector};
use crate::model::{relative_display, DiscoveredRepo};
use crate::settings::Settings;

/// Directory names never descended into.
const IGNORED_DIRS: &[&str] = &[
    // dependency caches
    "node_modules",
    "bower_components",
    "jspm_packages",
    "vendor",
    "third_party",
    "site-packages",
    "venv",
    "env",
    "Pods",
    "Carthage",
    // build output
    "target",
    "build",
    "dist",
    "out",
    "bin",
    "obj",
    "coverage",
    "__pycache__",
    // archives and fixtures
    "archive",
    "archives",
    "backup",
    "backups",
    "fixtures",
    "testdata",
    // documentation
    "docs",
    "doc",
    "documentation",
    // temp
    "tmp",
    "temp",
];

/// Glob patterns for ignored directory names.
const IGNORED_PATTERNS: &[&str] = &["*.egg-info", "*.tmp", "*~"];

/// Decides which directory names the walk skips.
///
/// Hidden directories are always skipped; `.git` is recognized by the
/// repository test, never walked.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    names: Vec<String>,
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    pub fn new(names: &[&str], patterns: &[&str]) -> Result<Self> {
        Ok(Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            patterns: patterns
                .iter()
                .map(|p| Pattern::new(p))
                .collect::<std::result::Result<_, _>>()?,
        })
    }

    /// The built-in ignore list.
    pub fn standard() -> Result<Self> {
        Self::new(IGNORED_DIRS, IGNORED_PATTERNS)
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        name.starts_with('.')
            || self.names.iter().any(|n| n == name)
            || self.patterns.iter().any(|p| p.matches(name))
    }
}

/// Knobs for one discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Deepest directory level examined; direct children of the root are 1.
    pub max_depth: usize,
    pub parallelism: usize,
    pub include_submodules: bool,
    pub nested: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for DiscoveryOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            max_depth: settings.search_depth,
            parallelism: settings.parallelism,
            include_submodules: settings.include_submodules,
            nested: settings.nested,
        }
    }
}

/// Find every repository below `root`.
pub fn discover(
    root: &Path,
    options: &DiscoveryOptions,
    inspector: &dyn RepoInspector,
) -> Result<Vec<DiscoveredRepo>> {
    if !root.is_dir() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("discovery root {} is not a directory", root.display()),
        )));
    }
    if options.max_depth == 0 {
        return Ok(Vec::new());
    }

    let ignore = IgnoreSet::standard()?;
    let subtrees = top_level_dirs(root, &ignore)?;
    debug!(
        "Discovering in {} ({} subtrees, depth {}, {} threads)",
        root.display(),
        subtrees.len(),
        options.max_depth,
        options.parallelism
    );

    let found: Mutex<BTreeMap<String, DiscoveredRepo>> = Mutex::new(BTreeMap::new());
    let errors: Mutex<Vec<Error>> = Mutex::new(Vec::new());

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.parallelism.max(1))
        .build()?;
    pool.install(|| {
        subtrees.par_iter().for_each(|subtree| {
            let walker = SubtreeWalk {
                root,
                options,
                ignore: &ignore,
                inspector,
                found: &found,
            };
            if let Err(e) = walker.walk(subtree) {
                if let Ok(mut errors) = errors.lock() {
                    errors.push(e);
                }
            }
        });
    });

    let errors = errors.into_inner().map_err(|_| Error::LockPoisoned {
        context: "discovery errors".to_string(),
    })?;
    if let Some(first) = errors.into_iter().next() {
        return Err(first);
    }

    let found = found.into_inner().map_err(|_| Error::LockPoisoned {
        context: "discovery results".to_string(),
    })?;
    Ok(found.into_values().collect())
}

fn top_level_dirs(root: &Path, ignore: &IgnoreSet) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", root.display(), e);
                continue;
            }
        };
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let name = entry.file_name();
        if is_dir && !ignore.is_ignored(&name.to_string_lossy()) {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

struct SubtreeWalk<'a> {
    root: &'a Path,
    options: &'a DiscoveryOptions,
    ignore: &'a IgnoreSet,
    inspector: &'a dyn RepoInspector,
    found: &'a Mutex<BTreeMap<String, DiscoveredRepo>>,
}

impl SubtreeWalk<'_> {
    fn walk(&self, subtree: &Path) -> Result<()> {
        // subtree roots sit at depth 1 below the discovery root
        let walk_depth = self.options.max_depth - 1;
        let mut entries = WalkDir::new(subtree)
            .follow_links(false)
            .max_depth(walk_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || (e.file_type().is_dir()
                        && !self.ignore.is_ignored(&e.file_name().to_string_lossy()))
            });

        while let Some(entry) = entries.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory: {}", e);
                    continue;
                }
            };
            let dir = entry.path();
            if entry.depth() == walk_depth {
                debug!("MaxDepthReached: not descending below {}", dir.display());
            }
            if !git::is_repository(dir) {
                continue;
            }

            let depth = entry.depth() + 1;
            self.record(dir, depth)?;

            // bare repository contents are git internals
            if !self.options.nested || git::is_bare_repository(dir) {
                entries.skip_current_dir();
            }
        }
        Ok(())
    }

    fn record(&self, dir: &Path, depth: usize) -> Result<()> {
        let relative_path = relative_display(self.root, dir);
        let is_submodule = is_submodule(self.root, dir);
        if is_submodule && !self.options.include_submodules {
            debug!("Skipping submodule {}", relative_path);
            return Ok(());
        }

        {
            let found = self.found.lock().map_err(|_| Error::LockPoisoned {
                context: "discovery results".to_string(),
            })?;
            if found.contains_key(&relative_path) {
                return Ok(());
            }
        }

        let repo = inspect(dir, relative_path, depth, is_submodule, self.inspector)?;
        debug!("Discovered {} at {}", repo.name, repo.relative_path);

        let mut found = self.found.lock().map_err(|_| Error::LockPoisoned {
            context: "discovery results".to_string(),
        })?;
        found.entry(repo.relative_path.clone()).or_insert(repo);
        Ok(())
    }
}

/// Build the record for one repository directory.
pub fn inspect(
    dir: &Path,
    relative_path: String,
    depth: usize,
    is_submodule: bool,
    inspector: &dyn RepoInspector,
) -> Result<DiscoveredRepo> {
    let basename = dir
        .file_name()
        .map(|n| naming::clean_name(&n.to_string_lossy()))
        .unwrap_or_default();

    Ok(DiscoveredRepo {
        name: naming::canonical_name(dir),
        service_type: classify::classify(dir, &basename)?,
        branch: inspector.default_branch(dir),
        version: metadata::detect_version(dir, inspector),
        remote_url: inspector.remote_url(dir),
        relative_path,
        is_submodule,
        depth,
    })
}

/// A submodule checkout has a gitdir pointer into its parent's `modules/`
/// storage, or is listed in the `.gitmodules` of the nearest enclosing
/// repository.
pub fn is_submodule(root: &Path, dir: &Path) -> bool {
    if git::is_submodule_checkout(dir) {
        return true;
    }
    let Some(parent) = dir.parent() else {
        return false;
    };
    let enclosing = parent
        .ancestors()
        .take_while(|a| a.starts_with(root))
        .find(|a| git::is_repository(a));
    match enclosing {
        Some(repo) => {
            let relative = relative_display(repo, dir);
            git::submodule_paths(repo).contains(&relative)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitDirInspector;
    use crate::model::ServiceType;
    use tempfile::TempDir;

    fn git_init(dir: &Path) {
        let git = dir.join(".git");
        fs::create_dir_all(git.join("refs/heads")).unwrap();
        fs::create_dir_all(git.join("objects")).unwrap();
        fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
    }

    fn paths(repos: &[DiscoveredRepo]) -> Vec<&str> {
        repos.iter().map(|r| r.relative_path.as_str()).collect()
    }

    #[test]
    fn test_ignored_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        git_init(&dir.path().join("service-a"));
        git_init(&dir.path().join("service-a/node_modules/fake-repo"));
        git_init(&dir.path().join("vendor/other"));

        let repos = discover(dir.path(), &DiscoveryOptions::default(), &GitDirInspector).unwrap();
        assert_eq!(paths(&repos), vec!["service-a"]);
        assert_eq!(repos[0].name, "service-a");
        assert_eq!(repos[0].depth, 1);
    }

    #[test]
    fn test_nested_repositories_and_sorting() {
        let dir = TempDir::new().unwrap();
        git_init(&dir.path().join("zeta"));
        git_init(&dir.path().join("platform"));
        git_init(&dir.path().join("platform/services/billing"));
        git_init(&dir.path().join("alpha/inner"));

        let repos = discover(dir.path(), &DiscoveryOptions::default(), &GitDirInspector).unwrap();
        assert_eq!(
            paths(&repos),
            vec!["alpha/inner", "platform", "platform/services/billing", "zeta"]
        );

        let options = DiscoveryOptions {
            nested: false,
            ..Default::default()
        };
        let repos = discover(dir.path(), &options, &GitDirInspector).unwrap();
        assert_eq!(paths(&repos), vec!["alpha/inner", "platform", "zeta"]);
    }

    #[test]
    fn test_relative_paths_never_repeat() {
        let dir = TempDir::new().unwrap();
        for p in ["a", "a/b", "a/b/c", "d/e", "d/e/f"] {
            git_init(&dir.path().join(p));
        }
        let options = DiscoveryOptions {
            parallelism: 8,
            ..Default::default()
        };
        let repos = discover(dir.path(), &options, &GitDirInspector).unwrap();
        let mut unique = paths(&repos);
        unique.dedup();
        assert_eq!(unique.len(), repos.len());
        assert_eq!(repos.len(), 5);
    }

    #[test]
    fn test_max_depth_is_respected() {
        let dir = TempDir::new().unwrap();
        git_init(&dir.path().join("one"));
        git_init(&dir.path().join("x/two"));
        git_init(&dir.path().join("x/y/z/four"));

        let options = DiscoveryOptions {
            max_depth: 2,
            ..Default::default()
        };
        let repos = discover(dir.path(), &options, &GitDirInspector).unwrap();
        assert_eq!(paths(&repos), vec!["one", "x/two"]);

        let options = DiscoveryOptions {
            max_depth: 0,
            ..Default::default()
        };
        assert!(discover(dir.path(), &options, &GitDirInspector).unwrap().is_empty());
    }

    #[test]
    fn test_root_repository_is_not_emitted() {
        let dir = TempDir::new().unwrap();
        git_init(dir.path());
        git_init(&dir.path().join("child"));
        let repos = discover(dir.path(), &DiscoveryOptions::default(), &GitDirInspector).unwrap();
        assert_eq!(paths(&repos), vec!["child"]);
    }

    #[test]
    fn test_submodules_detected_and_optional() {
        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("app");
        git_init(&parent);
        fs::write(
            parent.join(".gitmodules"),
            "[submodule \"shared\"]\n\tpath = libs/shared\n",
        )
        .unwrap();
        fs::create_dir_all(parent.join("libs/shared")).unwrap();
        fs::write(parent.join("libs/shared/.git"), "gitdir: ../../.git/modules/shared\n").unwrap();
        git_init(&parent.join("tools/listed-only"));

        let repos = discover(dir.path(), &DiscoveryOptions::default(), &GitDirInspector).unwrap();
        assert_eq!(paths(&repos), vec!["app", "app/libs/shared", "app/tools/listed-only"]);
        assert!(!repos[0].is_submodule);
        assert!(repos[1].is_submodule);
        assert!(!repos[2].is_submodule);

        let options = DiscoveryOptions {
            include_submodules: false,
            ..Default::default()
        };
        let repos = discover(dir.path(), &options, &GitDirInspector).unwrap();
        assert_eq!(paths(&repos), vec!["app", "app/tools/listed-only"]);
    }

    #[test]
    fn test_gitmodules_listing_marks_submodule() {
        let dir = TempDir::new().unwrap();
        let parent = dir.path().join("mono");
        git_init(&parent);
        fs::write(
            parent.join(".gitmodules"),
            "[submodule \"proto\"]\n\tpath = proto\n",
        )
        .unwrap();
        git_init(&parent.join("proto"));
        assert!(is_submodule(dir.path(), &parent.join("proto")));
        assert!(!is_submodule(dir.path(), &parent));
    }

    #[test]
    fn test_linked_worktree_is_not_a_submodule() {
        let dir = TempDir::new().unwrap();
        git_init(&dir.path().join("main"));
        let worktree = dir.path().join("feature-wt");
        fs::create_dir_all(&worktree).unwrap();
        fs::write(
            worktree.join(".git"),
            format!(
                "gitdir: {}\n",
                dir.path().join("main/.git/worktrees/feature-wt").display()
            ),
        )
        .unwrap();

        assert!(!is_submodule(dir.path(), &worktree));
        let repos = discover(dir.path(), &DiscoveryOptions::default(), &GitDirInspector).unwrap();
        assert_eq!(paths(&repos), vec!["feature-wt", "main"]);
        assert!(repos.iter().all(|r| !r.is_submodule));
    }

    #[test]
    fn test_bare_repository_detected() {
        let dir = TempDir::new().unwrap();
        let bare = dir.path().join("mirror.git");
        fs::create_dir_all(bare.join("objects")).unwrap();
        fs::create_dir_all(bare.join("refs/heads")).unwrap();
        fs::write(bare.join("HEAD"), "ref: refs/heads/main\n").unwrap();

        let repos = discover(dir.path(), &DiscoveryOptions::default(), &GitDirInspector).unwrap();
        assert_eq!(paths(&repos), vec!["mirror.git"]);
        assert_eq!(repos[0].name, "mirror-git");
    }

    #[test]
    fn test_metadata_is_filled() {
        let dir = TempDir::new().unwrap();
        let infra = dir.path().join("infra-live");
        git_init(&infra);
        fs::write(infra.join("main.tf"), "").unwrap();
        fs::write(infra.join("VERSION"), "0.3.0").unwrap();

        let repos = discover(dir.path(), &DiscoveryOptions::default(), &GitDirInspector).unwrap();
        let repo = &repos[0];
        assert_eq!(repo.service_type, ServiceType::Infrastructure);
        assert_eq!(repo.version, "0.3.0");
        assert_eq!(repo.branch, "main");
        assert_eq!(repo.remote_url, None);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(discover(&dir.path().join("gone"), &DiscoveryOptions::default(), &GitDirInspector).is_err());
    }

    #[test]
    fn test_ignore_set() {
        let ignore = IgnoreSet::standard().unwrap();
        assert!(ignore.is_ignored("node_modules"));
        assert!(ignore.is_ignored(".idea"));
        assert!(ignore.is_ignored("pkg.egg-info"));
        assert!(ignore.is_ignored("scratch~"));
        assert!(!ignore.is_ignored("services"));
    }
}
