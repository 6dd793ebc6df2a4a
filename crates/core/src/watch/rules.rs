//! Watch rules and path matching
//!
//! A [`WatchRule`] maps one glob, relative to the workspace root, to the
//! tasks it triggers. Globs are matched with `*` stopping at path
//! separators and `**` crossing them.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};

use crate::types::{RunnelError, RunnelResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRule {
    pub pattern: String,
    pub tasks: Vec<String>,
}

impl WatchRule {
    pub fn new<I, S>(pattern: impl Into<String>, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pattern: pattern.into(),
            tasks: tasks.into_iter().map(Into::into).collect(),
        }
    }
}

/// Compiled rules, answering "which tasks does this changed path trigger?"
#[derive(Debug)]
pub struct RuleMatcher {
    root: PathBuf,
    rules: Vec<(GlobMatcher, Vec<String>)>,
}

impl RuleMatcher {
    pub fn new(root: impl Into<PathBuf>, rules: &[WatchRule]) -> RunnelResult<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                let glob = GlobBuilder::new(&rule.pattern)
                    .literal_separator(true)
                    .build()
                    .map_err(|e| {
                        RunnelError::Config(format!(
                            "Invalid watch pattern '{}': {}",
                            rule.pattern, e
                        ))
                    })?;
                Ok((glob.compile_matcher(), rule.tasks.clone()))
            })
            .collect::<RunnelResult<Vec<_>>>()?;

        Ok(Self {
            root: root.into(),
            rules,
        })
    }

    /// Tasks triggered by a change to `path`, in rule order without
    /// duplicates. Absolute paths are made relative to the root first.
    pub fn tasks_for(&self, path: &Path) -> Vec<String> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut tasks: Vec<String> = Vec::new();
        for (matcher, rule_tasks) in &self.rules {
            if !matcher.is_match(relative) {
                continue;
            }
            for task in rule_tasks {
                if !tasks.contains(task) {
                    tasks.push(task.clone());
                }
            }
        }
        tasks
    }
}

/// The static part of a glob: every component before the first one that
/// contains a wildcard.
pub fn static_prefix(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|c| !c.as_os_str().to_string_lossy().contains(['*', '?', '[', '{']))
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Directories to watch recursively so that every rule is covered.
///
/// Concrete files are watched through their parent so atomic saves are
/// seen. Prefixes that do not exist yet fall back to their closest existing
/// ancestor inside `root`.
pub fn watch_roots(root: &Path, rules: &[WatchRule]) -> Vec<PathBuf> {
    let mut paths = HashSet::new();
    for rule in rules {
        let mut candidate = root.join(static_prefix(&rule.pattern));
        while !candidate.is_dir() && candidate != root {
            match candidate.parent() {
                Some(parent) => candidate = parent.to_path_buf(),
                None => break,
            }
        }
        paths.insert(candidate);
    }
    collapse_watch_paths(paths)
}

/// Reduces a set of paths to the minimal set of watch roots.
///
/// Watching `/a` recursively already covers `/a/b`, so nested paths are
/// dropped after sorting.
fn collapse_watch_paths(paths: HashSet<PathBuf>) -> Vec<PathBuf> {
    let mut paths: Vec<_> = paths.into_iter().collect();
    paths.sort();

    let mut filtered: Vec<PathBuf> = Vec::new();
    for path in paths {
        if filtered.last().is_some_and(|last| path.starts_with(last)) {
            continue;
        }
        filtered.push(path);
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(rules: &[WatchRule]) -> RuleMatcher {
        RuleMatcher::new("/work", rules).unwrap()
    }

    #[test]
    fn test_single_star_does_not_cross_directories() {
        let m = matcher(&[WatchRule::new("style/*.less", ["style"])]);
        assert_eq!(m.tasks_for(Path::new("style/print.less")), vec!["style"]);
        assert!(m.tasks_for(Path::new("style/vendor/x.less")).is_empty());
        assert!(m.tasks_for(Path::new("style/print.css")).is_empty());
    }

    #[test]
    fn test_absolute_paths_are_relativized() {
        let m = matcher(&[WatchRule::new("routes/**/*.js", ["lint", "--rerun"])]);
        assert_eq!(
            m.tasks_for(Path::new("/work/routes/api/users.js")),
            vec!["lint", "--rerun"]
        );
    }

    #[test]
    fn test_overlapping_rules_are_deduplicated() {
        let m = matcher(&[
            WatchRule::new("controllers/*.js", ["script", "--rerun"]),
            WatchRule::new("**/*.js", ["lint", "--rerun"]),
        ]);
        assert_eq!(
            m.tasks_for(Path::new("controllers/home.js")),
            vec!["script", "--rerun", "lint"]
        );
    }

    #[test]
    fn test_invalid_pattern_is_a_configuration_error() {
        let err = RuleMatcher::new("/work", &[WatchRule::new("style/[", ["style"])]).unwrap_err();
        assert!(matches!(err, RunnelError::Config(_)));
    }

    #[test]
    fn test_static_prefix() {
        assert_eq!(static_prefix("style/*.less"), PathBuf::from("style"));
        assert_eq!(static_prefix("./routes/**/*.js"), PathBuf::from("routes"));
        assert_eq!(static_prefix("app.js"), PathBuf::from("app.js"));
        assert_eq!(static_prefix("**/*.hbs"), PathBuf::new());
    }

    #[test]
    fn test_watch_roots_use_existing_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("style")).unwrap();
        std::fs::create_dir_all(root.join("views/partials")).unwrap();
        std::fs::write(root.join("app.js"), "").unwrap();

        let roots = watch_roots(
            root,
            &[
                WatchRule::new("style/*.less", ["style"]),
                WatchRule::new("views/partials/**/*.hbs", ["--rerun"]),
                WatchRule::new("views/**/*.hbs", ["--rerun"]),
            ],
        );
        assert_eq!(roots, vec![root.join("style"), root.join("views")]);

        // A concrete file or a missing directory falls back to the root
        let roots = watch_roots(
            root,
            &[
                WatchRule::new("app.js", ["lint"]),
                WatchRule::new("data/*.json", ["lint"]),
                WatchRule::new("style/*.less", ["style"]),
            ],
        );
        assert_eq!(roots, vec![root.to_path_buf()]);
    }

    #[test]
    fn test_collapse_watch_paths() {
        let mut paths = HashSet::new();
        paths.insert(PathBuf::from("/a"));
        paths.insert(PathBuf::from("/a/b"));
        paths.insert(PathBuf::from("/a/b/c"));
        paths.insert(PathBuf::from("/b"));
        paths.insert(PathBuf::from("/c/d"));

        assert_eq!(
            collapse_watch_paths(paths),
            vec![
                PathBuf::from("/a"),
                PathBuf::from("/b"),
                PathBuf::from("/c/d")
            ]
        );
    }

    #[test]
    fn test_collapse_watch_paths_similar_names() {
        let mut paths = HashSet::new();
        paths.insert(PathBuf::from("/foo"));
        paths.insert(PathBuf::from("/foo-bar"));

        assert_eq!(
            collapse_watch_paths(paths),
            vec![PathBuf::from("/foo"), PathBuf::from("/foo-bar")]
        );
    }
}
