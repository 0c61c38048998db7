//! Files a package would publish
//!
//! Mirrors npm's pack rules closely enough to answer "does this change
//! affect the published artifact": always-excluded noise, always-included
//! manifest, readme, license and main entry, then either the manifest's
//! `files` allow-list or an ignore file.

use std::collections::BTreeSet;

use globset::{GlobBuilder, GlobMatcher};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::Result;

/// Files that steer what is published; changing one is always releasable
pub const CONTROL_FILES: [&str; 3] = ["package.json", ".npmignore", ".gitignore"];

/// In-memory view of a package used to compute its publish list
#[derive(Debug, Clone, Default)]
pub struct PackageSnapshot {
    /// Parsed package.json
    pub manifest: Value,
    /// Candidate files, slash-separated and relative to the package directory
    pub files: BTreeSet<String>,
    /// Contents of `.npmignore`, if present
    pub npmignore: Option<String>,
    /// Contents of `.gitignore`, if present
    pub gitignore: Option<String>,
}

/// Collaborator that decides which snapshot files would be published
pub trait PublishFileLister {
    fn files_to_be_published(&self, snapshot: &PackageSnapshot) -> Result<Vec<String>>;
}

/// npm-compatible pack list
#[derive(Debug, Clone, Copy, Default)]
pub struct NpmPackList;

const ALWAYS_EXCLUDED: &[&str] = &[
    ".git",
    ".svn",
    ".hg",
    "CVS",
    ".npmrc",
    ".npmignore",
    ".gitignore",
    ".DS_Store",
    "._*",
    ".*.swp",
    ".wafpickle-*",
    ".lock-wscript",
    "npm-debug.log",
    "config.gypi",
    "*.orig",
    "package-lock.json",
    "node_modules",
];

const ALWAYS_INCLUDED_PREFIXES: &[&str] = &["readme", "license", "licence"];

impl PublishFileLister for NpmPackList {
    fn files_to_be_published(&self, snapshot: &PackageSnapshot) -> Result<Vec<String>> {
        let noise = PatternList::unanchored(ALWAYS_EXCLUDED.iter().copied());
        let main = snapshot
            .manifest
            .get("main")
            .and_then(Value::as_str)
            .map(|m| m.trim_start_matches("./").to_string());

        let allow_list = snapshot.manifest.get("files").and_then(Value::as_array).map(|files| {
            PatternList::anchored(files.iter().filter_map(Value::as_str))
        });
        let ignore = match (&allow_list, &snapshot.npmignore, &snapshot.gitignore) {
            (Some(_), _, _) => None,
            (None, Some(npmignore), _) => Some(PatternList::ignore_file(npmignore)),
            (None, None, Some(gitignore)) => Some(PatternList::ignore_file(gitignore)),
            (None, None, None) => None,
        };

        let mut published = Vec::new();
        for file in &snapshot.files {
            if noise.matches(file) {
                trace!(file = file.as_str(), "excluded by default");
                continue;
            }

            let included = if is_always_included(file, main.as_deref()) {
                true
            } else if let Some(allow_list) = &allow_list {
                allow_list.matches(file)
            } else if let Some(ignore) = &ignore {
                !ignore.matches(file)
            } else {
                true
            };

            if included {
                published.push(file.clone());
            }
        }

        debug!(
            candidates = snapshot.files.len(),
            published = published.len(),
            "computed pack list"
        );
        Ok(published)
    }
}

fn is_always_included(file: &str, main: Option<&str>) -> bool {
    if file == "package.json" || Some(file) == main {
        return true;
    }
    if file.contains('/') {
        return false;
    }
    let lower = file.to_ascii_lowercase();
    ALWAYS_INCLUDED_PREFIXES.iter().any(|prefix| {
        lower
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
    })
}

struct Rule {
    matchers: Vec<GlobMatcher>,
    negated: bool,
}

/// Ordered gitignore-style rules; the last matching rule wins
struct PatternList {
    rules: Vec<Rule>,
}

impl PatternList {
    /// Rules from an ignore file. Patterns without a slash match at any depth.
    fn ignore_file(content: &str) -> Self {
        Self::build(content.lines(), false)
    }

    /// Patterns that match at any depth
    fn unanchored<'s>(patterns: impl Iterator<Item = &'s str>) -> Self {
        Self::build(patterns, false)
    }

    /// Patterns relative to the package root, like the `files` field
    fn anchored<'s>(patterns: impl Iterator<Item = &'s str>) -> Self {
        Self::build(patterns, true)
    }

    fn build<'s>(patterns: impl Iterator<Item = &'s str>, always_anchored: bool) -> Self {
        let rules = patterns
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    return None;
                }
                let (negated, body) = match line.strip_prefix('!') {
                    Some(rest) => (true, rest),
                    None => (false, line),
                };
                let dir_only = body.ends_with('/');
                let body = body.trim_start_matches("./").trim_matches('/');
                if body.is_empty() {
                    return None;
                }

                let anchored = always_anchored || line.trim_end_matches('/').contains('/');
                let base = if anchored {
                    body.to_string()
                } else {
                    format!("**/{}", body)
                };

                let mut globs = vec![format!("{}/**", base)];
                if !dir_only {
                    globs.push(base);
                }

                let matchers = globs
                    .iter()
                    .filter_map(|glob| {
                        GlobBuilder::new(glob)
                            .literal_separator(true)
                            .build()
                            .map_err(|e| debug!(pattern = line, error = %e, "skipping invalid pattern"))
                            .ok()
                    })
                    .map(|glob| glob.compile_matcher())
                    .collect::<Vec<_>>();

                (!matchers.is_empty()).then_some(Rule { matchers, negated })
            })
            .collect();

        Self { rules }
    }

    fn matches(&self, file: &str) -> bool {
        let mut matched = false;
        for rule in &self.rules {
            if rule.matchers.iter().any(|m| m.is_match(file)) {
                matched = !rule.negated;
            }
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(manifest: Value, files: &[&str]) -> PackageSnapshot {
        PackageSnapshot {
            manifest,
            files: files.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    fn publish(snapshot: &PackageSnapshot) -> Vec<String> {
        NpmPackList.files_to_be_published(snapshot).unwrap()
    }

    #[test]
    fn test_everything_published_without_rules() {
        let snap = snapshot(
            json!({"name": "a"}),
            &["package.json", "index.js", "src/util.js", ".npmrc", "node_modules/x/index.js"],
        );
        assert_eq!(publish(&snap), vec!["index.js", "package.json", "src/util.js"]);
    }

    #[test]
    fn test_files_allow_list() {
        let snap = snapshot(
            json!({"name": "a", "main": "./main.js", "files": ["dist", "!dist/**/*.map", "types/*.d.ts"]}),
            &[
                "README.md",
                "LICENSE",
                "main.js",
                "package.json",
                "dist/index.js",
                "dist/index.js.map",
                "src/index.ts",
                "test/a.test.js",
                "types/index.d.ts",
                "types/nested/x.d.ts",
            ],
        );
        assert_eq!(
            publish(&snap),
            vec![
                "LICENSE",
                "README.md",
                "dist/index.js",
                "main.js",
                "package.json",
                "types/index.d.ts",
            ]
        );
    }

    #[test]
    fn test_npmignore_takes_precedence_over_gitignore() {
        let mut snap = snapshot(
            json!({"name": "a"}),
            &["package.json", "index.js", "dist/index.js", "test/a.test.js", "notes.log"],
        );
        snap.npmignore = Some("# comments are skipped\ntest/\n*.log\n".to_string());
        snap.gitignore = Some("dist\n".to_string());

        assert_eq!(publish(&snap), vec!["dist/index.js", "index.js", "package.json"]);
    }

    #[test]
    fn test_gitignore_used_without_npmignore() {
        let mut snap = snapshot(
            json!({"name": "a"}),
            &["package.json", "index.js", "dist/index.js", "lib/dist/x.js"],
        );
        snap.gitignore = Some("dist\n".to_string());

        assert_eq!(publish(&snap), vec!["index.js", "package.json"]);
    }

    #[test]
    fn test_ignore_negation_and_anchoring() {
        let mut snap = snapshot(
            json!({"name": "a"}),
            &["package.json", "build/a.js", "build/keep.js", "src/build/b.js"],
        );
        snap.npmignore = Some("/build\n!build/keep.js\n".to_string());

        assert_eq!(
            publish(&snap),
            vec!["build/keep.js", "package.json", "src/build/b.js"]
        );
    }

    #[test]
    fn test_control_files_are_not_published() {
        let snap = snapshot(
            json!({"name": "a", "files": ["lib"]}),
            &["package.json", ".npmignore", ".gitignore", "lib/a.js"],
        );
        assert_eq!(publish(&snap), vec!["lib/a.js", "package.json"]);
    }

    #[test]
    fn test_readme_only_at_root() {
        let snap = snapshot(
            json!({"name": "a", "files": []}),
            &["readme.markdown", "docs/README.md", "LICENCE.txt", "licenses.json"],
        );
        assert_eq!(publish(&snap), vec!["LICENCE.txt", "readme.markdown"]);
    }
}
