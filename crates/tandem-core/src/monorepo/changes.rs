//! Change detection for monorepos
//!
//! A package changed when files under its directory differ from its last
//! release tag. A change is releasable when it touches a file the package
//! would publish. The publish list is computed over the changed files plus
//! the files that control publishing, so edits to those are judged by the
//! same rules. Releasable changes cascade to dependents through the
//! dependents tree.

use std::collections::{BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};

use semver::Version;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::{ChangeError, Result};
use crate::types::release_tag;
use crate::vcs::VersionControl;

use super::dag::{build_dependents_tree, DependentsTree, NodeId};
use super::diff::{is_dev_only_change, manifest_diff};
use super::manifest::{read_manifest_value, MANIFEST_FILE};
use super::packlist::{PackageSnapshot, PublishFileLister, CONTROL_FILES};
use super::workspace::{WorkspaceModel, WorkspacePackage};

/// A package with changes, or a dependent reached by a releasable change
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    pub name: String,
    /// Directory relative to the workspace root
    pub path: PathBuf,
    /// Dependents of this package, dev edges included
    #[serde(skip)]
    pub dag: DependentsTree,
    /// Changed files, relative to the workspace root
    pub changed_files: Vec<String>,
    /// The subset of `changed_files` that affects the published package
    pub changed_releasable_files: Vec<String>,
}

impl ChangeRecord {
    /// Recorded only because a dependency has releasable changes
    pub fn is_cascaded(&self) -> bool {
        self.changed_files.is_empty()
    }

    pub fn is_releasable(&self) -> bool {
        !self.changed_releasable_files.is_empty()
    }
}

/// Change detection options
#[derive(Debug, Clone, Default)]
pub struct ChangeOptions {
    /// Ignore package.json edits confined to devDependencies or publishConfig
    pub exclude_dev_changes: bool,
    /// Let changes cascade across devDependencies edges
    pub cascade_dev_dependencies: bool,
    /// Commit-ish to diff from instead of an older release tag
    pub since: Option<String>,
}

impl ChangeOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            exclude_dev_changes: config.release.exclude_dev_changes,
            cascade_dev_dependencies: config.changes.cascade_dev_dependencies,
            since: config.changes.since.clone(),
        }
    }
}

/// Change detector for monorepos
pub struct ChangeDetector<'a> {
    model: &'a WorkspaceModel,
    vcs: &'a dyn VersionControl,
    lister: &'a dyn PublishFileLister,
    options: ChangeOptions,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(
        model: &'a WorkspaceModel,
        vcs: &'a dyn VersionControl,
        lister: &'a dyn PublishFileLister,
    ) -> Self {
        Self {
            model,
            vcs,
            lister,
            options: ChangeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ChangeOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the change records.
    ///
    /// Directly changed packages come first, in workspace order, followed by
    /// dependents reached through cascading.
    #[instrument(skip_all)]
    pub fn detect(&self) -> Result<Vec<ChangeRecord>> {
        let head = self.vcs.current_commit()?;
        let since = self.resolve_since(&head)?;
        let uncommitted = self.vcs.working_tree_changes()?;

        let mut records = Vec::new();
        for package in self.model.iter() {
            let Some(version) = &package.version else {
                continue;
            };
            if !package.is_named() {
                continue;
            }

            let base = self.baseline(package, version, since.as_deref())?;
            let changed_files = self.changed_files(package, &base, &head, &uncommitted)?;
            if changed_files.is_empty() {
                continue;
            }

            let changed_releasable_files = self.releasable_files(package, &changed_files, &base)?;
            debug!(
                package = %package.name,
                base = %base,
                changed = changed_files.len(),
                releasable = changed_releasable_files.len(),
                "package has changes"
            );

            records.push(ChangeRecord {
                name: package.name.clone(),
                path: package.path.clone(),
                dag: build_dependents_tree(self.model, &package.name, true),
                changed_files,
                changed_releasable_files,
            });
        }

        let direct = records.len();
        self.cascade(&mut records);

        info!(
            changed = direct,
            cascaded = records.len() - direct,
            "change detection complete"
        );
        Ok(records)
    }

    /// The `since` commit, if it names an ancestor of HEAD
    fn resolve_since(&self, head: &str) -> Result<Option<String>> {
        let Some(reference) = &self.options.since else {
            return Ok(None);
        };

        match self.vcs.resolve_commit(reference)? {
            Some(commit) if self.vcs.is_ancestor(&commit, head)? => Ok(Some(commit)),
            _ => {
                debug!(since = %reference, "reference commit unavailable, ignoring");
                Ok(None)
            }
        }
    }

    /// Commit the package is diffed from: its release tag, else the first
    /// commit, moved forward to `since` when that is newer.
    fn baseline(
        &self,
        package: &WorkspacePackage,
        version: &Version,
        since: Option<&str>,
    ) -> Result<String> {
        let tag = release_tag(&package.name, version);
        let base = match self.vcs.commit_at_tag(&tag)? {
            Some(commit) => commit,
            None => {
                debug!(tag = %tag, "release tag not found, diffing from first commit");
                self.vcs.first_commit()?
            }
        };

        if let Some(since) = since {
            if since != base && self.vcs.is_ancestor(&base, since)? {
                return Ok(since.to_string());
            }
        }
        Ok(base)
    }

    fn changed_files(
        &self,
        package: &WorkspacePackage,
        base: &str,
        head: &str,
        uncommitted: &[String],
    ) -> Result<Vec<String>> {
        let committed = self.vcs.diff_names(base, head)?;

        let mut files = BTreeSet::new();
        for file in committed.iter().chain(uncommitted) {
            if file.ends_with('/') {
                return Err(ChangeError::DirectoryEntry(file.clone()).into());
            }
            if self
                .owner_of(file)
                .is_some_and(|owner| std::ptr::eq(owner, package))
            {
                files.insert(file.clone());
            }
        }
        Ok(files.into_iter().collect())
    }

    /// The deepest package whose directory contains `file`
    fn owner_of(&self, file: &str) -> Option<&'a WorkspacePackage> {
        let model = self.model;
        let file = Path::new(file);
        model
            .packages()
            .values()
            .filter(|p| file.starts_with(&p.path))
            .max_by_key(|p| p.path.components().count())
            .or_else(|| Some(model.root()))
    }

    fn releasable_files(
        &self,
        package: &WorkspacePackage,
        changed_files: &[String],
        base: &str,
    ) -> Result<Vec<String>> {
        let prefix = slash_path(&package.path);
        let package_dir = self.model.package_dir(package);

        let relative: Vec<(&String, &str)> = changed_files
            .iter()
            .filter_map(|file| relative_to(file, &prefix).map(|rel| (file, rel)))
            .collect();

        let mut snapshot = PackageSnapshot {
            manifest: read_manifest_value(&package_dir.join(MANIFEST_FILE))?
                .unwrap_or(Value::Null),
            files: relative.iter().map(|(_, rel)| rel.to_string()).collect(),
            npmignore: read_optional(&package_dir.join(".npmignore"))?,
            gitignore: read_optional(&package_dir.join(".gitignore"))?,
        };
        snapshot
            .files
            .extend(CONTROL_FILES.iter().map(|f| f.to_string()));

        let published: HashSet<String> = self
            .lister
            .files_to_be_published(&snapshot)?
            .into_iter()
            .collect();

        let mut releasable = Vec::new();
        for (file, rel) in relative {
            if !published.contains(rel) {
                continue;
            }
            if rel == MANIFEST_FILE
                && self.options.exclude_dev_changes
                && self.is_dev_only_manifest_change(file, &package_dir, base)?
            {
                debug!(package = %package.name, "ignoring dev-only manifest change");
                continue;
            }
            releasable.push(file.clone());
        }
        Ok(releasable)
    }

    fn is_dev_only_manifest_change(
        &self,
        manifest_file: &str,
        package_dir: &Path,
        base: &str,
    ) -> Result<bool> {
        let Some(previous) = self.vcs.file_at_commit(manifest_file, base)? else {
            return Ok(false);
        };
        let Some(current) = read_manifest_value(&package_dir.join(MANIFEST_FILE))? else {
            return Ok(false);
        };
        let previous: Value = match serde_json::from_slice(&previous) {
            Ok(value) => value,
            Err(e) => {
                debug!(file = manifest_file, error = %e, "previous manifest unreadable");
                return Ok(false);
            }
        };

        Ok(is_dev_only_change(&manifest_diff(&previous, &current)))
    }

    /// Add records for dependents of releasable packages
    fn cascade(&self, records: &mut Vec<ChangeRecord>) {
        let mut reached = Vec::new();
        for record in records.iter().filter(|r| r.is_releasable()) {
            let mut visited = HashSet::new();
            self.collect_dependents(&record.dag, record.dag.root(), &mut visited, &mut reached);
        }

        let mut seen: HashSet<String> = records.iter().map(|r| r.name.clone()).collect();
        for name in reached {
            if !seen.insert(name.clone()) {
                continue;
            }
            let Some(package) = self.model.get(&name) else {
                continue;
            };
            debug!(package = %name, "cascading change to dependent");
            records.push(ChangeRecord {
                name: name.clone(),
                path: package.path.clone(),
                dag: build_dependents_tree(self.model, &name, true),
                changed_files: Vec::new(),
                changed_releasable_files: Vec::new(),
            });
        }
    }

    fn collect_dependents(
        &self,
        tree: &DependentsTree,
        id: NodeId,
        visited: &mut HashSet<NodeId>,
        reached: &mut Vec<String>,
    ) {
        for edge in &tree.node(id).dependents {
            if edge.is_cycle {
                continue;
            }
            if edge.kind.is_dev() && !self.options.cascade_dev_dependencies {
                continue;
            }
            if visited.insert(edge.node) {
                reached.push(tree.node(edge.node).name.clone());
                self.collect_dependents(tree, edge.node, visited, reached);
            }
        }
    }
}

/// Slash-separated form of a relative path
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn relative_to<'f>(file: &'f str, dir: &str) -> Option<&'f str> {
    if dir.is_empty() {
        return Some(file);
    }
    file.strip_prefix(dir).and_then(|rest| rest.strip_prefix('/'))
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
