//! Release planning
//!
//! Turns change records into release trees: which packages get a new
//! version, of what type, and how dependents' ranges on them are rewritten.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::range::{satisfies, track_new_version};
use crate::types::{DependencyKind, ReleaseType};

use super::changes::ChangeRecord;
use super::dag::{DagEdge, DagNode, DependentsTree, NodeId};
use super::workspace::DependencyMap;

/// Collaborator that recommends a release type from commit history
pub trait CommitAnalyzer {
    /// Release type for the commits touching `package_path` since the newest
    /// tag starting with `tag_prefix`, or `None` if there is nothing to go on
    fn recommended_release_type(
        &self,
        package_path: &Path,
        tag_prefix: &str,
    ) -> Result<Option<ReleaseType>>;
}

/// Release planning policy
#[derive(Debug, Clone)]
pub struct ReleaseOptions {
    /// Bump dependents even when the new version still satisfies their range
    pub bump_in_range_dependencies: bool,
    /// Raise a dependent's release type to that of its dependency
    pub inherit_greater_release_type: bool,
    /// Do not bump dependents reached only through dev edges
    pub exclude_dev_changes: bool,
    /// Packages that propagation must not bump
    pub frozen: BTreeSet<String>,
}

impl ReleaseOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            bump_in_range_dependencies: config.release.bump_in_range_dependencies,
            inherit_greater_release_type: config.release.inherit_greater_release_type,
            exclude_dev_changes: config.release.exclude_dev_changes,
            frozen: config
                .packages
                .iter()
                .filter(|p| !p.bump_version)
                .map(|p| p.name.clone())
                .collect(),
        }
    }
}

impl Default for ReleaseOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Planned release of one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseTree {
    pub name: String,
    /// Directory relative to the workspace root
    pub path: Option<PathBuf>,
    pub old_version: Option<Version>,
    pub new_version: Option<Version>,
    pub release_type: ReleaseType,
    pub is_internal_package: bool,
    pub should_bump_version: bool,
    pub should_publish: bool,
    /// Rewritten ranges on bumped dependencies, by kind
    #[serde(flatten)]
    pub dependencies: BTreeMap<DependencyKind, DependencyMap>,
}

impl ReleaseTree {
    /// Rewritten range for a dependency, if any
    pub fn range(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.dependencies
            .get(&kind)
            .and_then(|deps| deps.get(name))
            .map(String::as_str)
    }
}

/// Release trees in discovery order plus any warnings raised while planning
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReleasePlan {
    pub trees: Vec<ReleaseTree>,
    pub warnings: Vec<String>,
}

impl ReleasePlan {
    pub fn get(&self, name: &str) -> Option<&ReleaseTree> {
        self.trees.iter().find(|t| t.name == name)
    }

    /// Trees whose version will change
    pub fn bumped(&self) -> impl Iterator<Item = &ReleaseTree> {
        self.trees.iter().filter(|t| t.should_bump_version)
    }
}

/// Plans releases from change records
pub struct ReleasePlanner<'a> {
    analyzer: &'a dyn CommitAnalyzer,
    options: ReleaseOptions,
}

impl<'a> ReleasePlanner<'a> {
    pub fn new(analyzer: &'a dyn CommitAnalyzer) -> Self {
        Self {
            analyzer,
            options: ReleaseOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReleaseOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the release plan. Inputs are not modified, so planning the same
    /// records twice yields equal plans.
    #[instrument(skip_all, fields(records = records.len()))]
    pub fn plan(&self, records: &[ChangeRecord]) -> Result<ReleasePlan> {
        let mut state = PlanState {
            options: &self.options,
            entries: Vec::new(),
            index: HashMap::new(),
            warnings: Vec::new(),
        };

        let seeds: Vec<&ChangeRecord> = records.iter().filter(|r| r.is_releasable()).collect();
        for record in &seeds {
            let tag_prefix = format!("{}@", record.name);
            let release_type = self
                .analyzer
                .recommended_release_type(&record.path, &tag_prefix)?
                .unwrap_or(ReleaseType::Patch);
            debug!(package = %record.name, %release_type, "seeding release");
            state.insert(record.dag.root_node(), release_type);
        }

        for record in &seeds {
            state.admit_dependents(&record.dag, record.dag.root(), &mut HashSet::new());
        }

        for record in &seeds {
            if let Some(&seed) = state.index.get(&record.name) {
                state.entries[seed].marked = true;
            }
            state.mark_dependents(&record.dag, record.dag.root(), &mut HashSet::new());
        }

        for record in &seeds {
            state.rewrite_ranges(&record.dag, record.dag.root(), &mut HashSet::new());
        }

        let plan = state.finish();
        info!(
            trees = plan.trees.len(),
            bumped = plan.bumped().count(),
            warnings = plan.warnings.len(),
            "release plan complete"
        );
        Ok(plan)
    }
}

struct Entry {
    name: String,
    path: Option<PathBuf>,
    old_version: Option<Version>,
    release_type: ReleaseType,
    is_internal_package: bool,
    marked: bool,
    dependencies: BTreeMap<DependencyKind, DependencyMap>,
}

impl Entry {
    /// Version after the bump, when this entry will be bumped
    fn planned_version(&self) -> Option<Version> {
        if !self.marked || self.name.is_empty() {
            return None;
        }
        self.old_version.as_ref().map(|v| self.release_type.bump(v))
    }
}

struct PlanState<'o> {
    options: &'o ReleaseOptions,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    warnings: Vec<String>,
}

impl<'o> PlanState<'o> {
    fn insert(&mut self, node: &DagNode, release_type: ReleaseType) {
        if self.index.contains_key(&node.name) {
            return;
        }
        self.index.insert(node.name.clone(), self.entries.len());
        self.entries.push(Entry {
            name: node.name.clone(),
            path: node.path.clone(),
            old_version: node.version.clone(),
            release_type,
            is_internal_package: node.is_internal_package,
            marked: false,
            dependencies: BTreeMap::new(),
        });
    }

    fn entry(&self, name: &str) -> Option<&Entry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Create entries for dependents that should take part in the release
    fn admit_dependents(&mut self, tree: &DependentsTree, id: NodeId, visited: &mut HashSet<NodeId>) {
        let parent = tree.node(id);
        for edge in &parent.dependents {
            if edge.is_cycle {
                continue;
            }
            let child = tree.node(edge.node);
            let eligible = self.index.contains_key(&child.name) || self.admit(parent, edge, child);
            if eligible && visited.insert(edge.node) {
                self.admit_dependents(tree, edge.node, visited);
            }
        }
    }

    fn admit(&mut self, parent: &DagNode, edge: &DagEdge, child: &DagNode) -> bool {
        if self.options.frozen.contains(&child.name) {
            debug!(package = %child.name, "version bumps disabled by configuration");
            return false;
        }

        let leaves_range = self
            .entry(&parent.name)
            .and_then(|p| p.old_version.as_ref().map(|v| p.release_type.bump(v)))
            .is_some_and(|next| !satisfies(&next, &edge.range));
        if !leaves_range && !self.options.bump_in_range_dependencies {
            return false;
        }

        debug!(package = %child.name, dependency = %parent.name, leaves_range, "adding dependent");
        self.insert(child, ReleaseType::Patch);
        true
    }

    /// Mark entries for bumping and raise inherited release types.
    ///
    /// An entry left unmarked by a dev edge is still walked through, so its
    /// own dependents are marked.
    fn mark_dependents(&mut self, tree: &DependentsTree, id: NodeId, visited: &mut HashSet<NodeId>) {
        let parent = tree.node(id);
        let Some(&parent_index) = self.index.get(&parent.name) else {
            return;
        };

        for edge in &parent.dependents {
            if edge.is_cycle {
                continue;
            }
            let child = tree.node(edge.node);
            let Some(&child_index) = self.index.get(&child.name) else {
                continue;
            };

            let parent_type = self.entries[parent_index].release_type;
            let dev = edge.kind.is_dev();
            let entry = &mut self.entries[child_index];
            let mut changed = false;

            if self.options.inherit_greater_release_type && !dev && parent_type > entry.release_type {
                entry.release_type = parent_type;
                changed = true;
            }
            if !(self.options.exclude_dev_changes && dev) && !entry.marked {
                entry.marked = true;
                changed = true;
            }

            if visited.insert(edge.node) || changed {
                self.mark_dependents(tree, edge.node, visited);
            }
        }
    }

    /// Record new ranges on dependencies that will be bumped
    fn rewrite_ranges(&mut self, tree: &DependentsTree, id: NodeId, visited: &mut HashSet<NodeId>) {
        let parent = tree.node(id);
        for edge in &parent.dependents {
            let child = tree.node(edge.node);
            if let (Some(&p), Some(&c)) = (self.index.get(&parent.name), self.index.get(&child.name)) {
                let recorded = self.entries[c]
                    .dependencies
                    .get(&edge.kind)
                    .is_some_and(|deps| deps.contains_key(&parent.name));
                if let (false, Some(next)) = (recorded, self.entries[p].planned_version()) {
                    let range = self.next_range(&child.name, &parent.name, &edge.range, &next);
                    self.entries[c]
                        .dependencies
                        .entry(edge.kind)
                        .or_default()
                        .insert(parent.name.clone(), range);
                }
            }

            if !edge.is_cycle && visited.insert(edge.node) {
                self.rewrite_ranges(tree, edge.node, visited);
            }
        }
    }

    fn next_range(&mut self, dependent: &str, dependency: &str, range: &str, next: &Version) -> String {
        if !self.options.bump_in_range_dependencies && satisfies(next, range) {
            return range.to_string();
        }

        let tracked = track_new_version(dependency, range, next);
        if let Some(warning) = tracked.warning {
            self.warnings.push(format!("{}: {}", dependent, warning));
        }
        tracked.range
    }

    fn finish(self) -> ReleasePlan {
        let trees = self
            .entries
            .into_iter()
            .map(|entry| {
                let new_version = entry.planned_version();
                let should_bump_version = new_version.is_some();
                ReleaseTree {
                    should_publish: should_bump_version && entry.is_internal_package,
                    should_bump_version,
                    new_version,
                    name: entry.name,
                    path: entry.path,
                    old_version: entry.old_version,
                    release_type: entry.release_type,
                    is_internal_package: entry.is_internal_package,
                    dependencies: entry.dependencies,
                }
            })
            .collect();

        let mut seen = HashSet::new();
        let warnings = self
            .warnings
            .into_iter()
            .filter(|w| seen.insert(w.clone()))
            .collect();

        ReleasePlan { trees, warnings }
    }
}
