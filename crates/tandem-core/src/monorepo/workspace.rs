//! Workspace model: the root package plus its members

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use semver::Version;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{ManifestError, Result};
use crate::range::{is_safe_version, satisfies};
use crate::types::DependencyKind;

use super::discovery::PackageManager;
use super::manifest::{PackageManifest, MANIFEST_FILE};

/// Dependency name to version range
pub type DependencyMap = BTreeMap<String, String>;

/// Declared dependencies, grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyMaps {
    maps: BTreeMap<DependencyKind, DependencyMap>,
}

impl DependencyMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependencies of one kind
    pub fn get(&self, kind: DependencyKind) -> Option<&DependencyMap> {
        self.maps.get(&kind)
    }

    /// Range declared for `name` under `kind`
    pub fn range(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.maps
            .get(&kind)
            .and_then(|deps| deps.get(name))
            .map(String::as_str)
    }

    pub fn insert(&mut self, kind: DependencyKind, name: impl Into<String>, range: impl Into<String>) {
        self.maps
            .entry(kind)
            .or_default()
            .insert(name.into(), range.into());
    }

    /// All declarations as `(kind, name, range)`, kinds in traversal order
    pub fn iter(&self) -> impl Iterator<Item = (DependencyKind, &str, &str)> {
        self.maps.iter().flat_map(|(kind, deps)| {
            deps.iter()
                .map(move |(name, range)| (*kind, name.as_str(), range.as_str()))
        })
    }

    /// Keep only declarations matching `keep`; returns how many were removed
    pub fn retain(&mut self, mut keep: impl FnMut(DependencyKind, &str, &str) -> bool) -> usize {
        let mut removed = 0;
        for (kind, deps) in self.maps.iter_mut() {
            let before = deps.len();
            deps.retain(|name, range| keep(*kind, name.as_str(), range.as_str()));
            removed += before - deps.len();
        }
        self.maps.retain(|_, deps| !deps.is_empty());
        removed
    }

    pub fn is_empty(&self) -> bool {
        self.maps.values().all(|deps| deps.is_empty())
    }
}

/// A package in the workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePackage {
    /// Manifest name; empty for an unnamed root
    pub name: String,
    /// Directory relative to the workspace root
    pub path: PathBuf,
    pub version: Option<Version>,
    pub is_private: bool,
    pub is_root: bool,
    pub dependencies: DependencyMaps,
}

impl WorkspacePackage {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            version: None,
            is_private: false,
            is_root: false,
            dependencies: DependencyMaps::new(),
        }
    }

    /// Build from a parsed manifest. Unparseable versions, and versions with
    /// components npm would reject, are dropped.
    pub fn from_manifest(manifest: PackageManifest, path: PathBuf, is_root: bool) -> Self {
        let name = manifest.name.clone().unwrap_or_default();
        let version = manifest.version.as_deref().and_then(|raw| {
            let version = Version::parse(raw)
                .map_err(|e| warn!(package = %name, version = raw, error = %e, "ignoring invalid version"))
                .ok()?;
            if !is_safe_version(&version) {
                warn!(package = %name, version = raw, "ignoring version beyond npm's integer limit");
                return None;
            }
            Some(version)
        });

        let mut dependencies = DependencyMaps::new();
        for kind in DependencyKind::ALL {
            for (dep, range) in manifest.dependencies_of(kind) {
                dependencies.insert(kind, dep.clone(), range.clone());
            }
        }

        Self {
            name,
            path,
            version,
            is_private: manifest.is_private(),
            is_root,
            dependencies,
        }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Version::parse(version).ok();
        self
    }

    pub fn with_dependency(mut self, kind: DependencyKind, name: &str, range: &str) -> Self {
        self.dependencies.insert(kind, name, range);
        self
    }

    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    pub fn root(mut self) -> Self {
        self.is_root = true;
        self
    }

    /// A non-root, non-private package that can be published
    pub fn is_internal_package(&self) -> bool {
        !self.is_root && !self.is_private
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Options for building a [`WorkspaceModel`]
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Drop declarations that do not resolve to a satisfying member
    pub prune_dependencies: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            prune_dependencies: true,
        }
    }
}

/// An internal declaration whose range the member's version does not satisfy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsatisfiedDependency {
    pub dependent: String,
    pub kind: DependencyKind,
    pub dependency: String,
    pub range: String,
    pub version: Option<Version>,
}

/// The root package and its members, keyed by name
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceModel {
    root_dir: PathBuf,
    root: WorkspacePackage,
    packages: BTreeMap<String, WorkspacePackage>,
}

impl WorkspaceModel {
    /// Read the workspace rooted at `root_dir`.
    ///
    /// Members without a manifest or without a name are skipped. A missing
    /// root manifest or any malformed manifest is an error.
    #[instrument(skip_all, fields(root = %root_dir.display()))]
    pub fn build(
        root_dir: &Path,
        package_manager: &dyn PackageManager,
        options: &BuildOptions,
    ) -> Result<Self> {
        let root_manifest_path = root_dir.join(MANIFEST_FILE);
        let root_manifest = PackageManifest::load(&root_manifest_path)?
            .ok_or_else(|| ManifestError::RootNotFound(root_manifest_path.clone()))?;
        let root = WorkspacePackage::from_manifest(root_manifest, PathBuf::new(), true);

        debug!(package_manager = package_manager.name(), "listing workspace members");
        let mut members = Vec::new();
        for member_path in package_manager.list_workspace_member_paths(root_dir)? {
            let manifest_path = root_dir.join(&member_path).join(MANIFEST_FILE);
            let Some(manifest) = PackageManifest::load(&manifest_path)? else {
                debug!(path = %member_path.display(), "no manifest, skipping member");
                continue;
            };
            if manifest.name.is_none() {
                warn!(path = %member_path.display(), "member manifest has no name, skipping");
                continue;
            }
            members.push(WorkspacePackage::from_manifest(manifest, member_path, false));
        }

        let model = Self::from_packages(root_dir, root, members, options);
        info!(packages = model.packages.len(), "loaded workspace");
        Ok(model)
    }

    /// Assemble a model from already-read packages
    pub fn from_packages(
        root_dir: impl Into<PathBuf>,
        root: WorkspacePackage,
        members: impl IntoIterator<Item = WorkspacePackage>,
        options: &BuildOptions,
    ) -> Self {
        let mut packages = BTreeMap::new();
        for member in members {
            if let Some(previous) = packages.insert(member.name.clone(), member) {
                warn!(
                    package = %previous.name,
                    path = %previous.path.display(),
                    "duplicate package name, keeping the last one found"
                );
            }
        }

        let mut model = Self {
            root_dir: root_dir.into(),
            root,
            packages,
        };
        if options.prune_dependencies {
            model.prune();
        }
        model
    }

    /// Drop declarations on unknown names, then declarations whose range
    /// the member's version does not satisfy.
    pub fn prune(&mut self) {
        let versions: HashMap<String, Option<Version>> = self
            .packages
            .iter()
            .map(|(name, package)| (name.clone(), package.version.clone()))
            .collect();

        let mut external = 0;
        let mut unsatisfied = 0;
        for package in std::iter::once(&mut self.root).chain(self.packages.values_mut()) {
            external += package
                .dependencies
                .retain(|_, name, _| versions.contains_key(name));
            unsatisfied += package.dependencies.retain(|_, name, range| {
                matches!(versions.get(name), Some(Some(version)) if satisfies(version, range))
            });
        }

        debug!(external, unsatisfied, "pruned dependency declarations");
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn root(&self) -> &WorkspacePackage {
        &self.root
    }

    /// Member packages by name (the root is not included)
    pub fn packages(&self) -> &BTreeMap<String, WorkspacePackage> {
        &self.packages
    }

    /// Look up a member, falling back to the root
    pub fn get(&self, name: &str) -> Option<&WorkspacePackage> {
        self.packages
            .get(name)
            .or_else(|| (self.root.name == name).then_some(&self.root))
    }

    /// Members in name order, then the root
    pub fn iter(&self) -> impl Iterator<Item = &WorkspacePackage> {
        self.packages.values().chain(std::iter::once(&self.root))
    }

    /// Absolute directory of a package
    pub fn package_dir(&self, package: &WorkspacePackage) -> PathBuf {
        self.root_dir.join(&package.path)
    }

    /// Internal declarations whose range the member's version misses.
    ///
    /// Only meaningful on an unpruned model.
    pub fn unsatisfied_dependencies(&self) -> Vec<UnsatisfiedDependency> {
        let mut found = Vec::new();
        for package in self.iter() {
            for (kind, name, range) in package.dependencies.iter() {
                let Some(member) = self.packages.get(name) else {
                    continue;
                };
                let ok = member
                    .version
                    .as_ref()
                    .is_some_and(|version| satisfies(version, range));
                if !ok {
                    found.push(UnsatisfiedDependency {
                        dependent: package.name.clone(),
                        kind,
                        dependency: name.to_string(),
                        range: range.to_string(),
                        version: member.version.clone(),
                    });
                }
            }
        }
        found
    }
}
