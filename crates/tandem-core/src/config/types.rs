//! Configuration types

use serde::{Deserialize, Serialize};

/// Main configuration for tandem
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Release planning policy
    pub release: ReleaseConfig,

    /// Change detection settings
    pub changes: ChangesConfig,

    /// Dependency graph settings
    pub graph: GraphConfig,

    /// Per-package overrides
    #[serde(default)]
    pub packages: Vec<PackageConfig>,
}

impl Config {
    /// Look up the override for a package, if any
    pub fn package(&self, name: &str) -> Option<&PackageConfig> {
        self.packages.iter().find(|p| p.name == name)
    }

    /// Whether a package may be given a version bump by propagation
    pub fn allows_version_bump(&self, name: &str) -> bool {
        self.package(name).map_or(true, |p| p.bump_version)
    }
}

/// Release planning policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Bump dependents even when the new version still satisfies their range
    pub bump_in_range_dependencies: bool,

    /// Raise a dependent's release type to that of its dependency
    pub inherit_greater_release_type: bool,

    /// Ignore devDependencies-only manifest changes and dev edges when bumping
    pub exclude_dev_changes: bool,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            bump_in_range_dependencies: true,
            inherit_greater_release_type: false,
            exclude_dev_changes: false,
        }
    }
}

/// Change detection settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangesConfig {
    /// Whether changes cascade across devDependencies edges
    pub cascade_dev_dependencies: bool,

    /// Only consider changes newer than this commit-ish
    pub since: Option<String>,
}

/// Dependency graph settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Whether devDependencies count as graph edges
    pub include_dev_dependencies: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            include_dev_dependencies: true,
        }
    }
}

/// Per-package override
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Package name as declared in its manifest
    pub name: String,

    /// Whether propagation may bump this package's version
    #[serde(default = "default_true")]
    pub bump_version: bool,
}

fn default_true() -> bool {
    true
}
