//! Workspace member discovery

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use glob::glob;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{ManifestError, Result};

use super::manifest::{PackageManifest, MANIFEST_FILE};

/// pnpm's workspace declaration file
pub const PNPM_WORKSPACE_FILE: &str = "pnpm-workspace.yaml";

/// Package-manager collaborator that enumerates workspace members
pub trait PackageManager {
    /// Name of the package manager
    fn name(&self) -> &'static str;

    /// Member package directories, relative to `root`
    fn list_workspace_member_paths(&self, root: &Path) -> Result<Vec<PathBuf>>;
}

/// Reads member patterns from `pnpm-workspace.yaml` or the root
/// manifest's `workspaces` field and expands them against the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestWorkspaces;

impl ManifestWorkspaces {
    pub fn new() -> Self {
        Self
    }

    /// Member patterns declared at `root`
    pub fn patterns(&self, root: &Path) -> Result<Vec<String>> {
        let pnpm_workspace = root.join(PNPM_WORKSPACE_FILE);
        if pnpm_workspace.exists() {
            #[derive(Deserialize)]
            struct PnpmWorkspace {
                #[serde(default)]
                packages: Vec<String>,
            }

            let content = std::fs::read_to_string(&pnpm_workspace)?;
            let config: PnpmWorkspace = serde_yaml::from_str(&content).map_err(|source| {
                ManifestError::PnpmWorkspace {
                    path: pnpm_workspace.clone(),
                    source,
                }
            })?;
            debug!(patterns = config.packages.len(), "read pnpm workspace");
            return Ok(config.packages);
        }

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = PackageManifest::load(&manifest_path)?
            .ok_or(ManifestError::RootNotFound(manifest_path))?;

        Ok(manifest
            .workspaces
            .map(|w| w.patterns().to_vec())
            .unwrap_or_default())
    }
}

impl PackageManager for ManifestWorkspaces {
    fn name(&self) -> &'static str {
        "npm"
    }

    #[instrument(skip(self), fields(root = %root.display()))]
    fn list_workspace_member_paths(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let patterns = self.patterns(root)?;
        expand_patterns(root, &patterns)
    }
}

/// Expand workspace globs into member directories relative to `root`.
///
/// Patterns starting with `!` exclude matches. `node_modules` and the root
/// itself are never members. The result is sorted.
pub fn expand_patterns(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut included = BTreeSet::new();
    let mut excluded = BTreeSet::new();

    for pattern in patterns {
        let (negated, body) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, pattern.as_str()),
        };
        let body = body.trim_start_matches("./").trim_end_matches('/');
        if body.is_empty() || body == "." {
            continue;
        }

        let full_pattern = root.join(body).to_string_lossy().to_string();
        let entries = glob(&full_pattern).map_err(|e| ManifestError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for entry in entries {
            let path = entry.map_err(|e| ManifestError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            if !path.is_dir() {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
            let in_node_modules = relative
                .components()
                .any(|c| c == Component::Normal("node_modules".as_ref()));
            if relative.as_os_str().is_empty() || in_node_modules {
                continue;
            }

            if negated {
                excluded.insert(relative);
            } else {
                included.insert(relative);
            }
        }
    }

    let members: Vec<PathBuf> = included.difference(&excluded).cloned().collect();
    debug!(count = members.len(), "expanded workspace patterns");
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mkdirs(root: &Path, dirs: &[&str]) {
        for dir in dirs {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
    }

    #[test]
    fn test_npm_workspaces_array() {
        let temp = TempDir::new().unwrap();
        mkdirs(temp.path(), &["packages/a", "packages/b", "tools/x"]);
        std::fs::write(
            temp.path().join("package.json"),
            r#"{"name": "root", "workspaces": ["packages/*"]}"#,
        )
        .unwrap();

        let members = ManifestWorkspaces
            .list_workspace_member_paths(temp.path())
            .unwrap();
        assert_eq!(
            members,
            vec![PathBuf::from("packages/a"), PathBuf::from("packages/b")]
        );
    }

    #[test]
    fn test_yarn_workspaces_object_with_exclusion() {
        let temp = TempDir::new().unwrap();
        mkdirs(temp.path(), &["packages/a", "packages/legacy", "apps/web"]);
        std::fs::write(
            temp.path().join("package.json"),
            r#"{"workspaces": {"packages": ["packages/*", "apps/*", "!packages/legacy"]}}"#,
        )
        .unwrap();

        let members = ManifestWorkspaces
            .list_workspace_member_paths(temp.path())
            .unwrap();
        assert_eq!(
            members,
            vec![PathBuf::from("apps/web"), PathBuf::from("packages/a")]
        );
    }

    #[test]
    fn test_pnpm_workspace_takes_precedence() {
        let temp = TempDir::new().unwrap();
        mkdirs(temp.path(), &["packages/a", "components/ui"]);
        std::fs::write(
            temp.path().join("package.json"),
            r#"{"workspaces": ["packages/*"]}"#,
        )
        .unwrap();
        std::fs::write(
            temp.path().join(PNPM_WORKSPACE_FILE),
            "packages:\n  - 'components/*'\n",
        )
        .unwrap();

        let members = ManifestWorkspaces
            .list_workspace_member_paths(temp.path())
            .unwrap();
        assert_eq!(members, vec![PathBuf::from("components/ui")]);
    }

    #[test]
    fn test_no_workspaces_field() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("package.json"), r#"{"name": "solo"}"#).unwrap();

        let members = ManifestWorkspaces
            .list_workspace_member_paths(temp.path())
            .unwrap();
        assert!(members.is_empty());
    }

    #[test]
    fn test_missing_root_manifest() {
        let temp = TempDir::new().unwrap();
        let err = ManifestWorkspaces
            .list_workspace_member_paths(temp.path())
            .unwrap_err();
        assert!(err.to_string().contains("Workspace manifest not found"));
    }

    #[test]
    fn test_node_modules_skipped() {
        let temp = TempDir::new().unwrap();
        mkdirs(temp.path(), &["packages/a", "packages/a/node_modules/dep"]);

        let members = expand_patterns(temp.path(), &["packages/**".to_string()]).unwrap();
        assert!(members.contains(&PathBuf::from("packages/a")));
        assert!(!members
            .iter()
            .any(|m| m.to_string_lossy().contains("node_modules")));
    }
}
