//! package.json model

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ManifestError, Result};
use crate::types::DependencyKind;

/// File name of a package manifest
pub const MANIFEST_FILE: &str = "package.json";

/// The subset of package.json the planner reads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    /// Publish allow-list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspaces: Option<WorkspacesField>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub optional_dependencies: BTreeMap<String, String>,
}

/// `workspaces` accepts either a pattern list or `{ "packages": [...] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkspacesField {
    Patterns(Vec<String>),
    Config {
        #[serde(default)]
        packages: Vec<String>,
    },
}

impl WorkspacesField {
    pub fn patterns(&self) -> &[String] {
        match self {
            Self::Patterns(patterns) => patterns,
            Self::Config { packages } => packages,
        }
    }
}

impl PackageManifest {
    /// Load a manifest, returning `None` if the file does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Self::parse(path, &content).map(Some)
    }

    /// Parse manifest text; `path` is only used for error reporting
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|source| {
            ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }

    /// Declared dependencies of one kind
    pub fn dependencies_of(&self, kind: DependencyKind) -> &BTreeMap<String, String> {
        match kind {
            DependencyKind::Dependencies => &self.dependencies,
            DependencyKind::DevDependencies => &self.dev_dependencies,
            DependencyKind::OptionalDependencies => &self.optional_dependencies,
        }
    }

    pub fn is_private(&self) -> bool {
        self.private.unwrap_or(false)
    }
}

/// Read a manifest as untyped JSON, returning `None` if it does not exist
pub fn read_manifest_value(path: &Path) -> Result<Option<Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| {
            ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
}
