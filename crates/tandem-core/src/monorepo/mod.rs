//! Monorepo support for multi-package repositories
//!
//! This module provides the planning pipeline for npm-style workspaces:
//! - Member discovery from workspace globs
//! - A workspace model with out-of-range declarations pruned
//! - Dependents trees and cycle detection
//! - Change detection against release tags, cascaded to dependents
//! - Release planning with version bumps and range rewriting

pub mod changes;
pub mod cycles;
pub mod dag;
pub mod diff;
pub mod discovery;
pub mod manifest;
pub mod packlist;
pub mod release;
pub mod workspace;

pub use changes::{ChangeDetector, ChangeOptions, ChangeRecord};
pub use cycles::find_cycles;
pub use dag::{build_dependents_tree, DagEdge, DagNode, DependentsTree, NodeId};
pub use diff::{is_dev_only_change, manifest_diff, PatchOperation};
pub use discovery::{ManifestWorkspaces, PackageManager};
pub use manifest::{PackageManifest, MANIFEST_FILE};
pub use packlist::{NpmPackList, PackageSnapshot, PublishFileLister};
pub use release::{CommitAnalyzer, ReleaseOptions, ReleasePlan, ReleasePlanner, ReleaseTree};
pub use workspace::{
    BuildOptions, DependencyMap, DependencyMaps, UnsatisfiedDependency, WorkspaceModel,
    WorkspacePackage,
};
