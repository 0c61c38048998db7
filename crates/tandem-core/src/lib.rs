//! Tandem Core - Core library for monorepo release planning
//!
//! This crate provides the workspace model, npm range semantics, change
//! detection, and release planning used by the tandem CLI. Version control
//! and commit analysis are collaborators behind traits, implemented for git
//! by `tandem-git`.

pub mod config;
pub mod error;
pub mod monorepo;
pub mod range;
pub mod types;
pub mod vcs;

pub use config::{load_config, load_config_or_default, Config};
pub use error::{Result, TandemError};
pub use monorepo::{
    build_dependents_tree, find_cycles, ChangeDetector, ChangeOptions, ChangeRecord,
    CommitAnalyzer, ManifestWorkspaces, NpmPackList, PackageManager, PublishFileLister,
    ReleaseOptions, ReleasePlan, ReleasePlanner, WorkspaceModel,
};
pub use range::{satisfies, track_new_version, VersionRange};
pub use types::{DependencyKind, ReleaseType};
pub use vcs::{CachedVcs, VersionControl};
