//! Tandem Git - Git collaborators for release planning
//!
//! This crate implements the version-control and commit-analysis
//! collaborators of `tandem-core` on top of git2.

mod analyzer;
mod commits;
mod diff;
mod repository;
mod status;
mod tags;
pub mod types;
mod vcs;

#[cfg(test)]
mod testing;

pub use analyzer::{classify, ConventionalAnalyzer};
pub use repository::{GitRepo, Result};
pub use types::{CommitInfo, TagInfo};
