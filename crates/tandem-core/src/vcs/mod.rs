//! Version-control collaborator
//!
//! Change detection only needs a handful of history queries. They are
//! expressed as a trait so the planner can run against git, a cached
//! wrapper, or an in-memory history in tests.

use std::path::Path;

use crate::error::Result;

pub mod cache;
#[cfg(test)]
pub(crate) mod memory;

pub use cache::CachedVcs;

/// History queries used by change detection.
///
/// Paths are slash-separated and relative to [`VersionControl::workdir`].
pub trait VersionControl {
    /// Root directory that reported paths are relative to
    fn workdir(&self) -> &Path;

    /// Commit a tag points at, or `None` if the tag does not exist
    fn commit_at_tag(&self, tag: &str) -> Result<Option<String>>;

    /// The root commit of the current history
    fn first_commit(&self) -> Result<String>;

    /// The commit HEAD points at
    fn current_commit(&self) -> Result<String>;

    /// Resolve a commit-ish, or `None` if it does not name a commit
    fn resolve_commit(&self, reference: &str) -> Result<Option<String>>;

    /// Whether `ancestor` is reachable from `descendant` (a commit is its own ancestor)
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Files that differ between two commits, including both sides of renames
    fn diff_names(&self, from: &str, to: &str) -> Result<Vec<String>>;

    /// Uncommitted changes: staged, unstaged, and untracked files
    fn working_tree_changes(&self) -> Result<Vec<String>>;

    /// File contents at a commit, or `None` if the file did not exist there
    fn file_at_commit(&self, path: &str, commit: &str) -> Result<Option<Vec<u8>>>;
}

impl<T: VersionControl + ?Sized> VersionControl for &T {
    fn workdir(&self) -> &Path {
        (**self).workdir()
    }

    fn commit_at_tag(&self, tag: &str) -> Result<Option<String>> {
        (**self).commit_at_tag(tag)
    }

    fn first_commit(&self) -> Result<String> {
        (**self).first_commit()
    }

    fn current_commit(&self) -> Result<String> {
        (**self).current_commit()
    }

    fn resolve_commit(&self, reference: &str) -> Result<Option<String>> {
        (**self).resolve_commit(reference)
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        (**self).is_ancestor(ancestor, descendant)
    }

    fn diff_names(&self, from: &str, to: &str) -> Result<Vec<String>> {
        (**self).diff_names(from, to)
    }

    fn working_tree_changes(&self) -> Result<Vec<String>> {
        (**self).working_tree_changes()
    }

    fn file_at_commit(&self, path: &str, commit: &str) -> Result<Option<Vec<u8>>> {
        (**self).file_at_commit(path, commit)
    }
}
