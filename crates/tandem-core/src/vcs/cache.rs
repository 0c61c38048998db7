//! Memoizing version-control wrapper

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::Result;

use super::VersionControl;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    workdir: PathBuf,
    query: Vec<String>,
}

#[derive(Debug, Clone)]
enum Cached {
    Commit(Option<String>),
    Required(String),
    Flag(bool),
    Paths(Vec<String>),
    Blob(Option<Vec<u8>>),
}

/// Caches query results of an inner [`VersionControl`].
///
/// Results are keyed by working directory and query arguments. A cache is
/// meant to live for one planning run; create a fresh one per run so new
/// commits and working-tree edits are observed.
pub struct CachedVcs<V> {
    inner: V,
    entries: RefCell<HashMap<CacheKey, Cached>>,
}

impl<V: VersionControl> CachedVcs<V> {
    /// Wrap a version-control collaborator
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// The wrapped collaborator
    pub fn inner(&self) -> &V {
        &self.inner
    }

    /// Number of memoized results
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn memo<T: Clone>(
        &self,
        query: &[&str],
        fetch: impl FnOnce(&V) -> Result<T>,
        wrap: impl FnOnce(T) -> Cached,
        unwrap: impl FnOnce(&Cached) -> Option<T>,
    ) -> Result<T> {
        let key = CacheKey {
            workdir: self.inner.workdir().to_path_buf(),
            query: query.iter().map(|s| s.to_string()).collect(),
        };

        if let Some(value) = self.entries.borrow().get(&key).and_then(unwrap) {
            trace!(query = ?key.query, "vcs cache hit");
            return Ok(value);
        }

        let value = fetch(&self.inner)?;
        self.entries.borrow_mut().insert(key, wrap(value.clone()));
        Ok(value)
    }
}

impl<V: VersionControl> VersionControl for CachedVcs<V> {
    fn workdir(&self) -> &Path {
        self.inner.workdir()
    }

    fn commit_at_tag(&self, tag: &str) -> Result<Option<String>> {
        self.memo(
            &["commit_at_tag", tag],
            |vcs| vcs.commit_at_tag(tag),
            Cached::Commit,
            |c| match c {
                Cached::Commit(v) => Some(v.clone()),
                _ => None,
            },
        )
    }

    fn first_commit(&self) -> Result<String> {
        self.memo(
            &["first_commit"],
            |vcs| vcs.first_commit(),
            Cached::Required,
            |c| match c {
                Cached::Required(v) => Some(v.clone()),
                _ => None,
            },
        )
    }

    fn current_commit(&self) -> Result<String> {
        self.memo(
            &["current_commit"],
            |vcs| vcs.current_commit(),
            Cached::Required,
            |c| match c {
                Cached::Required(v) => Some(v.clone()),
                _ => None,
            },
        )
    }

    fn resolve_commit(&self, reference: &str) -> Result<Option<String>> {
        self.memo(
            &["resolve_commit", reference],
            |vcs| vcs.resolve_commit(reference),
            Cached::Commit,
            |c| match c {
                Cached::Commit(v) => Some(v.clone()),
                _ => None,
            },
        )
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        self.memo(
            &["is_ancestor", ancestor, descendant],
            |vcs| vcs.is_ancestor(ancestor, descendant),
            Cached::Flag,
            |c| match c {
                Cached::Flag(v) => Some(*v),
                _ => None,
            },
        )
    }

    fn diff_names(&self, from: &str, to: &str) -> Result<Vec<String>> {
        self.memo(
            &["diff_names", from, to],
            |vcs| vcs.diff_names(from, to),
            Cached::Paths,
            |c| match c {
                Cached::Paths(v) => Some(v.clone()),
                _ => None,
            },
        )
    }

    fn working_tree_changes(&self) -> Result<Vec<String>> {
        self.memo(
            &["working_tree_changes"],
            |vcs| vcs.working_tree_changes(),
            Cached::Paths,
            |c| match c {
                Cached::Paths(v) => Some(v.clone()),
                _ => None,
            },
        )
    }

    fn file_at_commit(&self, path: &str, commit: &str) -> Result<Option<Vec<u8>>> {
        self.memo(
            &["file_at_commit", path, commit],
            |vcs| vcs.file_at_commit(path, commit),
            Cached::Blob,
            |c| match c {
                Cached::Blob(v) => Some(v.clone()),
                _ => None,
            },
        )
    }
}
