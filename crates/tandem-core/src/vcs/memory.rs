//! In-memory history for tests

use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::error::{Result, VcsError};

use super::VersionControl;

/// Linear commit history held in memory
#[derive(Debug, Default)]
pub struct MemoryVcs {
    workdir: PathBuf,
    commits: Vec<(String, Vec<String>)>,
    tags: HashMap<String, String>,
    uncommitted: Vec<String>,
    blobs: HashMap<(String, String), Vec<u8>>,
    calls: Cell<usize>,
}

impl MemoryVcs {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            ..Default::default()
        }
    }

    /// Append a commit touching `files`
    pub fn commit(mut self, id: &str, files: &[&str]) -> Self {
        self.commits.push((
            id.to_string(),
            files.iter().map(|f| f.to_string()).collect(),
        ));
        self
    }

    pub fn tag(mut self, tag: &str, commit: &str) -> Self {
        self.tags.insert(tag.to_string(), commit.to_string());
        self
    }

    pub fn uncommitted(mut self, files: &[&str]) -> Self {
        self.uncommitted = files.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Record the contents of `path` as of `commit`
    pub fn blob(mut self, path: &str, commit: &str, contents: &str) -> Self {
        self.blobs.insert(
            (path.to_string(), commit.to_string()),
            contents.as_bytes().to_vec(),
        );
        self
    }

    /// Number of queries answered so far
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    fn record_call(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    fn position(&self, commit: &str) -> Result<usize> {
        self.commits
            .iter()
            .position(|(id, _)| id == commit)
            .ok_or_else(|| VcsError::UnknownCommit(commit.to_string()).into())
    }
}

impl VersionControl for MemoryVcs {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn commit_at_tag(&self, tag: &str) -> Result<Option<String>> {
        self.record_call();
        Ok(self.tags.get(tag).cloned())
    }

    fn first_commit(&self) -> Result<String> {
        self.record_call();
        self.commits
            .first()
            .map(|(id, _)| id.clone())
            .ok_or_else(|| VcsError::NoCommits.into())
    }

    fn current_commit(&self) -> Result<String> {
        self.record_call();
        self.commits
            .last()
            .map(|(id, _)| id.clone())
            .ok_or_else(|| VcsError::NoCommits.into())
    }

    fn resolve_commit(&self, reference: &str) -> Result<Option<String>> {
        self.record_call();
        if let Some(commit) = self.tags.get(reference) {
            return Ok(Some(commit.clone()));
        }
        Ok(self
            .commits
            .iter()
            .find(|(id, _)| id == reference)
            .map(|(id, _)| id.clone()))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        self.record_call();
        Ok(self.position(ancestor)? <= self.position(descendant)?)
    }

    fn diff_names(&self, from: &str, to: &str) -> Result<Vec<String>> {
        self.record_call();
        let (start, end) = (self.position(from)?, self.position(to)?);
        let files: BTreeSet<String> = self
            .commits
            .iter()
            .take(end + 1)
            .skip(start + 1)
            .flat_map(|(_, files)| files.iter().cloned())
            .collect();
        Ok(files.into_iter().collect())
    }

    fn working_tree_changes(&self) -> Result<Vec<String>> {
        self.record_call();
        Ok(self.uncommitted.clone())
    }

    fn file_at_commit(&self, path: &str, commit: &str) -> Result<Option<Vec<u8>>> {
        self.record_call();
        Ok(self
            .blobs
            .get(&(path.to_string(), commit.to_string()))
            .cloned())
    }
}
