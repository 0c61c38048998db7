//! Commit history operations

use std::path::Path;

use chrono::{TimeZone, Utc};
use git2::{Oid, Sort};
use tracing::{debug, instrument};

use crate::repository::{GitRepo, Result};
use crate::types::CommitInfo;
use tandem_core::error::VcsError;

impl GitRepo {
    /// The root commit reached from HEAD
    pub fn first_commit(&self) -> Result<Oid> {
        let head = self.head_commit()?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
        revwalk.push(head.id())?;

        match revwalk.next() {
            Some(oid) => Ok(oid?),
            None => Err(VcsError::NoCommits),
        }
    }

    /// Resolve a commit-ish to a commit id, or `None` if it names nothing
    pub fn resolve(&self, reference: &str) -> Result<Option<Oid>> {
        let object = match self.repo.revparse_single(reference) {
            Ok(object) => object,
            Err(e)
                if matches!(
                    e.code(),
                    git2::ErrorCode::NotFound
                        | git2::ErrorCode::InvalidSpec
                        | git2::ErrorCode::Ambiguous
                ) =>
            {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };

        Ok(object.peel_to_commit().ok().map(|c| c.id()))
    }

    /// Whether `ancestor` is reachable from `descendant`; a commit is its
    /// own ancestor
    pub fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self.repo.graph_descendant_of(descendant, ancestor)?)
    }

    /// Commits reachable from HEAD but not from `since`, newest first
    pub fn commits_since(&self, since: Option<Oid>) -> Result<Vec<CommitInfo>> {
        Ok(self
            .walk(since)?
            .iter()
            .map(commit_to_info)
            .collect())
    }

    /// Commits since `since` that change files under `path`, a
    /// workspace-relative directory
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn commits_touching(&self, path: &Path, since: Option<Oid>) -> Result<Vec<CommitInfo>> {
        let repo_path = self.to_repo_path(path);
        let mut touching = Vec::new();

        for commit in self.walk(since)? {
            let tree = commit.tree()?;
            let parent_tree = match commit.parent(0) {
                Ok(parent) => Some(parent.tree()?),
                Err(_) => None,
            };
            let diff = self
                .repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

            let touches = diff.deltas().any(|delta| {
                [delta.old_file().path(), delta.new_file().path()]
                    .into_iter()
                    .flatten()
                    .any(|p| p.starts_with(&repo_path))
            });
            if touches {
                touching.push(commit_to_info(&commit));
            }
        }

        debug!(count = touching.len(), "found commits touching path");
        Ok(touching)
    }

    fn walk(&self, since: Option<Oid>) -> Result<Vec<git2::Commit<'_>>> {
        let head = self.head_commit()?;

        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(head.id())?;
        if let Some(since) = since {
            revwalk.hide(since)?;
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            commits.push(self.repo.find_commit(oid?)?);
        }
        Ok(commits)
    }
}

/// Convert a git2 Commit to CommitInfo
fn commit_to_info(commit: &git2::Commit<'_>) -> CommitInfo {
    let hash = commit.id().to_string();
    let author = commit.author();

    let message = commit.summary().unwrap_or("(no message)").to_string();

    let timestamp = Utc
        .timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or_else(Utc::now);

    let info = CommitInfo::new(hash, message, author.name().unwrap_or("Unknown"), timestamp);
    match commit.body() {
        Some(body) => info.with_body(body),
        None => info,
    }
}
