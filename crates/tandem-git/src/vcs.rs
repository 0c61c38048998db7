//! Git as the planner's version-control collaborator

use std::path::Path;

use git2::Oid;

use tandem_core::error::VcsError;
use tandem_core::vcs::VersionControl;
use tandem_core::Result;

use crate::repository::GitRepo;

fn oid(commit: &str) -> std::result::Result<Oid, VcsError> {
    Oid::from_str(commit).map_err(|_| VcsError::UnknownCommit(commit.to_string()))
}

impl VersionControl for GitRepo {
    fn workdir(&self) -> &Path {
        self.workspace()
    }

    fn commit_at_tag(&self, tag: &str) -> Result<Option<String>> {
        Ok(self.find_tag(tag)?.map(|t| t.commit_hash))
    }

    fn first_commit(&self) -> Result<String> {
        Ok(GitRepo::first_commit(self)?.to_string())
    }

    fn current_commit(&self) -> Result<String> {
        Ok(self.head_commit()?.id().to_string())
    }

    fn resolve_commit(&self, reference: &str) -> Result<Option<String>> {
        Ok(self.resolve(reference)?.map(|oid| oid.to_string()))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        Ok(GitRepo::is_ancestor(self, oid(ancestor)?, oid(descendant)?)?)
    }

    fn diff_names(&self, from: &str, to: &str) -> Result<Vec<String>> {
        Ok(GitRepo::diff_names(self, oid(from)?, oid(to)?)?)
    }

    fn working_tree_changes(&self) -> Result<Vec<String>> {
        Ok(GitRepo::working_tree_changes(self)?)
    }

    fn file_at_commit(&self, path: &str, commit: &str) -> Result<Option<Vec<u8>>> {
        Ok(GitRepo::file_at_commit(self, Path::new(path), oid(commit)?)?)
    }
}
