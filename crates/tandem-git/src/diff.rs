//! Tree comparisons and file contents at a commit

use std::collections::BTreeSet;
use std::path::Path;

use git2::Oid;
use tracing::{debug, instrument};

use crate::repository::{GitRepo, Result};

impl GitRepo {
    /// Files that differ between two commits, relative to the workspace.
    ///
    /// Both sides of a rename are reported, as are deleted files. Paths
    /// outside the workspace are dropped.
    #[instrument(skip(self))]
    pub fn diff_names(&self, from: Oid, to: Oid) -> Result<Vec<String>> {
        let old_tree = self.repo.find_commit(from)?.tree()?;
        let new_tree = self.repo.find_commit(to)?.tree()?;
        let mut diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;
        diff.find_similar(None)?;

        let mut files = BTreeSet::new();
        for delta in diff.deltas() {
            for path in [delta.old_file().path(), delta.new_file().path()]
                .into_iter()
                .flatten()
            {
                if let Some(path) = self.to_workspace_path(path) {
                    files.insert(path);
                }
            }
        }

        debug!(count = files.len(), "diffed trees");
        Ok(files.into_iter().collect())
    }

    /// Contents of a workspace-relative file at `commit`, or `None` if it
    /// did not exist there
    pub fn file_at_commit(&self, path: &Path, commit: Oid) -> Result<Option<Vec<u8>>> {
        let tree = self.repo.find_commit(commit)?.tree()?;
        let entry = match tree.get_path(&self.to_repo_path(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let object = entry.to_object(&self.repo)?;
        Ok(object.as_blob().map(|blob| blob.content().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::testing::{commit_changes, commit_files, init_repo};
    use crate::GitRepo;

    #[test]
    fn test_diff_names_includes_deletions_and_renames() {
        let (temp, raw) = init_repo();
        let base = commit_files(
            &raw,
            &[("keep.txt", "keep"), ("gone.txt", "gone"), ("old.txt", "same contents here")],
            "base",
        );
        let head = commit_changes(
            &raw,
            &[
                ("keep.txt", Some("changed")),
                ("gone.txt", None),
                ("old.txt", None),
                ("new.txt", Some("same contents here")),
            ],
            "change",
        );

        let repo = GitRepo::open(temp.path()).unwrap();
        assert_eq!(
            repo.diff_names(base, head).unwrap(),
            vec!["gone.txt", "keep.txt", "new.txt", "old.txt"]
        );
        assert!(repo.diff_names(head, head).unwrap().is_empty());
    }

    #[test]
    fn test_diff_names_relative_to_workspace() {
        let (temp, raw) = init_repo();
        let base = commit_files(&raw, &[("ws/package.json", "{}"), ("other.txt", "1")], "base");
        let head = commit_files(&raw, &[("ws/packages/a/index.js", "1"), ("other.txt", "2")], "change");

        let repo = GitRepo::discover(&temp.path().join("ws")).unwrap();
        assert_eq!(repo.diff_names(base, head).unwrap(), vec!["packages/a/index.js"]);
    }

    #[test]
    fn test_file_at_commit() {
        let (temp, raw) = init_repo();
        let first = commit_files(&raw, &[("pkg/package.json", r#"{"v": 1}"#)], "first");
        let second = commit_files(&raw, &[("pkg/package.json", r#"{"v": 2}"#)], "second");

        let repo = GitRepo::open(temp.path()).unwrap();
        let path = Path::new("pkg/package.json");
        assert_eq!(
            repo.file_at_commit(path, first).unwrap().unwrap(),
            br#"{"v": 1}"#.to_vec()
        );
        assert_eq!(
            repo.file_at_commit(path, second).unwrap().unwrap(),
            br#"{"v": 2}"#.to_vec()
        );
        assert!(repo
            .file_at_commit(Path::new("missing.json"), first)
            .unwrap()
            .is_none());
    }
}
