//! Repository status operations

use std::collections::BTreeSet;
use std::path::PathBuf;

use git2::StatusOptions;

use crate::repository::{GitRepo, Result};

impl GitRepo {
    /// Check if the working directory is clean (no uncommitted changes)
    pub fn is_clean(&self) -> Result<bool> {
        Ok(self.working_tree_changes()?.is_empty())
    }

    /// Staged, unstaged, and untracked files relative to the workspace.
    ///
    /// Untracked directories are listed file by file. Both sides of a
    /// staged rename are reported.
    pub fn working_tree_changes(&self) -> Result<Vec<String>> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .renames_head_to_index(true);

        let statuses = self.repo.statuses(Some(&mut opts))?;
        let mut files = BTreeSet::new();

        for entry in statuses.iter() {
            if entry.status().is_empty() || entry.status().is_ignored() {
                continue;
            }

            let mut paths: Vec<PathBuf> = entry.path().map(PathBuf::from).into_iter().collect();
            for delta in [entry.head_to_index(), entry.index_to_workdir()]
                .into_iter()
                .flatten()
            {
                for side in [delta.old_file().path(), delta.new_file().path()]
                    .into_iter()
                    .flatten()
                {
                    paths.push(side.to_path_buf());
                }
            }

            for path in paths {
                if let Some(path) = self.to_workspace_path(&path) {
                    files.insert(path);
                }
            }
        }

        Ok(files.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{commit_files, init_repo};
    use crate::GitRepo;

    #[test]
    fn test_is_clean() {
        let (temp, raw) = init_repo();
        commit_files(&raw, &[("file.txt", "content")], "Initial commit");

        let repo = GitRepo::open(temp.path()).unwrap();
        assert!(repo.is_clean().unwrap());
    }

    #[test]
    fn test_working_tree_changes() {
        let (temp, raw) = init_repo();
        commit_files(&raw, &[("file.txt", "content"), ("gone.txt", "x")], "Initial commit");

        std::fs::write(temp.path().join("file.txt"), "modified").unwrap();
        std::fs::remove_file(temp.path().join("gone.txt")).unwrap();
        std::fs::create_dir_all(temp.path().join("new/dir")).unwrap();
        std::fs::write(temp.path().join("new/dir/a.txt"), "a").unwrap();
        std::fs::write(temp.path().join(".gitignore"), "*.log\n").unwrap();
        std::fs::write(temp.path().join("debug.log"), "noise").unwrap();

        let repo = GitRepo::open(temp.path()).unwrap();
        assert!(!repo.is_clean().unwrap());
        assert_eq!(
            repo.working_tree_changes().unwrap(),
            vec![".gitignore", "file.txt", "gone.txt", "new/dir/a.txt"]
        );
    }
}
