//! Git repository operations

use std::path::{Component, Path, PathBuf};

use git2::Repository;
use tracing::{debug, info, instrument};

use tandem_core::error::VcsError;

/// Result type for git operations
pub type Result<T> = std::result::Result<T, VcsError>;

/// Git repository wrapper.
///
/// Paths handed in and out are relative to the workspace directory the
/// repository was opened from, which may be a subdirectory of the
/// repository's working tree.
pub struct GitRepo {
    pub(crate) repo: Repository,
    path: PathBuf,
    workspace: PathBuf,
    prefix: PathBuf,
}

impl GitRepo {
    /// Open a repository at the given path
    #[instrument(fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                VcsError::RepositoryNotFound(path.to_path_buf())
            } else {
                VcsError::OpenFailed(e.to_string())
            }
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            workspace: path.to_path_buf(),
            prefix: PathBuf::new(),
            repo,
        })
    }

    /// Discover the repository containing `start_path` and use `start_path`
    /// as the workspace directory
    #[instrument(fields(start_path = %start_path.display()))]
    pub fn discover(start_path: &Path) -> Result<Self> {
        info!(start_path = %start_path.display(), "discovering git repository");
        let repo = Repository::discover(start_path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                VcsError::NotARepository(start_path.to_path_buf())
            } else {
                VcsError::OpenFailed(e.to_string())
            }
        })?;

        let path = repo
            .workdir()
            .ok_or_else(|| VcsError::OpenFailed("repository has no working tree".to_string()))?
            .to_path_buf();

        let canonical = |p: &Path| {
            p.canonicalize()
                .map_err(|e| VcsError::OpenFailed(format!("{}: {}", p.display(), e)))
        };
        let prefix = canonical(start_path)?
            .strip_prefix(canonical(&path)?)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        debug!(prefix = %prefix.display(), "workspace location in repository");

        Ok(Self {
            repo,
            path,
            workspace: start_path.to_path_buf(),
            prefix,
        })
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory reported paths are relative to
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Get a reference to the inner git2 Repository
    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    /// Get the HEAD reference
    pub fn head(&self) -> Result<git2::Reference<'_>> {
        self.repo.head().map_err(|e| {
            if e.code() == git2::ErrorCode::UnbornBranch {
                VcsError::NoCommits
            } else {
                VcsError::Git2(e)
            }
        })
    }

    /// Get the HEAD commit
    pub fn head_commit(&self) -> Result<git2::Commit<'_>> {
        let head = self.head()?;
        head.peel_to_commit().map_err(VcsError::Git2)
    }

    /// Repository-relative form of a workspace-relative path
    pub(crate) fn to_repo_path(&self, workspace_path: &Path) -> PathBuf {
        self.prefix.join(workspace_path)
    }

    /// Workspace-relative, slash-separated form of a repository path, or
    /// `None` if the path lies outside the workspace
    pub(crate) fn to_workspace_path(&self, repo_path: &Path) -> Option<String> {
        let relative = repo_path.strip_prefix(&self.prefix).ok()?;
        let parts: Vec<_> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{commit_files, init_repo};
    use tempfile::TempDir;

    #[test]
    fn test_open_repo() {
        let (temp, _repo) = init_repo();
        let repo = GitRepo::open(temp.path()).unwrap();
        assert!(!repo.inner().is_bare());
    }

    #[test]
    fn test_discover_repo() {
        let (temp, _repo) = init_repo();

        let subdir = temp.path().join("sub").join("dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let repo = GitRepo::discover(&subdir).unwrap();
        // Canonicalize both paths to handle macOS /var -> /private/var symlink
        let repo_path = repo.path().canonicalize().unwrap();
        let temp_path = temp.path().canonicalize().unwrap();
        assert_eq!(repo_path, temp_path);
        assert_eq!(repo.to_repo_path(Path::new("a.txt")), PathBuf::from("sub/dir/a.txt"));
        assert_eq!(
            repo.to_workspace_path(Path::new("sub/dir/pkg/a.txt")),
            Some("pkg/a.txt".to_string())
        );
        assert_eq!(repo.to_workspace_path(Path::new("other/a.txt")), None);
    }

    #[test]
    fn test_not_a_repo() {
        let temp = TempDir::new().unwrap();
        let result = GitRepo::open(temp.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_head_of_empty_repo() {
        let (temp, _repo) = init_repo();
        let repo = GitRepo::open(temp.path()).unwrap();
        assert!(matches!(repo.head_commit(), Err(VcsError::NoCommits)));

        let (temp, raw) = init_repo();
        commit_files(&raw, &[("a.txt", "a")], "initial");
        let repo = GitRepo::open(temp.path()).unwrap();
        assert!(repo.head_commit().is_ok());
    }
}
