//! Repository fixtures for tests

use std::path::Path;

use git2::{Oid, Repository, Signature};
use tempfile::TempDir;

pub fn init_repo() -> (TempDir, Repository) {
    let temp = TempDir::new().unwrap();
    let repo = Repository::init(temp.path()).unwrap();
    (temp, repo)
}

/// Write `files` into the working tree and commit them on HEAD.
/// A `None` body deletes the file.
pub fn commit_changes(repo: &Repository, files: &[(&str, Option<&str>)], message: &str) -> Oid {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();

    for (path, content) in files {
        let full = workdir.join(path);
        match content {
            Some(content) => {
                std::fs::create_dir_all(full.parent().unwrap()).unwrap();
                std::fs::write(&full, content).unwrap();
                index.add_path(Path::new(path)).unwrap();
            }
            None => {
                std::fs::remove_file(&full).unwrap();
                index.remove_path(Path::new(path)).unwrap();
            }
        }
    }
    index.write().unwrap();

    let sig = Signature::now("Test", "test@example.com").unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

pub fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) -> Oid {
    let changes: Vec<(&str, Option<&str>)> = files.iter().map(|(p, c)| (*p, Some(*c))).collect();
    commit_changes(repo, &changes, message)
}

pub fn tag(repo: &Repository, name: &str, commit: Oid) {
    let commit = repo.find_commit(commit).unwrap();
    repo.tag_lightweight(name, commit.as_object(), false).unwrap();
}

pub fn annotated_tag(repo: &Repository, name: &str, commit: Oid) {
    let sig = Signature::now("Test", "test@example.com").unwrap();
    let commit = repo.find_commit(commit).unwrap();
    repo.tag(name, commit.as_object(), &sig, "release", false)
        .unwrap();
}
