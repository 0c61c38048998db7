//! Release type recommendation from Conventional Commits
//!
//! Commits follow https://www.conventionalcommits.org/: a breaking marker
//! or `BREAKING CHANGE` footer means major, `feat` means minor, and
//! anything else means patch.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use tandem_core::monorepo::CommitAnalyzer;
use tandem_core::types::ReleaseType;

use crate::repository::GitRepo;
use crate::types::CommitInfo;

/// Regex for parsing conventional commit messages
static CONVENTIONAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<type>[a-zA-Z]+)(?:\((?P<scope>[^)]+)\))?(?P<breaking>!)?: (?P<description>.+)$",
    )
    .expect("Invalid regex")
});

/// Regex for parsing footer lines
static FOOTER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<token>[A-Za-z-]+|BREAKING CHANGE): (?P<value>.+)$").expect("Invalid regex")
});

/// Commit analyzer backed by git history
pub struct ConventionalAnalyzer<'r> {
    repo: &'r GitRepo,
}

impl<'r> ConventionalAnalyzer<'r> {
    pub fn new(repo: &'r GitRepo) -> Self {
        Self { repo }
    }
}

impl CommitAnalyzer for ConventionalAnalyzer<'_> {
    #[instrument(skip(self), fields(path = %package_path.display()))]
    fn recommended_release_type(
        &self,
        package_path: &Path,
        tag_prefix: &str,
    ) -> tandem_core::Result<Option<ReleaseType>> {
        let since = match self.repo.find_latest_tag(tag_prefix)? {
            Some(tag) => self.repo.resolve(&tag.commit_hash)?,
            None => None,
        };

        let commits = self.repo.commits_touching(package_path, since)?;
        let recommended = commits.iter().map(classify).max();
        debug!(
            commits = commits.len(),
            recommended = ?recommended,
            "analyzed commits"
        );
        Ok(recommended)
    }
}

/// Release type implied by a single commit
pub fn classify(commit: &CommitInfo) -> ReleaseType {
    let Some(caps) = CONVENTIONAL_REGEX.captures(&commit.message) else {
        return ReleaseType::Patch;
    };

    let breaking_in_footer = commit.body.as_deref().is_some_and(|body| {
        body.lines().any(|line| {
            FOOTER_REGEX
                .captures(line)
                .and_then(|c| c.name("token"))
                .is_some_and(|token| {
                    token.as_str().eq_ignore_ascii_case("BREAKING CHANGE")
                        || token.as_str().eq_ignore_ascii_case("BREAKING-CHANGE")
                })
        })
    });

    if caps.name("breaking").is_some() || breaking_in_footer {
        ReleaseType::Major
    } else if caps
        .name("type")
        .is_some_and(|t| t.as_str().eq_ignore_ascii_case("feat"))
    {
        ReleaseType::Minor
    } else {
        ReleaseType::Patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{commit_files, init_repo, tag};
    use chrono::Utc;

    fn commit(message: &str, body: Option<&str>) -> CommitInfo {
        let info = CommitInfo::new("abc1234567890", message, "Author", Utc::now());
        match body {
            Some(body) => info.with_body(body),
            None => info,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&commit("feat: add x", None)), ReleaseType::Minor);
        assert_eq!(classify(&commit("feat(core): add x", None)), ReleaseType::Minor);
        assert_eq!(classify(&commit("fix: y", None)), ReleaseType::Patch);
        assert_eq!(classify(&commit("refactor!: drop z", None)), ReleaseType::Major);
        assert_eq!(classify(&commit("update readme", None)), ReleaseType::Patch);
        assert_eq!(
            classify(&commit("fix: y", Some("details\n\nBREAKING CHANGE: removed z"))),
            ReleaseType::Major
        );
    }

    #[test]
    fn test_recommendation_since_latest_tag() {
        let (temp, raw) = init_repo();
        let released = commit_files(&raw, &[("packages/a/index.js", "1")], "feat!: initial");
        tag(&raw, "a@1.0.0", released);
        commit_files(&raw, &[("packages/b/index.js", "1")], "feat: b only");
        commit_files(&raw, &[("packages/a/index.js", "2")], "fix: a bug");

        let repo = GitRepo::open(temp.path()).unwrap();
        let analyzer = ConventionalAnalyzer::new(&repo);
        assert_eq!(
            analyzer
                .recommended_release_type(Path::new("packages/a"), "a@")
                .unwrap(),
            Some(ReleaseType::Patch)
        );
        assert_eq!(
            analyzer
                .recommended_release_type(Path::new("packages/b"), "b@")
                .unwrap(),
            Some(ReleaseType::Minor)
        );
        assert_eq!(
            analyzer
                .recommended_release_type(Path::new("packages/c"), "c@")
                .unwrap(),
            None
        );
    }
}
