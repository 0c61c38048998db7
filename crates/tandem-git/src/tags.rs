//! Tag operations

use semver::Version;
use tracing::{debug, instrument};

use crate::repository::{GitRepo, Result};
use crate::types::TagInfo;
use tandem_core::error::VcsError;

impl GitRepo {
    /// Get all tags, peeled to the commits they point at
    #[instrument(skip(self))]
    pub fn tags(&self) -> Result<Vec<TagInfo>> {
        let names = self.repo.tag_names(None)?;
        let mut tags = Vec::new();

        for name in names.iter().flatten() {
            if let Some(tag) = self.find_tag(name)? {
                tags.push(tag);
            }
        }

        debug!(count = tags.len(), "listed all tags");
        Ok(tags)
    }

    /// Find a specific tag by name. Annotated tags resolve to their commit.
    pub fn find_tag(&self, name: &str) -> Result<Option<TagInfo>> {
        let tag_ref = format!("refs/tags/{}", name);

        match self.repo.find_reference(&tag_ref) {
            Ok(reference) => match reference.peel_to_commit() {
                Ok(commit) => Ok(Some(TagInfo::new(name, commit.id().to_string()))),
                Err(e) => {
                    debug!(tag = name, error = %e, "tag does not point at a commit");
                    Ok(None)
                }
            },
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) if e.code() == git2::ErrorCode::InvalidSpec => Ok(None),
            Err(e) => Err(VcsError::Git2(e)),
        }
    }

    /// Newest tag of the form `<prefix><semver>`, by version precedence
    #[instrument(skip(self))]
    pub fn find_latest_tag(&self, prefix: &str) -> Result<Option<TagInfo>> {
        let mut versioned: Vec<(TagInfo, Version)> = self
            .tags()?
            .into_iter()
            .filter_map(|tag| {
                let version = tag
                    .name
                    .strip_prefix(prefix)
                    .and_then(|v| Version::parse(v).ok())?;
                Some((tag, version))
            })
            .collect();

        versioned.sort_by(|a, b| b.1.cmp(&a.1));

        let result = versioned.into_iter().next().map(|(t, _)| t);
        debug!(latest = ?result.as_ref().map(|t| &t.name), "found latest tag");
        Ok(result)
    }
}
