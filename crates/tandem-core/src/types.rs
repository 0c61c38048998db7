//! Core types for tandem

use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};

/// Semantic release increment, ordered `patch < minor < major`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    /// Patch version bump (bug fixes)
    Patch,
    /// Minor version bump (new features)
    Minor,
    /// Major version bump (breaking changes)
    Major,
}

impl ReleaseType {
    /// Returns the string representation of the release type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }

    /// Increment `version` the way `npm version <type>` does.
    ///
    /// A prerelease graduates to its release instead of skipping past it,
    /// so `1.3.0-rc.1` bumped by minor is `1.3.0`. Components saturate at
    /// `u64::MAX`; manifest versions never get near it because they are
    /// capped at npm's limit when loaded.
    pub fn bump(&self, version: &Version) -> Version {
        let pre = !version.pre.is_empty();
        let (major, minor, patch) = match self {
            Self::Major if pre && version.minor == 0 && version.patch == 0 => {
                (version.major, 0, 0)
            }
            Self::Major => (version.major.saturating_add(1), 0, 0),
            Self::Minor if pre && version.patch == 0 => (version.major, version.minor, 0),
            Self::Minor => (version.major, version.minor.saturating_add(1), 0),
            Self::Patch if pre => (version.major, version.minor, version.patch),
            Self::Patch => (version.major, version.minor, version.patch.saturating_add(1)),
        };

        Version {
            major,
            minor,
            patch,
            pre: Prerelease::EMPTY,
            build: BuildMetadata::EMPTY,
        }
    }
}

impl std::fmt::Display for ReleaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReleaseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            _ => Err(format!("Unknown release type: {}", s)),
        }
    }
}

/// Manifest section a dependency is declared in.
///
/// Ordering follows the section names, which is the order traversals visit
/// kinds in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    #[serde(rename = "dependencies")]
    Dependencies,
    #[serde(rename = "devDependencies")]
    DevDependencies,
    #[serde(rename = "optionalDependencies")]
    OptionalDependencies,
}

impl DependencyKind {
    /// Every kind, in traversal order
    pub const ALL: [DependencyKind; 3] = [
        Self::Dependencies,
        Self::DevDependencies,
        Self::OptionalDependencies,
    ];

    /// Kinds admitted by a traversal, optionally including dev dependencies
    pub fn filter(include_dev_dependencies: bool) -> Vec<DependencyKind> {
        Self::ALL
            .into_iter()
            .filter(|kind| include_dev_dependencies || !kind.is_dev())
            .collect()
    }

    /// The package.json key for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dependencies => "dependencies",
            Self::DevDependencies => "devDependencies",
            Self::OptionalDependencies => "optionalDependencies",
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::DevDependencies)
    }
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip a `detached` prerelease marker, yielding the version a release tag
/// was cut for.
pub fn strip_detached(version: &Version) -> Version {
    let pre = version.pre.as_str();
    if pre == "detached" || pre.starts_with("detached.") || pre.ends_with(".detached") {
        let mut stripped = version.clone();
        stripped.pre = Prerelease::EMPTY;
        return stripped;
    }
    version.clone()
}

/// Release tag for a package version (`name@version`)
pub fn release_tag(name: &str, version: &Version) -> String {
    format!("{}@{}", name, strip_detached(version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_release_type_from_str() {
        assert_eq!(ReleaseType::from_str("major").unwrap(), ReleaseType::Major);
        assert_eq!(ReleaseType::from_str("MINOR").unwrap(), ReleaseType::Minor);
        assert_eq!(ReleaseType::from_str("patch").unwrap(), ReleaseType::Patch);
        assert!(ReleaseType::from_str("prerelease").is_err());
    }

    #[test]
    fn test_release_type_ordering() {
        assert!(ReleaseType::Patch < ReleaseType::Minor);
        assert!(ReleaseType::Minor < ReleaseType::Major);
        assert_eq!(
            ReleaseType::Patch.max(ReleaseType::Major),
            ReleaseType::Major
        );
    }

    #[test]
    fn test_bump() {
        assert_eq!(ReleaseType::Patch.bump(&v("1.2.3")), v("1.2.4"));
        assert_eq!(ReleaseType::Minor.bump(&v("1.2.3")), v("1.3.0"));
        assert_eq!(ReleaseType::Major.bump(&v("1.2.3")), v("2.0.0"));
    }

    #[test]
    fn test_bump_graduates_prerelease() {
        assert_eq!(ReleaseType::Patch.bump(&v("1.2.3-beta.1")), v("1.2.3"));
        assert_eq!(ReleaseType::Minor.bump(&v("1.3.0-rc.1")), v("1.3.0"));
        assert_eq!(ReleaseType::Minor.bump(&v("1.3.1-rc.1")), v("1.4.0"));
        assert_eq!(ReleaseType::Major.bump(&v("2.0.0-alpha")), v("2.0.0"));
    }

    #[test]
    fn test_bump_saturates() {
        let max = u64::MAX;
        assert_eq!(
            ReleaseType::Major.bump(&Version::new(max, 0, 0)),
            Version::new(max, 0, 0)
        );
        assert_eq!(
            ReleaseType::Patch.bump(&Version::new(1, 2, max)),
            Version::new(1, 2, max)
        );
    }

    #[test]
    fn test_dependency_kind_filter() {
        assert_eq!(DependencyKind::filter(true).len(), 3);
        assert_eq!(
            DependencyKind::filter(false),
            vec![
                DependencyKind::Dependencies,
                DependencyKind::OptionalDependencies
            ]
        );
    }

    #[test]
    fn test_release_tag_strips_detached() {
        assert_eq!(release_tag("pkg", &v("1.2.0-detached")), "pkg@1.2.0");
        assert_eq!(release_tag("@s/pkg", &v("1.2.0")), "@s/pkg@1.2.0");
        assert_eq!(release_tag("pkg", &v("1.2.0-beta.1")), "pkg@1.2.0-beta.1");
    }
}
