//! npm semver range expressions
//!
//! `semver::VersionReq` follows Cargo's grammar, which has no `||` unions,
//! hyphen ranges or npm's x-range rules. This module desugars npm range
//! syntax into comparator sets over `semver::Version`:
//!
//! - `^1.2.3` → `>=1.2.3 <2.0.0-0`
//! - `~1.2.3` → `>=1.2.3 <1.3.0-0`
//! - `1.2.x`  → `>=1.2.0 <1.3.0-0`
//! - `1.2.3 - 2.3` → `>=1.2.3 <2.4.0-0`
//! - `a || b` → one comparator set per alternative

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::RangeError;

/// Partial version: `1`, `1.2`, `1.2.x`, `*`, `v1.2.3-beta.1`
static PARTIAL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^v?(?P<major>0|[1-9]\d*|[xX*])(?:\.(?P<minor>0|[1-9]\d*|[xX*]))?(?:\.(?P<patch>0|[1-9]\d*|[xX*]))?(?:-?(?P<pre>[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+(?P<build>[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .expect("Invalid regex")
});

/// Hyphen range: `1.2.3 - 2.3.4`
static HYPHEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\S+)\s+-\s+(\S+)\s*$").expect("Invalid regex"));

/// Whitespace between an operator and its version: `>= 1.2.3`
static OPERATOR_SPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(~>|>=|<=|>|<|=|~|\^)\s+").expect("Invalid regex"));

/// Largest version component npm accepts (`Number.MAX_SAFE_INTEGER`)
pub const MAX_SAFE_COMPONENT: u64 = (1 << 53) - 1;

/// Whether every numeric component of `version` is within npm's limit
pub fn is_safe_version(version: &Version) -> bool {
    [version.major, version.minor, version.patch]
        .iter()
        .all(|&c| c <= MAX_SAFE_COMPONENT)
}

/// Comparison operator of a primitive comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Op {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// A primitive `<op><version>` bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    /// Check a version against this bound, ignoring build metadata
    pub fn matches(&self, version: &Version) -> bool {
        let ordering = precedence(version, &self.version);
        match self.op {
            Op::Eq => ordering == Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
        }
    }

    /// Upper bounds synthesised by desugaring (`<2.0.0-0`) exclude every
    /// prerelease of the bound and never admit one.
    fn admits_prerelease_of(&self, version: &Version) -> bool {
        if self.version.pre.is_empty() {
            return false;
        }
        if self.op == Op::Lt && self.version.pre.as_str() == "0" {
            return false;
        }
        self.version.major == version.major
            && self.version.minor == version.minor
            && self.version.patch == version.patch
    }
}

impl std::fmt::Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.op.as_str(), self.version)
    }
}

/// Structural classification of a range, used when rewriting it for a new
/// version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeShape {
    /// A single bound, e.g. `1.0.0` or `>=1.0.0`
    ExactPin,
    /// A lower and upper bound, as produced by caret and tilde ranges
    Bounded { low_major: u64, high_major: u64 },
    /// Several alternatives, or a set too irregular to rewrite
    ComplexOr,
}

/// A parsed npm range: a union of comparator sets. An empty set matches
/// any release version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    sets: Vec<Vec<Comparator>>,
}

impl VersionRange {
    /// Parse an npm range expression
    pub fn parse(range: &str) -> Result<Self, RangeError> {
        let sets = range
            .split("||")
            .map(|alternative| parse_set(range, alternative))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: range.trim().to_string(),
            sets,
        })
    }

    /// The expression as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Comparator sets, one per `||` alternative
    pub fn sets(&self) -> &[Vec<Comparator>] {
        &self.sets
    }

    /// Whether `version` falls inside this range
    pub fn satisfies(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set_matches(set, version))
    }

    /// Classify the range for rewriting
    pub fn shape(&self) -> RangeShape {
        match self.sets.as_slice() {
            [set] => match set.as_slice() {
                [] | [_] => RangeShape::ExactPin,
                [low, high, ..] => RangeShape::Bounded {
                    low_major: low.version.major,
                    high_major: high.version.major,
                },
            },
            _ => RangeShape::ComplexOr,
        }
    }
}

impl std::fmt::Display for VersionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for VersionRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whether `version` satisfies the npm range `range`. Unparseable ranges
/// satisfy nothing.
pub fn satisfies(version: &Version, range: &str) -> bool {
    VersionRange::parse(range)
        .map(|parsed| parsed.satisfies(version))
        .unwrap_or(false)
}

/// Outcome of rewriting a declared range for a dependency's new version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRange {
    /// The rewritten range
    pub range: String,
    /// Set when the range was too complex to rewrite faithfully
    pub warning: Option<String>,
}

/// Rewrite `range` so it tracks `new_version`, keeping its strictness.
///
/// Pins stay pins, caret-shaped ranges become `^new`, tilde-shaped ranges
/// become `~new`. Unions and unparseable ranges fall back to `^new` with a
/// warning naming `package`.
pub fn track_new_version(package: &str, range: &str, new_version: &Version) -> TrackedRange {
    let shape = VersionRange::parse(range)
        .map(|parsed| parsed.shape())
        .unwrap_or(RangeShape::ComplexOr);

    match shape {
        RangeShape::ExactPin => TrackedRange {
            range: new_version.to_string(),
            warning: None,
        },
        RangeShape::Bounded {
            low_major,
            high_major,
        } if low_major != high_major => TrackedRange {
            range: format!("^{}", new_version),
            warning: None,
        },
        RangeShape::Bounded { .. } => TrackedRange {
            range: format!("~{}", new_version),
            warning: None,
        },
        RangeShape::ComplexOr => {
            let message = format!(
                "cannot rewrite range '{}' of dependency '{}' precisely, using '^{}'",
                range, package, new_version
            );
            warn!(package, range, %new_version, "range too complex to track, falling back to caret");
            TrackedRange {
                range: format!("^{}", new_version),
                warning: Some(message),
            }
        }
    }
}

fn set_matches(set: &[Comparator], version: &Version) -> bool {
    if !set.iter().all(|comparator| comparator.matches(version)) {
        return false;
    }
    if version.pre.is_empty() {
        return true;
    }
    set.iter()
        .any(|comparator| comparator.admits_prerelease_of(version))
}

fn precedence(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.pre.cmp(&b.pre))
}

/// A version with missing or wildcard components
#[derive(Debug, Clone)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(range: &str, text: &str) -> Result<Self, RangeError> {
        let invalid = |message: String| RangeError::Invalid {
            range: range.to_string(),
            message,
        };

        let caps = PARTIAL_REGEX
            .captures(text)
            .ok_or_else(|| invalid(format!("'{}' is not a version", text)))?;

        let component = |name: &str| -> Result<Option<u64>, RangeError> {
            match caps.name(name).map(|m| m.as_str()) {
                None | Some("x") | Some("X") | Some("*") => Ok(None),
                Some(digits) => match digits.parse::<u64>() {
                    Ok(value) if value <= MAX_SAFE_COMPONENT => Ok(Some(value)),
                    Ok(_) => Err(invalid(format!(
                        "{} component of '{}' exceeds {}",
                        name, text, MAX_SAFE_COMPONENT
                    ))),
                    Err(e) => Err(invalid(e.to_string())),
                },
            }
        };

        let major = component("major")?;
        let minor = major.and(component("minor")?);
        let patch = minor.and(component("patch")?);

        let pre = match (patch, caps.name("pre")) {
            (Some(_), Some(pre)) => {
                Prerelease::new(pre.as_str()).map_err(|e| invalid(e.to_string()))?
            }
            _ => Prerelease::EMPTY,
        };

        Ok(Self {
            major,
            minor,
            patch,
            pre,
        })
    }

    fn full(&self) -> Option<Version> {
        Some(Version {
            major: self.major?,
            minor: self.minor?,
            patch: self.patch?,
            pre: self.pre.clone(),
            build: BuildMetadata::EMPTY,
        })
    }

    /// The lowest version the partial covers
    fn floor(&self) -> Version {
        Version {
            major: self.major.unwrap_or(0),
            minor: self.minor.unwrap_or(0),
            patch: self.patch.unwrap_or(0),
            pre: self.pre.clone(),
            build: BuildMetadata::EMPTY,
        }
    }

    /// The exclusive ceiling of a partial missing its minor or patch
    fn ceiling(&self) -> Option<Version> {
        match (self.major, self.minor, self.patch) {
            (Some(major), None, _) => Some(release_floor(major + 1, 0, 0)),
            (Some(major), Some(minor), None) => Some(release_floor(major, minor + 1, 0)),
            _ => None,
        }
    }
}

fn version(major: u64, minor: u64, patch: u64) -> Version {
    Version::new(major, minor, patch)
}

/// `major.minor.patch-0`, the lowest version of that release line
fn release_floor(major: u64, minor: u64, patch: u64) -> Version {
    let mut floor = version(major, minor, patch);
    floor.pre = Prerelease::new("0").expect("0 is a valid prerelease");
    floor
}

fn parse_set(range: &str, alternative: &str) -> Result<Vec<Comparator>, RangeError> {
    if let Some(caps) = HYPHEN_REGEX.captures(alternative) {
        let from = Partial::parse(range, &caps[1])?;
        let to = Partial::parse(range, &caps[2])?;
        return Ok(hyphen(&from, &to));
    }

    let normalized = OPERATOR_SPACE_REGEX.replace_all(alternative.trim(), "$1");
    let mut comparators = Vec::new();
    for token in normalized.split_whitespace() {
        comparators.extend(parse_token(range, token)?);
    }
    Ok(comparators)
}

fn parse_token(range: &str, token: &str) -> Result<Vec<Comparator>, RangeError> {
    const OPERATORS: [&str; 8] = ["~>", ">=", "<=", ">", "<", "=", "~", "^"];

    let (operator, rest) = OPERATORS
        .iter()
        .find_map(|op| token.strip_prefix(op).map(|rest| (*op, rest)))
        .unwrap_or(("", token));

    let partial = Partial::parse(range, rest)?;
    Ok(match operator {
        "^" => caret(&partial),
        "~" | "~>" => tilde(&partial),
        ">" => primitive(Op::Gt, &partial),
        ">=" => primitive(Op::Gte, &partial),
        "<" => primitive(Op::Lt, &partial),
        "<=" => primitive(Op::Lte, &partial),
        _ => x_range(&partial),
    })
}

fn x_range(partial: &Partial) -> Vec<Comparator> {
    match (partial.full(), partial.major, partial.ceiling()) {
        (Some(full), _, _) => vec![Comparator::new(Op::Eq, full)],
        (None, None, _) => Vec::new(),
        (None, Some(_), Some(ceiling)) => vec![
            Comparator::new(Op::Gte, partial.floor()),
            Comparator::new(Op::Lt, ceiling),
        ],
        (None, Some(_), None) => Vec::new(),
    }
}

fn caret(partial: &Partial) -> Vec<Comparator> {
    let Some(major) = partial.major else {
        return Vec::new();
    };
    let upper = match (partial.minor, partial.patch) {
        (None, _) => release_floor(major + 1, 0, 0),
        (Some(minor), None) if major == 0 => release_floor(0, minor + 1, 0),
        (Some(_), None) => release_floor(major + 1, 0, 0),
        (Some(_), Some(_)) if major > 0 => release_floor(major + 1, 0, 0),
        (Some(minor), Some(_)) if minor > 0 => release_floor(0, minor + 1, 0),
        (Some(_), Some(patch)) => release_floor(0, 0, patch + 1),
    };
    vec![
        Comparator::new(Op::Gte, partial.floor()),
        Comparator::new(Op::Lt, upper),
    ]
}

fn tilde(partial: &Partial) -> Vec<Comparator> {
    let Some(major) = partial.major else {
        return Vec::new();
    };
    let upper = match partial.minor {
        None => release_floor(major + 1, 0, 0),
        Some(minor) => release_floor(major, minor + 1, 0),
    };
    vec![
        Comparator::new(Op::Gte, partial.floor()),
        Comparator::new(Op::Lt, upper),
    ]
}

fn primitive(op: Op, partial: &Partial) -> Vec<Comparator> {
    if let Some(full) = partial.full() {
        return vec![Comparator::new(op, full)];
    }
    let Some(major) = partial.major else {
        // `>*` and `<*` admit nothing, `>=*` and `<=*` admit everything
        return match op {
            Op::Gt | Op::Lt => vec![Comparator::new(Op::Lt, release_floor(0, 0, 0))],
            _ => Vec::new(),
        };
    };
    let next = match partial.minor {
        None => version(major + 1, 0, 0),
        Some(minor) => version(major, minor + 1, 0),
    };
    match op {
        Op::Gt => vec![Comparator::new(Op::Gte, next)],
        Op::Gte => vec![Comparator::new(Op::Gte, partial.floor())],
        Op::Lt => vec![Comparator::new(
            Op::Lt,
            release_floor(major, partial.minor.unwrap_or(0), 0),
        )],
        Op::Lte => vec![Comparator::new(
            Op::Lt,
            release_floor(next.major, next.minor, next.patch),
        )],
        Op::Eq => x_range(partial),
    }
}

fn hyphen(from: &Partial, to: &Partial) -> Vec<Comparator> {
    let mut comparators = Vec::new();
    if from.major.is_some() {
        comparators.push(Comparator::new(Op::Gte, from.floor()));
    }
    if let Some(full) = to.full() {
        comparators.push(Comparator::new(Op::Lte, full));
    } else if let Some(ceiling) = to.ceiling() {
        comparators.push(Comparator::new(Op::Lt, ceiling));
    }
    comparators
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn rendered(range: &str) -> Vec<String> {
        VersionRange::parse(range)
            .unwrap()
            .sets()
            .iter()
            .map(|set| {
                set.iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    #[test]
    fn test_desugar_caret_and_tilde() {
        assert_eq!(rendered("^1.2.3"), vec![">=1.2.3 <2.0.0-0"]);
        assert_eq!(rendered("^0.2.3"), vec![">=0.2.3 <0.3.0-0"]);
        assert_eq!(rendered("^0.0.3"), vec![">=0.0.3 <0.0.4-0"]);
        assert_eq!(rendered("~1.2.3"), vec![">=1.2.3 <1.3.0-0"]);
        assert_eq!(rendered("~1"), vec![">=1.0.0 <2.0.0-0"]);
    }

    #[test]
    fn test_desugar_x_ranges_and_hyphens() {
        assert_eq!(rendered("1.2.x"), vec![">=1.2.0 <1.3.0-0"]);
        assert_eq!(rendered("1"), vec![">=1.0.0 <2.0.0-0"]);
        assert_eq!(rendered("*"), vec![""]);
        assert_eq!(rendered("1.2.3 - 2.3"), vec![">=1.2.3 <2.4.0-0"]);
        assert_eq!(rendered("1.2 - 2.3.4"), vec![">=1.2.0 <=2.3.4"]);
        assert_eq!(rendered(">= 1.0.0 < 2"), vec![">=1.0.0 <2.0.0-0"]);
    }

    #[test]
    fn test_satisfies() {
        assert!(satisfies(&v("1.4.0"), "^1.2.3"));
        assert!(!satisfies(&v("2.0.0"), "^1.2.3"));
        assert!(satisfies(&v("1.2.9"), "~1.2.3"));
        assert!(!satisfies(&v("1.3.0"), "~1.2.3"));
        assert!(satisfies(&v("3.1.0"), ">=1.0.0 <2.0.0 || >=3.0.0 <4.0.0"));
        assert!(satisfies(&v("5.0.0"), "*"));
        assert!(satisfies(&v("1.0.0"), "1.0.0"));
        assert!(!satisfies(&v("1.0.1"), "1.0.0"));
        assert!(!satisfies(&v("1.0.0"), "workspace:*"));
    }

    #[test]
    fn test_satisfies_prerelease_rule() {
        assert!(satisfies(&v("1.2.3-beta.2"), "^1.2.3-beta.1"));
        assert!(!satisfies(&v("1.2.4-beta.1"), "^1.2.3-beta.1"));
        assert!(!satisfies(&v("2.0.0-alpha"), "^1.0.0"));
        assert!(!satisfies(&v("1.5.0-alpha"), "*"));
    }

    #[test]
    fn test_shape() {
        let shape = |r: &str| VersionRange::parse(r).unwrap().shape();
        assert_eq!(shape("1.0.0"), RangeShape::ExactPin);
        assert_eq!(
            shape("^1.0.0"),
            RangeShape::Bounded {
                low_major: 1,
                high_major: 2
            }
        );
        assert_eq!(
            shape("~1.0.0"),
            RangeShape::Bounded {
                low_major: 1,
                high_major: 1
            }
        );
        assert_eq!(shape("^1.0.0 || ^2.0.0"), RangeShape::ComplexOr);
    }

    #[test]
    fn test_track_new_version() {
        assert_eq!(track_new_version("a", "^1.0.0", &v("2.0.0")).range, "^2.0.0");
        assert_eq!(track_new_version("a", "~1.0.0", &v("1.1.0")).range, "~1.1.0");
        assert_eq!(track_new_version("a", "1.0.0", &v("1.0.1")).range, "1.0.1");

        let pin = track_new_version("a", "1.0.0", &v("1.0.1"));
        assert!(pin.warning.is_none());
    }

    #[test]
    fn test_track_complex_range_warns_once() {
        let tracked = track_new_version("a", ">=1.0.0 <2.0.0 || >=3.0.0 <4.0.0", &v("5.0.0"));
        assert_eq!(tracked.range, "^5.0.0");
        let warning = tracked.warning.unwrap();
        assert!(warning.contains("'a'"));
        assert!(warning.contains(">=1.0.0 <2.0.0 || >=3.0.0 <4.0.0"));
    }

    #[test]
    fn test_oversized_components_rejected() {
        for range in [
            "^18446744073709551615.0.0",
            "~1.18446744073709551615",
            "1.18446744073709551615",
            ">9007199254740992",
            "1.0.0 - 9007199254740992.x",
        ] {
            assert!(
                matches!(VersionRange::parse(range), Err(RangeError::Invalid { .. })),
                "{} should be rejected",
                range
            );
            assert!(!satisfies(&v("1.0.0"), range));
        }

        let limit = format!("^{}.0.0", MAX_SAFE_COMPONENT);
        assert!(VersionRange::parse(&limit).is_ok());
        assert!(is_safe_version(&v("9007199254740991.0.0")));
        assert!(!is_safe_version(&v("1.9007199254740992.0")));
    }

    #[test]
    fn test_invalid_range() {
        assert!(VersionRange::parse("not a range").is_err());
        assert!(VersionRange::parse("workspace:^1.0.0").is_err());
    }
}
