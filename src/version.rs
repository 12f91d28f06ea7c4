//! Version interval arithmetic shared by the specifier compiler and the resolver
//!
//! Every NPM version specifier eventually compiles down to a set of [`Range`]s
//! between two [`Bound`]s. Working on ranges instead of specifier syntax makes
//! intersections (merging constraints while building the dependency tree) and
//! unions (simplifying `||` alternatives) straightforward, and gives a single
//! place where the translation to Python version specifiers happens.
//!
//! # Examples
//!
//! ```
//! use npym::version::{Bound, Range, Ver};
//! use semver::Version as SemVersion;
//!
//! let range = Range::new(
//!     Bound::inclusive(Ver::from(SemVersion::new(1, 0, 0))),
//!     Bound::exclusive(Ver::from(SemVersion::new(2, 0, 0))),
//! );
//! assert!(range.contains(&SemVersion::new(1, 5, 0)));
//! assert!(!range.contains(&SemVersion::new(2, 0, 0)));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version as SemVersion;

use crate::{Error, Result};

/// A version or one of the two open-interval sentinels.
///
/// `Min` sorts below every concrete version and `Max` above, which lets
/// open-ended intervals like `>=1.0.0` be expressed as `[1.0.0, Max]` without
/// a separate "unbounded" representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ver {
    Min,
    Version(SemVersion),
    Max,
}

impl From<SemVersion> for Ver {
    fn from(version: SemVersion) -> Self {
        Ver::Version(version)
    }
}

impl Ord for Ver {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Ver::Min, Ver::Min) | (Ver::Max, Ver::Max) => Ordering::Equal,
            (Ver::Min, _) | (_, Ver::Max) => Ordering::Less,
            (Ver::Max, _) | (_, Ver::Min) => Ordering::Greater,
            // Build metadata does not participate in precedence, same as the
            // SemVer spec and NPM's comparisons.
            (Ver::Version(a), Ver::Version(b)) => a.cmp_precedence(b),
        }
    }
}

impl PartialOrd for Ver {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Ver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ver::Min => write!(f, "MIN_VER"),
            Ver::Max => write!(f, "MAX_VER"),
            Ver::Version(v) => write!(f, "{}", v),
        }
    }
}

/// One end of a range: a version plus an inclusive/exclusive flag.
///
/// Bounds are totally ordered so that range overlap and intersection reduce to
/// `min`/`max` on bounds. At an equal version, the inclusive bound sorts first:
/// as a lower bound it admits more, and as an upper bound `min()` correctly
/// picks it as the narrower end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bound {
    pub version: Ver,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(version: Ver) -> Self {
        Self {
            version,
            inclusive: true,
        }
    }

    pub fn exclusive(version: Ver) -> Self {
        Self {
            version,
            inclusive: false,
        }
    }

    /// `self` as a lower bound admits `version`.
    pub fn admits_from_below(&self, version: &SemVersion) -> bool {
        match &self.version {
            Ver::Min => true,
            Ver::Max => false,
            Ver::Version(b) => {
                let ord = b.cmp_precedence(version);
                ord == Ordering::Less || (self.inclusive && ord == Ordering::Equal)
            }
        }
    }

    /// `self` as an upper bound admits `version`.
    pub fn admits_from_above(&self, version: &SemVersion) -> bool {
        match &self.version {
            Ver::Min => false,
            Ver::Max => true,
            Ver::Version(b) => {
                let ord = b.cmp_precedence(version);
                ord == Ordering::Greater || (self.inclusive && ord == Ordering::Equal)
            }
        }
    }

    /// Convert from SemVer conventions to Python conventions.
    pub fn as_py_bound(&self) -> Result<PyBound> {
        Ok(match &self.version {
            Ver::Min => PyBound {
                version: PyVer::Min,
                inclusive: self.inclusive,
            },
            Ver::Max => PyBound {
                version: PyVer::Max,
                inclusive: self.inclusive,
            },
            Ver::Version(v) => PyBound {
                version: PyVer::Version(version_sem_to_py_version(v)?),
                inclusive: self.inclusive,
            },
        })
    }
}

impl Ord for Bound {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.version.cmp(&other.version) {
            Ordering::Equal => match (self.inclusive, other.inclusive) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => Ordering::Equal,
            },
            ord => ord,
        }
    }
}

impl PartialOrd for Bound {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A contiguous interval between two bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Range {
    pub min: Bound,
    pub max: Bound,
}

impl Default for Range {
    fn default() -> Self {
        Self {
            min: Bound::inclusive(Ver::Min),
            max: Bound::inclusive(Ver::Max),
        }
    }
}

impl Range {
    pub fn new(min: Bound, max: Bound) -> Self {
        Self { min, max }
    }

    /// Check if a version is contained in this range.
    ///
    /// Prereleases are only admitted when one of the bounds is itself a
    /// prerelease on the same `(major, minor, patch)` triple. This mirrors
    /// NPM: `^1.0.0` never pulls in `1.5.0-beta`, while `~1.2.3-beta.2` does
    /// admit `1.2.3-beta.4`.
    pub fn contains(&self, version: &SemVersion) -> bool {
        if !version.pre.is_empty() && !self.admits_prerelease_at(version) {
            return false;
        }

        self.min.admits_from_below(version) && self.max.admits_from_above(version)
    }

    fn admits_prerelease_at(&self, version: &SemVersion) -> bool {
        [&self.min, &self.max].into_iter().any(|b| match &b.version {
            Ver::Version(v) => {
                !v.pre.is_empty()
                    && v.major == version.major
                    && v.minor == version.minor
                    && v.patch == version.patch
            }
            _ => false,
        })
    }

    pub fn as_py_range(&self) -> Result<PyRange> {
        Ok(PyRange {
            min: self.min.as_py_bound()?,
            max: self.max.as_py_bound()?,
        })
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_range_bounds(
            f,
            sentinel_kind(&self.min.version),
            sentinel_kind(&self.max.version),
            self.min.inclusive,
            self.max.inclusive,
            self.min.version == self.max.version,
            &self.min.version,
            &self.max.version,
        )
    }
}

/// A Python version or a sentinel, the PEP 440 mirror of [`Ver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PyVer {
    Min,
    Version(pep440_rs::Version),
    Max,
}

impl fmt::Display for PyVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PyVer::Min => write!(f, "MIN_VER"),
            PyVer::Max => write!(f, "MAX_VER"),
            PyVer::Version(v) => write!(f, "{}", v),
        }
    }
}

/// Same as [`Bound`] but following Python conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyBound {
    pub version: PyVer,
    pub inclusive: bool,
}

/// Same as [`Range`] but following Python conventions. Its `Display` output is
/// a valid PEP 440 specifier set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyRange {
    pub min: PyBound,
    pub max: PyBound,
}

impl fmt::Display for PyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_range_bounds(
            f,
            py_sentinel_kind(&self.min.version),
            py_sentinel_kind(&self.max.version),
            self.min.inclusive,
            self.max.inclusive,
            self.min.version == self.max.version,
            &self.min.version,
            &self.max.version,
        )
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum SentinelKind {
    Min,
    Max,
}

fn sentinel_kind(version: &Ver) -> Option<SentinelKind> {
    match version {
        Ver::Min => Some(SentinelKind::Min),
        Ver::Max => Some(SentinelKind::Max),
        Ver::Version(_) => None,
    }
}

fn py_sentinel_kind(version: &PyVer) -> Option<SentinelKind> {
    match version {
        PyVer::Min => Some(SentinelKind::Min),
        PyVer::Max => Some(SentinelKind::Max),
        PyVer::Version(_) => None,
    }
}

/// The rendering shared by [`Range`] and [`PyRange`]: dump the two bounds as
/// a comma-joined specifier, collapsing the special cases (both sentinels,
/// single sentinel, exact version) to their short forms.
#[allow(clippy::too_many_arguments)]
fn fmt_range_bounds(
    f: &mut fmt::Formatter<'_>,
    min_sentinel: Option<SentinelKind>,
    max_sentinel: Option<SentinelKind>,
    min_inclusive: bool,
    max_inclusive: bool,
    versions_equal: bool,
    min_version: &dyn fmt::Display,
    max_version: &dyn fmt::Display,
) -> fmt::Result {
    match (min_sentinel, max_sentinel) {
        // [MIN, MAX] admits everything; [MIN, MIN] and [MAX, MAX] admit
        // nothing.
        (Some(SentinelKind::Min), Some(SentinelKind::Max)) => write!(f, ">=0.0.0"),
        (Some(_), Some(_)) => write!(f, "<0.0.0"),
        (Some(_), None) => {
            if max_inclusive {
                write!(f, "<={}", max_version)
            } else {
                write!(f, "<{}", max_version)
            }
        }
        (None, Some(_)) => {
            if min_inclusive {
                write!(f, ">={}", min_version)
            } else {
                write!(f, ">{}", min_version)
            }
        }
        (None, None) => {
            if min_inclusive && max_inclusive && versions_equal {
                return write!(f, "=={}", min_version);
            }

            match (min_inclusive, max_inclusive) {
                (true, true) => write!(f, ">={},<={}", min_version, max_version),
                (true, false) => write!(f, ">={},<{}", min_version, max_version),
                (false, true) => write!(f, ">{},<={}", min_version, max_version),
                (false, false) => write!(f, ">{},<{}", min_version, max_version),
            }
        }
    }
}

/// Checks if two ranges are overlapping.
pub fn is_overlapping(a: &Range, b: &Range) -> bool {
    a.min <= b.max && b.min <= a.max
}

fn intersect_two(a: &Range, b: &Range) -> Vec<Range> {
    if !is_overlapping(a, b) {
        return Vec::new();
    }

    vec![Range {
        min: a.min.clone().max(b.min.clone()),
        max: a.max.clone().min(b.max.clone()),
    }]
}

/// Computes the intersection of all the provided ranges at once.
pub fn intersect_ranges(ranges: &[Range]) -> Vec<Range> {
    let Some(first) = ranges.first() else {
        return Vec::new();
    };

    let mut out = vec![first.clone()];

    for r in ranges {
        out = out.iter().flat_map(|o| intersect_two(o, r)).collect();
    }

    out
}

fn union_two(a: &Range, b: &Range) -> Vec<Range> {
    if is_overlapping(a, b) {
        return vec![Range {
            min: a.min.clone().min(b.min.clone()),
            max: a.max.clone().max(b.max.clone()),
        }];
    }

    vec![a.clone(), b.clone()]
}

/// Folds all the provided ranges into a union, fusing overlapping pairs.
pub fn union_ranges(ranges: &[Range]) -> Vec<Range> {
    let Some(first) = ranges.first() else {
        return Vec::new();
    };

    let mut out = vec![first.clone()];

    for r in ranges {
        out = out.iter().flat_map(|o| union_two(o, r)).collect();
    }

    out
}

/// Converts a SemVer version into a PEP 440 one: the finalized numeric triple
/// with prerelease and build metadata concatenated literally, re-parsed
/// through the Python version grammar. SemVer prerelease tags that PEP 440
/// has no spelling for (e.g. `1.0.0-security`) fail the conversion.
pub fn version_sem_to_py_version(version: &SemVersion) -> Result<pep440_rs::Version> {
    let mut raw = format!("{}.{}.{}", version.major, version.minor, version.patch);
    raw.push_str(version.pre.as_str());
    raw.push_str(version.build.as_str());

    pep440_rs::Version::from_str(&raw)
        .map_err(|e| Error::VersionConversion(format!("{} -> {}: {}", version, raw, e)))
}

/// String-in, string-out convenience over [`version_sem_to_py_version`],
/// normalizing through the PEP 440 display form.
pub fn version_sem_to_py(version: &str) -> Result<String> {
    let sem = SemVersion::parse(version)?;
    Ok(version_sem_to_py_version(&sem)?.to_string())
}
