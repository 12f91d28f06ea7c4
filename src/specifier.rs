//! NPM version specifier parsing
//!
//! Implements the `node-semver` range grammar: a specifier is a `||`-separated
//! disjunction of ranges, each range being either a hyphen pair
//! (`1.2.3 - 2.3.4`) or a space-separated conjunction of simples (plain
//! partials, comparator primitives, tildes and carets). Every simple compiles
//! to a [`Range`]; conjunctions intersect, alternatives accumulate.
//!
//! Anything that is not part of that grammar (dist-tags like `latest`,
//! tarball URLs, `file:` references) is rejected with a parse error.
//!
//! # Examples
//!
//! ```
//! use npym::specifier::{parse_spec, sem_range_to_py_range};
//!
//! let ranges = parse_spec("^1.2.3").unwrap();
//! assert_eq!(ranges.len(), 1);
//! assert_eq!(sem_range_to_py_range("^1.2.3").unwrap(), ">=1.2.3,<2.0.0");
//! ```

use semver::{BuildMetadata, Prerelease, Version as SemVersion};

use crate::version::{intersect_ranges, union_ranges, Bound, Range, Ver};
use crate::{Error, Result};

/// A single component of a partial version: a number or a wildcard
/// (`x`, `X` or `*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPart {
    Wildcard,
    Num(u64),
}

impl VersionPart {
    fn num(self) -> Option<u64> {
        match self {
            VersionPart::Num(n) => Some(n),
            VersionPart::Wildcard => None,
        }
    }
}

/// A potentially incomplete version number, like `1.x` or `1.1.1`.
///
/// This is the unit the SemVer range grammar builds everything from: the
/// modifiers (`~`, `^`, comparators, hyphens) each have their own way of
/// widening a partial into a concrete [`Range`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partial {
    pub major: VersionPart,
    pub minor: Option<VersionPart>,
    pub patch: Option<VersionPart>,
    pub prerelease: Prerelease,
    pub build: BuildMetadata,
}

fn sem(major: u64, minor: u64, patch: u64, pre: &Prerelease) -> SemVersion {
    let mut version = SemVersion::new(major, minor, patch);
    version.pre = pre.clone();
    version
}

/// The `-0` prerelease marker used on exclusive upper bounds so that e.g.
/// `^1.2.3` excludes every `2.0.0-*` prerelease as well as `2.0.0` itself.
fn pre_zero() -> Prerelease {
    Prerelease::new("0").unwrap()
}

impl Partial {
    /// The range implied by the first wildcard-or-missing component, shared
    /// by the no-op, tilde and equality forms. `None` when fully concrete.
    fn range_x(&self) -> Option<Range> {
        let major = match self.major {
            VersionPart::Wildcard => {
                return Some(Range::default());
            }
            VersionPart::Num(n) => n,
        };

        let minor = match self.minor.and_then(VersionPart::num) {
            None => {
                let min = if major == 0 {
                    Bound::inclusive(Ver::Min)
                } else {
                    Bound::inclusive(Ver::from(SemVersion::new(major, 0, 0)))
                };

                return Some(Range::new(
                    min,
                    Bound::exclusive(Ver::from(sem(major + 1, 0, 0, &pre_zero()))),
                ));
            }
            Some(n) => n,
        };

        if self.patch.and_then(VersionPart::num).is_none() {
            return Some(Range::new(
                Bound::inclusive(Ver::from(SemVersion::new(major, minor, 0))),
                Bound::exclusive(Ver::from(sem(major, minor + 1, 0, &pre_zero()))),
            ));
        }

        None
    }

    fn concrete(&self) -> SemVersion {
        // Only called on fully concrete partials, after range_x() declined.
        sem(
            self.major.num().unwrap_or(0),
            self.minor.and_then(VersionPart::num).unwrap_or(0),
            self.patch.and_then(VersionPart::num).unwrap_or(0),
            &self.prerelease,
        )
    }

    /// The range you get without any modifier.
    pub fn as_range(&self) -> Range {
        if let Some(r) = self.range_x() {
            return r;
        }

        let v = self.concrete();
        Range::new(
            Bound::inclusive(Ver::from(v.clone())),
            Bound::inclusive(Ver::from(v)),
        )
    }

    /// Apply a comparator to this partial.
    pub fn primitive(&self, comparator: Comparator) -> Range {
        match comparator {
            Comparator::Ge => self.primitive_ge(),
            Comparator::Gt => self.primitive_gt(),
            Comparator::Le => self.primitive_le(),
            Comparator::Lt => self.primitive_lt(),
            Comparator::Eq => self.as_range(),
        }
    }

    fn primitive_ge(&self) -> Range {
        let major = match self.major {
            VersionPart::Wildcard => return Range::default(),
            VersionPart::Num(n) => n,
        };

        let minor = match self.minor.and_then(VersionPart::num) {
            None => {
                return Range::new(
                    Bound::inclusive(Ver::from(SemVersion::new(major, 0, 0))),
                    Bound::inclusive(Ver::Max),
                )
            }
            Some(n) => n,
        };

        if self.patch.and_then(VersionPart::num).is_none() {
            return Range::new(
                Bound::inclusive(Ver::from(SemVersion::new(major, minor, 0))),
                Bound::inclusive(Ver::Max),
            );
        }

        Range::new(
            Bound::inclusive(Ver::from(self.concrete())),
            Bound::inclusive(Ver::Max),
        )
    }

    fn primitive_gt(&self) -> Range {
        let major = match self.major {
            VersionPart::Wildcard => {
                // ">*" matches nothing.
                return Range::new(Bound::inclusive(Ver::Max), Bound::inclusive(Ver::Max));
            }
            VersionPart::Num(n) => n,
        };

        let minor = match self.minor.and_then(VersionPart::num) {
            None => {
                return Range::new(
                    Bound::inclusive(Ver::from(SemVersion::new(major + 1, 0, 0))),
                    Bound::inclusive(Ver::Max),
                )
            }
            Some(n) => n,
        };

        if self.patch.and_then(VersionPart::num).is_none() {
            return Range::new(
                Bound::inclusive(Ver::from(SemVersion::new(major, minor + 1, 0))),
                Bound::inclusive(Ver::Max),
            );
        }

        Range::new(
            Bound::exclusive(Ver::from(self.concrete())),
            Bound::inclusive(Ver::Max),
        )
    }

    fn primitive_le(&self) -> Range {
        let major = match self.major {
            VersionPart::Wildcard => return Range::default(),
            VersionPart::Num(n) => n,
        };

        let minor = match self.minor.and_then(VersionPart::num) {
            None => {
                return Range::new(
                    Bound::inclusive(Ver::Min),
                    Bound::exclusive(Ver::from(sem(major + 1, 0, 0, &pre_zero()))),
                )
            }
            Some(n) => n,
        };

        if self.patch.and_then(VersionPart::num).is_none() {
            return Range::new(
                Bound::inclusive(Ver::Min),
                Bound::exclusive(Ver::from(sem(major, minor + 1, 0, &pre_zero()))),
            );
        }

        Range::new(
            Bound::inclusive(Ver::Min),
            Bound::inclusive(Ver::from(self.concrete())),
        )
    }

    fn primitive_lt(&self) -> Range {
        let major = match self.major {
            VersionPart::Wildcard => {
                // "<*" matches nothing.
                return Range::new(Bound::inclusive(Ver::Min), Bound::inclusive(Ver::Min));
            }
            VersionPart::Num(n) => n,
        };

        let minor = match self.minor.and_then(VersionPart::num) {
            None => {
                return Range::new(
                    Bound::inclusive(Ver::Min),
                    Bound::exclusive(Ver::from(sem(major, 0, 0, &pre_zero()))),
                )
            }
            Some(n) => n,
        };

        if self.patch.and_then(VersionPart::num).is_none() {
            return Range::new(
                Bound::inclusive(Ver::Min),
                Bound::exclusive(Ver::from(sem(major, minor, 0, &pre_zero()))),
            );
        }

        Range::new(
            Bound::inclusive(Ver::Min),
            Bound::exclusive(Ver::from(self.concrete())),
        )
    }

    /// Apply the tilde logic: patch-level changes within the given minor.
    pub fn tilde(&self) -> Range {
        if let Some(r) = self.range_x() {
            return r;
        }

        let major = self.major.num().unwrap_or(0);
        let minor = self.minor.and_then(VersionPart::num).unwrap_or(0);

        Range::new(
            Bound::inclusive(Ver::from(self.concrete())),
            Bound::exclusive(Ver::from(sem(major, minor + 1, 0, &pre_zero()))),
        )
    }

    /// Apply the caret logic: changes that keep the left-most non-zero
    /// component.
    pub fn caret(&self) -> Range {
        let major = match self.major {
            VersionPart::Wildcard => return Range::default(),
            VersionPart::Num(n) => n,
        };

        if major == 0 {
            return self.tilde();
        }

        let minor = self.minor.and_then(VersionPart::num);
        let patch = self.patch.and_then(VersionPart::num);

        if minor.is_none() || patch.is_none() {
            return Range::new(
                Bound::inclusive(Ver::from(SemVersion::new(major, minor.unwrap_or(0), 0))),
                Bound::exclusive(Ver::from(sem(major + 1, 0, 0, &pre_zero()))),
            );
        }

        Range::new(
            Bound::inclusive(Ver::from(self.concrete())),
            Bound::exclusive(Ver::from(sem(major + 1, 0, 0, &pre_zero()))),
        )
    }
}

/// The five comparison operators of the `primitive` grammar rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

fn spec_err(spec: &str) -> Error {
    Error::Spec(spec.to_string())
}

fn parse_num(spec: &str, raw: &str) -> Result<u64> {
    if raw.len() > 1 && raw.starts_with('0') {
        return Err(spec_err(spec));
    }

    raw.parse::<u64>().map_err(|_| spec_err(spec))
}

fn parse_xr(spec: &str, raw: &str) -> Result<VersionPart> {
    match raw {
        "x" | "X" | "*" => Ok(VersionPart::Wildcard),
        _ => Ok(VersionPart::Num(parse_num(spec, raw)?)),
    }
}

/// Parse one `partial` token: `xr[.xr[.xr[-pre][+build]]]`. The qualifier is
/// only legal after three components, per the grammar.
fn parse_partial(spec: &str, token: &str) -> Result<Partial> {
    if token.is_empty() {
        return Err(spec_err(spec));
    }

    let (core, qualifier) = match token.find(['-', '+']) {
        Some(idx) => token.split_at(idx),
        None => (token, ""),
    };

    let components: Vec<&str> = core.split('.').collect();

    if components.is_empty() || components.len() > 3 || components.iter().any(|c| c.is_empty()) {
        return Err(spec_err(spec));
    }

    if !qualifier.is_empty() && components.len() != 3 {
        return Err(spec_err(spec));
    }

    let (prerelease, build) = parse_qualifier(spec, qualifier)?;

    Ok(Partial {
        major: parse_xr(spec, components[0])?,
        minor: components.get(1).map(|c| parse_xr(spec, *c)).transpose()?,
        patch: components.get(2).map(|c| parse_xr(spec, *c)).transpose()?,
        prerelease,
        build,
    })
}

fn parse_qualifier(spec: &str, qualifier: &str) -> Result<(Prerelease, BuildMetadata)> {
    if qualifier.is_empty() {
        return Ok((Prerelease::EMPTY, BuildMetadata::EMPTY));
    }

    let (pre_raw, build_raw) = match qualifier.split_once('+') {
        Some((pre, build)) => (pre, build),
        None => (qualifier, ""),
    };

    let pre_raw = pre_raw.strip_prefix('-').unwrap_or(pre_raw);

    let prerelease = if pre_raw.is_empty() {
        Prerelease::EMPTY
    } else {
        Prerelease::new(pre_raw).map_err(|_| spec_err(spec))?
    };

    let build = if build_raw.is_empty() {
        BuildMetadata::EMPTY
    } else {
        BuildMetadata::new(build_raw).map_err(|_| spec_err(spec))?
    };

    Ok((prerelease, build))
}

fn parse_comparator(token: &str) -> Option<(Comparator, &str)> {
    for (text, op) in [
        (">=", Comparator::Ge),
        ("<=", Comparator::Le),
        (">", Comparator::Gt),
        ("<", Comparator::Lt),
        ("=", Comparator::Eq),
    ] {
        if let Some(rest) = token.strip_prefix(text) {
            return Some((op, rest));
        }
    }

    None
}

/// Compile one `simple` token to a range.
fn parse_simple(spec: &str, token: &str) -> Result<Range> {
    if let Some(rest) = token.strip_prefix('~') {
        return Ok(parse_partial(spec, rest)?.tilde());
    }

    if let Some(rest) = token.strip_prefix('^') {
        return Ok(parse_partial(spec, rest)?.caret());
    }

    if let Some((op, rest)) = parse_comparator(token) {
        return Ok(parse_partial(spec, rest)?.primitive(op));
    }

    Ok(parse_partial(spec, token)?.as_range())
}

/// Compile one `range` (hyphen or simple set) to its conjunction of ranges.
fn parse_range(spec: &str, raw: &str) -> Result<Vec<Range>> {
    if let Some((low, high)) = raw.split_once(" - ") {
        let low = parse_partial(spec, low.trim())?;
        let high = parse_partial(spec, high.trim())?;

        return Ok(vec![Range::new(low.as_range().min, high.as_range().max)]);
    }

    let mut ranges = Vec::new();
    let mut tokens = raw.split_whitespace().peekable();

    while let Some(token) = tokens.next() {
        // The grammar allows spaces between a comparator and its partial
        // (">= 1.2.3"), which splits into two tokens here.
        let joined;
        let token = match parse_comparator(token) {
            Some((_, "")) => {
                let partial = tokens.next().ok_or_else(|| spec_err(spec))?;
                joined = format!("{}{}", token, partial);
                joined.as_str()
            }
            _ => token,
        };

        ranges.push(parse_simple(spec, token)?);
    }

    if ranges.is_empty() {
        return Err(spec_err(spec));
    }

    Ok(ranges)
}

/// Transforms a version spec into its canonical disjunction of ranges.
///
/// Each `||` alternative is intersected internally (space-separated simples
/// are conjunctive); alternatives whose intersection is empty are dropped.
pub fn parse_spec(spec: &str) -> Result<Vec<Range>> {
    let mut out = Vec::new();

    for alternative in spec.split("||") {
        let alternative = alternative.trim();

        if alternative.is_empty() {
            return Err(spec_err(spec));
        }

        let ranges = parse_range(spec, alternative)?;
        out.extend(intersect_ranges(&ranges));
    }

    Ok(out)
}

/// Handles the different cardinalities of a translated range set.
///
/// Python has no clean way to express a disjunction with a hole in the
/// middle, so multiple disjoint ranges fail the conversion. An empty set
/// renders as a specifier that matches nothing.
pub fn flatten_py_range(spec: &str, ranges: &[crate::version::PyRange]) -> Result<String> {
    match ranges {
        [] => Ok("<0.0.0".to_string()),
        [range] => Ok(range.to_string()),
        _ => Err(Error::Spec(format!(
            "cannot express disjoint ranges as a Python specifier: {}",
            spec
        ))),
    }
}

/// Converts a SemVer version specifier into something you can put in a wheel.
pub fn sem_range_to_py_range(spec: &str) -> Result<String> {
    let parsed = parse_spec(spec)?;
    let fused = union_ranges(&parsed);
    let py_ranges = fused
        .iter()
        .map(|r| r.as_py_range())
        .collect::<Result<Vec<_>>>()?;

    flatten_py_range(spec, &py_ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::{intersect_ranges, Bound, Range, Ver};

    fn partial(token: &str) -> Partial {
        parse_partial(token, token).unwrap()
    }

    fn v(major: u64, minor: u64, patch: u64) -> Ver {
        Ver::from(SemVersion::new(major, minor, patch))
    }

    fn v_pre(major: u64, minor: u64, patch: u64, pre: &str) -> Ver {
        let mut version = SemVersion::new(major, minor, patch);
        version.pre = Prerelease::new(pre).unwrap();
        Ver::from(version)
    }

    #[test]
    fn test_partial_as_range() {
        assert_eq!(
            partial("x").as_range(),
            Range::new(Bound::inclusive(Ver::Min), Bound::inclusive(Ver::Max)),
        );
        assert_eq!(
            partial("1.x").as_range(),
            Range::new(
                Bound::inclusive(v(1, 0, 0)),
                Bound::exclusive(v_pre(2, 0, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.1.x").as_range(),
            Range::new(
                Bound::inclusive(v(1, 1, 0)),
                Bound::exclusive(v_pre(1, 2, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.1.1-foo+bar").as_range(),
            Range::new(
                Bound::inclusive(v_pre(1, 1, 1, "foo")),
                Bound::inclusive(v_pre(1, 1, 1, "foo")),
            ),
        );
    }

    #[test]
    fn test_partial_primitive_ge() {
        assert_eq!(
            partial("x").primitive(Comparator::Ge),
            Range::new(Bound::inclusive(Ver::Min), Bound::inclusive(Ver::Max)),
        );
        assert_eq!(
            partial("1.x").primitive(Comparator::Ge),
            Range::new(Bound::inclusive(v(1, 0, 0)), Bound::inclusive(Ver::Max)),
        );
        assert_eq!(
            partial("1.1.x").primitive(Comparator::Ge),
            Range::new(Bound::inclusive(v(1, 1, 0)), Bound::inclusive(Ver::Max)),
        );
        assert_eq!(
            partial("1.1.1-foo+bar").primitive(Comparator::Ge),
            Range::new(
                Bound::inclusive(v_pre(1, 1, 1, "foo")),
                Bound::inclusive(Ver::Max),
            ),
        );
    }

    #[test]
    fn test_partial_primitive_gt() {
        assert_eq!(
            partial("x").primitive(Comparator::Gt),
            Range::new(Bound::inclusive(Ver::Max), Bound::inclusive(Ver::Max)),
        );
        assert_eq!(
            partial("1.x").primitive(Comparator::Gt),
            Range::new(Bound::inclusive(v(2, 0, 0)), Bound::inclusive(Ver::Max)),
        );
        assert_eq!(
            partial("1.1.x").primitive(Comparator::Gt),
            Range::new(Bound::inclusive(v(1, 2, 0)), Bound::inclusive(Ver::Max)),
        );
        assert_eq!(
            partial("1.1.1-foo+bar").primitive(Comparator::Gt),
            Range::new(
                Bound::exclusive(v_pre(1, 1, 1, "foo")),
                Bound::inclusive(Ver::Max),
            ),
        );
    }

    #[test]
    fn test_partial_primitive_le() {
        assert_eq!(
            partial("x").primitive(Comparator::Le),
            Range::new(Bound::inclusive(Ver::Min), Bound::inclusive(Ver::Max)),
        );
        assert_eq!(
            partial("1.x").primitive(Comparator::Le),
            Range::new(
                Bound::inclusive(Ver::Min),
                Bound::exclusive(v_pre(2, 0, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.1.x").primitive(Comparator::Le),
            Range::new(
                Bound::inclusive(Ver::Min),
                Bound::exclusive(v_pre(1, 2, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.1.1-foo+bar").primitive(Comparator::Le),
            Range::new(
                Bound::inclusive(Ver::Min),
                Bound::inclusive(v_pre(1, 1, 1, "foo")),
            ),
        );
    }

    #[test]
    fn test_partial_primitive_lt() {
        assert_eq!(
            partial("x").primitive(Comparator::Lt),
            Range::new(Bound::inclusive(Ver::Min), Bound::inclusive(Ver::Min)),
        );
        assert_eq!(
            partial("1.x").primitive(Comparator::Lt),
            Range::new(
                Bound::inclusive(Ver::Min),
                Bound::exclusive(v_pre(1, 0, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.1.x").primitive(Comparator::Lt),
            Range::new(
                Bound::inclusive(Ver::Min),
                Bound::exclusive(v_pre(1, 1, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.1.1-foo+bar").primitive(Comparator::Lt),
            Range::new(
                Bound::inclusive(Ver::Min),
                Bound::exclusive(v_pre(1, 1, 1, "foo")),
            ),
        );
    }

    #[test]
    fn test_partial_primitive_eq() {
        assert_eq!(
            partial("1.x").primitive(Comparator::Eq),
            partial("1.x").as_range(),
        );
        assert_eq!(
            partial("1.1.1-foo+bar").primitive(Comparator::Eq),
            partial("1.1.1-foo+bar").as_range(),
        );
    }

    #[test]
    fn test_partial_tilde() {
        assert_eq!(
            partial("x").tilde(),
            Range::new(Bound::inclusive(Ver::Min), Bound::inclusive(Ver::Max)),
        );
        assert_eq!(
            partial("0.x").tilde(),
            Range::new(
                Bound::inclusive(Ver::Min),
                Bound::exclusive(v_pre(1, 0, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.x").tilde(),
            Range::new(
                Bound::inclusive(v(1, 0, 0)),
                Bound::exclusive(v_pre(2, 0, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.1.x").tilde(),
            Range::new(
                Bound::inclusive(v(1, 1, 0)),
                Bound::exclusive(v_pre(1, 2, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.1.1-foo+bar").tilde(),
            Range::new(
                Bound::inclusive(v_pre(1, 1, 1, "foo")),
                Bound::exclusive(v_pre(1, 2, 0, "0")),
            ),
        );
    }

    #[test]
    fn test_partial_caret() {
        assert_eq!(
            partial("x").caret(),
            Range::new(Bound::inclusive(Ver::Min), Bound::inclusive(Ver::Max)),
        );
        assert_eq!(
            partial("0.x").caret(),
            Range::new(
                Bound::inclusive(Ver::Min),
                Bound::exclusive(v_pre(1, 0, 0, "0")),
            ),
        );
        assert_eq!(
            partial("0.1.x").caret(),
            Range::new(
                Bound::inclusive(v(0, 1, 0)),
                Bound::exclusive(v_pre(0, 2, 0, "0")),
            ),
        );
        assert_eq!(
            partial("0.1.1-foo+bar").caret(),
            Range::new(
                Bound::inclusive(v_pre(0, 1, 1, "foo")),
                Bound::exclusive(v_pre(0, 2, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.x").caret(),
            Range::new(
                Bound::inclusive(v(1, 0, 0)),
                Bound::exclusive(v_pre(2, 0, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.1.x").caret(),
            Range::new(
                Bound::inclusive(v(1, 1, 0)),
                Bound::exclusive(v_pre(2, 0, 0, "0")),
            ),
        );
        assert_eq!(
            partial("1.1.1-foo+bar").caret(),
            Range::new(
                Bound::inclusive(v_pre(1, 1, 1, "foo")),
                Bound::exclusive(v_pre(2, 0, 0, "0")),
            ),
        );
    }

    #[test]
    fn test_parse_spec_conjunction_and_disjunction() {
        assert_eq!(
            parse_spec(">1 <=3 <=3.4 >1.2 || 5.x").unwrap(),
            vec![
                Range::new(
                    Bound::inclusive(v(2, 0, 0)),
                    Bound::exclusive(v_pre(3, 5, 0, "0")),
                ),
                Range::new(
                    Bound::inclusive(v(5, 0, 0)),
                    Bound::exclusive(v_pre(6, 0, 0, "0")),
                ),
            ],
        );

        assert_eq!(
            parse_spec("1.x || 2.x || 3.x").unwrap(),
            vec![
                Range::new(
                    Bound::inclusive(v(1, 0, 0)),
                    Bound::exclusive(v_pre(2, 0, 0, "0")),
                ),
                Range::new(
                    Bound::inclusive(v(2, 0, 0)),
                    Bound::exclusive(v_pre(3, 0, 0, "0")),
                ),
                Range::new(
                    Bound::inclusive(v(3, 0, 0)),
                    Bound::exclusive(v_pre(4, 0, 0, "0")),
                ),
            ],
        );
    }

    #[test]
    fn test_parse_spec_qualifier_on_wildcard_patch() {
        assert_eq!(
            parse_spec("1.0.x-a.b+d.e").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 0, 0)),
                Bound::exclusive(v_pre(1, 1, 0, "0")),
            )],
        );
    }

    #[test]
    fn test_parse_spec_tilde_and_caret() {
        assert_eq!(
            parse_spec("~1").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 0, 0)),
                Bound::exclusive(v_pre(2, 0, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("~1.1").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 1, 0)),
                Bound::exclusive(v_pre(1, 2, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("~1.2").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 2, 0)),
                Bound::exclusive(v_pre(1, 3, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("~1.2.3").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 2, 3)),
                Bound::exclusive(v_pre(1, 3, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("~0.1.2").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(0, 1, 2)),
                Bound::exclusive(v_pre(0, 2, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("^1").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 0, 0)),
                Bound::exclusive(v_pre(2, 0, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("^0.1").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(0, 1, 0)),
                Bound::exclusive(v_pre(0, 2, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("^1.1").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 1, 0)),
                Bound::exclusive(v_pre(2, 0, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("^0.1.2").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(0, 1, 2)),
                Bound::exclusive(v_pre(0, 2, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("^1.1.2").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 1, 2)),
                Bound::exclusive(v_pre(2, 0, 0, "0")),
            )],
        );
    }

    #[test]
    fn test_parse_spec_hyphen() {
        assert_eq!(
            parse_spec("1.x - 2.x").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 0, 0)),
                Bound::exclusive(v_pre(3, 0, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("1.0.0 - 2.9999.9999").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 0, 0)),
                Bound::inclusive(v(2, 9999, 9999)),
            )],
        );
    }

    #[test]
    fn test_parse_spec_primitives() {
        assert_eq!(
            parse_spec(">=1.0.2 <2.1.2").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(1, 0, 2)),
                Bound::exclusive(v(2, 1, 2)),
            )],
        );
        assert_eq!(
            parse_spec(">1.0.2 <=2.3.4").unwrap(),
            vec![Range::new(
                Bound::exclusive(v(1, 0, 2)),
                Bound::inclusive(v(2, 3, 4)),
            )],
        );
        assert_eq!(
            parse_spec("2.0.1").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(2, 0, 1)),
                Bound::inclusive(v(2, 0, 1)),
            )],
        );
        assert_eq!(
            parse_spec("2.x").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(2, 0, 0)),
                Bound::exclusive(v_pre(3, 0, 0, "0")),
            )],
        );
        assert_eq!(
            parse_spec("3.3.x").unwrap(),
            vec![Range::new(
                Bound::inclusive(v(3, 3, 0)),
                Bound::exclusive(v_pre(3, 4, 0, "0")),
            )],
        );
    }

    #[test]
    fn test_parse_spec_disjoint_alternatives() {
        assert_eq!(
            parse_spec("<1.0.0 || >=2.3.1 <2.4.5 || >=2.5.2 <3.0.0").unwrap(),
            vec![
                Range::new(
                    Bound::inclusive(Ver::Min),
                    Bound::exclusive(v(1, 0, 0)),
                ),
                Range::new(
                    Bound::inclusive(v(2, 3, 1)),
                    Bound::exclusive(v(2, 4, 5)),
                ),
                Range::new(
                    Bound::inclusive(v(2, 5, 2)),
                    Bound::exclusive(v(3, 0, 0)),
                ),
            ],
        );
    }

    #[test]
    fn test_parse_spec_rejects_non_ranges() {
        assert!(parse_spec("http://asdf.com/asdf.tar.gz").is_err());
        assert!(parse_spec("latest").is_err());
        assert!(parse_spec("file:../dyl").is_err());
        assert!(parse_spec("").is_err());
        assert!(parse_spec("1.0.0 ||").is_err());
        assert!(parse_spec("git+ssh://git@github.com/x/y.git").is_err());
    }

    #[test]
    fn test_parse_spec_intersection_properties() {
        // Containment is monotone: intersecting with the universal range
        // changes nothing.
        for spec in ["^1.2.3", "~0.4.2", ">=1.0.2 <2.1.2", "1.x"] {
            let ranges = parse_spec(spec).unwrap();
            let universal = Range::default();

            for range in &ranges {
                let narrowed = intersect_ranges(&[range.clone(), universal.clone()]);
                assert_eq!(narrowed, vec![range.clone()], "spec {}", spec);
            }
        }
    }

    #[test]
    fn test_parse_spec_intersection_commutative() {
        let a = parse_spec(">=1.0.0").unwrap().remove(0);
        let b = parse_spec("<2.0.0").unwrap().remove(0);
        let c = parse_spec("~1.4").unwrap().remove(0);

        let abc = intersect_ranges(&[a.clone(), b.clone(), c.clone()]);
        let cba = intersect_ranges(&[c, b, a]);
        assert_eq!(abc, cba);
    }

    #[test]
    fn test_sem_range_to_py_range() {
        assert_eq!(sem_range_to_py_range("1.0.0").unwrap(), "==1.0.0");
        assert_eq!(sem_range_to_py_range(">= 12.37.2").unwrap(), ">=12.37.2");
        assert_eq!(sem_range_to_py_range("1.*").unwrap(), ">=1.0.0,<2.0.0");
        assert_eq!(sem_range_to_py_range("1.x").unwrap(), ">=1.0.0,<2.0.0");
        assert_eq!(sem_range_to_py_range("1.x - 2.x").unwrap(), ">=1.0.0,<3.0.0");
        assert_eq!(sem_range_to_py_range("~1.2.3").unwrap(), ">=1.2.3,<1.3.0");
        assert_eq!(sem_range_to_py_range(">4").unwrap(), ">=5.0.0");
        assert_eq!(sem_range_to_py_range(">2 >4 <8 || 5.x").unwrap(), ">=5.0.0,<8.0.0");
        assert!(sem_range_to_py_range("<1.0.0 || >=2.0.0").is_err());
    }

    #[test]
    fn test_py_translation_left_inverse_on_releases() {
        // For single-range specs, the Python translation admits the same
        // releases as the original spec.
        let cases = [
            ("^1.2.3", vec!["1.2.3", "1.9.9", "2.0.0", "1.2.2"]),
            ("~1.2.3", vec!["1.2.3", "1.2.42", "1.3.0", "1.2.0"]),
            (">=1.0.2 <2.1.2", vec!["1.0.2", "2.1.1", "2.1.2", "1.0.1"]),
        ];

        for (spec, versions) in cases {
            let js_ranges = parse_spec(spec).unwrap();
            let py_spec = sem_range_to_py_range(spec).unwrap();
            // Python joins conjunctions with a comma where NPM uses a space.
            let js_back = parse_spec(&py_spec.replace(',', " ")).unwrap();

            for version in versions {
                let sem = SemVersion::parse(version).unwrap();
                let direct = js_ranges.iter().any(|r| r.contains(&sem));
                let round_tripped = js_back.iter().any(|r| r.contains(&sem));
                assert_eq!(direct, round_tripped, "{} vs {} at {}", spec, py_spec, version);
            }
        }
    }

    #[test]
    fn test_range_contains_through_parse() {
        let exact = parse_spec("1.0.0").unwrap();
        assert!(exact[0].contains(&SemVersion::parse("1.0.0").unwrap()));
        assert!(!exact[0].contains(&SemVersion::parse("1.0.1").unwrap()));

        let wild = parse_spec("1.x").unwrap();
        assert!(!wild[0].contains(&SemVersion::parse("1.0.0-beta.1").unwrap()));
        assert!(wild[0].contains(&SemVersion::parse("1.0.0").unwrap()));
        assert!(wild[0].contains(&SemVersion::parse("1.2.0").unwrap()));
        assert!(!wild[0].contains(&SemVersion::parse("2.0.0").unwrap()));

        let tilde = parse_spec("~1.2.3").unwrap();
        assert!(!tilde[0].contains(&SemVersion::parse("1.2.0").unwrap()));
        assert!(tilde[0].contains(&SemVersion::parse("1.2.3").unwrap()));
        assert!(tilde[0].contains(&SemVersion::parse("1.2.42").unwrap()));
        assert!(!tilde[0].contains(&SemVersion::parse("1.3.0").unwrap()));
    }

    #[test]
    fn test_prerelease_lower_bound_pinning() {
        // A prerelease lower bound admits prereleases on its own triple only.
        let ranges = parse_spec(">=1.0.0-0 <2.0.0").unwrap();
        assert_eq!(ranges.len(), 1);
        assert!(ranges[0].contains(&SemVersion::parse("1.0.0-beta").unwrap()));
        assert!(ranges[0].contains(&SemVersion::parse("1.5.0").unwrap()));
        assert!(!ranges[0].contains(&SemVersion::parse("1.5.0-beta").unwrap()));
    }
}
