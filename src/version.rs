//! @ai:module:intent Parse version constraints into intervals over a one-decimal version axis
//! @ai:module:layer domain
//! @ai:module:public_api Version, VersionNumber, VersionPoint, compare_version_strings
//! @ai:module:stateless true

use crate::error::{Error, ErrorContext, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// @ai:intent A concrete version on the axis, stored in tenths so `3.4` is exact
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionNumber(i32);

impl VersionNumber {
    pub const STEP: i32 = 1;

    pub const fn from_tenths(tenths: i32) -> Self {
        Self(tenths)
    }

    pub fn tenths(self) -> i32 {
        self.0
    }

    /// @ai:intent Next version on the axis (`3.4` -> `3.5`)
    /// @ai:post None when the axis ends
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(Self::STEP).map(Self)
    }

    /// @ai:intent Previous version on the axis (`3.4` -> `3.3`)
    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub(Self::STEP).map(Self)
    }

    /// @ai:intent Round up to the next whole major version
    pub fn ceil(self) -> Option<Self> {
        let floor = self.0.div_euclid(10).checked_mul(10)?;
        if self.0.rem_euclid(10) == 0 {
            Some(Self(floor))
        } else {
            floor.checked_add(10).map(Self)
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.0) / 10.0
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}

impl FromStr for VersionNumber {
    type Err = Error;

    /// Accepts `X.Y`; minor parts wider than one digit are rounded half up onto the axis.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (major, minor) = s
            .split_once('.')
            .filter(|_| point_regex().is_match(s))
            .ok_or_else(|| unrecognized(s))?;

        let digits: Vec<i32> = minor
            .chars()
            .map(|c| c.to_digit(10).map(|d| d as i32))
            .collect::<Option<_>>()
            .ok_or_else(|| unrecognized(s))?;
        let tenth = digits.first().copied().unwrap_or(0);
        let round_up = digits.get(1).map_or(false, |d| *d >= 5);

        major
            .parse::<i32>()
            .ok()
            .and_then(|major| major.checked_mul(10))
            .and_then(|tenths| tenths.checked_add(tenth + i32::from(round_up)))
            .map(Self)
            .ok_or_else(|| unrecognized(s))
    }
}

impl TryFrom<String> for VersionNumber {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<VersionNumber> for String {
    fn from(number: VersionNumber) -> Self {
        number.to_string()
    }
}

/// @ai:intent One end of a version interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionPoint {
    Number(VersionNumber),
    Wildcard,
}

impl VersionPoint {
    pub fn number(self) -> Option<VersionNumber> {
        match self {
            VersionPoint::Number(n) => Some(n),
            VersionPoint::Wildcard => None,
        }
    }

    fn to_json(self) -> serde_json::Value {
        match self {
            VersionPoint::Number(n) => serde_json::json!(n.as_f64()),
            VersionPoint::Wildcard => serde_json::json!("*"),
        }
    }
}

impl fmt::Display for VersionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPoint::Number(n) => write!(f, "{}", n),
            VersionPoint::Wildcard => write!(f, "*"),
        }
    }
}

/// @ai:intent An immutable version constraint normalized to a `[start, end]` interval
/// @ai:invariant start <= end when both ends are numeric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    constraint: String,
    start: VersionPoint,
    end: VersionPoint,
}

fn point_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+\.[0-9]+$").expect("Invalid regex"))
}

fn single_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?P<op>>=|<=|>|<|~)(?P<num>\d+\.\d+)|(?P<plain>\d+\.\d+)|(?P<major>\d+)\.\*)$")
            .expect("Invalid regex")
    })
}

fn operator_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(>=|<=|>|<|~)").expect("Invalid regex"))
}

fn unrecognized(constraint: &str) -> Error {
    Error::UnrecognizedSchema {
        constraint: constraint.to_string(),
        context: ErrorContext::default(),
    }
}

impl Version {
    /// @ai:intent Parse a constraint such as `3.4`, `>=3.4`, `~3.3`, `3.*` or `3.0 - 3.3`
    /// @ai:example "3.0 - 3.3" -> [3.0, 3.3]
    /// @ai:example ">3.4" -> [3.5, *]
    /// @ai:effects pure
    pub fn parse(constraint: &str) -> Result<Self> {
        let constraint = constraint.trim();

        let (start, end) = match constraint.split_once(" - ") {
            Some((lower, upper)) => parse_range(constraint, lower, upper)?,
            None => parse_single(constraint)?,
        };

        Ok(Self {
            constraint: constraint.to_string(),
            start,
            end,
        })
    }

    /// @ai:intent Parse a constraint and attach docblock context to any failure
    pub fn parse_in(constraint: &str, ctx: &ErrorContext) -> Result<Self> {
        Self::parse(constraint).map_err(|e| e.in_context(ctx))
    }

    pub fn constraint(&self) -> &str {
        &self.constraint
    }

    pub fn start(&self) -> VersionPoint {
        self.start
    }

    pub fn end(&self) -> VersionPoint {
        self.end
    }

    /// @ai:intent Check whether a version string such as `3.4` falls inside this constraint
    /// @ai:post unparsable input never matches
    pub fn matches(&self, version: &str) -> bool {
        version
            .parse::<VersionNumber>()
            .map(|v| self.contains(v))
            .unwrap_or(false)
    }

    /// @ai:intent Membership test on the version axis
    pub fn contains(&self, version: VersionNumber) -> bool {
        match (self.start, self.end) {
            (VersionPoint::Number(start), VersionPoint::Number(end)) if start == end => {
                version == start
            }
            (VersionPoint::Number(start), VersionPoint::Wildcard) => version >= start,
            (VersionPoint::Wildcard, VersionPoint::Number(end)) => version <= end,
            (VersionPoint::Number(start), VersionPoint::Number(end)) => {
                start <= version && version <= end
            }
            (VersionPoint::Wildcard, VersionPoint::Wildcard) => true,
        }
    }

    /// @ai:intent Canonical `{start, end}` form, numbers to one decimal and `*` for open ends
    pub fn to_array(&self) -> serde_json::Value {
        serde_json::json!({
            "start": self.start.to_json(),
            "end": self.end.to_json(),
        })
    }
}

fn parse_single(constraint: &str) -> Result<(VersionPoint, VersionPoint)> {
    let captures = single_regex()
        .captures(constraint)
        .ok_or_else(|| unrecognized(constraint))?;

    if let Some(plain) = captures.name("plain") {
        let n: VersionNumber = plain.as_str().parse()?;
        return Ok((VersionPoint::Number(n), VersionPoint::Number(n)));
    }

    if let Some(major) = captures.name("major") {
        let start = major
            .as_str()
            .parse::<i32>()
            .ok()
            .and_then(|major| major.checked_mul(10))
            .ok_or_else(|| unrecognized(constraint))?;
        let end = start
            .checked_add(10)
            .ok_or_else(|| unrecognized(constraint))?;
        return Ok((
            VersionPoint::Number(VersionNumber(start)),
            VersionPoint::Number(VersionNumber(end)),
        ));
    }

    let n: VersionNumber = captures
        .name("num")
        .ok_or_else(|| unrecognized(constraint))?
        .as_str()
        .parse()?;
    let op = captures.name("op").map(|m| m.as_str()).unwrap_or_default();

    let off_axis = || unrecognized(constraint);
    let interval = match op {
        ">" => (
            VersionPoint::Number(n.next().ok_or_else(off_axis)?),
            VersionPoint::Wildcard,
        ),
        ">=" => (VersionPoint::Number(n), VersionPoint::Wildcard),
        "<" => (
            VersionPoint::Wildcard,
            VersionPoint::Number(n.previous().ok_or_else(off_axis)?),
        ),
        "<=" => (VersionPoint::Wildcard, VersionPoint::Number(n)),
        "~" => (
            VersionPoint::Number(n),
            VersionPoint::Number(n.ceil().ok_or_else(off_axis)?),
        ),
        _ => return Err(off_axis()),
    };

    Ok(interval)
}

fn parse_range(
    constraint: &str,
    lower: &str,
    upper: &str,
) -> Result<(VersionPoint, VersionPoint)> {
    if operator_regex().is_match(lower) || operator_regex().is_match(upper) {
        return Err(Error::OperatorsWithinRange {
            constraint: constraint.to_string(),
            context: ErrorContext::default(),
        });
    }

    let (start, _) = parse_single(lower.trim()).map_err(|_| unrecognized(constraint))?;
    let (_, end) = parse_single(upper.trim()).map_err(|_| unrecognized(constraint))?;

    if let (VersionPoint::Number(s), VersionPoint::Number(e)) = (start, end) {
        match s.cmp(&e) {
            Ordering::Greater => {
                return Err(Error::LopsidedRange {
                    constraint: constraint.to_string(),
                    context: ErrorContext::default(),
                })
            }
            Ordering::Equal => {
                return Err(Error::BadRangeUse {
                    constraint: constraint.to_string(),
                    context: ErrorContext::default(),
                })
            }
            Ordering::Less => {}
        }
    }

    Ok((start, end))
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.constraint
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.constraint)
    }
}

/// @ai:intent Order dotted version strings numerically so `1.10` sorts after `1.2`
/// @ai:effects pure
pub fn compare_version_strings(a: &str, b: &str) -> Ordering {
    let parts = |s: &str| -> Vec<u64> {
        s.split('.')
            .map(|p| p.trim().parse::<u64>().unwrap_or(0))
            .collect()
    };

    let (left, right) = (parts(a), parts(b));
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    a.cmp(b)
}
