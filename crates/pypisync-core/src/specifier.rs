//! PEP 440 version parsing and specifier-set containment (C1).
//!
//! The range-construction logic (`CompareOp::ranges`) is adapted from the
//! njsmith/posy `specifier.rs` vocabulary module: every comparison operator
//! reduces to a union of half-open `[low, high)` ranges over `pep440::Version`,
//! which sidesteps having to special-case pre-release/post/dev/local ordering
//! at every call site.

use std::fmt::Display;
use std::ops::Range;
use std::str::FromStr;

use once_cell::sync::Lazy;
pub use pep440::Version;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use smallvec::{smallvec, SmallVec};

use crate::error::{Error, Result};

pub fn parse_version(s: &str) -> Option<Version> {
    Version::parse(s.trim())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specifier {
    pub op: CompareOp,
    pub value: String,
}

impl Specifier {
    pub fn contains(&self, version: &Version) -> bool {
        match self.to_ranges() {
            Ok(ranges) => ranges.into_iter().any(|r| r.contains(version)),
            Err(_) => false,
        }
    }

    pub fn to_ranges(&self) -> Result<SmallVec<[Range<Version>; 1]>> {
        self.op.ranges(&self.value)
    }
}

impl Display for Specifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.op, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, SerializeDisplay, DeserializeFromStr, Default, Hash)]
pub struct Specifiers(pub Vec<Specifier>);

impl Specifiers {
    pub fn contains(&self, version: &Version) -> bool {
        self.0.iter().all(|s| s.contains(version))
    }

    pub fn parse(s: &str) -> Option<Self> {
        crate::reqparse::versionspec(s.trim()).ok()
    }
}

impl Display for Specifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for spec in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            write!(f, "{}", spec)?;
        }
        Ok(())
    }
}

impl FromStr for Specifiers {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        Specifiers::parse(input).ok_or_else(|| Error::InvalidSpecifier(input.to_owned()))
    }
}

pub fn parse_specifier_set(s: &str) -> Option<Specifiers> {
    Specifiers::parse(s)
}

pub fn contains(set: &Specifiers, v: &Version) -> bool {
    set.contains(v)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CompareOp {
    LessThanEqual,
    StrictlyLessThan,
    NotEqual,
    Equal,
    GreaterThanEqual,
    StrictlyGreaterThan,
    Compatible,
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CompareOp::*;
        write!(
            f,
            "{}",
            match self {
                LessThanEqual => "<=",
                StrictlyLessThan => "<",
                NotEqual => "!=",
                Equal => "==",
                GreaterThanEqual => ">=",
                StrictlyGreaterThan => ">",
                Compatible => "~=",
            }
        )
    }
}

impl FromStr for CompareOp {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        use CompareOp::*;
        Ok(match value {
            "==" => Equal,
            "!=" => NotEqual,
            "<=" => LessThanEqual,
            "<" => StrictlyLessThan,
            ">=" => GreaterThanEqual,
            ">" => StrictlyGreaterThan,
            "~=" => Compatible,
            _ => return Err(Error::InvalidSpecifier(value.to_owned())),
        })
    }
}

fn parse_version_wildcard(input: &str) -> Result<(Version, bool)> {
    let (vstr, wildcard) = match input.strip_suffix(".*") {
        Some(vstr) => (vstr, true),
        None => (input, false),
    };
    let version = Version::parse(vstr).ok_or_else(|| Error::InvalidVersion(vstr.to_owned()))?;
    Ok((version, wildcard))
}

impl CompareOp {
    /// Converts a comparison like `>=1.2` into a union of half-open ranges.
    /// Takes a string rather than a `Version` because `==`/`!=` accept
    /// trailing `.*` wildcards, which aren't valid versions on their own.
    pub fn ranges(&self, rhs: &str) -> Result<SmallVec<[Range<Version>; 1]>> {
        use CompareOp::*;
        let (version, wildcard) = parse_version_wildcard(rhs)?;
        Ok(if wildcard {
            if version.dev.is_some() || !version.local.is_empty() {
                return Err(Error::InvalidSpecifier(format!(
                    "{rhs}: wildcards can't have dev or local suffixes"
                )));
            }
            let mut low = version.clone();
            low.dev = Some(0);
            let mut high = version;
            if let Some(post) = high.post {
                high.post = Some(post + 1)
            } else if let Some(pre) = high.pre {
                use pep440::PreRelease::*;
                high.pre = Some(match pre {
                    RC(n) => RC(n + 1),
                    A(n) => A(n + 1),
                    B(n) => B(n + 1),
                })
            } else {
                *high.release.last_mut().unwrap() += 1;
            }
            high.dev = Some(0);
            match self {
                Equal => smallvec![low..high],
                NotEqual => smallvec![VERSION_ZERO.clone()..low, high..VERSION_INFINITY.clone()],
                _ => {
                    return Err(Error::InvalidSpecifier(format!(
                        "can't use wildcard with {self}"
                    )))
                }
            }
        } else {
            if self != &Equal && self != &NotEqual && !version.local.is_empty() {
                return Err(Error::InvalidSpecifier(format!(
                    "operator {self} cannot be used on a version with a +local suffix"
                )));
            }
            match self {
                LessThanEqual => smallvec![VERSION_ZERO.clone()..version.pep440_next()],
                GreaterThanEqual => smallvec![version..VERSION_INFINITY.clone()],
                Equal => smallvec![version.clone()..version.pep440_next()],
                NotEqual => smallvec![
                    VERSION_ZERO.clone()..version.clone(),
                    version.pep440_next()..VERSION_INFINITY.clone(),
                ],
                StrictlyGreaterThan => {
                    let mut low = version.clone();
                    if let Some(dev) = &version.dev {
                        low.dev = Some(dev + 1);
                    } else if let Some(post) = &version.post {
                        low.post = Some(post + 1);
                    } else {
                        low.post = Some(u32::MAX);
                    }
                    smallvec![low..VERSION_INFINITY.clone()]
                }
                StrictlyLessThan => {
                    if (&version.pre, &version.dev) == (&None, &None) {
                        let mut new_max = version;
                        new_max.dev = Some(0);
                        new_max.post = None;
                        new_max.local = vec![];
                        smallvec![VERSION_ZERO.clone()..new_max]
                    } else {
                        smallvec![VERSION_ZERO.clone()..version]
                    }
                }
                Compatible => {
                    if version.release.len() < 2 {
                        return Err(Error::InvalidSpecifier(
                            "~= operator requires a version with two segments (X.Y)".to_owned(),
                        ));
                    }
                    let mut new_max = pep440::Version {
                        epoch: version.epoch,
                        release: version.release.clone(),
                        pre: None,
                        post: None,
                        dev: Some(0),
                        local: vec![],
                    };
                    new_max.release.pop().unwrap();
                    *new_max.release.last_mut().unwrap() += 1;
                    smallvec![version..new_max]
                }
            }
        })
    }
}

pub static VERSION_ZERO: Lazy<Version> = Lazy::new(|| Version::parse("0a0.dev0").unwrap());

pub static VERSION_INFINITY: Lazy<Version> = Lazy::new(|| pep440::Version {
    epoch: u32::MAX,
    release: vec![u32::MAX, u32::MAX, u32::MAX],
    pre: None,
    post: Some(u32::MAX),
    dev: None,
    local: vec![],
});

/// The smallest PEP 440 version strictly larger than `self`. Exposed as an
/// extension trait rather than a method on the upstream `Version` type.
pub trait Pep440VersionExt {
    fn pep440_next(&self) -> Self;
}

impl Pep440VersionExt for Version {
    fn pep440_next(&self) -> Version {
        let mut new = self.clone();
        if let Some(dev) = &mut new.dev {
            *dev += 1;
        } else if let Some(post) = &mut new.post {
            *post += 1;
        } else {
            new.post = Some(0);
            new.dev = Some(0);
        }
        new
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn orders_prereleases_below_final() {
        let a = parse_version("1.0.0a1").unwrap();
        let b = parse_version("1.0.0").unwrap();
        assert!(a < b);
    }

    #[test]
    fn range_specifier() {
        let spec = Specifiers::parse(">=1,<2").unwrap();
        assert!(spec.contains(&parse_version("1.5").unwrap()));
        assert!(!spec.contains(&parse_version("2.0").unwrap()));
    }

    #[test]
    fn compatible_release() {
        let spec = Specifiers::parse("~=1.4.2").unwrap();
        assert!(spec.contains(&parse_version("1.4.5").unwrap()));
        assert!(!spec.contains(&parse_version("1.5.0").unwrap()));
    }

    #[test]
    fn wildcard_equal() {
        let spec = Specifiers::parse("==1.4.*").unwrap();
        assert!(spec.contains(&parse_version("1.4.9").unwrap()));
        assert!(!spec.contains(&parse_version("1.5.0").unwrap()));
    }

    #[test]
    fn invalid_version_is_none() {
        assert!(parse_version("not-a-version").is_none());
    }

    #[test]
    fn not_equal_excludes_exact() {
        let spec = Specifiers::parse("!=1.5.0").unwrap();
        assert!(!spec.contains(&parse_version("1.5.0").unwrap()));
        assert!(spec.contains(&parse_version("1.5.1").unwrap()));
    }
}
