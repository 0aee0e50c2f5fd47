//! Project name normalization (PEP 503).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static NOT_NORMALIZED_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_.]+").unwrap());

/// A project name exactly as a user or upstream index spelled it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageName(String);

impl PackageName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn normalize(&self) -> NormalizedPackageName {
        NormalizedPackageName::from(self.0.as_str())
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A project name normalized per PEP 503: lowercased, with runs of `-_.`
/// collapsed to a single `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NormalizedPackageName(String);

impl NormalizedPackageName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedPackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NormalizedPackageName {
    fn from(s: &str) -> Self {
        Self(NOT_NORMALIZED_CHARS.replace_all(s, "-").to_lowercase())
    }
}

impl From<&PackageName> for NormalizedPackageName {
    fn from(name: &PackageName) -> Self {
        name.normalize()
    }
}

impl From<PackageName> for NormalizedPackageName {
    fn from(name: PackageName) -> Self {
        name.normalize()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalizes_separators_and_case() {
        assert_eq!(
            NormalizedPackageName::from("Friendly-Bard").as_str(),
            "friendly-bard"
        );
        assert_eq!(
            NormalizedPackageName::from("SUPER.dots__dashes").as_str(),
            "super-dots-dashes"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = NormalizedPackageName::from("Foo__Bar..Baz");
        let twice = NormalizedPackageName::from(once.as_str());
        assert_eq!(once, twice);
    }
}
