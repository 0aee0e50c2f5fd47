//! A requirement's constraint half: a package name's version bound as
//! produced by the user configuration or by metadata of a downloaded
//! artifact.

use crate::specifier::Specifiers;

/// Either a normal PEP 440 specifier set or the unparseable-literal fallback
/// (§4.1: callers fall back to exact-string equality when the user's
/// constraint text isn't a valid specifier set on its own).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Specifiers(Specifiers),
    /// The constraint text as typed; matched by exact string equality
    /// against a release's raw version string.
    Literal(String),
}
