//! Upstream data model: `Release` → `Artifact` (§3).

use url::Url;

use crate::package_name::PackageName;

/// A single downloadable file for a project release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub project: PackageName,
    /// Upstream version string, verbatim -- not necessarily a valid PEP 440
    /// version.
    pub version: String,
    pub filename: String,
    /// Carries a `#sha256=<hex>` fragment so the hash travels with every
    /// reference to the artifact.
    pub url: Url,
    pub sha256: String,
    pub yanked: bool,
}

/// A published version of a project, with all of its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub project: PackageName,
    pub version: String,
    pub yanked: bool,
    pub artifacts: Vec<Artifact>,
}
