//! `MirrorPackage`: the unit of dedup and the node key of the dependency
//! graph (§3).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use url::Url;

use crate::package_name::PackageName;

/// A concrete artifact selected for mirroring, or (when `url` is `None`) a
/// bare `(project, version)` node used only as a dependency-graph key.
///
/// Identity -- and therefore `Eq`/`Hash` -- is `(project, version,
/// basename)`, per §3: two `MirrorPackage`s with the same URL but
/// constructed separately must compare equal and collapse in a `HashSet`.
#[derive(Debug, Clone)]
pub struct MirrorPackage {
    pub project: PackageName,
    pub version: String,
    pub url: Option<Url>,
    pub local_path: Option<PathBuf>,
    pub sha256: Option<String>,
}

impl MirrorPackage {
    pub fn node_key(project: PackageName, version: String) -> Self {
        MirrorPackage {
            project,
            version,
            url: None,
            local_path: None,
            sha256: None,
        }
    }

    /// The project/version/basename triple used as dedup identity.
    fn identity(&self) -> (String, &str, Option<String>) {
        let basename = self
            .local_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());
        (
            self.project.normalize().as_str().to_owned(),
            self.version.as_str(),
            basename,
        )
    }

    /// The `(project, version)` identity with the URL/path dropped, used as
    /// the dependency graph's node key (§4.6).
    pub fn simplified(&self) -> MirrorPackage {
        MirrorPackage::node_key(self.project.clone(), self.version.clone())
    }
}

impl fmt::Display for MirrorPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=={}", self.project, self.version)
    }
}

impl PartialEq for MirrorPackage {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for MirrorPackage {}

impl Hash for MirrorPackage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn equal_identity_regardless_of_other_fields() {
        let a = MirrorPackage {
            project: PackageName::from("foo"),
            version: "1.0".into(),
            url: None,
            local_path: Some(PathBuf::from("/dest/foo-1.0.tar.gz")),
            sha256: Some("aaaa".into()),
        };
        let b = MirrorPackage {
            project: PackageName::from("Foo"),
            version: "1.0".into(),
            url: Some("https://example.com/foo-1.0.tar.gz".parse().unwrap()),
            local_path: Some(PathBuf::from("/other/foo-1.0.tar.gz")),
            sha256: Some("bbbb".into()),
        };
        assert_eq!(a, b);
    }
}
