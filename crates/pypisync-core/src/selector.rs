//! Selector (C5): turns `{package -> [constraint, ...]}` into concrete
//! `MirrorPackage`s, applying arch-exclusion and (optionally) latest-only
//! reduction.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::index::IndexClient;
use crate::marker::Environment;
use crate::package_name::PackageName;
use crate::specifier::{parse_version, Specifiers, Version};
use crate::types::{Artifact, MirrorPackage, Release};

static LATEST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<n>\d+)?\s*latest(?P<spec>.*)?$").unwrap());

pub struct Selector {
    index: Arc<IndexClient>,
    destination: PathBuf,
    simple_layout: bool,
    arch_exclude: Vec<String>,
    environment: Option<Environment>,
}

impl Selector {
    pub fn new(
        index: Arc<IndexClient>,
        destination: PathBuf,
        simple_layout: bool,
        arch_exclude: Vec<String>,
        environment: Option<Environment>,
    ) -> Self {
        Self {
            index,
            destination,
            simple_layout,
            arch_exclude,
            environment,
        }
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    /// Selects every `MirrorPackage` matching `seeds`. When `latest_only` is
    /// set, each (package, constraint) pair is reduced to its single highest
    /// non-yanked matching version before emitting artifacts (§4.6's
    /// transitive-dependency behavior).
    pub async fn select(
        &self,
        seeds: &IndexMap<PackageName, Vec<String>>,
        latest_only: bool,
    ) -> Vec<MirrorPackage> {
        let mut result = Vec::new();
        for (package, constraints) in seeds {
            for constraint in constraints {
                result.extend(self.select_one(package, constraint, latest_only).await);
            }
        }
        result
    }

    async fn select_one(
        &self,
        package: &PackageName,
        raw_constraint: &str,
        latest_only: bool,
    ) -> Vec<MirrorPackage> {
        let releases = self.releases_for(package).await;
        if releases.is_empty() {
            return Vec::new();
        }

        let (resolved, is_latest_pattern) = match self.resolve_constraint(raw_constraint, &releases) {
            Some(c) => c,
            None => {
                debug!(package = %package, constraint = raw_constraint, "constraint resolved to nothing, skipping");
                return Vec::new();
            }
        };

        let mut matched = match_releases(&releases, &resolved);
        if latest_only || is_latest_pattern {
            matched = reduce_to_latest(matched);
        }

        matched
            .into_iter()
            .flat_map(|r| r.artifacts.into_iter())
            .map(|artifact| self.to_mirror_package(artifact))
            .collect()
    }

    async fn releases_for(&self, package: &PackageName) -> Vec<Release> {
        let artifacts = self.index.project_info(package, &self.arch_exclude).await;
        group_into_releases(package, artifacts)
    }

    /// Implements §4.5 steps 1-2: normalizes `latest`, recognizes the
    /// `N latest<spec>` pattern, and replaces it with an equivalent
    /// `>=picked[,<spec>]` specifier set. Returns `None` if the constraint
    /// can't be resolved against anything, else the resolved constraint
    /// alongside whether it came from the `latest` pattern -- any such
    /// constraint forces latest-only reduction regardless of the caller's
    /// `latest_only`, matching the source's `"latest" in wanted_version`
    /// behavior.
    fn resolve_constraint(&self, raw: &str, releases: &[Release]) -> Option<(ResolvedConstraint, bool)> {
        let normalized = if raw.trim() == "latest" {
            "1 latest".to_owned()
        } else {
            raw.trim().to_owned()
        };

        if let Some(caps) = LATEST_RE.captures(&normalized) {
            let n: usize = caps
                .name("n")
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(1);
            let trailing_spec = caps.name("spec").map(|m| m.as_str().trim()).filter(|s| !s.is_empty());

            let trailing_specifiers = match trailing_spec {
                Some(spec_text) => match Specifiers::parse(spec_text) {
                    Some(specs) => Some(specs),
                    None => return None,
                },
                None => None,
            };

            let mut candidates: BTreeMap<Version, ()> = BTreeMap::new();
            for release in releases {
                let Some(version) = parse_version(&release.version) else {
                    continue;
                };
                if let Some(specs) = &trailing_specifiers {
                    if !specs.contains(&version) {
                        continue;
                    }
                }
                candidates.insert(version, ());
            }

            let ascending: Vec<Version> = candidates.into_keys().collect();
            let take = n.min(ascending.len());
            if take == 0 {
                return None;
            }
            let picked = ascending[ascending.len() - take].clone();

            let mut text = format!(">={picked}");
            if let Some(spec_text) = trailing_spec {
                text.push(',');
                text.push_str(spec_text);
            }
            return Specifiers::parse(&text).map(|specs| (ResolvedConstraint::Specifiers(specs), true));
        }

        match Specifiers::parse(&normalized) {
            Some(specs) => Some((ResolvedConstraint::Specifiers(specs), false)),
            None => Some((ResolvedConstraint::Literal(normalized), false)),
        }
    }

    fn to_mirror_package(&self, artifact: Artifact) -> MirrorPackage {
        let local_path = local_path(
            &self.destination,
            &artifact.sha256,
            &artifact.filename,
            self.simple_layout,
        );
        MirrorPackage {
            project: artifact.project,
            version: artifact.version,
            url: Some(artifact.url),
            local_path: Some(local_path),
            sha256: Some(artifact.sha256),
        }
    }
}

enum ResolvedConstraint {
    Specifiers(Specifiers),
    Literal(String),
}

fn match_releases<'a>(releases: &'a [Release], constraint: &ResolvedConstraint) -> Vec<Release> {
    releases
        .iter()
        .filter(|release| match constraint {
            ResolvedConstraint::Specifiers(specs) => match parse_version(&release.version) {
                Some(v) => specs.contains(&v),
                None => false,
            },
            ResolvedConstraint::Literal(text) => release.version == *text,
        })
        .cloned()
        .collect()
}

/// Reduces a matched set to the single highest non-yanked version (all of
/// its artifacts). Releases whose version doesn't parse are ignored here
/// since there's no ordering to reduce by.
fn reduce_to_latest(matched: Vec<Release>) -> Vec<Release> {
    matched
        .into_iter()
        .filter(|r| !r.yanked)
        .filter_map(|r| parse_version(&r.version).map(|v| (v, r)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, r)| vec![r])
        .unwrap_or_default()
}

fn group_into_releases(package: &PackageName, artifacts: Vec<Artifact>) -> Vec<Release> {
    let mut by_version: IndexMap<String, Vec<Artifact>> = IndexMap::new();
    for artifact in artifacts {
        by_version.entry(artifact.version.clone()).or_default().push(artifact);
    }
    by_version
        .into_iter()
        .map(|(version, artifacts)| Release {
            project: package.clone(),
            yanked: artifacts.iter().any(|a| a.yanked),
            version,
            artifacts,
        })
        .collect()
}

/// §4.5 local-path rule.
pub fn local_path(root: &Path, sha256: &str, basename: &str, simple_layout: bool) -> PathBuf {
    if simple_layout && sha256.len() >= 4 {
        root.join("packages")
            .join(&sha256[0..2])
            .join(&sha256[2..4])
            .join(&sha256[4..])
            .join(basename)
    } else {
        root.join(basename)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flat_layout_path() {
        let p = local_path(Path::new("/dest"), "abcdef0123", "demo-1.0.whl", false);
        assert_eq!(p, PathBuf::from("/dest/demo-1.0.whl"));
    }

    #[test]
    fn simple_layout_path_is_hash_sharded() {
        let p = local_path(Path::new("/dest"), "abcdef0123", "demo-1.0.whl", true);
        assert_eq!(
            p,
            PathBuf::from("/dest/packages/ab/cd/ef0123/demo-1.0.whl")
        );
    }

    #[test]
    fn local_path_is_pure() {
        let a = local_path(Path::new("/dest"), "abcd1234", "x.whl", true);
        let b = local_path(Path::new("/dest"), "abcd1234", "x.whl", true);
        assert_eq!(a, b);
    }

    #[test]
    fn latest_equals_one_latest() {
        let re = &*LATEST_RE;
        assert!(re.is_match("latest"));
        assert!(re.is_match("1 latest"));
    }

    #[test]
    fn n_latest_with_trailing_spec_pattern() {
        let caps = LATEST_RE.captures("2 latest<3").unwrap();
        assert_eq!(caps.name("n").unwrap().as_str(), "2");
        assert_eq!(caps.name("spec").unwrap().as_str(), "<3");
    }

    #[test]
    fn reduce_to_latest_skips_yanked() {
        let releases = vec![
            Release {
                project: PackageName::from("demo"),
                version: "2.0".into(),
                yanked: true,
                artifacts: vec![],
            },
            Release {
                project: PackageName::from("demo"),
                version: "1.0".into(),
                yanked: false,
                artifacts: vec![],
            },
        ];
        let reduced = reduce_to_latest(releases);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].version, "1.0");
    }
}
