//! Upstream index client (C3).
//!
//! Memoizes `project_info` results per `(name, arch_exclude)` for the
//! lifetime of a run using an `elsa::sync::FrozenMap`, the same
//! append-only-cache pattern the teacher's `PackageDb` uses for its
//! artifact-info cache: cheap, lock-free reads after first insert, and no
//! need to ever evict since a run only ever grows the cache.

use std::sync::Arc;

use elsa::sync::FrozenMap;
use regex::Regex;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

use super::json_types::RawProjectInfo;
use crate::http;
use crate::package_name::PackageName;
use crate::types::Artifact;

pub struct IndexClient {
    http: Client,
    index_url: Url,
    cache: FrozenMap<String, Box<Vec<Artifact>>>,
}

impl IndexClient {
    pub fn new(http: Client, index_url: Url) -> Self {
        Self {
            http,
            index_url,
            cache: FrozenMap::new(),
        }
    }

    /// Enumerates every project name known to the index, via the bulk
    /// "simple" listing page. Network/parse failures yield an empty list --
    /// the driver then simply has nothing to expand `packages_re` against.
    pub async fn list_project_names(&self) -> Vec<String> {
        match self.list_project_names_fallible().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "failed to list upstream project names");
                Vec::new()
            }
        }
    }

    async fn list_project_names_fallible(&self) -> crate::error::Result<Vec<String>> {
        let response = self.http.get(self.index_url.clone()).send().await?;
        if !response.status().is_success() {
            return Ok(Vec::new());
        }
        let body = response.text().await?;
        Ok(extract_anchor_text(&body))
    }

    /// Fetches `<endpoint>/pypi/<name>/json`, walks `releases[version][*]`,
    /// and returns one `Artifact` per variant with its `sha256` fragment
    /// attached to the URL. Never fails (§4.3): network/parse errors yield an
    /// empty list. Memoized per `(name, arch_exclude)`.
    pub async fn project_info(&self, name: &PackageName, arch_exclude: &[String]) -> Vec<Artifact> {
        let key = cache_key(name, arch_exclude);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let artifacts = self.fetch_project_info(name, arch_exclude).await;
        self.cache
            .insert(key, Box::new(artifacts.clone()));
        artifacts
    }

    async fn fetch_project_info(&self, name: &PackageName, arch_exclude: &[String]) -> Vec<Artifact> {
        match self.fetch_project_info_fallible(name).await {
            Ok(artifacts) => artifacts
                .into_iter()
                .filter(|a| !is_arch_excluded(a, arch_exclude))
                .collect(),
            Err(e) => {
                debug!(project = %name, error = %e, "upstream unavailable, treating as no releases");
                Vec::new()
            }
        }
    }

    async fn fetch_project_info_fallible(
        &self,
        name: &PackageName,
    ) -> crate::error::Result<Vec<Artifact>> {
        let url = http::join(&self.index_url, &format!("pypi/{}/json", name.as_str()))?;
        let response = self.http.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Ok(Vec::new());
        }
        let raw: RawProjectInfo = response.json().await?;
        let project_name = PackageName::from(raw.info.name.as_str());

        let mut artifacts = Vec::new();
        for (version, variants) in raw.releases {
            for variant in variants {
                let Ok(mut url) = Url::parse(&variant.url) else {
                    continue;
                };
                let sha256 = variant.digests.sha256.unwrap_or_default();
                if !sha256.is_empty() {
                    url.set_fragment(Some(&format!("sha256={sha256}")));
                }
                artifacts.push(Artifact {
                    project: project_name.clone(),
                    version: version.clone(),
                    filename: variant.filename,
                    url,
                    sha256,
                    yanked: variant.yanked,
                });
            }
        }
        Ok(artifacts)
    }
}

fn cache_key(name: &PackageName, arch_exclude: &[String]) -> String {
    format!("{}\u{0}{}", name.normalize(), arch_exclude.join("\u{0}"))
}

/// `filename \ "<project>-<version>"` contains any `arch_exclude` substring.
fn is_arch_excluded(artifact: &Artifact, arch_exclude: &[String]) -> bool {
    if arch_exclude.is_empty() {
        return false;
    }
    let prefix = format!("{}-{}", artifact.project.as_str(), artifact.version);
    let suffix = artifact
        .filename
        .strip_prefix(&prefix)
        .unwrap_or(&artifact.filename);
    arch_exclude.iter().any(|excl| suffix.contains(excl.as_str()))
}

fn extract_anchor_text(html: &str) -> Vec<String> {
    // The bulk project-name listing only needs anchor text, not the full
    // PEP 503 structure that C8 must emit byte-for-byte; a small regex scan
    // is enough and avoids pulling in a full HTML parser for a one-shot read.
    static ANCHOR: once_cell::sync::Lazy<Regex> =
        once_cell::sync::Lazy::new(|| Regex::new(r"(?is)<a[^>]*>([^<]+)</a>").unwrap());
    ANCHOR
        .captures_iter(html)
        .map(|c| c[1].trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extracts_anchor_text() {
        let html = r#"<html><body><a href="/simple/foo/">foo</a><a href="/simple/bar-baz/">bar-baz</a></body></html>"#;
        assert_eq!(extract_anchor_text(html), vec!["foo", "bar-baz"]);
    }

    #[test]
    fn arch_exclude_matches_filename_suffix() {
        let artifact = Artifact {
            project: PackageName::from("demo"),
            version: "1.0".into(),
            filename: "demo-1.0-cp39-cp39-manylinux1_x86_64.whl".into(),
            url: "https://example.com/demo-1.0.whl".parse().unwrap(),
            sha256: "abc".into(),
            yanked: false,
        };
        assert!(is_arch_excluded(&artifact, &["manylinux1".to_owned()]));
        assert!(!is_arch_excluded(&artifact, &["win32".to_owned()]));
        assert!(!is_arch_excluded(&artifact, &[]));
    }
}
