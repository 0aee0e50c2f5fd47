//! Resolver/driver (C6): the fixpoint loop tying the selector, downloader,
//! metadata reader and marker evaluator together.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use tracing::{info, warn};

use crate::config::Config;
use crate::downloader::Downloader;
use crate::graph::DependencyGraph;
use crate::index::IndexClient;
use crate::marker::{self, Environment};
use crate::metadata;
use crate::package_name::{NormalizedPackageName, PackageName};
use crate::selector::Selector;
use crate::types::{Constraint, MirrorPackage};

pub struct Resolver {
    index: Arc<IndexClient>,
    selector: Selector,
    downloader: Downloader,
    environment: Option<Environment>,
    packages: HashMap<String, Vec<String>>,
    packages_re: HashMap<String, Vec<String>>,
}

impl Resolver {
    /// `http` is shared with the `IndexClient` wrapped by `index`, so the
    /// whole run -- project lookups and artifact downloads alike -- goes
    /// through one client and one connection pool.
    pub fn new(
        http: reqwest::Client,
        index: Arc<IndexClient>,
        destination: PathBuf,
        simple_layout: bool,
        config: &Config,
    ) -> Self {
        let environment = config.marker_environment();
        let selector = Selector::new(
            index.clone(),
            destination,
            simple_layout,
            config.arch_exclude.clone(),
            environment.clone(),
        );
        Self {
            index,
            selector,
            downloader: Downloader::new(http),
            environment,
            packages: config.packages.clone(),
            packages_re: config.packages_re.clone(),
        }
    }

    /// Runs the fixpoint loop to completion: §4.6 steps 2-3.
    pub async fn run(&self) -> (HashSet<MirrorPackage>, DependencyGraph) {
        let seed_map = self.build_seed_map().await;
        let mut frontier = self.selector.select(&seed_map, false).await;

        let mut downloaded: HashSet<MirrorPackage> = HashSet::new();
        let mut graph = DependencyGraph::new();

        loop {
            frontier.retain(|p| !downloaded.contains(p));
            if frontier.is_empty() {
                break;
            }

            let outcomes = self
                .downloader
                .download_all(std::mem::take(&mut frontier))
                .await;

            // (requiring package, required name, constraint text) triples
            // collected across this whole batch, so one selector call can
            // resolve every requirement at once while still letting us
            // attribute the resulting edges back to the package that asked
            // for them.
            let mut requirement_edges: Vec<(MirrorPackage, PackageName)> = Vec::new();
            let mut next_seeds: IndexMap<PackageName, Vec<String>> = IndexMap::new();

            for outcome in outcomes {
                let package = outcome.package;
                let path = match outcome.result {
                    Ok(path) => path,
                    Err(e) => {
                        warn!(project = %package.project, version = %package.version, error = %e, "dropping package after download failure");
                        continue;
                    }
                };

                for dep in self.dependencies_of(&path) {
                    next_seeds
                        .entry(dep.name.clone())
                        .or_default()
                        .push(dep.constraint_text());
                    requirement_edges.push((package.simplified(), dep.name));
                }

                downloaded.insert(package);
            }

            let new_frontier = self.selector.select(&next_seeds, true).await;

            let mut by_name: HashMap<NormalizedPackageName, Vec<MirrorPackage>> = HashMap::new();
            for package in &new_frontier {
                by_name
                    .entry(package.project.normalize())
                    .or_default()
                    .push(package.simplified());
            }

            for (from, required_name) in requirement_edges {
                if let Some(matches) = by_name.get(&required_name.normalize()) {
                    for to in matches {
                        graph.add_dependency(from.clone(), to.clone());
                    }
                }
            }

            frontier = new_frontier
                .into_iter()
                .filter(|p| !downloaded.contains(p))
                .collect();
        }

        info!(count = downloaded.len(), "resolution complete");
        (downloaded, graph)
    }

    /// §4.6 step 1: expand `packages_re` against the upstream project-name
    /// list, then overlay the explicit `packages` map (which replaces, not
    /// merges, regex-derived entries for the same project).
    async fn build_seed_map(&self) -> IndexMap<PackageName, Vec<String>> {
        let mut seeds: IndexMap<PackageName, Vec<String>> = IndexMap::new();

        if !self.packages_re.is_empty() {
            let upstream_names = self.index.list_project_names().await;
            for (pattern, constraints) in &self.packages_re {
                let Ok(re) = Regex::new(&format!("^(?:{pattern})$")) else {
                    warn!(pattern = %pattern, "invalid packages_re pattern, skipping");
                    continue;
                };
                for name in &upstream_names {
                    if re.is_match(name) {
                        seeds
                            .entry(PackageName::from(name.as_str()))
                            .or_default()
                            .extend(constraints.iter().cloned());
                    }
                }
            }
        }

        for (name, constraints) in &self.packages {
            seeds.insert(PackageName::from(name.as_str()), constraints.clone());
        }

        seeds
    }

    /// Reads an artifact's declared requirements (C4), parses each, and
    /// discards any whose marker fails to evaluate against the configured
    /// environment (C2).
    fn dependencies_of(&self, artifact_path: &Path) -> Vec<ResolvedDependency> {
        let raw_requirements = metadata::read_requires_dist(artifact_path);
        let mut deps = Vec::new();
        for raw in raw_requirements {
            let parsed = match crate::reqparse::requirement(&raw) {
                Ok(p) => p,
                Err(e) => {
                    warn!(requirement = %raw, error = %e, "failed to parse requirement, skipping");
                    continue;
                }
            };
            if let Some(marker) = &parsed.marker {
                if !marker::evaluate(marker, self.environment.as_ref()) {
                    continue;
                }
            }
            let constraint = if parsed.specifiers.0.is_empty() {
                Constraint::Literal("latest".to_owned())
            } else {
                Constraint::Specifiers(parsed.specifiers)
            };
            deps.push(ResolvedDependency {
                name: parsed.name,
                constraint,
            });
        }
        deps
    }
}

struct ResolvedDependency {
    name: PackageName,
    constraint: Constraint,
}

impl ResolvedDependency {
    fn constraint_text(&self) -> String {
        match &self.constraint {
            Constraint::Specifiers(specs) => specs.to_string(),
            Constraint::Literal(text) => text.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn packages_re_pattern_is_anchored() {
        let re = Regex::new(&format!("^(?:{})$", "^py.*$")).unwrap();
        assert!(re.is_match("pyyaml"));
        assert!(!re.is_match("not-py"));
    }
}
