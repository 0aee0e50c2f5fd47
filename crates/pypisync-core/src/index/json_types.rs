//! Wire schema for the upstream per-project JSON endpoint (§6): a trimmed
//! version of the public `info.name` / `releases[version][*]` shape. Modeled
//! after the teacher's `project_info.rs`, cut down to the fields §3/§6
//! actually name.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct RawProjectInfo {
    pub info: RawInfo,
    #[serde(default)]
    pub releases: HashMap<String, Vec<RawArtifact>>,
}

#[derive(Debug, Deserialize)]
pub struct RawInfo {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawArtifact {
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub yanked: bool,
    #[serde(default)]
    pub digests: RawDigests,
}

#[derive(Debug, Deserialize, Default)]
pub struct RawDigests {
    pub sha256: Option<String>,
}
