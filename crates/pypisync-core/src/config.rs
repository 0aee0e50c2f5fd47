//! Typed configuration (C10), matching the JSON schema in §6.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::marker::{Environment, VarBinding};

pub const DEFAULT_ENDPOINT: &str = "https://pypi.org";

#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    pub destination_folder: Option<String>,
    #[serde(default)]
    pub arch_exclude: Option<Vec<String>>,
    #[serde(default)]
    pub environment: Option<HashMap<String, Option<Vec<String>>>>,
    #[serde(default)]
    pub packages_re: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub packages: Option<HashMap<String, Vec<String>>>,
}

/// Validated configuration, ready for the resolver.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Url,
    pub destination_folder: PathBuf,
    pub arch_exclude: Vec<String>,
    /// `None` iff the config omitted `environment` entirely -- the marker
    /// evaluator treats that as "no environment was supplied" (§4.2 rule 1)
    /// rather than as every variable being absent.
    pub environment: Option<HashMap<String, Option<Vec<String>>>>,
    pub packages_re: HashMap<String, Vec<String>>,
    pub packages: HashMap<String, Vec<String>>,
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)
            .map_err(|e| Error::Config(format!("invalid config JSON: {e}")))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let destination_folder = raw
            .destination_folder
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::Config("destination_folder is required".to_owned()))?;

        let endpoint = match raw.endpoint.filter(|s| !s.trim().is_empty()) {
            Some(text) => {
                Url::parse(&text).map_err(|e| Error::Config(format!("invalid endpoint: {e}")))?
            }
            None => Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
        };

        let packages = raw.packages.unwrap_or_default();

        Ok(Config {
            endpoint,
            destination_folder: PathBuf::from(destination_folder),
            arch_exclude: raw.arch_exclude.unwrap_or_default(),
            environment: raw.environment,
            packages_re: raw.packages_re.unwrap_or_default(),
            packages,
        })
    }

    pub fn lock_path(&self) -> PathBuf {
        self.destination_folder.join(".pypisync.lock")
    }

    /// Converts the configured `environment` section into the marker
    /// evaluator's `VarBinding` model. Returns `None` when `environment` was
    /// omitted entirely, which the evaluator treats as "no filtering at all"
    /// rather than every variable being absent. A per-variable `null` entry
    /// is an explicitly absent variable; an empty list is the "impossible"
    /// binding; anything else is its candidate values.
    pub fn marker_environment(&self) -> Option<Environment> {
        let raw = self.environment.as_ref()?;
        Some(
            raw.iter()
                .map(|(var, values)| {
                    let binding = match values {
                        None => VarBinding::Absent,
                        Some(values) if values.is_empty() => VarBinding::Empty,
                        Some(values) => VarBinding::Values(values.clone()),
                    };
                    (var.clone(), binding)
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn requires_destination_folder() {
        let err = Config::from_json(r#"{"packages": {}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_packages_map_is_valid() {
        let config = Config::from_json(r#"{"destination_folder": "/tmp/out", "packages": {}}"#)
            .unwrap();
        assert!(config.packages.is_empty());
        assert_eq!(config.endpoint.as_str(), "https://pypi.org/");
    }

    #[test]
    fn defaults_apply_when_optional_fields_absent() {
        let config = Config::from_json(
            r#"{"destination_folder": "out", "packages": {"demo": ["latest"]}}"#,
        )
        .unwrap();
        assert!(config.arch_exclude.is_empty());
        assert!(config.environment.is_none());
        assert!(config.marker_environment().is_none());
        assert!(config.packages_re.is_empty());
        assert_eq!(config.packages["demo"], vec!["latest".to_owned()]);
    }

    #[test]
    fn environment_nulls_become_absent_bindings() {
        let config = Config::from_json(
            r#"{"destination_folder": "out", "packages": {}, "environment": {"extra": [], "os_name": null, "sys_platform": ["linux"]}}"#,
        )
        .unwrap();
        let env = config.marker_environment().unwrap();
        assert_eq!(env.get("extra"), Some(&VarBinding::Empty));
        assert_eq!(env.get("os_name"), Some(&VarBinding::Absent));
        assert_eq!(
            env.get("sys_platform"),
            Some(&VarBinding::Values(vec!["linux".to_owned()]))
        );
    }

    #[test]
    fn rejects_blank_destination_folder() {
        let err =
            Config::from_json(r#"{"destination_folder": "   ", "packages": {}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
