use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Most variants are *recovered* by callers (logged, then treated as an empty
/// result) rather than propagated; see each component's module docs for which
/// variants are fatal for a run and which merely drop the offending item.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("config error: {0}")]
    #[diagnostic(code(pypisync::config))]
    Config(String),

    #[error("upstream unavailable for {project}: {reason}")]
    #[diagnostic(code(pypisync::upstream_unavailable))]
    UpstreamUnavailable { project: String, reason: String },

    #[error("invalid version: {0}")]
    #[diagnostic(code(pypisync::invalid_version))]
    InvalidVersion(String),

    #[error("invalid specifier: {0}")]
    #[diagnostic(code(pypisync::invalid_specifier))]
    InvalidSpecifier(String),

    #[error("marker parse error: {0}")]
    #[diagnostic(code(pypisync::marker_parse))]
    MarkerParseError(String),

    #[error("metadata error for {artifact}: {reason}")]
    #[diagnostic(code(pypisync::metadata))]
    MetadataError { artifact: String, reason: String },

    #[error("integrity error: {path} expected sha256 {expected} but got {actual}")]
    #[diagnostic(code(pypisync::integrity))]
    IntegrityError {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("download error: {url}: {source}")]
    #[diagnostic(code(pypisync::download))]
    DownloadError {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    #[diagnostic(code(pypisync::http))]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    #[diagnostic(code(pypisync::io))]
    Io(#[from] std::io::Error),

    #[error("the destination directory is locked by another run: {0}")]
    #[diagnostic(code(pypisync::locked))]
    DestinationLocked(PathBuf),
}

pub type Result<T> = std::result::Result<T, Error>;
