//! Thin HTTP client wrapper shared by the upstream index client (C3) and the
//! downloader (C7). Simplified relative to the teacher's `index/http.rs`,
//! which layers full RFC7234 cache semantics on top of `reqwest`: this
//! crate's caching needs are limited to per-project JSON memoization (done
//! by the caller, in `index::Client`) and resumable byte ranges (done by
//! `downloader`), so a bare client-plus-proxy wrapper is enough.

use std::env;

use reqwest::Client;
use url::Url;

use crate::error::Result;

pub const USER_AGENT: &str = concat!("pypisync/", env!("CARGO_PKG_VERSION"));

/// Builds a `reqwest::Client` honoring `HTTP_PROXY` (per §6) if set.
pub fn build_client() -> Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Ok(proxy) = env::var("HTTP_PROXY") {
        if !proxy.is_empty() {
            builder = builder.proxy(reqwest::Proxy::http(&proxy)?);
        }
    }
    Ok(builder.build()?)
}

/// Joins `base` with a path segment, tolerating a base URL that may or may
/// not already end in `/`.
pub fn join(base: &Url, segment: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    Ok(base.join(segment)?)
}

impl From<url::ParseError> for crate::error::Error {
    fn from(e: url::ParseError) -> Self {
        crate::error::Error::Config(format!("invalid URL: {e}"))
    }
}
