//! Shared HTTP client construction policy for search providers.
//!
//! Timeouts and compression are fixed per client. The User-Agent is not set
//! here because every request carries the caller's rotating identity.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use super::SearchError;

/// Default connect timeout for provider requests.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default read timeout for provider requests.
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Builds a provider HTTP client.
///
/// Some sandboxed macOS environments panic while reading system proxy
/// settings; in that case the client is rebuilt from proxy env vars only.
///
/// # Errors
///
/// Returns [`SearchError::InvalidRequest`] when the client cannot be built.
pub(crate) fn build_search_http_client(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
) -> Result<Client, SearchError> {
    match try_build_client(connect_timeout_secs, read_timeout_secs, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            warn!("search client hit system proxy panic; using env-proxy fallback builder");
            try_build_client(connect_timeout_secs, read_timeout_secs, true).map_err(|failure| {
                match failure {
                    BuildClientFailure::Panic => SearchError::invalid_request(
                        "HTTP client construction panicked while loading proxy settings",
                    ),
                    BuildClientFailure::Build(error) => SearchError::invalid_request(format!(
                        "HTTP client construction failed: {error}"
                    )),
                }
            })
        }
        Err(BuildClientFailure::Build(error)) => Err(SearchError::invalid_request(format!(
            "HTTP client construction failed: {error}"
        ))),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    let https = find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]);
    if let Some(proxy) = https
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    let http = find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]);
    if let Some(proxy) = http
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
