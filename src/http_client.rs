//! Shared construction of outbound `reqwest` clients.

use reqwest::Client;
use std::time::Duration;

/// Build an HTTP client for a provider adapter.
///
/// No timeout is applied unless `timeout_secs` is set; an unresponsive provider then stalls
/// the request that called it.
pub(crate) fn build_client(
    user_agent: &str,
    timeout_secs: Option<u64>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder().user_agent(user_agent);
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build()
}

/// Join a base URL and a relative path with exactly one slash between them.
pub(crate) fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
