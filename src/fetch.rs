use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

/// Download a text resource with a single blocking request.
///
/// There is no automatic retry: a failed download aborts the comparison step
/// and is reported to the caller.
pub fn fetch_text(url: &str) -> Result<String> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("pooldetect/0.1"));

    let client = Client::builder()
        .default_headers(headers)
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to fetch {url}"))?;

    let status = response.status();
    if !status.is_success() {
        bail!("failed to fetch {url}: status {status}");
    }

    response
        .text()
        .with_context(|| format!("failed to read response body of {url}"))
}
