use std::sync::LazyLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use crate::error::ExtractError;

/// Every outbound call is bounded by this; a timeout surfaces as a transport
/// error and advances the caller's fallback chain like any other failure.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

static CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(FETCH_TIMEOUT)
        .build()
        .expect("http client")
});

pub fn client() -> &'static reqwest::Client {
    &CLIENT
}

/// GET a URL and return the body text; non-2xx is an error.
pub async fn fetch_text(url: &str) -> Result<String, ExtractError> {
    let resp = CLIENT.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ExtractError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp.text().await?)
}

/// GET a URL and parse the body as JSON; non-2xx is an error.
pub async fn fetch_json(url: &str) -> Result<serde_json::Value, ExtractError> {
    let resp = CLIENT.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ExtractError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    resp.json::<serde_json::Value>()
        .await
        .map_err(|e| ExtractError::Parse(e.to_string()))
}

/// GET with extra per-request headers (API media types and the like).
pub async fn fetch_json_with_headers(
    url: &str,
    headers: &[(&str, &str)],
) -> Result<serde_json::Value, ExtractError> {
    let mut req = CLIENT.get(url);
    for (k, v) in headers {
        req = req.header(*k, *v);
    }
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ExtractError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    resp.json::<serde_json::Value>()
        .await
        .map_err(|e| ExtractError::Parse(e.to_string()))
}

/// Same but returning the raw body (GitHub raw README).
pub async fn fetch_text_with_headers(
    url: &str,
    headers: &[(&str, &str)],
) -> Result<String, ExtractError> {
    let mut req = CLIENT.get(url);
    for (k, v) in headers {
        req = req.header(*k, *v);
    }
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ExtractError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp.text().await?)
}
