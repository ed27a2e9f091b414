use thiserror::Error;

/// Failure origins for a single extraction strategy.
///
/// Strategies catch these locally and advance their fallback chain; only the
/// exhaustion of a chain turns one into a failure-shaped result.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// URL shape carries no extractable id; nothing was fetched.
    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),

    #[error("http status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Transport-level failure, including timeouts.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// 200 response with a malformed or unexpected body.
    #[error("unexpected response shape: {0}")]
    Parse(String),

    #[error("summarize service: {0}")]
    Service(String),

    #[error("feed parse: {0}")]
    Xml(String),
}
