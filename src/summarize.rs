use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::warn;

use crate::error::ExtractError;
use crate::fetch;
use crate::types::TranscriptSegment;

/// Remote summarization/transcription service endpoint.
const SERVICE_URL_ENV: &str = "NOTE_SUMMARIZE_URL";
/// Direct spider.cloud fallback key (page extraction only, no transcripts).
const SPIDER_KEY_ENV: &str = "SPIDER_API_KEY";

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeOptions {
    /// "always" forces the firecrawl-style backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firecrawl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// "prefer" asks for a transcript when the target carries audio/video.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_transcript: Option<String>,
    pub transcript_timestamps: bool,
}

impl SummarizeOptions {
    /// Blocked/thin page re-extraction.
    pub fn firecrawl_always() -> Self {
        SummarizeOptions {
            firecrawl: Some("always".into()),
            format: Some("markdown".into()),
            media_transcript: None,
            transcript_timestamps: false,
        }
    }

    /// Podcast/audio extraction with timestamped transcript preferred.
    pub fn transcript_preferred() -> Self {
        SummarizeOptions {
            firecrawl: None,
            format: Some("markdown".into()),
            media_transcript: Some("prefer".into()),
            transcript_timestamps: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub source: String,
    #[serde(default)]
    pub word_count: Option<usize>,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeMedia {
    pub kind: Option<String>,
    pub video_url: Option<String>,
    pub duration_seconds: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeResult {
    pub success: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub word_count: Option<usize>,
    #[serde(default)]
    pub transcript: Option<Transcript>,
    #[serde(default)]
    pub media: Option<SummarizeMedia>,
    /// Which backend handled the request.
    #[serde(default)]
    pub diagnostics: Option<String>,
}

/// Narrow client for the external summarization/transcription capability.
///
/// Two backends, preferred in order: the remote service (full capability,
/// including podcast transcripts) and direct spider.cloud page scraping
/// (markdown only). Both optional; with neither configured every capability
/// check reports unavailable and `extract` errors without any network call.
pub struct SummarizeClient {
    service_url: Option<String>,
    spider: Option<Spider>,
}

impl SummarizeClient {
    pub fn from_env() -> Self {
        let service_url = std::env::var(SERVICE_URL_ENV)
            .ok()
            .filter(|u| !u.is_empty());
        let spider = std::env::var(SPIDER_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .and_then(|key| match Spider::new(Some(key)) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!("spider client unavailable: {}", e);
                    None
                }
            });
        SummarizeClient {
            service_url,
            spider,
        }
    }

    /// No backends; every capability reports unavailable.
    pub fn disabled() -> Self {
        SummarizeClient {
            service_url: None,
            spider: None,
        }
    }

    pub fn with_service_url(url: impl Into<String>) -> Self {
        SummarizeClient {
            service_url: Some(url.into()),
            spider: None,
        }
    }

    /// Firecrawl-style blocked-page re-extraction available?
    pub fn is_firecrawl_available(&self) -> bool {
        self.service_url.is_some() || self.spider.is_some()
    }

    /// Audio transcript extraction available?
    pub fn is_podcast_available(&self) -> bool {
        self.service_url.is_some()
    }

    pub async fn extract(
        &self,
        url: &str,
        options: &SummarizeOptions,
    ) -> Result<SummarizeResult, ExtractError> {
        if let Some(base) = &self.service_url {
            return self.extract_via_service(base, url, options).await;
        }
        if self.spider.is_some() {
            return self.extract_via_spider(url).await;
        }
        Err(ExtractError::Service("no backend configured".into()))
    }

    async fn extract_via_service(
        &self,
        base: &str,
        url: &str,
        options: &SummarizeOptions,
    ) -> Result<SummarizeResult, ExtractError> {
        #[derive(Serialize)]
        struct Request<'a> {
            url: &'a str,
            #[serde(flatten)]
            options: &'a SummarizeOptions,
        }

        let endpoint = format!("{}/extract", base.trim_end_matches('/'));
        let resp = fetch::client()
            .post(&endpoint)
            .json(&Request { url, options })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractError::HttpStatus {
                status: status.as_u16(),
                url: endpoint,
            });
        }
        resp.json::<SummarizeResult>()
            .await
            .map_err(|e| ExtractError::Service(e.to_string()))
    }

    async fn extract_via_spider(&self, url: &str) -> Result<SummarizeResult, ExtractError> {
        let spider = self
            .spider
            .as_ref()
            .ok_or_else(|| ExtractError::Service("no backend configured".into()))?;

        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Markdown)),
            ..Default::default()
        };

        let response = spider
            .scrape_url(url, Some(params), "application/json")
            .await
            .map_err(|e| ExtractError::Service(format!("spider scrape failed: {}", e)))?;

        let parsed: serde_json::Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };

        let content = parsed
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|obj| obj.get("content"))
            .and_then(|c| c.as_str())
            .map(strip_images)
            .ok_or_else(|| ExtractError::Service("no content in spider response".into()))?;

        let word_count = content.split_whitespace().count();
        Ok(SummarizeResult {
            success: !content.trim().is_empty(),
            content,
            title: None,
            description: None,
            site_name: None,
            word_count: Some(word_count),
            transcript: None,
            media: None,
            diagnostics: Some("spider".into()),
        })
    }
}

/// Remove markdown image syntax: ![alt](url) and [![alt](url)](link)
fn strip_images(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").to_string()
}

// ── Tests ──
