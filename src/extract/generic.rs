use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::ExtractError;
use crate::fetch;
use crate::html::{collect_images, content_links, json_ld_articles, main_content, microdata, page_meta};
use crate::router::Extractor;
use crate::summarize::{SummarizeClient, SummarizeOptions};
use crate::text::clean_text;
use crate::types::{AuthorInfo, Extracted, ExtractionResult, Platform, PlatformData};

const VERSION: &str = "1.3.0";

/// Content shorter than this is "thin" and worth a second attempt through
/// the external service.
const MIN_CONTENT_CHARS: usize = 150;

/// Paywall/bot-check fragments. Case-insensitive substring match against the
/// extracted text and the raw HTML; first match wins. Inherently heuristic:
/// a page quoting one of these in running text is a false positive we accept.
const BLOCKED_PHRASES: &[&str] = &[
    "subscribe to continue",
    "sign in to continue",
    "to continue reading",
    "create a free account",
    "already a subscriber",
    "this article is for subscribers",
    "subscribers only",
    "enable javascript",
    "javascript is required",
    "javascript is disabled",
    "access denied",
    "are you a robot",
    "verify you are human",
    "checking your browser",
    "complete the captcha",
    "please turn off your ad blocker",
];

/// What the local scrape produced before any service fallback.
struct LocalScrape {
    fields: Option<Extracted>,
    blocked: Option<&'static str>,
    thin: bool,
}

/// Unconditional fallback. OG, JSON-LD, microdata and heuristic container
/// extraction merged in that priority, then blocked/thin detection with a
/// service re-attempt before settling for degraded local content.
pub struct GenericExtractor {
    summarize: Arc<SummarizeClient>,
}

impl GenericExtractor {
    pub fn new(summarize: Arc<SummarizeClient>) -> Self {
        GenericExtractor { summarize }
    }
}

#[async_trait]
impl Extractor for GenericExtractor {
    fn platform(&self) -> Platform {
        Platform::Generic
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    /// Always applicable; registered last so everything unmatched lands here.
    fn can_handle(&self, _url: &str) -> bool {
        true
    }

    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        let html = match fetch::fetch_text(url).await {
            Ok(html) => html,
            Err(e) => {
                return Ok(ExtractionResult::failure(
                    Platform::Generic,
                    VERSION,
                    format!("page fetch failed: {}", e),
                ))
            }
        };

        let local = scrape_local(&html);

        if (local.blocked.is_some() || local.thin) && self.summarize.is_firecrawl_available() {
            if let Some(phrase) = local.blocked {
                warn!("content looks blocked (\"{}\"), retrying via service", phrase);
            }
            match self.from_service(url).await {
                Ok(fields) => {
                    return Ok(ExtractionResult::success(Platform::Generic, VERSION, fields))
                }
                Err(e) => warn!("service fallback failed for {}: {}", url, e),
            }
        }

        // Degraded local content still beats nothing; only a fully empty
        // merge is a failure.
        match local.fields {
            Some(fields) => Ok(ExtractionResult::success(Platform::Generic, VERSION, fields)),
            None => Ok(ExtractionResult::failure(
                Platform::Generic,
                VERSION,
                "no extractable content found on page",
            )),
        }
    }
}

impl GenericExtractor {
    async fn from_service(&self, url: &str) -> Result<Extracted, ExtractError> {
        let result = self
            .summarize
            .extract(url, &SummarizeOptions::firecrawl_always())
            .await?;
        if !result.success || result.content.trim().is_empty() {
            return Err(ExtractError::Service("service returned no content".into()));
        }

        let word_count = Some(result.content.split_whitespace().count());
        Ok(Extracted {
            title: result.title,
            content: result.content,
            excerpt: result.description,
            platform_data: Some(PlatformData::Generic {
                strategy: result.diagnostics.unwrap_or_else(|| "firecrawl".into()),
                blocked: false,
                word_count,
            }),
            ..Default::default()
        })
    }
}

fn scrape_local(html: &str) -> LocalScrape {
    let meta = page_meta(html);
    let article = json_ld_articles(html).into_iter().next();
    let micro = microdata(html);
    let raw = main_content(html, &[]);

    let title = meta
        .title
        .clone()
        .or_else(|| {
            article
                .as_ref()
                .and_then(|a| a.get("headline"))
                .and_then(|h| h.as_str())
                .map(clean_text)
        })
        .or_else(|| micro.headline.clone());

    let (content, strategy) = match (
        article
            .as_ref()
            .and_then(|a| a.get("articleBody"))
            .and_then(|b| b.as_str())
            .map(clean_text)
            .filter(|b| !b.is_empty()),
        micro.body.clone(),
        raw,
    ) {
        (Some(body), _, _) => (Some(body), "json-ld"),
        (None, Some(body), _) => (Some(body), "microdata"),
        (None, None, Some(body)) => (Some(body), "heuristic"),
        (None, None, None) => (meta.description.clone(), "og"),
    };

    let blocked = content
        .as_deref()
        .and_then(|c| blocked_phrase(c))
        .or_else(|| blocked_phrase(html));
    let thin = content
        .as_deref()
        .map(|c| c.chars().count() < MIN_CONTENT_CHARS)
        .unwrap_or(true);

    let author = meta
        .author
        .clone()
        .or_else(|| {
            article.as_ref().and_then(|a| {
                super::article::ld_author_name(a)
            })
        })
        .or_else(|| micro.author.clone())
        .map(AuthorInfo::named);

    let thumbnail_url = meta.image.clone().or_else(|| micro.image.clone());

    let fields = content.map(|content| Extracted {
        title,
        content: content.clone(),
        excerpt: meta.description.clone(),
        author,
        thumbnail_url,
        media: collect_images(html, None),
        mentioned_links: content_links(html, &[]),
        platform_data: Some(PlatformData::Generic {
            strategy: strategy.to_string(),
            blocked: blocked.is_some(),
            word_count: Some(content.split_whitespace().count()),
        }),
        ..Default::default()
    });

    LocalScrape {
        fields,
        blocked,
        thin,
    }
}

/// First blocked phrase found, if any.
fn blocked_phrase(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    BLOCKED_PHRASES
        .iter()
        .find(|phrase| lowered.contains(*phrase))
        .copied()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> String {
        format!(
            r#"<html><head><meta property="og:title" content="Page Title">
            <meta property="og:description" content="Short description"></head>
            <body>{}</body></html>"#,
            body
        )
    }

    #[test]
    fn json_ld_body_beats_heuristic() {
        let filler = "Container text that is long enough to count as content. ".repeat(4);
        let html = format!(
            r#"<html><head><script type="application/ld+json">
            {{"@type":"Article","articleBody":"The canonical body text."}}</script>
            </head><body><article>{}</article></body></html>"#,
            filler
        );
        let local = scrape_local(&html);
        let fields = local.fields.unwrap();
        assert_eq!(fields.content, "The canonical body text.");
        match fields.platform_data.unwrap() {
            PlatformData::Generic { strategy, .. } => assert_eq!(strategy, "json-ld"),
            other => panic!("wrong platform data: {:?}", other),
        }
    }

    #[test]
    fn heuristic_when_no_structured_body() {
        let filler = "Plain article paragraphs, repeated to pass the size check. ".repeat(4);
        let local = scrape_local(&page(&format!("<article>{}</article>", filler)));
        let fields = local.fields.unwrap();
        assert!(fields.content.starts_with("Plain article paragraphs"));
        assert!(!local.thin);
        match fields.platform_data.unwrap() {
            PlatformData::Generic { strategy, blocked, .. } => {
                assert_eq!(strategy, "heuristic");
                assert!(!blocked);
            }
            other => panic!("wrong platform data: {:?}", other),
        }
    }

    #[test]
    fn og_description_as_last_resort() {
        let local = scrape_local(&page(""));
        let fields = local.fields.unwrap();
        assert_eq!(fields.content, "Short description");
        assert!(local.thin);
        match fields.platform_data.unwrap() {
            PlatformData::Generic { strategy, .. } => assert_eq!(strategy, "og"),
            other => panic!("wrong platform data: {:?}", other),
        }
    }

    #[test]
    fn blocked_phrase_case_insensitive() {
        assert_eq!(
            blocked_phrase("Please SUBSCRIBE To Continue reading this piece"),
            Some("subscribe to continue")
        );
        assert_eq!(blocked_phrase("perfectly normal text"), None);
    }

    #[test]
    fn blocked_detected_in_content() {
        let filler = "Some lead-in text before the wall appears on the page here. ".repeat(3);
        let html = page(&format!(
            "<article>{}Subscribe to continue reading the rest.</article>",
            filler
        ));
        let local = scrape_local(&html);
        assert_eq!(local.blocked, Some("subscribe to continue"));
        // Blocked local content is still returned, flagged
        let fields = local.fields.unwrap();
        match fields.platform_data.unwrap() {
            PlatformData::Generic { blocked, .. } => assert!(blocked),
            other => panic!("wrong platform data: {:?}", other),
        }
    }

    #[test]
    fn blocked_detected_in_raw_html_only() {
        // The phrase sits outside the extracted container
        let filler = "Real visible content that is certainly long enough to count here. "
            .repeat(4);
        let html = format!(
            r#"<html><body><div id="paywall-overlay">Create a free account</div>
            <article>{}</article></body></html>"#,
            filler
        );
        let local = scrape_local(&html);
        assert_eq!(local.blocked, Some("create a free account"));
    }

    #[test]
    fn empty_page_has_no_fields() {
        let local = scrape_local("<html><body></body></html>");
        assert!(local.fields.is_none());
        assert!(local.thin);
    }

    #[test]
    fn thin_content_flagged() {
        let local = scrape_local(&page("<article>way too short</article>"));
        assert!(local.thin);
    }
}
