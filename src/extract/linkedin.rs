use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::detect::detect_platform;
use crate::error::ExtractError;
use crate::fetch;
use crate::html::page_meta;
use crate::router::Extractor;
use crate::types::{AuthorInfo, Extracted, ExtractionResult, Platform, PlatformData};

const VERSION: &str = "1.0.0";

// "Jane Doe on LinkedIn: the first line of the post..."
static TITLE_AUTHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.{2,80}?) on LinkedIn\b").unwrap());

/// LinkedIn gates everything behind auth, so OG/meta scraping is the only
/// strategy; the author is recovered from the share title when possible.
pub struct LinkedinExtractor;

#[async_trait]
impl Extractor for LinkedinExtractor {
    fn platform(&self) -> Platform {
        Platform::Linkedin
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    fn can_handle(&self, url: &str) -> bool {
        detect_platform(url) == Platform::Linkedin
    }

    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        let html = match fetch::fetch_text(url).await {
            Ok(html) => html,
            Err(e) => {
                return Ok(ExtractionResult::failure(
                    Platform::Linkedin,
                    VERSION,
                    format!("linkedin page fetch failed: {}", e),
                ))
            }
        };

        let meta = page_meta(&html);
        let Some(content) = meta.description.clone().or_else(|| meta.title.clone()) else {
            return Ok(ExtractionResult::failure(
                Platform::Linkedin,
                VERSION,
                "linkedin page carries no og metadata",
            ));
        };

        let author = meta
            .author
            .clone()
            .map(AuthorInfo::named)
            .or_else(|| author_from_title(meta.title.as_deref()));

        let post_type = url::Url::parse(url).ok().and_then(|u| {
            u.path_segments()
                .and_then(|mut s| s.next().map(str::to_string))
                .filter(|s| !s.is_empty())
        });

        let fields = Extracted {
            title: meta.title,
            content,
            author,
            thumbnail_url: meta.image,
            platform_data: Some(PlatformData::Linkedin { post_type }),
            ..Default::default()
        };
        Ok(ExtractionResult::success(Platform::Linkedin, VERSION, fields))
    }
}

fn author_from_title(title: Option<&str>) -> Option<AuthorInfo> {
    let title = title?;
    TITLE_AUTHOR_RE
        .captures(title)
        .map(|caps| AuthorInfo::named(caps[1].trim()))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_recovered_from_share_title() {
        let author =
            author_from_title(Some("Jane Doe on LinkedIn: Excited to announce our new thing"))
                .unwrap();
        assert_eq!(author.name, "Jane Doe");
    }

    #[test]
    fn unrelated_titles_yield_no_author() {
        assert!(author_from_title(Some("Sign in to LinkedIn")).is_none());
        assert!(author_from_title(None).is_none());
    }

    #[test]
    fn can_handle_linkedin_only() {
        let e = LinkedinExtractor;
        assert!(e.can_handle("https://www.linkedin.com/posts/jane_announce-activity-1"));
        assert!(!e.can_handle("https://example.com/linkedin.com"));
    }
}
