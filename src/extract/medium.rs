use async_trait::async_trait;

use crate::detect::detect_platform;
use crate::error::ExtractError;
use crate::extract::article::{extract_article, ArticleSource};
use crate::router::Extractor;
use crate::types::{ExtractionResult, Platform};

const SOURCE: ArticleSource = ArticleSource {
    platform: Platform::Medium,
    version: "1.0.0",
    // Current layout, the data-field body of older posts, then the legacy
    // postArticle container
    container_selectors: &[
        "article",
        "section[data-field='body']",
        "div.postArticle-content",
    ],
    cdn_filter: Some("miro.medium.com"),
};

pub struct MediumExtractor;

#[async_trait]
impl Extractor for MediumExtractor {
    fn platform(&self) -> Platform {
        Platform::Medium
    }

    fn version(&self) -> &'static str {
        SOURCE.version
    }

    fn can_handle(&self, url: &str) -> bool {
        detect_platform(url) == Platform::Medium
    }

    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        extract_article(&SOURCE, url).await
    }
}
