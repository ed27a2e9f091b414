use async_trait::async_trait;

use crate::detect::detect_platform;
use crate::error::ExtractError;
use crate::extract::article::{extract_article, ArticleSource};
use crate::router::Extractor;
use crate::types::{ExtractionResult, Platform};

const SOURCE: ArticleSource = ArticleSource {
    platform: Platform::Substack,
    version: "1.0.0",
    container_selectors: &["div.available-content", "div.body.markup", "article"],
    cdn_filter: Some("substackcdn.com"),
};

pub struct SubstackExtractor;

#[async_trait]
impl Extractor for SubstackExtractor {
    fn platform(&self) -> Platform {
        Platform::Substack
    }

    fn version(&self) -> &'static str {
        SOURCE.version
    }

    fn can_handle(&self, url: &str) -> bool {
        detect_platform(url) == Platform::Substack
    }

    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        extract_article(&SOURCE, url).await
    }
}
