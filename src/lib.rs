//! Content-extraction router for pasted note URLs.
//!
//! Give [`extract_from_url`] an absolute URL and get back a normalized
//! [`ExtractionResult`]: platform tag, title/body/author, media, engagement
//! and mentioned links, or a failure record explaining why. Platform-specific
//! extractors (API-first, scraping as fallback) are selected by a
//! registration-ordered router with a generic scrape as the catch-all.

pub mod detect;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod router;
pub mod summarize;
pub mod text;
pub mod types;

use std::sync::Arc;

pub use detect::detect_platform;
pub use error::ExtractError;
pub use router::{Extractor, ExtractorRouter};
pub use summarize::{SummarizeClient, SummarizeOptions, SummarizeResult};
pub use types::{
    AuthorInfo, EngagementMetrics, Extracted, ExtractionResult, MediaItem, MediaKind,
    MentionedLink, Platform, PlatformData,
};

/// One-shot extraction with a router built from the environment.
/// Embedders that extract repeatedly should build an [`ExtractorRouter`]
/// once and reuse it.
pub async fn extract_from_url(url: &str) -> ExtractionResult {
    let router = ExtractorRouter::new(Arc::new(SummarizeClient::from_env()));
    router.extract_from_url(url).await
}
