pub mod article;
pub mod generic;
pub mod github;
pub mod linkedin;
pub mod medium;
pub mod podcast;
pub mod reddit;
pub mod substack;
pub mod twitter;
pub mod youtube;

use std::sync::Arc;

use crate::router::Extractor;
use crate::summarize::SummarizeClient;

/// Full registry in registration order. The generic extractor accepts every
/// URL and must stay last.
pub fn all_extractors(summarize: Arc<SummarizeClient>) -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(twitter::TwitterExtractor),
        Box::new(youtube::YoutubeExtractor::new(Arc::clone(&summarize))),
        Box::new(reddit::RedditExtractor),
        Box::new(linkedin::LinkedinExtractor),
        Box::new(medium::MediumExtractor),
        Box::new(substack::SubstackExtractor),
        Box::new(github::GithubExtractor),
        Box::new(podcast::PodcastExtractor::new(Arc::clone(&summarize))),
        Box::new(generic::GenericExtractor::new(summarize)),
    ]
}
