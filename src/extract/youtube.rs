use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

use crate::detect::detect_platform;
use crate::error::ExtractError;
use crate::fetch;
use crate::router::Extractor;
use crate::summarize::{SummarizeClient, SummarizeOptions, Transcript};
use crate::types::{
    AuthorInfo, EngagementMetrics, Extracted, ExtractionResult, MediaItem, MediaKind, Platform,
    PlatformData,
};

const VERSION: &str = "1.1.0";

static ID_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtu\.be/([A-Za-z0-9_-]{6,})",
        r"[?&]v=([A-Za-z0-9_-]{6,})",
        r"youtube\.com/shorts/([A-Za-z0-9_-]{6,})",
        r"youtube\.com/embed/([A-Za-z0-9_-]{6,})",
        r"youtube\.com/live/([A-Za-z0-9_-]{6,})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static VIEW_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""viewCount"\s*:\s*"(\d+)""#).unwrap());
static LIKE_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""likeCount"\s*:\s*"?(\d+)"#).unwrap());

/// Video metadata merged from the parallel oEmbed + noembed fetches.
/// oEmbed wins on field collisions; noembed fills the gaps.
#[derive(Debug, Default)]
struct VideoMeta {
    title: Option<String>,
    author_name: Option<String>,
    author_url: Option<String>,
    thumbnail_url: Option<String>,
    provider: Option<String>,
}

pub struct YoutubeExtractor {
    summarize: Arc<SummarizeClient>,
}

impl YoutubeExtractor {
    pub fn new(summarize: Arc<SummarizeClient>) -> Self {
        YoutubeExtractor { summarize }
    }
}

#[async_trait]
impl Extractor for YoutubeExtractor {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    fn can_handle(&self, url: &str) -> bool {
        detect_platform(url) == Platform::Youtube
    }

    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        let Some(video_id) = video_id(url) else {
            return Ok(ExtractionResult::failure(
                Platform::Youtube,
                VERSION,
                format!("no video id in url: {}", url),
            ));
        };
        let watch_url = format!("https://www.youtube.com/watch?v={}", video_id);

        // The three sources are independent; fetch them together and merge,
        // rather than falling back from one to the next.
        let oembed_url = format!(
            "https://www.youtube.com/oembed?url={}&format=json",
            encode(&watch_url)
        );
        let noembed_url = format!("https://noembed.com/embed?url={}", encode(&watch_url));
        let (oembed, noembed, transcript) = tokio::join!(
            fetch::fetch_json(&oembed_url),
            fetch::fetch_json(&noembed_url),
            fetch_transcript(&self.summarize, &watch_url),
        );

        let oembed = match oembed {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("oembed failed for video {}: {}", video_id, e);
                None
            }
        };
        let noembed = match noembed {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("noembed failed for video {}: {}", video_id, e);
                None
            }
        };

        let meta = merge_meta(oembed.as_ref(), noembed.as_ref());
        if meta.title.is_none() && transcript.is_none() {
            return Ok(ExtractionResult::failure(
                Platform::Youtube,
                VERSION,
                format!("no metadata available for video {}", video_id),
            ));
        }

        let transcript_text = transcript.as_ref().map(|t| {
            t.segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        });
        let content = match (&meta.title, transcript_text) {
            (Some(title), Some(text)) if !text.is_empty() => format!("{}\n\n{}", title, text),
            (_, Some(text)) if !text.is_empty() => text,
            (Some(title), _) => title.clone(),
            _ => String::new(),
        };
        if content.is_empty() {
            return Ok(ExtractionResult::failure(
                Platform::Youtube,
                VERSION,
                format!("no usable metadata for video {}", video_id),
            ));
        }

        // Engagement is optional enrichment; a failed page scrape is ignored.
        let engagement = scrape_counts(&watch_url).await;

        let author = meta.author_name.as_ref().map(|name| {
            let mut a = AuthorInfo::named(name.clone());
            a.profile_url = meta.author_url.clone();
            a
        });

        let mut video = MediaItem::new(MediaKind::Video, watch_url.clone());
        video.thumbnail_url = meta.thumbnail_url.clone();

        let fields = Extracted {
            title: meta.title.clone(),
            content,
            author,
            thumbnail_url: meta.thumbnail_url.clone(),
            engagement,
            media: vec![video],
            platform_data: Some(PlatformData::Youtube {
                video_id,
                channel_url: meta.author_url,
                provider: meta.provider,
                has_transcript: transcript.is_some(),
                transcript_segments: transcript.map(|t| t.segments).unwrap_or_default(),
            }),
            ..Default::default()
        };
        Ok(ExtractionResult::success(Platform::Youtube, VERSION, fields))
    }
}

fn video_id(url: &str) -> Option<String> {
    ID_RES
        .iter()
        .find_map(|re| re.captures(url).map(|c| c[1].to_string()))
}

fn encode(url: &str) -> String {
    url::form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

fn str_field(v: Option<&serde_json::Value>, key: &str) -> Option<String> {
    v.and_then(|v| v.get(key))
        .and_then(|s| s.as_str())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn merge_meta(
    oembed: Option<&serde_json::Value>,
    noembed: Option<&serde_json::Value>,
) -> VideoMeta {
    VideoMeta {
        title: str_field(oembed, "title").or_else(|| str_field(noembed, "title")),
        author_name: str_field(oembed, "author_name").or_else(|| str_field(noembed, "author_name")),
        author_url: str_field(oembed, "author_url").or_else(|| str_field(noembed, "author_url")),
        thumbnail_url: str_field(oembed, "thumbnail_url")
            .or_else(|| str_field(noembed, "thumbnail_url")),
        provider: str_field(oembed, "provider_name")
            .or_else(|| str_field(noembed, "provider_name")),
    }
}

async fn fetch_transcript(summarize: &SummarizeClient, url: &str) -> Option<Transcript> {
    if !summarize.is_podcast_available() {
        return None;
    }
    match summarize
        .extract(url, &SummarizeOptions::transcript_preferred())
        .await
    {
        Ok(result) => result.transcript,
        Err(e) => {
            warn!("transcript fetch failed: {}", e);
            None
        }
    }
}

/// Best-effort view/like counts from the watch page. Failures are swallowed.
async fn scrape_counts(watch_url: &str) -> Option<EngagementMetrics> {
    let html = fetch::fetch_text(watch_url).await.ok()?;
    parse_counts(&html)
}

fn parse_counts(html: &str) -> Option<EngagementMetrics> {
    let views = VIEW_COUNT_RE
        .captures(html)
        .and_then(|c| c[1].parse().ok());
    let likes = LIKE_COUNT_RE
        .captures(html)
        .and_then(|c| c[1].parse().ok());
    if views.is_none() && likes.is_none() {
        return None;
    }
    Some(EngagementMetrics {
        views,
        likes,
        ..Default::default()
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_id_from_url_shapes() {
        assert_eq!(video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(
            video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            video_id("https://www.youtube.com/shorts/abc123XYZ_-").as_deref(),
            Some("abc123XYZ_-")
        );
        assert_eq!(
            video_id("https://www.youtube.com/embed/abc123XYZ").as_deref(),
            Some("abc123XYZ")
        );
        assert_eq!(video_id("https://www.youtube.com/@somechannel"), None);
    }

    #[test]
    fn oembed_overwrites_noembed() {
        let oembed = serde_json::json!({"title": "From oEmbed", "author_name": "Channel A"});
        let noembed = serde_json::json!({
            "title": "From noembed",
            "author_name": "Channel B",
            "thumbnail_url": "https://i.ytimg.com/vi/x/hq.jpg",
            "provider_name": "YouTube"
        });
        let meta = merge_meta(Some(&oembed), Some(&noembed));
        assert_eq!(meta.title.as_deref(), Some("From oEmbed"));
        assert_eq!(meta.author_name.as_deref(), Some("Channel A"));
        // Fields absent from oEmbed fall through to noembed
        assert_eq!(meta.thumbnail_url.as_deref(), Some("https://i.ytimg.com/vi/x/hq.jpg"));
        assert_eq!(meta.provider.as_deref(), Some("YouTube"));
    }

    #[test]
    fn merge_survives_missing_sources() {
        let noembed = serde_json::json!({"title": "Only noembed"});
        let meta = merge_meta(None, Some(&noembed));
        assert_eq!(meta.title.as_deref(), Some("Only noembed"));
        let empty = merge_meta(None, None);
        assert!(empty.title.is_none());
    }

    #[test]
    fn counts_from_page_json() {
        let html = r#"..."viewCount":"123456","otherField":1,"likeCount":"789"..."#;
        let counts = parse_counts(html).unwrap();
        assert_eq!(counts.views, Some(123_456));
        assert_eq!(counts.likes, Some(789));

        let unquoted = r#""likeCount":4321,"#;
        assert_eq!(parse_counts(unquoted).unwrap().likes, Some(4321));

        assert!(parse_counts("<html>no counts</html>").is_none());
    }
}
