use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::warn;

use crate::detect::detect_platform;
use crate::error::ExtractError;
use crate::fetch;
use crate::html::page_meta;
use crate::router::Extractor;
use crate::text::{clean_text, parse_engagement_value, strip_tags};
use crate::types::{
    AuthorInfo, EngagementMetrics, Extracted, ExtractionResult, MediaItem, MediaKind,
    MentionedLink, Platform, PlatformData,
};

const VERSION: &str = "1.2.0";

const SYNDICATION_URL: &str = "https://cdn.syndication.twimg.com/tweet-result";
const OEMBED_URL: &str = "https://publish.twitter.com/oembed";

static TWEET_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:twitter|x)\.com/[^/]+/status(?:es)?/(\d+)").unwrap()
});

/// Tweet extraction: syndication API, then oEmbed, then OG page scrape.
/// Each stage runs only when the one before it failed.
pub struct TwitterExtractor;

#[async_trait]
impl Extractor for TwitterExtractor {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    fn can_handle(&self, url: &str) -> bool {
        detect_platform(url) == Platform::Twitter
    }

    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        let Some(tweet_id) = tweet_id(url) else {
            return Ok(ExtractionResult::failure(
                Platform::Twitter,
                VERSION,
                format!("no tweet id in url: {}", url),
            ));
        };

        match from_syndication(&tweet_id).await {
            Ok(fields) => {
                return Ok(ExtractionResult::success(Platform::Twitter, VERSION, fields))
            }
            Err(e) => warn!("syndication failed for tweet {}: {}", tweet_id, e),
        }

        match from_oembed(url, &tweet_id).await {
            Ok(fields) => {
                return Ok(ExtractionResult::success(Platform::Twitter, VERSION, fields))
            }
            Err(e) => warn!("oembed failed for tweet {}: {}", tweet_id, e),
        }

        match from_page_scrape(url, &tweet_id).await {
            Ok(fields) => {
                return Ok(ExtractionResult::success(Platform::Twitter, VERSION, fields))
            }
            Err(e) => warn!("page scrape failed for tweet {}: {}", tweet_id, e),
        }

        Ok(ExtractionResult::failure(
            Platform::Twitter,
            VERSION,
            format!(
                "all extraction methods exhausted for tweet {} (syndication, oembed, page scrape)",
                tweet_id
            ),
        ))
    }
}

fn tweet_id(url: &str) -> Option<String> {
    TWEET_ID_RE
        .captures(url)
        .map(|caps| caps[1].to_string())
}

/// Token the syndication CDN expects alongside the id: `(id / 1e15) · π` in
/// base 36 with all zeros and the radix point removed.
fn syndication_token(tweet_id: &str) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let id: f64 = tweet_id.parse().unwrap_or(0.0);
    let value = (id / 1e15) * std::f64::consts::PI;

    let mut out = Vec::new();
    let mut int_part = value.trunc() as u64;
    if int_part == 0 {
        out.push(b'0');
    }
    let mut int_digits = Vec::new();
    while int_part > 0 {
        int_digits.push(DIGITS[(int_part % 36) as usize]);
        int_part /= 36;
    }
    int_digits.reverse();
    out.extend(int_digits);
    out.push(b'.');

    let mut frac = value.fract();
    for _ in 0..8 {
        frac *= 36.0;
        let digit = (frac.trunc() as usize).min(35);
        out.push(DIGITS[digit]);
        frac = frac.fract();
    }

    out.iter()
        .map(|&b| b as char)
        .filter(|&c| c != '0' && c != '.')
        .collect()
}

async fn from_syndication(tweet_id: &str) -> Result<Extracted, ExtractError> {
    let endpoint = format!(
        "{}?id={}&lang=en&token={}",
        SYNDICATION_URL,
        tweet_id,
        syndication_token(tweet_id)
    );
    let body = fetch::fetch_json(&endpoint).await?;
    normalize_syndication(tweet_id, &body)
}

fn normalize_syndication(
    tweet_id: &str,
    body: &serde_json::Value,
) -> Result<Extracted, ExtractError> {
    if body.get("tombstone").is_some() || body.get("__typename").and_then(|t| t.as_str())
        == Some("TweetTombstone")
    {
        return Err(ExtractError::Parse("tweet is unavailable".into()));
    }

    let text = body
        .get("text")
        .and_then(|t| t.as_str())
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ExtractError::Parse("syndication payload has no text".into()))?;

    let author = body.get("user").map(|user| {
        let name = user
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or("unknown")
            .to_string();
        let handle = user.get("screen_name").and_then(|s| s.as_str());
        AuthorInfo {
            name,
            handle: handle.map(str::to_string),
            profile_url: handle.map(|h| format!("https://x.com/{}", h)),
            avatar_url: user
                .get("profile_image_url_https")
                .and_then(|a| a.as_str())
                .map(str::to_string),
            bio: None,
            verified: user
                .get("is_blue_verified")
                .or_else(|| user.get("verified"))
                .and_then(|v| v.as_bool()),
            follower_count: None,
        }
    });

    let mut engagement = EngagementMetrics::default();
    engagement.likes = body.get("favorite_count").and_then(parse_engagement_value);
    engagement.replies = body
        .get("conversation_count")
        .and_then(parse_engagement_value);

    let mut media = Vec::new();
    if let Some(photos) = body.get("photos").and_then(|p| p.as_array()) {
        for photo in photos {
            if let Some(url) = photo.get("url").and_then(|u| u.as_str()) {
                let mut item = MediaItem::new(MediaKind::Image, url);
                item.width = photo.get("width").and_then(|w| w.as_u64()).map(|w| w as u32);
                item.height = photo.get("height").and_then(|h| h.as_u64()).map(|h| h as u32);
                media.push(item);
            }
        }
    }
    if let Some(video) = body.get("video") {
        let variant_url = video
            .get("variants")
            .and_then(|v| v.as_array())
            .and_then(|variants| {
                variants
                    .iter()
                    .find(|v| v.get("type").and_then(|t| t.as_str()) == Some("video/mp4"))
                    .or_else(|| variants.first())
            })
            .and_then(|v| v.get("src").or_else(|| v.get("url")))
            .and_then(|u| u.as_str());
        if let Some(url) = variant_url {
            let mut item = MediaItem::new(MediaKind::Video, url);
            item.thumbnail_url = video
                .get("poster")
                .and_then(|p| p.as_str())
                .map(str::to_string);
            media.push(item);
        }
    }

    let mentioned_links = body
        .get("entities")
        .and_then(|e| e.get("urls"))
        .and_then(|u| u.as_array())
        .map(|urls| {
            urls.iter()
                .filter_map(|u| {
                    let expanded = u.get("expanded_url").and_then(|e| e.as_str())?;
                    Some(MentionedLink {
                        url: expanded.to_string(),
                        title: u
                            .get("display_url")
                            .and_then(|d| d.as_str())
                            .map(str::to_string),
                        domain: crate::text::domain_of(expanded),
                        favicon: None,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let thumbnail_url = media.first().map(|m| m.url.clone());
    let title = author
        .as_ref()
        .map(|a| format!("{} on X", a.name));

    Ok(Extracted {
        title,
        content: text,
        author,
        thumbnail_url,
        engagement: Some(engagement),
        media,
        mentioned_links,
        platform_data: Some(PlatformData::Twitter {
            tweet_id: tweet_id.to_string(),
            lang: body.get("lang").and_then(|l| l.as_str()).map(str::to_string),
            created_at: body
                .get("created_at")
                .and_then(|c| c.as_str())
                .map(str::to_string),
            strategy: "syndication".into(),
        }),
        ..Default::default()
    })
}

async fn from_oembed(url: &str, tweet_id: &str) -> Result<Extracted, ExtractError> {
    let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
    let endpoint = format!("{}?url={}&omit_script=true", OEMBED_URL, encoded);
    let body = fetch::fetch_json(&endpoint).await?;

    let html = body
        .get("html")
        .and_then(|h| h.as_str())
        .ok_or_else(|| ExtractError::Parse("oembed payload has no html".into()))?;
    let content = strip_tags(html);
    if content.is_empty() {
        return Err(ExtractError::Parse("oembed html stripped to nothing".into()));
    }

    let author = body
        .get("author_name")
        .and_then(|n| n.as_str())
        .map(|name| {
            let mut a = AuthorInfo::named(name);
            a.profile_url = body
                .get("author_url")
                .and_then(|u| u.as_str())
                .map(str::to_string);
            a
        });
    let title = author.as_ref().map(|a| format!("{} on X", a.name));

    Ok(Extracted {
        title,
        content,
        author,
        platform_data: Some(PlatformData::Twitter {
            tweet_id: tweet_id.to_string(),
            lang: None,
            created_at: None,
            strategy: "oembed".into(),
        }),
        ..Default::default()
    })
}

async fn from_page_scrape(url: &str, tweet_id: &str) -> Result<Extracted, ExtractError> {
    let html = fetch::fetch_text(url).await?;
    let meta = page_meta(&html);

    let content = meta
        .description
        .clone()
        .or_else(|| meta.title.clone())
        .ok_or_else(|| ExtractError::Parse("page has no og metadata".into()))?;

    Ok(Extracted {
        title: meta.title,
        content,
        thumbnail_url: meta.image,
        platform_data: Some(PlatformData::Twitter {
            tweet_id: tweet_id.to_string(),
            lang: None,
            created_at: None,
            strategy: "scrape".into(),
        }),
        ..Default::default()
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tweet_id_from_url_shapes() {
        assert_eq!(
            tweet_id("https://x.com/someone/status/1234567890").as_deref(),
            Some("1234567890")
        );
        assert_eq!(
            tweet_id("https://twitter.com/someone/statuses/42").as_deref(),
            Some("42")
        );
        assert_eq!(
            tweet_id("https://mobile.twitter.com/a/status/7?s=20").as_deref(),
            Some("7")
        );
        assert_eq!(tweet_id("https://x.com/someone"), None);
        assert_eq!(tweet_id("https://x.com/i/lists/123"), None);
    }

    #[test]
    fn token_is_deterministic_and_stripped() {
        let t1 = syndication_token("1640809727047073792");
        let t2 = syndication_token("1640809727047073792");
        assert_eq!(t1, t2);
        assert!(!t1.is_empty());
        assert!(!t1.contains('0'));
        assert!(!t1.contains('.'));
        // Different ids produce different tokens
        assert_ne!(t1, syndication_token("1234567890123456789"));
    }

    #[test]
    fn can_handle_twitter_hosts_only() {
        let e = TwitterExtractor;
        assert!(e.can_handle("https://x.com/a/status/1"));
        assert!(e.can_handle("https://twitter.com/a"));
        assert!(!e.can_handle("https://example.com/x.com"));
    }

    #[tokio::test]
    async fn missing_id_fails_without_network() {
        let e = TwitterExtractor;
        let result = e.extract("https://x.com/just-a-profile").await.unwrap();
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("no tweet id"));
    }

    #[test]
    fn syndication_payload_normalized() {
        let body: serde_json::Value = serde_json::json!({
            "text": "Hello from the bird site",
            "lang": "en",
            "created_at": "2024-03-01T10:00:00.000Z",
            "user": {
                "name": "Jane",
                "screen_name": "jane",
                "profile_image_url_https": "https://pbs.twimg.com/jane.jpg",
                "is_blue_verified": true
            },
            "favorite_count": 1200,
            "conversation_count": 34,
            "photos": [{"url": "https://pbs.twimg.com/media/a.jpg", "width": 1024, "height": 768}],
            "entities": {"urls": [{"expanded_url": "https://example.com/post", "display_url": "example.com/post"}]}
        });

        let fields = normalize_syndication("1640809727047073792", &body).unwrap();
        assert_eq!(fields.content, "Hello from the bird site");
        assert_eq!(fields.title.as_deref(), Some("Jane on X"));

        let author = fields.author.unwrap();
        assert_eq!(author.handle.as_deref(), Some("jane"));
        assert_eq!(author.profile_url.as_deref(), Some("https://x.com/jane"));
        assert_eq!(author.verified, Some(true));

        let engagement = fields.engagement.unwrap();
        assert_eq!(engagement.likes, Some(1200));
        assert_eq!(engagement.replies, Some(34));

        assert_eq!(fields.media.len(), 1);
        assert_eq!(fields.media[0].width, Some(1024));
        assert_eq!(fields.mentioned_links.len(), 1);
        assert_eq!(
            fields.mentioned_links[0].domain.as_deref(),
            Some("example.com")
        );

        match fields.platform_data.unwrap() {
            PlatformData::Twitter { tweet_id, strategy, lang, .. } => {
                assert_eq!(tweet_id, "1640809727047073792");
                assert_eq!(strategy, "syndication");
                assert_eq!(lang.as_deref(), Some("en"));
            }
            other => panic!("wrong platform data: {:?}", other),
        }
    }

    #[test]
    fn syndication_tombstone_rejected() {
        let body = serde_json::json!({"tombstone": {"text": "This tweet is unavailable"}});
        assert!(normalize_syndication("1", &body).is_err());
    }

    #[test]
    fn syndication_video_variant_selection() {
        let body = serde_json::json!({
            "text": "clip",
            "video": {
                "poster": "https://pbs.twimg.com/poster.jpg",
                "variants": [
                    {"type": "application/x-mpegURL", "src": "https://video/hls.m3u8"},
                    {"type": "video/mp4", "src": "https://video/clip.mp4"}
                ]
            }
        });
        let fields = normalize_syndication("1", &body).unwrap();
        assert_eq!(fields.media.len(), 1);
        assert_eq!(fields.media[0].url, "https://video/clip.mp4");
        assert_eq!(
            fields.media[0].thumbnail_url.as_deref(),
            Some("https://pbs.twimg.com/poster.jpg")
        );
    }
}
