use async_trait::async_trait;

use crate::detect::detect_platform;
use crate::error::ExtractError;
use crate::fetch;
use crate::router::Extractor;
use crate::text::clean_text;
use crate::types::{
    AuthorInfo, EngagementMetrics, Extracted, ExtractionResult, MediaItem, MediaKind,
    MentionedLink, Platform, PlatformData,
};

const VERSION: &str = "1.0.1";

/// Reddit's public JSON API: one strategy, no scraping fallback. The
/// canonical post URL with `.json` appended returns the full listing.
pub struct RedditExtractor;

#[async_trait]
impl Extractor for RedditExtractor {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    fn can_handle(&self, url: &str) -> bool {
        detect_platform(url) == Platform::Reddit
    }

    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        let canonical = match canonicalize(url) {
            Ok(c) => c,
            Err(e) => {
                return Ok(ExtractionResult::failure(
                    Platform::Reddit,
                    VERSION,
                    e.to_string(),
                ))
            }
        };

        let endpoint = format!("{}.json", canonical);
        match fetch::fetch_json(&endpoint).await.and_then(|v| normalize_listing(&v)) {
            Ok(fields) => Ok(ExtractionResult::success(Platform::Reddit, VERSION, fields)),
            Err(e) => Ok(ExtractionResult::failure(
                Platform::Reddit,
                VERSION,
                format!("reddit api extraction failed: {}", e),
            )),
        }
    }
}

/// Normalize any reddit URL shape to `https://www.reddit.com/...` with no
/// query or fragment. Short `redd.it/<id>` links become `/comments/<id>`.
fn canonicalize(raw: &str) -> Result<String, ExtractError> {
    let parsed = url::Url::parse(raw)
        .map_err(|_| ExtractError::UnsupportedUrl(raw.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ExtractError::UnsupportedUrl(raw.to_string()))?;

    let path = if host.eq_ignore_ascii_case("redd.it") {
        let id = parsed
            .path()
            .trim_matches('/')
            .split('/')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ExtractError::UnsupportedUrl(raw.to_string()))?;
        format!("/comments/{}", id)
    } else if host.eq_ignore_ascii_case("reddit.com")
        || host.to_ascii_lowercase().ends_with(".reddit.com")
    {
        parsed.path().trim_end_matches('/').to_string()
    } else {
        return Err(ExtractError::UnsupportedUrl(raw.to_string()));
    };

    Ok(format!("https://www.reddit.com{}", path))
}

fn normalize_listing(body: &serde_json::Value) -> Result<Extracted, ExtractError> {
    let post = body
        .get(0)
        .and_then(|l| l.get("data"))
        .and_then(|d| d.get("children"))
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("data"))
        .ok_or_else(|| ExtractError::Parse("listing has no post data".into()))?;

    let title = post
        .get("title")
        .and_then(|t| t.as_str())
        .map(clean_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ExtractError::Parse("post has no title".into()))?;

    let selftext = post
        .get("selftext")
        .and_then(|s| s.as_str())
        .map(clean_text)
        .filter(|s| !s.is_empty());
    let content = selftext.clone().unwrap_or_else(|| title.clone());

    let author = post
        .get("author")
        .and_then(|a| a.as_str())
        .filter(|a| *a != "[deleted]")
        .map(|name| {
            let mut a = AuthorInfo::named(format!("u/{}", name));
            a.handle = Some(name.to_string());
            a.profile_url = Some(format!("https://www.reddit.com/user/{}", name));
            a
        });

    let subreddit = post
        .get("subreddit")
        .and_then(|s| s.as_str())
        .unwrap_or("")
        .to_string();
    let post_id = post
        .get("id")
        .and_then(|i| i.as_str())
        .unwrap_or("")
        .to_string();

    let engagement = EngagementMetrics {
        upvotes: post.get("score").and_then(|s| s.as_u64()),
        comments: post.get("num_comments").and_then(|n| n.as_u64()),
        ..Default::default()
    };

    let mut media = Vec::new();
    // Preview image URLs arrive entity-encoded
    if let Some(source) = post
        .get("preview")
        .and_then(|p| p.get("images"))
        .and_then(|i| i.get(0))
        .and_then(|i| i.get("source"))
    {
        if let Some(src) = source.get("url").and_then(|u| u.as_str()) {
            let mut item = MediaItem::new(MediaKind::Image, src.replace("&amp;", "&"));
            item.width = source.get("width").and_then(|w| w.as_u64()).map(|w| w as u32);
            item.height = source.get("height").and_then(|h| h.as_u64()).map(|h| h as u32);
            media.push(item);
        }
    }
    if let Some(video_url) = post
        .get("media")
        .and_then(|m| m.get("reddit_video"))
        .and_then(|v| v.get("fallback_url"))
        .and_then(|u| u.as_str())
    {
        media.push(MediaItem::new(MediaKind::Video, video_url));
    }

    let thumbnail_url = post
        .get("thumbnail")
        .and_then(|t| t.as_str())
        .filter(|t| t.starts_with("http"))
        .map(str::to_string)
        .or_else(|| media.first().map(|m| m.url.clone()));

    // Link posts point somewhere else; surface the target as a reference
    let mut mentioned_links = Vec::new();
    if selftext.is_none() {
        if let Some(target) = post
            .get("url_overridden_by_dest")
            .and_then(|u| u.as_str())
            .filter(|u| u.starts_with("http"))
        {
            mentioned_links.push(MentionedLink {
                url: target.to_string(),
                title: None,
                domain: crate::text::domain_of(target),
                favicon: None,
            });
        }
    }

    Ok(Extracted {
        title: Some(title),
        content,
        author,
        thumbnail_url,
        engagement: Some(engagement),
        media,
        mentioned_links,
        platform_data: Some(PlatformData::Reddit {
            post_id,
            subreddit,
            flair: post
                .get("link_flair_text")
                .and_then(|f| f.as_str())
                .map(str::to_string),
            nsfw: post.get("over_18").and_then(|n| n.as_bool()).unwrap_or(false),
            upvote_ratio: post.get("upvote_ratio").and_then(|r| r.as_f64()),
        }),
        ..Default::default()
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_link_canonicalized() {
        assert_eq!(
            canonicalize("https://redd.it/abc123").unwrap(),
            "https://www.reddit.com/comments/abc123"
        );
    }

    #[test]
    fn subdomains_and_queries_normalized() {
        assert_eq!(
            canonicalize("http://old.reddit.com/r/rust/comments/abc123/some_title/?sort=top#x")
                .unwrap(),
            "https://www.reddit.com/r/rust/comments/abc123/some_title"
        );
        assert_eq!(
            canonicalize("https://www.reddit.com/r/rust/comments/abc123").unwrap(),
            "https://www.reddit.com/r/rust/comments/abc123"
        );
    }

    #[test]
    fn short_link_and_canonical_share_endpoint() {
        // Both forms target the same canonical path before `.json`
        let a = canonicalize("https://redd.it/abc123").unwrap();
        let b = canonicalize("https://www.reddit.com/comments/abc123/").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn non_reddit_rejected() {
        assert!(canonicalize("https://example.com/r/rust").is_err());
        assert!(canonicalize("not a url").is_err());
    }

    fn listing(post: serde_json::Value) -> serde_json::Value {
        serde_json::json!([{"data": {"children": [{"kind": "t3", "data": post}]}}, {}])
    }

    #[test]
    fn self_post_normalized() {
        let body = listing(serde_json::json!({
            "id": "abc123",
            "title": "Ask anything",
            "selftext": "The actual question body",
            "author": "someuser",
            "subreddit": "AskReddit",
            "score": 4200,
            "num_comments": 318,
            "upvote_ratio": 0.93,
            "over_18": false,
            "link_flair_text": "Discussion"
        }));
        let fields = normalize_listing(&body).unwrap();
        assert_eq!(fields.title.as_deref(), Some("Ask anything"));
        assert_eq!(fields.content, "The actual question body");
        assert_eq!(fields.author.as_ref().unwrap().name, "u/someuser");
        let e = fields.engagement.unwrap();
        assert_eq!(e.upvotes, Some(4200));
        assert_eq!(e.comments, Some(318));
        match fields.platform_data.unwrap() {
            PlatformData::Reddit { subreddit, flair, nsfw, .. } => {
                assert_eq!(subreddit, "AskReddit");
                assert_eq!(flair.as_deref(), Some("Discussion"));
                assert!(!nsfw);
            }
            other => panic!("wrong platform data: {:?}", other),
        }
    }

    #[test]
    fn link_post_surfaces_target() {
        let body = listing(serde_json::json!({
            "id": "xyz",
            "title": "Interesting article",
            "selftext": "",
            "author": "poster",
            "subreddit": "programming",
            "url_overridden_by_dest": "https://example.com/article",
            "thumbnail": "https://b.thumbs.redditmedia.com/t.jpg"
        }));
        let fields = normalize_listing(&body).unwrap();
        // No selftext: the title stands in as content
        assert_eq!(fields.content, "Interesting article");
        assert_eq!(fields.mentioned_links.len(), 1);
        assert_eq!(fields.mentioned_links[0].url, "https://example.com/article");
        assert_eq!(
            fields.thumbnail_url.as_deref(),
            Some("https://b.thumbs.redditmedia.com/t.jpg")
        );
    }

    #[test]
    fn preview_image_unescaped() {
        let body = listing(serde_json::json!({
            "title": "Pic",
            "preview": {"images": [{"source": {
                "url": "https://preview.redd.it/x.jpg?width=640&amp;s=abc",
                "width": 640, "height": 480}}]}
        }));
        let fields = normalize_listing(&body).unwrap();
        assert_eq!(fields.media.len(), 1);
        assert!(fields.media[0].url.contains("&s=abc"));
        assert_eq!(fields.media[0].width, Some(640));
    }

    #[test]
    fn malformed_listing_is_parse_error() {
        assert!(normalize_listing(&serde_json::json!({})).is_err());
        assert!(normalize_listing(&serde_json::json!([{"data": {"children": []}}])).is_err());
    }
}
