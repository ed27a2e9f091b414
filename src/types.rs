use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform tag assigned by detection and carried on every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Youtube,
    Reddit,
    Linkedin,
    Medium,
    Substack,
    Github,
    Podcast,
    News,
    Generic,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Youtube => "youtube",
            Platform::Reddit => "reddit",
            Platform::Linkedin => "linkedin",
            Platform::Medium => "medium",
            Platform::Substack => "substack",
            Platform::Github => "github",
            Platform::Podcast => "podcast",
            Platform::News => "news",
            Platform::Generic => "generic",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follower_count: Option<u64>,
}

impl AuthorInfo {
    /// Author with just a display name; the rest filled in by the caller.
    pub fn named(name: impl Into<String>) -> Self {
        AuthorInfo {
            name: name.into(),
            handle: None,
            profile_url: None,
            avatar_url: None,
            bio: None,
            verified: None,
            follower_count: None,
        }
    }
}

/// Sparse counters. Absence means "unknown", never zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reposts: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replies: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stars: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forks: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upvotes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claps: Option<u64>,
}

impl EngagementMetrics {
    pub fn is_empty(&self) -> bool {
        self.likes.is_none()
            && self.reposts.is_none()
            && self.replies.is_none()
            && self.comments.is_none()
            && self.views.is_none()
            && self.stars.is_none()
            && self.forks.is_none()
            && self.upvotes.is_none()
            && self.claps.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Gif,
    Audio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl MediaItem {
    pub fn new(kind: MediaKind, url: impl Into<String>) -> Self {
        MediaItem {
            kind,
            url: url.into(),
            width: None,
            height: None,
            duration_seconds: None,
            thumbnail_url: None,
            alt: None,
        }
    }
}

/// A link found inside the extracted body, surfaced as a reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionedLink {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

/// Platform-specific fields, one variant per platform that populates any.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase")]
pub enum PlatformData {
    Twitter {
        tweet_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        created_at: Option<String>,
        /// Which strategy produced the result: syndication, oembed or scrape.
        strategy: String,
    },
    Youtube {
        video_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        channel_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
        #[serde(default)]
        has_transcript: bool,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        transcript_segments: Vec<TranscriptSegment>,
    },
    Reddit {
        post_id: String,
        subreddit: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        flair: Option<String>,
        #[serde(default)]
        nsfw: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        upvote_ratio: Option<f64>,
    },
    Github {
        resource: GithubResource,
        owner: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        repo: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        number: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        default_branch: Option<String>,
    },
    Linkedin {
        #[serde(skip_serializing_if = "Option::is_none")]
        post_type: Option<String>,
    },
    Article {
        #[serde(skip_serializing_if = "Option::is_none")]
        canonical_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        published_at: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        word_count: Option<usize>,
    },
    Podcast {
        has_transcript: bool,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        transcript_segments: Vec<TranscriptSegment>,
        #[serde(skip_serializing_if = "Option::is_none")]
        audio_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_seconds: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        episode_title: Option<String>,
    },
    Generic {
        /// Which source won the merge: og, json-ld, microdata, heuristic or firecrawl.
        strategy: String,
        #[serde(default)]
        blocked: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        word_count: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GithubResource {
    Repository,
    Issue,
    Pull,
    Gist,
    Blob,
    Unknown,
}

/// Normalized record returned by every extractor.
///
/// Either a success shape (content present, error absent) or a failure shape
/// (error present, no content fields). Built only through [`ExtractionResult::success`]
/// and [`ExtractionResult::failure`] so the invariant holds everywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub platform: Platform,
    pub success: bool,
    pub extracted_at: DateTime<Utc>,
    pub extractor_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement: Option<EngagementMetrics>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub media: Vec<MediaItem>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub mentioned_links: Vec<MentionedLink>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_data: Option<PlatformData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Success-side fields collected by an extractor before sealing a result.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub title: Option<String>,
    pub content: String,
    pub excerpt: Option<String>,
    pub author: Option<AuthorInfo>,
    pub thumbnail_url: Option<String>,
    pub engagement: Option<EngagementMetrics>,
    pub media: Vec<MediaItem>,
    pub mentioned_links: Vec<MentionedLink>,
    pub platform_data: Option<PlatformData>,
}

impl ExtractionResult {
    pub fn success(platform: Platform, version: &str, fields: Extracted) -> Self {
        let excerpt = fields
            .excerpt
            .or_else(|| Some(crate::text::make_excerpt(&fields.content, crate::text::EXCERPT_MAX)));
        // Drop empty engagement so "no counters" serializes as absence
        let engagement = fields.engagement.filter(|e| !e.is_empty());
        ExtractionResult {
            platform,
            success: true,
            extracted_at: Utc::now(),
            extractor_version: version.to_string(),
            title: fields.title,
            content: Some(fields.content),
            excerpt,
            author: fields.author,
            thumbnail_url: fields.thumbnail_url,
            engagement,
            media: fields.media,
            mentioned_links: fields.mentioned_links,
            platform_data: fields.platform_data,
            error: None,
        }
    }

    pub fn failure(platform: Platform, version: &str, error: impl Into<String>) -> Self {
        let mut message = error.into();
        if message.is_empty() {
            message = "extraction failed".to_string();
        }
        ExtractionResult {
            platform,
            success: false,
            extracted_at: Utc::now(),
            extractor_version: version.to_string(),
            title: None,
            content: None,
            excerpt: None,
            author: None,
            thumbnail_url: None,
            engagement: None,
            media: Vec::new(),
            mentioned_links: Vec::new(),
            platform_data: None,
            error: Some(message),
        }
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_shape() {
        let r = ExtractionResult::success(
            Platform::Generic,
            "1.0",
            Extracted {
                content: "hello world".into(),
                ..Default::default()
            },
        );
        assert!(r.success);
        assert_eq!(r.content.as_deref(), Some("hello world"));
        assert!(r.error.is_none());
        assert!(r.excerpt.is_some());
    }

    #[test]
    fn failure_shape() {
        let r = ExtractionResult::failure(Platform::Twitter, "1.0", "nothing worked");
        assert!(!r.success);
        assert!(r.content.is_none());
        assert!(r.title.is_none());
        assert!(r.media.is_empty());
        assert_eq!(r.error.as_deref(), Some("nothing worked"));
    }

    #[test]
    fn failure_never_empty_message() {
        let r = ExtractionResult::failure(Platform::Generic, "1.0", "");
        assert!(r.error.as_deref().is_some_and(|e| !e.is_empty()));
    }

    #[test]
    fn empty_engagement_dropped() {
        let r = ExtractionResult::success(
            Platform::Github,
            "1.0",
            Extracted {
                content: "x".into(),
                engagement: Some(EngagementMetrics::default()),
                ..Default::default()
            },
        );
        assert!(r.engagement.is_none());
    }

    #[test]
    fn platform_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Platform::Youtube).unwrap(), "\"youtube\"");
        assert_eq!(Platform::Generic.to_string(), "generic");
    }
}
