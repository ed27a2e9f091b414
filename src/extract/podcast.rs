use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::detect::detect_platform;
use crate::error::ExtractError;
use crate::fetch;
use crate::html::page_meta;
use crate::router::Extractor;
use crate::summarize::{SummarizeClient, SummarizeOptions};
use crate::text::clean_text;
use crate::types::{
    AuthorInfo, Extracted, ExtractionResult, MediaItem, MediaKind, Platform, PlatformData,
};

const VERSION: &str = "1.0.0";

/// Podcast episodes: transcript via the external service when it is
/// available, RSS feed metadata when the URL serves a feed, OG metadata as
/// the last resort. `has_transcript` tells the consumer which path was taken.
pub struct PodcastExtractor {
    summarize: Arc<SummarizeClient>,
}

impl PodcastExtractor {
    pub fn new(summarize: Arc<SummarizeClient>) -> Self {
        PodcastExtractor { summarize }
    }
}

#[async_trait]
impl Extractor for PodcastExtractor {
    fn platform(&self) -> Platform {
        Platform::Podcast
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    fn can_handle(&self, url: &str) -> bool {
        detect_platform(url) == Platform::Podcast
    }

    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        if self.summarize.is_podcast_available() {
            match self.from_service(url).await {
                Ok(fields) => {
                    return Ok(ExtractionResult::success(Platform::Podcast, VERSION, fields))
                }
                Err(e) => warn!("transcript service failed for {}: {}", url, e),
            }
        }

        let body = match fetch::fetch_text(url).await {
            Ok(body) => body,
            Err(e) => {
                return Ok(ExtractionResult::failure(
                    Platform::Podcast,
                    VERSION,
                    format!("podcast page fetch failed: {}", e),
                ))
            }
        };

        let outcome = if looks_like_feed(&body) {
            parse_feed(&body)
        } else {
            from_og(&body)
        };

        match outcome {
            Ok(fields) => Ok(ExtractionResult::success(Platform::Podcast, VERSION, fields)),
            Err(e) => Ok(ExtractionResult::failure(
                Platform::Podcast,
                VERSION,
                format!("podcast extraction failed: {}", e),
            )),
        }
    }
}

impl PodcastExtractor {
    async fn from_service(&self, url: &str) -> Result<Extracted, ExtractError> {
        let result = self
            .summarize
            .extract(url, &SummarizeOptions::transcript_preferred())
            .await?;
        if !result.success {
            return Err(ExtractError::Service("service reported failure".into()));
        }

        let transcript = result.transcript;
        let has_transcript = transcript.is_some();
        let segments = transcript.map(|t| t.segments).unwrap_or_default();

        let content = if result.content.trim().is_empty() {
            segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            result.content
        };
        if content.trim().is_empty() {
            return Err(ExtractError::Service("service returned no content".into()));
        }

        let (audio_url, duration_seconds) = result
            .media
            .map(|m| (m.video_url, m.duration_seconds))
            .unwrap_or((None, None));

        Ok(Extracted {
            title: result.title.clone(),
            content,
            excerpt: result.description.clone(),
            media: audio_url
                .iter()
                .map(|u| MediaItem::new(MediaKind::Audio, u.clone()))
                .collect(),
            platform_data: Some(PlatformData::Podcast {
                has_transcript,
                transcript_segments: segments,
                audio_url,
                duration_seconds,
                episode_title: result.title,
            }),
            ..Default::default()
        })
    }
}

fn looks_like_feed(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(256).collect();
    head.starts_with("<?xml") || head.contains("<rss") || head.contains("<feed")
}

fn from_og(html: &str) -> Result<Extracted, ExtractError> {
    let meta = page_meta(html);
    let content = meta
        .description
        .clone()
        .or_else(|| meta.title.clone())
        .ok_or_else(|| ExtractError::Parse("episode page has no og metadata".into()))?;

    Ok(Extracted {
        title: meta.title.clone(),
        content,
        thumbnail_url: meta.image,
        platform_data: Some(PlatformData::Podcast {
            has_transcript: false,
            transcript_segments: Vec::new(),
            audio_url: None,
            duration_seconds: None,
            episode_title: meta.title,
        }),
        ..Default::default()
    })
}

#[derive(Default)]
struct FeedFields {
    channel_title: Option<String>,
    channel_description: Option<String>,
    author: Option<String>,
    episode_title: Option<String>,
    episode_description: Option<String>,
    audio_url: Option<String>,
    duration: Option<String>,
}

/// First episode of an RSS feed, channel metadata as context.
fn parse_feed(xml: &str) -> Result<Extracted, ExtractError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut fields = FeedFields::default();
    let mut in_item = false;
    let mut items_seen = 0usize;
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                let name = e.name().as_ref().to_vec();
                if name == b"item" || name == b"entry" {
                    in_item = true;
                    items_seen += 1;
                }
                current = Some(name);
            }
            Ok(quick_xml::events::Event::Empty(e)) => {
                if e.name().as_ref() == b"enclosure" && in_item && items_seen == 1 {
                    for attr in e.attributes().filter_map(Result::ok) {
                        if attr.key.as_ref() == b"url" {
                            fields.audio_url = attr
                                .unescape_value()
                                .ok()
                                .map(|v| v.to_string());
                        }
                    }
                }
            }
            Ok(quick_xml::events::Event::Text(e)) => {
                if let Ok(text) = e.unescape() {
                    assign_field(&mut fields, current.as_deref(), in_item, items_seen, &text);
                }
            }
            Ok(quick_xml::events::Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                assign_field(&mut fields, current.as_deref(), in_item, items_seen, &text);
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.name().as_ref() == b"item" || e.name().as_ref() == b"entry" {
                    in_item = false;
                }
                current = None;
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Xml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    let title = match (&fields.channel_title, &fields.episode_title) {
        (Some(show), Some(ep)) => Some(format!("{} — {}", show, ep)),
        (None, Some(ep)) => Some(ep.clone()),
        (Some(show), None) => Some(show.clone()),
        (None, None) => None,
    };
    let content = fields
        .episode_description
        .clone()
        .or_else(|| fields.channel_description.clone())
        .or_else(|| title.clone())
        .ok_or_else(|| ExtractError::Xml("feed carries no usable metadata".into()))?;

    let duration_seconds = fields.duration.as_deref().and_then(parse_duration);
    let media = fields
        .audio_url
        .iter()
        .map(|u| {
            let mut item = MediaItem::new(MediaKind::Audio, u.clone());
            item.duration_seconds = duration_seconds;
            item
        })
        .collect();

    Ok(Extracted {
        title,
        content: clean_text(&content),
        author: fields.author.map(AuthorInfo::named),
        media,
        platform_data: Some(PlatformData::Podcast {
            has_transcript: false,
            transcript_segments: Vec::new(),
            audio_url: fields.audio_url,
            duration_seconds,
            episode_title: fields.episode_title,
        }),
        ..Default::default()
    })
}

fn assign_field(
    fields: &mut FeedFields,
    current: Option<&[u8]>,
    in_item: bool,
    items_seen: usize,
    text: &str,
) {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return;
    }
    // Only the first item counts; later episodes are other notes
    let first_item = in_item && items_seen == 1;

    match current {
        Some(b"title") if first_item => set_once(&mut fields.episode_title, cleaned),
        Some(b"title") if !in_item => set_once(&mut fields.channel_title, cleaned),
        Some(b"description") if first_item => {
            set_once(&mut fields.episode_description, cleaned)
        }
        Some(b"description") if !in_item => set_once(&mut fields.channel_description, cleaned),
        Some(b"itunes:author") if !in_item => set_once(&mut fields.author, cleaned),
        Some(b"itunes:duration") if first_item => set_once(&mut fields.duration, cleaned),
        _ => {}
    }
}

fn set_once(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

/// "3723", "62:03" and "1:02:03" forms all appear in the wild.
fn parse_duration(s: &str) -> Option<u32> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    match parts.as_slice() {
        [secs] => secs.parse().ok(),
        [m, s] => Some(m.parse::<u32>().ok()? * 60 + s.parse::<u32>().ok()?),
        [h, m, s] => Some(
            h.parse::<u32>().ok()? * 3600 + m.parse::<u32>().ok()? * 60 + s.parse::<u32>().ok()?,
        ),
        _ => None,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>The Example Show</title>
    <description>A show about examples.</description>
    <itunes:author>Example Productions</itunes:author>
    <item>
      <title>Episode 12: Edge Cases</title>
      <description>We talk edge cases for an hour.</description>
      <enclosure url="https://cdn.example.fm/ep12.mp3" type="audio/mpeg" length="1234"/>
      <itunes:duration>1:02:03</itunes:duration>
    </item>
    <item>
      <title>Episode 11: Older</title>
      <description>Old news.</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn feed_detection() {
        assert!(looks_like_feed(FEED));
        assert!(looks_like_feed("  <rss version=\"2.0\"><channel/></rss>"));
        assert!(!looks_like_feed("<!DOCTYPE html><html></html>"));
    }

    #[test]
    fn first_episode_extracted() {
        let fields = parse_feed(FEED).unwrap();
        assert_eq!(
            fields.title.as_deref(),
            Some("The Example Show — Episode 12: Edge Cases")
        );
        assert_eq!(fields.content, "We talk edge cases for an hour.");
        assert_eq!(fields.author.as_ref().unwrap().name, "Example Productions");
        assert!(!fields.content.contains("Old news"));
    }

    #[test]
    fn enclosure_and_duration() {
        let fields = parse_feed(FEED).unwrap();
        assert_eq!(fields.media.len(), 1);
        assert_eq!(fields.media[0].url, "https://cdn.example.fm/ep12.mp3");
        assert_eq!(fields.media[0].duration_seconds, Some(3723));
        match fields.platform_data.unwrap() {
            PlatformData::Podcast { has_transcript, audio_url, duration_seconds, .. } => {
                assert!(!has_transcript);
                assert_eq!(audio_url.as_deref(), Some("https://cdn.example.fm/ep12.mp3"));
                assert_eq!(duration_seconds, Some(3723));
            }
            other => panic!("wrong platform data: {:?}", other),
        }
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("3723"), Some(3723));
        assert_eq!(parse_duration("62:03"), Some(3723));
        assert_eq!(parse_duration("1:02:03"), Some(3723));
        assert_eq!(parse_duration("not:a:time"), None);
    }

    #[test]
    fn og_fallback_reports_no_transcript() {
        let html = r#"<head><meta property="og:title" content="Ep 5">
            <meta property="og:description" content="About things"></head>"#;
        let fields = from_og(html).unwrap();
        assert_eq!(fields.content, "About things");
        match fields.platform_data.unwrap() {
            PlatformData::Podcast { has_transcript, .. } => assert!(!has_transcript),
            other => panic!("wrong platform data: {:?}", other),
        }
    }

    #[test]
    fn empty_feed_is_error() {
        let xml = "<?xml version=\"1.0\"?><rss><channel></channel></rss>";
        assert!(parse_feed(xml).is_err());
    }
}
