use crate::error::ExtractError;
use crate::fetch;
use crate::html::{collect_images, content_links, json_ld_articles, main_content, page_meta};
use crate::text::clean_text;
use crate::types::{AuthorInfo, Extracted, ExtractionResult, Platform, PlatformData};

/// Per-platform knobs for the shared article pipeline: which containers hold
/// the body on this platform, and which CDN hosts carry its real images.
pub struct ArticleSource {
    pub platform: Platform,
    pub version: &'static str,
    pub container_selectors: &'static [&'static str],
    pub cdn_filter: Option<&'static str>,
}

/// OG tags + JSON-LD + container heuristics, shared by the article-shaped
/// platforms. Metadata precedence: OG first, JSON-LD filling the gaps.
pub async fn extract_article(
    source: &ArticleSource,
    url: &str,
) -> Result<ExtractionResult, ExtractError> {
    let html = match fetch::fetch_text(url).await {
        Ok(html) => html,
        Err(e) => {
            return Ok(ExtractionResult::failure(
                source.platform,
                source.version,
                format!("page fetch failed: {}", e),
            ))
        }
    };

    match scrape_article(source, &html) {
        Ok(fields) => Ok(ExtractionResult::success(
            source.platform,
            source.version,
            fields,
        )),
        Err(e) => Ok(ExtractionResult::failure(
            source.platform,
            source.version,
            e.to_string(),
        )),
    }
}

pub(crate) fn scrape_article(
    source: &ArticleSource,
    html: &str,
) -> Result<Extracted, ExtractError> {
    let meta = page_meta(html);
    let article = json_ld_articles(html).into_iter().next();

    let title = meta
        .title
        .clone()
        .or_else(|| article.as_ref().and_then(|a| ld_str(a, "headline")));

    let content = main_content(html, source.container_selectors)
        .or_else(|| {
            article
                .as_ref()
                .and_then(|a| ld_str(a, "articleBody"))
        })
        .or_else(|| meta.description.clone())
        .ok_or_else(|| ExtractError::Parse("no article content found".into()))?;

    let author_name = meta
        .author
        .clone()
        .or_else(|| article.as_ref().and_then(ld_author_name));
    let author = author_name.map(AuthorInfo::named);

    let thumbnail_url = meta
        .image
        .clone()
        .or_else(|| article.as_ref().and_then(ld_image));

    let published_at = article
        .as_ref()
        .and_then(|a| ld_str(a, "datePublished"))
        .or_else(|| meta.published_time.clone());

    let word_count = Some(content.split_whitespace().count());

    Ok(Extracted {
        title,
        content: content.clone(),
        excerpt: meta.description.clone().map(|d| clean_text(&d)),
        author,
        thumbnail_url,
        media: collect_images(html, source.cdn_filter),
        mentioned_links: content_links(html, source.container_selectors),
        platform_data: Some(PlatformData::Article {
            canonical_url: meta.canonical_url,
            published_at,
            word_count,
        }),
        ..Default::default()
    })
}

fn ld_str(article: &serde_json::Value, key: &str) -> Option<String> {
    article
        .get(key)
        .and_then(|v| v.as_str())
        .map(clean_text)
        .filter(|s| !s.is_empty())
}

/// JSON-LD authors show up as a string, an object, or an array of either.
pub(crate) fn ld_author_name(article: &serde_json::Value) -> Option<String> {
    let author = article.get("author")?;
    let single = match author {
        serde_json::Value::Array(items) => items.first()?,
        other => other,
    };
    match single {
        serde_json::Value::String(s) => Some(clean_text(s)),
        serde_json::Value::Object(obj) => obj
            .get("name")
            .and_then(|n| n.as_str())
            .map(clean_text),
        _ => None,
    }
    .filter(|s| !s.is_empty())
}

fn ld_image(article: &serde_json::Value) -> Option<String> {
    match article.get("image")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => items.first().and_then(|i| match i {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(obj) => {
                obj.get("url").and_then(|u| u.as_str()).map(str::to_string)
            }
            _ => None,
        }),
        serde_json::Value::Object(obj) => {
            obj.get("url").and_then(|u| u.as_str()).map(str::to_string)
        }
        _ => None,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: ArticleSource = ArticleSource {
        platform: Platform::Medium,
        version: "test",
        container_selectors: &["section[data-field='body']"],
        cdn_filter: Some("cdn.example-images.net"),
    };

    fn fixture() -> String {
        let body = "Paragraph one of the piece. ".repeat(8);
        format!(
            r#"<html><head>
            <meta property="og:title" content="A Long Read">
            <meta property="og:description" content="What the piece is about">
            <script type="application/ld+json">
            {{"@type":"Article","headline":"LD Headline",
              "author":{{"name":"Casey Writer"}},
              "datePublished":"2024-05-01T08:00:00Z"}}</script>
            </head><body>
            <nav>home about</nav>
            <section data-field="body">{}<a href="https://ref.example.com/cited">a citation</a>
            <img src="https://cdn.example-images.net/hero.png" alt="hero">
            <img src="https://tracker.example.org/pixel.gif">
            </section></body></html>"#,
            body
        )
    }

    #[test]
    fn og_title_beats_json_ld() {
        let fields = scrape_article(&SOURCE, &fixture()).unwrap();
        assert_eq!(fields.title.as_deref(), Some("A Long Read"));
    }

    #[test]
    fn container_content_extracted() {
        let fields = scrape_article(&SOURCE, &fixture()).unwrap();
        assert!(fields.content.starts_with("Paragraph one of the piece."));
        assert!(!fields.content.contains("home about"));
    }

    #[test]
    fn json_ld_fills_author_and_date() {
        let fields = scrape_article(&SOURCE, &fixture()).unwrap();
        assert_eq!(fields.author.as_ref().unwrap().name, "Casey Writer");
        match fields.platform_data.unwrap() {
            PlatformData::Article { published_at, word_count, .. } => {
                assert_eq!(published_at.as_deref(), Some("2024-05-01T08:00:00Z"));
                assert!(word_count.unwrap() > 20);
            }
            other => panic!("wrong platform data: {:?}", other),
        }
    }

    #[test]
    fn images_filtered_to_platform_cdn() {
        let fields = scrape_article(&SOURCE, &fixture()).unwrap();
        assert_eq!(fields.media.len(), 1);
        assert!(fields.media[0].url.contains("cdn.example-images.net"));
    }

    #[test]
    fn mentioned_links_scoped_to_container() {
        let fields = scrape_article(&SOURCE, &fixture()).unwrap();
        assert_eq!(fields.mentioned_links.len(), 1);
        assert_eq!(fields.mentioned_links[0].url, "https://ref.example.com/cited");
    }

    #[test]
    fn author_shapes() {
        assert_eq!(
            ld_author_name(&serde_json::json!({"author": "Plain Name"})).as_deref(),
            Some("Plain Name")
        );
        assert_eq!(
            ld_author_name(&serde_json::json!({"author": [{"name": "First Of Many"}, {"name": "Second"}]}))
                .as_deref(),
            Some("First Of Many")
        );
        assert!(ld_author_name(&serde_json::json!({"headline": "x"})).is_none());
    }

    #[test]
    fn empty_page_is_parse_error() {
        let result = scrape_article(&SOURCE, "<html><head></head><body></body></html>");
        assert!(result.is_err());
    }
}
