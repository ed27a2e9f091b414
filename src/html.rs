use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::text::{clean_text, domain_of};
use crate::types::{MediaItem, MediaKind, MentionedLink};

/// Containers shorter than this are treated as boilerplate, not content.
const MIN_CONTAINER_CHARS: usize = 80;
const MAX_LINKS: usize = 20;
const MAX_IMAGES: usize = 10;

static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").unwrap()
});

/// Metadata harvested from `<meta>` tags. Every field is optional; a page may
/// carry no OG tags at all.
#[derive(Debug, Clone, Default)]
pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
    pub author: Option<String>,
    pub published_time: Option<String>,
    pub canonical_url: Option<String>,
}

fn sel(selector: &str) -> Selector {
    // All call sites pass static, known-good selectors
    Selector::parse(selector).unwrap()
}

fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    doc.select(&sel(selector))
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(clean_text)
        .filter(|s| !s.is_empty())
}

/// Open Graph tags first, twitter-card and plain meta tags as fallback.
pub fn page_meta(html: &str) -> PageMeta {
    let doc = Html::parse_document(html);

    let title = meta_content(&doc, "meta[property='og:title']")
        .or_else(|| meta_content(&doc, "meta[name='twitter:title']"))
        .or_else(|| {
            doc.select(&sel("title"))
                .next()
                .map(|el| clean_text(&el.text().collect::<String>()))
                .filter(|s| !s.is_empty())
        });
    let description = meta_content(&doc, "meta[property='og:description']")
        .or_else(|| meta_content(&doc, "meta[name='twitter:description']"))
        .or_else(|| meta_content(&doc, "meta[name='description']"));
    let image = meta_content(&doc, "meta[property='og:image']")
        .or_else(|| meta_content(&doc, "meta[name='twitter:image']"));
    let site_name = meta_content(&doc, "meta[property='og:site_name']");
    let author = meta_content(&doc, "meta[name='author']")
        .or_else(|| meta_content(&doc, "meta[property='article:author']"));
    let published_time = meta_content(&doc, "meta[property='article:published_time']");
    let canonical_url = doc
        .select(&sel("link[rel='canonical']"))
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_string);

    PageMeta {
        title,
        description,
        image,
        site_name,
        author,
        published_time,
        canonical_url,
    }
}

/// All `application/ld+json` blocks, flattened (top-level arrays and `@graph`
/// wrappers unwrapped) and filtered to article-like types.
pub fn json_ld_articles(html: &str) -> Vec<serde_json::Value> {
    let doc = Html::parse_document(html);
    let mut articles = Vec::new();

    for script in doc.select(&sel("script[type='application/ld+json']")) {
        let raw = script.text().collect::<String>();
        let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&raw) else {
            continue;
        };

        let candidates: Vec<serde_json::Value> = match parsed {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(ref obj) if obj.contains_key("@graph") => obj
                .get("@graph")
                .and_then(|g| g.as_array())
                .cloned()
                .unwrap_or_default(),
            other => vec![other],
        };

        for item in candidates {
            if is_article_type(&item) {
                articles.push(item);
            }
        }
    }

    articles
}

fn is_article_type(item: &serde_json::Value) -> bool {
    const ARTICLE_TYPES: &[&str] = &["Article", "BlogPosting", "NewsArticle"];
    match item.get("@type") {
        Some(serde_json::Value::String(t)) => ARTICLE_TYPES.contains(&t.as_str()),
        Some(serde_json::Value::Array(types)) => types
            .iter()
            .filter_map(|t| t.as_str())
            .any(|t| ARTICLE_TYPES.contains(&t)),
        _ => false,
    }
}

/// schema.org microdata via `itemprop` attributes.
#[derive(Debug, Clone, Default)]
pub struct Microdata {
    pub headline: Option<String>,
    pub author: Option<String>,
    pub body: Option<String>,
    pub published: Option<String>,
    pub image: Option<String>,
}

pub fn microdata(html: &str) -> Microdata {
    let doc = Html::parse_document(html);

    let text_of = |selector: &str| -> Option<String> {
        doc.select(&sel(selector))
            .next()
            .map(|el| clean_text(&el.text().collect::<String>()))
            .filter(|s| !s.is_empty())
    };

    let headline = text_of("[itemprop='headline']");
    // Author may be a nested Person scope or a bare element
    let author = text_of("[itemprop='author'] [itemprop='name']")
        .or_else(|| text_of("[itemprop='author']"));
    let body = text_of("[itemprop='articleBody']");
    let published = doc
        .select(&sel("[itemprop='datePublished']"))
        .next()
        .and_then(|el| {
            el.value()
                .attr("content")
                .or_else(|| el.value().attr("datetime"))
                .map(str::to_string)
        });
    let image = doc.select(&sel("[itemprop='image']")).next().and_then(|el| {
        el.value()
            .attr("src")
            .or_else(|| el.value().attr("content"))
            .map(str::to_string)
    });

    Microdata {
        headline,
        author,
        body,
        published,
        image,
    }
}

fn element_text(el: ElementRef) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Heuristic main-content extraction.
///
/// Tries caller-supplied selectors first, then `<article>`, `<main>`, then
/// class/id patterns for content-looking containers, finally `<body>`. First
/// non-trivial match wins.
pub fn main_content(html: &str, extra_selectors: &[&str]) -> Option<String> {
    let stripped = SCRIPT_RE.replace_all(html, "");
    let doc = Html::parse_document(&stripped);

    const HEURISTICS: &[&str] = &[
        "article",
        "main",
        "div[class*='content']",
        "div[class*='article']",
        "div[class*='post']",
        "div[class*='entry']",
        "div[id*='content']",
        "div[id*='article']",
    ];

    for selector in extra_selectors.iter().copied().chain(HEURISTICS.iter().copied()) {
        if let Some(el) = doc.select(&sel(selector)).next() {
            let text = element_text(el);
            if text.chars().count() >= MIN_CONTAINER_CHARS {
                return Some(text);
            }
        }
    }

    doc.select(&sel("body"))
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

/// Absolute links inside the main content region, deduplicated.
pub fn content_links(html: &str, scope_selectors: &[&str]) -> Vec<MentionedLink> {
    let stripped = SCRIPT_RE.replace_all(html, "");
    let doc = Html::parse_document(&stripped);
    let anchor = sel("a[href]");

    let scope = scope_selectors
        .iter()
        .copied()
        .chain(["article", "main", "body"])
        .find_map(|s| doc.select(&sel(s)).next());

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    if let Some(scope) = scope {
        for a in scope.select(&anchor) {
            let Some(href) = a.value().attr("href") else { continue };
            if !href.starts_with("http://") && !href.starts_with("https://") {
                continue;
            }
            if !seen.insert(href.to_string()) {
                continue;
            }
            let title = Some(element_text(a)).filter(|t| !t.is_empty());
            links.push(MentionedLink {
                url: href.to_string(),
                title,
                domain: domain_of(href),
                favicon: None,
            });
            if links.len() >= MAX_LINKS {
                break;
            }
        }
    }
    links
}

/// `<img>` sources, optionally filtered to a platform CDN hostname substring.
pub fn collect_images(html: &str, cdn_filter: Option<&str>) -> Vec<MediaItem> {
    let doc = Html::parse_document(html);
    let img = sel("img[src]");

    let mut seen = HashSet::new();
    let mut items = Vec::new();
    for el in doc.select(&img) {
        let Some(src) = el.value().attr("src") else { continue };
        if !src.starts_with("http") {
            continue;
        }
        if let Some(filter) = cdn_filter {
            if !src.contains(filter) {
                continue;
            }
        }
        if !seen.insert(src.to_string()) {
            continue;
        }
        let mut item = MediaItem::new(MediaKind::Image, src);
        item.width = el.value().attr("width").and_then(|w| w.parse().ok());
        item.height = el.value().attr("height").and_then(|h| h.parse().ok());
        item.alt = el
            .value()
            .attr("alt")
            .map(str::to_string)
            .filter(|a| !a.is_empty());
        items.push(item);
        if items.len() >= MAX_IMAGES {
            break;
        }
    }
    items
}

// ── Tests ──
