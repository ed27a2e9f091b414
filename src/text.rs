use std::sync::LazyLock;

use regex::Regex;

/// Excerpt budget in characters, before the `...` suffix.
pub const EXCERPT_MAX: usize = 200;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static SPACES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Decode common HTML entities and collapse whitespace runs.
/// Paragraph breaks (double newlines) survive; longer runs collapse to one break.
pub fn clean_text(s: &str) -> String {
    let decoded = s
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&mdash;", "—")
        .replace("&hellip;", "…");
    let collapsed = SPACES_RE.replace_all(&decoded, " ");
    let collapsed = BLANKS_RE.replace_all(&collapsed, "\n\n");
    collapsed
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Strip markup from an HTML snippet (oEmbed bodies and the like).
pub fn strip_tags(html: &str) -> String {
    clean_text(&TAG_RE.replace_all(html, " "))
}

/// Build an excerpt of at most `max` characters.
///
/// Short content passes through cleaned but unchanged. Longer content is cut at
/// the last word boundary past 70% of the budget (hard cut when the text has no
/// usable boundary) and suffixed with `...`.
pub fn make_excerpt(content: &str, max: usize) -> String {
    let cleaned = clean_text(content).replace('\n', " ");
    let cleaned = SPACES_RE.replace_all(&cleaned, " ").to_string();
    let chars: Vec<char> = cleaned.chars().collect();
    if chars.len() <= max {
        return cleaned;
    }

    let floor = max * 7 / 10;
    let mut cut = max;
    if let Some(pos) = chars[..max].iter().rposition(|c| c.is_whitespace()) {
        if pos >= floor {
            cut = pos;
        }
    }
    let prefix: String = chars[..cut].iter().collect();
    format!("{}...", prefix.trim_end())
}

/// Parse "1.2K" / "3M" / "1,234" style counts into a number.
pub fn parse_engagement_number(s: &str) -> Option<u64> {
    let trimmed = s.trim().replace(',', "");
    if trimmed.is_empty() {
        return None;
    }

    let (body, multiplier) = match trimmed.chars().last() {
        Some('k') | Some('K') => (&trimmed[..trimmed.len() - 1], 1_000_f64),
        Some('m') | Some('M') => (&trimmed[..trimmed.len() - 1], 1_000_000_f64),
        Some('b') | Some('B') => (&trimmed[..trimmed.len() - 1], 1_000_000_000_f64),
        _ => (trimmed.as_str(), 1_f64),
    };

    let value: f64 = body.parse().ok()?;
    if value < 0.0 {
        return None;
    }
    Some((value * multiplier).round() as u64)
}

/// Engagement fields arrive as JSON numbers on some platforms and "1.2K" strings
/// on others; accept both.
pub fn parse_engagement_value(v: &serde_json::Value) -> Option<u64> {
    match v {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.round() as u64)),
        serde_json::Value::String(s) => parse_engagement_number(s),
        _ => None,
    }
}

/// Host of a URL with any leading `www.` stripped.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_string())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engagement_suffixes() {
        assert_eq!(parse_engagement_number("1.2K"), Some(1200));
        assert_eq!(parse_engagement_number("3M"), Some(3_000_000));
        assert_eq!(parse_engagement_number("1.5B"), Some(1_500_000_000));
        assert_eq!(parse_engagement_number("42"), Some(42));
        assert_eq!(parse_engagement_number("1,234"), Some(1234));
        assert_eq!(parse_engagement_number("12.5k"), Some(12_500));
    }

    #[test]
    fn engagement_garbage() {
        assert_eq!(parse_engagement_number(""), None);
        assert_eq!(parse_engagement_number("many"), None);
        assert_eq!(parse_engagement_number("-5"), None);
    }

    #[test]
    fn engagement_json_values() {
        assert_eq!(parse_engagement_value(&serde_json::json!(42)), Some(42));
        assert_eq!(parse_engagement_value(&serde_json::json!("1.2K")), Some(1200));
        assert_eq!(parse_engagement_value(&serde_json::json!(null)), None);
        assert_eq!(parse_engagement_value(&serde_json::json!([1])), None);
    }

    #[test]
    fn short_content_passes_through() {
        assert_eq!(make_excerpt("A short sentence.", 200), "A short sentence.");
    }

    #[test]
    fn long_content_breaks_on_word_boundary() {
        let content = "word ".repeat(100);
        let excerpt = make_excerpt(&content, 50);
        assert!(excerpt.ends_with("..."));
        let prefix = excerpt.trim_end_matches("...");
        assert!(prefix.chars().count() <= 50);
        // Cut landed between words, not inside one
        assert!(prefix.ends_with("word"));
    }

    #[test]
    fn long_content_without_boundary_hard_cuts() {
        let content = "x".repeat(500);
        let excerpt = make_excerpt(&content, 50);
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.trim_end_matches("...").chars().count(), 50);
    }

    #[test]
    fn boundary_before_floor_ignored() {
        // Only whitespace is at position 2, well before 70% of 20
        let content = format!("ab {}", "c".repeat(100));
        let excerpt = make_excerpt(&content, 20);
        assert_eq!(excerpt.trim_end_matches("...").chars().count(), 20);
    }

    #[test]
    fn clean_text_entities_and_whitespace() {
        assert_eq!(clean_text("a &amp; b"), "a & b");
        assert_eq!(clean_text("too    many   spaces"), "too many spaces");
        assert_eq!(clean_text("one\n\n\n\n\ntwo"), "one\n\ntwo");
        assert_eq!(clean_text("  padded  "), "padded");
    }

    #[test]
    fn strip_tags_basic() {
        assert_eq!(
            strip_tags("<p>Hello <strong>world</strong></p>"),
            "Hello world"
        );
    }

    #[test]
    fn domain_strips_www() {
        assert_eq!(
            domain_of("https://www.example.com/a/b").as_deref(),
            Some("example.com")
        );
        assert_eq!(
            domain_of("https://blog.example.org/x").as_deref(),
            Some("blog.example.org")
        );
        assert_eq!(domain_of("not a url"), None);
    }
}
