use std::sync::LazyLock;

use regex::Regex;

use crate::types::Platform;

/// Ordered platform-to-pattern table. First match wins. `News` and `Generic`
/// carry no patterns; `Generic` is the unconditional fallback.
static PLATFORM_PATTERNS: LazyLock<Vec<(Platform, Vec<Regex>)>> = LazyLock::new(|| {
    let patterns = |list: &[&str]| -> Vec<Regex> {
        list.iter().map(|p| Regex::new(p).unwrap()).collect()
    };

    vec![
        (
            Platform::Twitter,
            patterns(&[
                r"(?i)^https?://(www\.|mobile\.)?(twitter|x)\.com/",
            ]),
        ),
        (
            Platform::Youtube,
            patterns(&[
                r"(?i)^https?://(www\.|m\.|music\.)?youtube\.com/",
                r"(?i)^https?://youtu\.be/",
            ]),
        ),
        (
            Platform::Reddit,
            patterns(&[
                r"(?i)^https?://([a-z]+\.)?reddit\.com/",
                r"(?i)^https?://redd\.it/",
            ]),
        ),
        (
            Platform::Linkedin,
            patterns(&[r"(?i)^https?://(www\.)?linkedin\.com/"]),
        ),
        (
            Platform::Medium,
            patterns(&[
                r"(?i)^https?://(www\.)?medium\.com/",
                r"(?i)^https?://[a-z0-9-]+\.medium\.com/",
            ]),
        ),
        (
            Platform::Substack,
            patterns(&[r"(?i)^https?://[a-z0-9-]+\.substack\.com/"]),
        ),
        (
            Platform::Github,
            patterns(&[
                r"(?i)^https?://(www\.)?github\.com/",
                r"(?i)^https?://gist\.github\.com/",
            ]),
        ),
        (
            Platform::Podcast,
            patterns(&[
                r"(?i)^https?://podcasts\.apple\.com/",
                r"(?i)^https?://open\.spotify\.com/(episode|show)/",
                r"(?i)^https?://overcast\.fm/",
                r"(?i)^https?://(www\.)?pocketcasts\.com/",
                r"(?i)^https?://pca\.st/",
                r"(?i)^https?://[a-z0-9-]+\.libsyn\.com/",
                r"(?i)^https?://[^?#]+\.(rss|xml)(\?|$)",
                r"(?i)^https?://[^?#]+/feed/?(\?|$)",
            ]),
        ),
        (Platform::News, Vec::new()),
        (Platform::Generic, Vec::new()),
    ]
});

/// Deterministic, side-effect-free platform detection. O(number of patterns).
pub fn detect_platform(url: &str) -> Platform {
    for (platform, patterns) in PLATFORM_PATTERNS.iter() {
        if patterns.iter().any(|re| re.is_match(url)) {
            return *platform;
        }
    }
    Platform::Generic
}

// ── Tests ──
