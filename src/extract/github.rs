use async_trait::async_trait;
use tracing::warn;

use crate::detect::detect_platform;
use crate::error::ExtractError;
use crate::fetch;
use crate::html::page_meta;
use crate::router::Extractor;
use crate::text::clean_text;
use crate::types::{
    AuthorInfo, EngagementMetrics, Extracted, ExtractionResult, GithubResource, Platform,
    PlatformData,
};

const VERSION: &str = "1.1.0";
const API_BASE: &str = "https://api.github.com";

const API_HEADERS: &[(&str, &str)] = &[
    ("Accept", "application/vnd.github+json"),
    ("X-GitHub-Api-Version", "2022-11-28"),
];
const RAW_HEADERS: &[(&str, &str)] = &[
    ("Accept", "application/vnd.github.raw+json"),
    ("X-GitHub-Api-Version", "2022-11-28"),
];

/// What a GitHub URL points at, parsed from its path shape.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Repo { owner: String, repo: String },
    Issue { owner: String, repo: String, number: u64 },
    Pull { owner: String, repo: String, number: u64 },
    Gist { id: String },
    Blob { owner: String, repo: String, branch: String, path: String },
    Unknown,
}

/// GitHub REST v3, unauthenticated. Each path shape maps to its own API
/// call; shapes the API can't serve fall back to a local OG scrape.
pub struct GithubExtractor;

#[async_trait]
impl Extractor for GithubExtractor {
    fn platform(&self) -> Platform {
        Platform::Github
    }

    fn version(&self) -> &'static str {
        VERSION
    }

    fn can_handle(&self, url: &str) -> bool {
        detect_platform(url) == Platform::Github
    }

    async fn extract(&self, url: &str) -> Result<ExtractionResult, ExtractError> {
        let outcome = match parse_target(url) {
            Target::Repo { owner, repo } => extract_repo(&owner, &repo).await,
            Target::Issue { owner, repo, number } => {
                extract_issue_like(&owner, &repo, number, false).await
            }
            Target::Pull { owner, repo, number } => {
                extract_issue_like(&owner, &repo, number, true).await
            }
            Target::Gist { id } => extract_gist(&id).await,
            Target::Blob { owner, repo, branch, path } => {
                extract_blob(&owner, &repo, &branch, &path).await
            }
            Target::Unknown => extract_og_fallback(url).await,
        };

        match outcome {
            Ok(fields) => Ok(ExtractionResult::success(Platform::Github, VERSION, fields)),
            Err(e) => Ok(ExtractionResult::failure(
                Platform::Github,
                VERSION,
                format!("github extraction failed: {}", e),
            )),
        }
    }
}

fn parse_target(url: &str) -> Target {
    let Ok(parsed) = url::Url::parse(url) else {
        return Target::Unknown;
    };
    let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    if host == "gist.github.com" {
        // gist.github.com/<user>/<id> or gist.github.com/<id>
        return match segments.as_slice() {
            [_, id] | [id] => Target::Gist { id: id.to_string() },
            _ => Target::Unknown,
        };
    }

    // First segments that are site features, not user accounts
    const RESERVED: &[&str] = &[
        "topics", "orgs", "search", "marketplace", "explore", "trending", "collections",
        "sponsors", "features", "about", "pricing", "settings", "login", "join", "notifications",
    ];
    if segments
        .first()
        .is_some_and(|s| RESERVED.contains(s))
    {
        return Target::Unknown;
    }

    match segments.as_slice() {
        [owner, repo] => Target::Repo {
            owner: owner.to_string(),
            repo: repo.to_string(),
        },
        [owner, repo, "issues", number, ..] => match number.parse() {
            Ok(n) => Target::Issue {
                owner: owner.to_string(),
                repo: repo.to_string(),
                number: n,
            },
            Err(_) => Target::Unknown,
        },
        [owner, repo, "pull", number, ..] => match number.parse() {
            Ok(n) => Target::Pull {
                owner: owner.to_string(),
                repo: repo.to_string(),
                number: n,
            },
            Err(_) => Target::Unknown,
        },
        [owner, repo, "blob", branch, path @ ..] if !path.is_empty() => Target::Blob {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            path: path.join("/"),
        },
        _ => Target::Unknown,
    }
}

async fn extract_repo(owner: &str, repo: &str) -> Result<Extracted, ExtractError> {
    let endpoint = format!("{}/repos/{}/{}", API_BASE, owner, repo);
    let body = fetch::fetch_json_with_headers(&endpoint, API_HEADERS).await?;

    // README is a second call; its absence is not a failure
    let readme_endpoint = format!("{}/repos/{}/{}/readme", API_BASE, owner, repo);
    let readme = match fetch::fetch_text_with_headers(&readme_endpoint, RAW_HEADERS).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("readme fetch failed for {}/{}: {}", owner, repo, e);
            None
        }
    };

    normalize_repo(owner, repo, &body, readme)
}

fn normalize_repo(
    owner: &str,
    repo: &str,
    body: &serde_json::Value,
    readme: Option<String>,
) -> Result<Extracted, ExtractError> {
    let full_name = body
        .get("full_name")
        .and_then(|n| n.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}/{}", owner, repo));

    let description = body
        .get("description")
        .and_then(|d| d.as_str())
        .map(clean_text)
        .filter(|d| !d.is_empty());

    let content = match (&description, readme) {
        (Some(desc), Some(readme)) => format!("{}\n\n{}", desc, readme.trim()),
        (None, Some(readme)) => readme.trim().to_string(),
        (Some(desc), None) => desc.clone(),
        (None, None) => {
            return Err(ExtractError::Parse(
                "repository has no description or readme".into(),
            ))
        }
    };

    let author = body.get("owner").and_then(|o| {
        let login = o.get("login").and_then(|l| l.as_str())?;
        let mut a = AuthorInfo::named(login);
        a.profile_url = o.get("html_url").and_then(|u| u.as_str()).map(str::to_string);
        a.avatar_url = o
            .get("avatar_url")
            .and_then(|u| u.as_str())
            .map(str::to_string);
        Some(a)
    });

    let engagement = EngagementMetrics {
        stars: body.get("stargazers_count").and_then(|s| s.as_u64()),
        forks: body.get("forks_count").and_then(|f| f.as_u64()),
        ..Default::default()
    };

    Ok(Extracted {
        title: Some(full_name),
        content,
        author,
        engagement: Some(engagement),
        platform_data: Some(PlatformData::Github {
            resource: GithubResource::Repository,
            owner: owner.to_string(),
            repo: Some(repo.to_string()),
            number: None,
            language: body
                .get("language")
                .and_then(|l| l.as_str())
                .map(str::to_string),
            default_branch: body
                .get("default_branch")
                .and_then(|b| b.as_str())
                .map(str::to_string),
        }),
        ..Default::default()
    })
}

async fn extract_issue_like(
    owner: &str,
    repo: &str,
    number: u64,
    is_pull: bool,
) -> Result<Extracted, ExtractError> {
    let kind = if is_pull { "pulls" } else { "issues" };
    let endpoint = format!("{}/repos/{}/{}/{}/{}", API_BASE, owner, repo, kind, number);
    let body = fetch::fetch_json_with_headers(&endpoint, API_HEADERS).await?;
    normalize_issue_like(owner, repo, number, is_pull, &body)
}

fn normalize_issue_like(
    owner: &str,
    repo: &str,
    number: u64,
    is_pull: bool,
    body: &serde_json::Value,
) -> Result<Extracted, ExtractError> {
    let title = body
        .get("title")
        .and_then(|t| t.as_str())
        .map(clean_text)
        .ok_or_else(|| ExtractError::Parse("issue payload has no title".into()))?;

    let text = body
        .get("body")
        .and_then(|b| b.as_str())
        .map(clean_text)
        .filter(|b| !b.is_empty());
    let state = body.get("state").and_then(|s| s.as_str()).unwrap_or("open");
    let content = text.unwrap_or_else(|| format!("{} ({})", title, state));

    let author = body.get("user").and_then(|u| {
        let login = u.get("login").and_then(|l| l.as_str())?;
        let mut a = AuthorInfo::named(login);
        a.profile_url = u.get("html_url").and_then(|h| h.as_str()).map(str::to_string);
        a.avatar_url = u
            .get("avatar_url")
            .and_then(|h| h.as_str())
            .map(str::to_string);
        Some(a)
    });

    let engagement = EngagementMetrics {
        comments: body.get("comments").and_then(|c| c.as_u64()),
        likes: body
            .get("reactions")
            .and_then(|r| r.get("total_count"))
            .and_then(|t| t.as_u64()),
        ..Default::default()
    };

    Ok(Extracted {
        title: Some(format!("{}/{}#{}: {}", owner, repo, number, title)),
        content,
        author,
        engagement: Some(engagement),
        platform_data: Some(PlatformData::Github {
            resource: if is_pull {
                GithubResource::Pull
            } else {
                GithubResource::Issue
            },
            owner: owner.to_string(),
            repo: Some(repo.to_string()),
            number: Some(number),
            language: None,
            default_branch: None,
        }),
        ..Default::default()
    })
}

async fn extract_gist(id: &str) -> Result<Extracted, ExtractError> {
    let endpoint = format!("{}/gists/{}", API_BASE, id);
    let body = fetch::fetch_json_with_headers(&endpoint, API_HEADERS).await?;
    normalize_gist(id, &body)
}

fn normalize_gist(id: &str, body: &serde_json::Value) -> Result<Extracted, ExtractError> {
    let description = body
        .get("description")
        .and_then(|d| d.as_str())
        .map(clean_text)
        .filter(|d| !d.is_empty());

    let files = body
        .get("files")
        .and_then(|f| f.as_object())
        .ok_or_else(|| ExtractError::Parse("gist payload has no files".into()))?;

    let mut parts = Vec::new();
    let mut first_filename = None;
    for (name, file) in files {
        if first_filename.is_none() {
            first_filename = Some(name.clone());
        }
        if let Some(content) = file.get("content").and_then(|c| c.as_str()) {
            parts.push(content.to_string());
        }
    }
    if parts.is_empty() && description.is_none() {
        return Err(ExtractError::Parse("gist has no content".into()));
    }

    let content = match &description {
        Some(desc) if parts.is_empty() => desc.clone(),
        Some(desc) => format!("{}\n\n{}", desc, parts.join("\n\n")),
        None => parts.join("\n\n"),
    };

    let author = body
        .get("owner")
        .and_then(|o| o.get("login"))
        .and_then(|l| l.as_str())
        .map(AuthorInfo::named);

    Ok(Extracted {
        title: description.or(first_filename),
        content,
        author,
        platform_data: Some(PlatformData::Github {
            resource: GithubResource::Gist,
            owner: id.to_string(),
            repo: None,
            number: None,
            language: None,
            default_branch: None,
        }),
        ..Default::default()
    })
}

async fn extract_blob(
    owner: &str,
    repo: &str,
    branch: &str,
    path: &str,
) -> Result<Extracted, ExtractError> {
    let endpoint = format!(
        "{}/repos/{}/{}/contents/{}?ref={}",
        API_BASE, owner, repo, path, branch
    );
    let content = fetch::fetch_text_with_headers(&endpoint, RAW_HEADERS).await?;
    if content.trim().is_empty() {
        return Err(ExtractError::Parse("file is empty".into()));
    }

    Ok(Extracted {
        title: Some(format!("{}/{}: {}", owner, repo, path)),
        content,
        platform_data: Some(PlatformData::Github {
            resource: GithubResource::Blob,
            owner: owner.to_string(),
            repo: Some(repo.to_string()),
            number: None,
            language: None,
            default_branch: Some(branch.to_string()),
        }),
        ..Default::default()
    })
}

/// Path shapes the REST API can't serve (profiles, topic pages, search)
/// scrape their own OG tags instead.
async fn extract_og_fallback(url: &str) -> Result<Extracted, ExtractError> {
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
        platform_data: Some(PlatformData::Github {
            resource: GithubResource::Unknown,
            owner: String::new(),
            repo: None,
            number: None,
            language: None,
            default_branch: None,
        }),
        ..Default::default()
    })
}

// ── Tests ──
