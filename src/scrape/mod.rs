//! Profile scrapers for the supported coding platforms.
//!
//! Each platform module exposes an async `scrape` entry point plus a pure
//! parse function over fetched content, so parsing stays testable without
//! network access. Scrapers share one transport (rate-limited HTTP client
//! plus a headless render path for JS-heavy pages).

use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod codechef;
pub mod geeksforgeeks;
pub mod github;
pub mod hackerrank;
pub mod leetcode;
pub mod transport;

use transport::Transport;

// ============================================================================
// Error Taxonomy
// ============================================================================

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Empty or malformed username/URL; no network call was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Non-success HTTP status or network-level failure.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Request or render exceeded its time budget.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Page fetched fine but the expected profile markers are absent,
    /// which indicates a bad username rather than a flaky network.
    #[error("profile not found: {0}")]
    ProfileNotFound(String),
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout(err.to_string())
        } else {
            ScrapeError::Fetch(err.to_string())
        }
    }
}

// ============================================================================
// Platforms
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Leetcode,
    Codechef,
    Hackerrank,
    Geeksforgeeks,
    Github,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::Leetcode,
        Platform::Codechef,
        Platform::Hackerrank,
        Platform::Geeksforgeeks,
        Platform::Github,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Leetcode => "leetcode",
            Platform::Codechef => "codechef",
            Platform::Hackerrank => "hackerrank",
            Platform::Geeksforgeeks => "geeksforgeeks",
            Platform::Github => "github",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "leetcode" => Ok(Platform::Leetcode),
            "codechef" => Ok(Platform::Codechef),
            "hackerrank" => Ok(Platform::Hackerrank),
            "geeksforgeeks" => Ok(Platform::Geeksforgeeks),
            "github" => Ok(Platform::Github),
            other => Err(ScrapeError::InvalidInput(format!(
                "unknown platform '{other}'"
            ))),
        }
    }
}

// ============================================================================
// Scraped Statistics (strict per-platform output schemas)
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeetcodeStats {
    pub username: String,
    pub easy: i32,
    pub medium: i32,
    pub hard: i32,
    pub contests: i32,
    pub rating: i32,
    pub badges: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodechefStats {
    pub username: String,
    pub problems_solved: i32,
    pub contests: i32,
    pub rating: i32,
    pub stars: i32,
    pub badges: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HackerrankBadge {
    pub name: String,
    pub stars: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HackerrankStats {
    pub username: String,
    pub badges: Vec<HackerrankBadge>,
    pub total_stars: i32,
}

impl HackerrankStats {
    pub fn total_badges(&self) -> i32 {
        self.badges.len() as i32
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeeksforgeeksStats {
    pub username: String,
    pub school: i32,
    pub basic: i32,
    pub easy: i32,
    pub medium: i32,
    pub hard: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubStats {
    pub username: String,
    pub repos: i32,
    pub contributions: i32,
}

/// Result of one scrape, tagged by platform. Produced fresh on every scrape
/// and merged into the performance record by the orchestrator; never stored
/// verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScrapedStats {
    Leetcode(LeetcodeStats),
    Codechef(CodechefStats),
    Hackerrank(HackerrankStats),
    Geeksforgeeks(GeeksforgeeksStats),
    Github(GithubStats),
}

impl ScrapedStats {
    pub fn platform(&self) -> Platform {
        match self {
            ScrapedStats::Leetcode(_) => Platform::Leetcode,
            ScrapedStats::Codechef(_) => Platform::Codechef,
            ScrapedStats::Hackerrank(_) => Platform::Hackerrank,
            ScrapedStats::Geeksforgeeks(_) => Platform::Geeksforgeeks,
            ScrapedStats::Github(_) => Platform::Github,
        }
    }
}

/// Invoke the scraper matching `platform` on a username or profile URL.
pub async fn scrape_platform(
    transport: &Transport,
    platform: Platform,
    input: &str,
) -> Result<ScrapedStats, ScrapeError> {
    match platform {
        Platform::Leetcode => leetcode::scrape(transport, input)
            .await
            .map(ScrapedStats::Leetcode),
        Platform::Codechef => codechef::scrape(transport, input)
            .await
            .map(ScrapedStats::Codechef),
        Platform::Hackerrank => hackerrank::scrape(transport, input)
            .await
            .map(ScrapedStats::Hackerrank),
        Platform::Geeksforgeeks => geeksforgeeks::scrape(transport, input)
            .await
            .map(ScrapedStats::Geeksforgeeks),
        Platform::Github => github::scrape(transport, input)
            .await
            .map(ScrapedStats::Github),
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Reject empty input before any network traffic happens.
pub(crate) fn require_input(input: &str) -> Result<&str, ScrapeError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ScrapeError::InvalidInput(
            "empty username or URL".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Last non-empty path segment of a profile URL, or the input itself when
/// it is already a bare username.
pub(crate) fn extract_username(input: &str) -> String {
    let base = input.trim().split(['?', '#']).next().unwrap_or("");
    let base = base.trim_end_matches('/');
    base.rsplit('/').next().unwrap_or(base).to_string()
}

/// Flatten markup into its text content, roughly what a browser would
/// report as `innerText`. Label/number patterns match against this rather
/// than exact DOM paths so minor layout drift doesn't break parsing.
pub(crate) fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document.root_element().text().collect::<Vec<_>>().join(" ")
}

/// First capture group of `pattern` parsed as a number, commas stripped.
/// Fractional values truncate toward zero.
pub(crate) fn capture_int(text: &str, pattern: &str) -> Option<i64> {
    let re = Regex::new(pattern).expect("invalid pattern");
    let m = re.captures(text)?.get(1)?;
    m.as_str().replace(',', "").parse::<f64>().ok().map(|v| v as i64)
}
