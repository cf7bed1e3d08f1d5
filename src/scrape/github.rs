//! GitHub profile scraper.
//!
//! Repository count comes from the REST API; the API does not expose the
//! contribution total, so that is pattern-matched off the public
//! contributions page.

use serde::Deserialize;
use tracing::{info, warn};

use super::transport::Transport;
use super::{capture_int, extract_username, page_text, require_input, GithubStats, ScrapeError};

#[derive(Debug, Deserialize)]
struct GithubUser {
    public_repos: i32,
}

pub fn username_from(input: &str) -> Result<String, ScrapeError> {
    let input = require_input(input)?;
    if input.starts_with("http") {
        Ok(extract_username(input))
    } else {
        Ok(input.to_string())
    }
}

pub async fn scrape(transport: &Transport, input: &str) -> Result<GithubStats, ScrapeError> {
    let username = username_from(input)?;
    let api_url = format!("https://api.github.com/users/{username}");
    info!("[scrape] fetching github profile: {api_url}");

    let resp = transport.request(&api_url).await?;
    let status = resp.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ScrapeError::ProfileNotFound(username));
    }
    if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS
    {
        return Err(ScrapeError::Fetch("rate limited by GitHub API".to_string()));
    }
    if !status.is_success() {
        return Err(ScrapeError::Fetch(format!("HTTP {status} for {api_url}")));
    }

    let user: GithubUser = resp.json().await.map_err(ScrapeError::from)?;

    // Contribution count is best-effort: a failed page fetch downgrades to
    // zero rather than discarding the repo count.
    let contrib_url = format!("https://github.com/users/{username}/contributions");
    let contributions = match transport.fetch_page(&contrib_url).await {
        Ok(html) => parse_contributions(&html),
        Err(e) => {
            warn!("[scrape] failed to fetch contributions for {username}: {e}");
            0
        }
    };

    let stats = GithubStats {
        username,
        repos: user.public_repos,
        contributions,
    };

    if stats.repos == 0 && stats.contributions == 0 {
        warn!(
            "[scrape] all github values are 0 for {} - empty account or page structure changed",
            stats.username
        );
    }
    info!(
        "[scrape] github data for {}: repos={} contributions={}",
        stats.username, stats.repos, stats.contributions
    );
    Ok(stats)
}

pub fn parse_contributions(html: &str) -> i32 {
    let text = page_text(html);
    capture_int(&text, r"(?i)([\d,]+)\s+contributions?").unwrap_or(0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_contribution_totals_with_commas() {
        let html = "<html><body><h2>3,047 contributions in the last year</h2></body></html>";
        assert_eq!(parse_contributions(html), 3047);
    }

    #[test]
    fn contributionless_page_parses_to_zero() {
        assert_eq!(parse_contributions("<html><body></body></html>"), 0);
    }

    #[test]
    fn username_from_accepts_urls_and_bare_names() {
        assert_eq!(username_from("eve").unwrap(), "eve");
        assert_eq!(username_from("https://github.com/eve/").unwrap(), "eve");
        assert!(matches!(
            username_from(" "),
            Err(ScrapeError::InvalidInput(_))
        ));
    }
}
