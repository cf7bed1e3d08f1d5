//! LeetCode profile scraper.
//!
//! Parses difficulty counts, contest figures and badge count out of the
//! profile page text with tolerant label/number patterns.

use tracing::{info, warn};

use super::transport::Transport;
use super::{capture_int, extract_username, page_text, require_input, LeetcodeStats, ScrapeError};

pub fn profile_url(input: &str) -> Result<(String, String), ScrapeError> {
    let input = require_input(input)?;
    if input.starts_with("http") {
        Ok((input.to_string(), extract_username(input)))
    } else {
        Ok((format!("https://leetcode.com/u/{input}/"), input.to_string()))
    }
}

pub async fn scrape(transport: &Transport, input: &str) -> Result<LeetcodeStats, ScrapeError> {
    let (url, username) = profile_url(input)?;
    info!("[scrape] fetching leetcode profile: {url}");

    let html = transport.fetch_page(&url).await?;
    let stats = parse_profile(&html, &username)?;

    info!(
        "[scrape] leetcode data for {}: [E:{},M:{},H:{}] contests={} rating={} badges={}",
        stats.username, stats.easy, stats.medium, stats.hard, stats.contests, stats.rating,
        stats.badges
    );
    Ok(stats)
}

/// Extract stats from a fetched profile page. Absent username marker means
/// the page is not this user's profile, even on HTTP 200.
pub fn parse_profile(html: &str, username: &str) -> Result<LeetcodeStats, ScrapeError> {
    if !html.to_lowercase().contains(&username.to_lowercase()) {
        return Err(ScrapeError::ProfileNotFound(username.to_string()));
    }

    let text = page_text(html);
    let stats = LeetcodeStats {
        username: username.to_string(),
        easy: capture_int(&text, r"(?i)\bEasy\b\D{0,40}?(\d+)").unwrap_or(0) as i32,
        medium: capture_int(&text, r"(?i)\bMedium\b\D{0,40}?(\d+)").unwrap_or(0) as i32,
        hard: capture_int(&text, r"(?i)\bHard\b\D{0,40}?(\d+)").unwrap_or(0) as i32,
        contests: capture_int(&text, r"(?i)Attended\D{0,40}?(\d+)").unwrap_or(0) as i32,
        rating: capture_int(&text, r"(?i)Contest Rating\D{0,40}?([\d,]+(?:\.\d+)?)")
            .unwrap_or(0) as i32,
        badges: capture_int(&text, r"(?i)\bBadges\b\D{0,40}?(\d+)").unwrap_or(0) as i32,
    };

    if stats.easy + stats.medium + stats.hard == 0 {
        warn!(
            "[scrape] all leetcode difficulty counts are 0 for {username} - page structure may have changed"
        );
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"<html><body>
        <div class="profile">alice</div>
        <div>Easy <span>10</span> /885</div>
        <div>Medium <span>2</span> /1879</div>
        <div>Hard <span>1</span> /840</div>
        <div>Contest Rating <span>1,663.52</span></div>
        <div>Attended <span>7</span> contests</div>
        <div>Badges <span>3</span></div>
    </body></html>"#;

    #[test]
    fn parses_difficulty_and_contest_stats() {
        let stats = parse_profile(PROFILE, "alice").unwrap();
        assert_eq!(stats.easy, 10);
        assert_eq!(stats.medium, 2);
        assert_eq!(stats.hard, 1);
        assert_eq!(stats.contests, 7);
        assert_eq!(stats.rating, 1663);
        assert_eq!(stats.badges, 3);
    }

    #[test]
    fn missing_username_marker_is_profile_not_found() {
        let err = parse_profile("<html><body>404</body></html>", "alice").unwrap_err();
        assert!(matches!(err, ScrapeError::ProfileNotFound(_)));
    }

    #[test]
    fn zero_counts_still_return_a_result() {
        let html = "<html><body>alice has no public stats</body></html>";
        let stats = parse_profile(html, "alice").unwrap();
        assert_eq!(stats.easy + stats.medium + stats.hard, 0);
    }

    #[test]
    fn profile_url_accepts_bare_names_and_urls() {
        let (url, user) = profile_url("alice").unwrap();
        assert_eq!(url, "https://leetcode.com/u/alice/");
        assert_eq!(user, "alice");

        let (url, user) = profile_url("https://leetcode.com/u/bob/").unwrap();
        assert_eq!(url, "https://leetcode.com/u/bob/");
        assert_eq!(user, "bob");
    }

    #[test]
    fn empty_input_fails_before_any_network_call() {
        assert!(matches!(
            profile_url("  "),
            Err(ScrapeError::InvalidInput(_))
        ));
    }
}
