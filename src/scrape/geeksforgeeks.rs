//! GeeksForGeeks profile scraper.
//!
//! GFG profile pages populate their problem breakdown with client-side JS,
//! so this scraper goes through the headless render transport and pattern-
//! matches the `LABEL ( count )` breakdown out of the rendered text.

use tracing::{info, warn};

use super::transport::Transport;
use super::{capture_int, extract_username, page_text, require_input, GeeksforgeeksStats, ScrapeError};

/// Any of these appearing in the rendered DOM means the breakdown section
/// has loaded.
pub const CONTENT_MARKERS: &[&str] = &["Problems Breakdown", "SCHOOL", "BASIC", "Problems Solved"];

/// Normalize a username or profile URL to the activity tab where the
/// breakdown is shown. Legacy `/user/` paths rewrite to `/profile/`.
pub fn normalize_url(input: &str) -> Result<String, ScrapeError> {
    let input = require_input(input)?;
    let mut url = if input.starts_with("http") {
        input.to_string()
    } else {
        format!("https://www.geeksforgeeks.org/user/{input}/")
    };

    url = url.replace("/user/", "/profile/");

    if !url.contains("tab=") {
        if url.contains('?') {
            url.push_str("&tab=activity");
        } else {
            url = format!("{}?tab=activity", url.trim_end_matches('/'));
        }
    }
    Ok(url)
}

pub async fn scrape(transport: &Transport, input: &str) -> Result<GeeksforgeeksStats, ScrapeError> {
    let url = normalize_url(input)?;
    let username = extract_username(input);
    info!("[scrape] rendering geeksforgeeks profile: {url}");

    let html = transport.render_page(&url, CONTENT_MARKERS).await?;
    let stats = parse_profile(&html, &username)?;

    info!(
        "[scrape] geeksforgeeks data for {}: [S:{},B:{},E:{},M:{},H:{}]",
        stats.username, stats.school, stats.basic, stats.easy, stats.medium, stats.hard
    );
    Ok(stats)
}

pub fn parse_profile(html: &str, username: &str) -> Result<GeeksforgeeksStats, ScrapeError> {
    if !html.to_lowercase().contains(&username.to_lowercase()) {
        return Err(ScrapeError::ProfileNotFound(username.to_string()));
    }

    let text = page_text(html);
    let stats = GeeksforgeeksStats {
        username: username.to_string(),
        school: capture_int(&text, r"(?i)SCHOOL\s*\(\s*(\d+)\s*\)").unwrap_or(0) as i32,
        basic: capture_int(&text, r"(?i)BASIC\s*\(\s*(\d+)\s*\)").unwrap_or(0) as i32,
        easy: capture_int(&text, r"(?i)EASY\s*\(\s*(\d+)\s*\)").unwrap_or(0) as i32,
        medium: capture_int(&text, r"(?i)MEDIUM\s*\(\s*(\d+)\s*\)").unwrap_or(0) as i32,
        hard: capture_int(&text, r"(?i)HARD\s*\(\s*(\d+)\s*\)").unwrap_or(0) as i32,
    };

    let total = stats.school + stats.basic + stats.easy + stats.medium + stats.hard;
    if total == 0 {
        warn!(
            "[scrape] all difficulty levels are 0 for {username} - page might not have loaded problem data"
        );
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_usernames_to_the_activity_tab() {
        assert_eq!(
            normalize_url("dave").unwrap(),
            "https://www.geeksforgeeks.org/profile/dave?tab=activity"
        );
    }

    #[test]
    fn rewrites_user_paths_and_keeps_existing_queries() {
        assert_eq!(
            normalize_url("https://www.geeksforgeeks.org/user/dave/?foo=1").unwrap(),
            "https://www.geeksforgeeks.org/profile/dave/?foo=1&tab=activity"
        );
        assert_eq!(
            normalize_url("https://www.geeksforgeeks.org/profile/dave?tab=practice").unwrap(),
            "https://www.geeksforgeeks.org/profile/dave?tab=practice"
        );
    }

    #[test]
    fn empty_input_is_invalid_before_networking() {
        assert!(matches!(
            normalize_url(""),
            Err(ScrapeError::InvalidInput(_))
        ));
    }

    #[test]
    fn parses_problem_breakdown_patterns() {
        let html = r#"<html><body>
            <h2>dave</h2>
            <div>Problems Breakdown</div>
            <span>SCHOOL (0)</span>
            <span>BASIC (164)</span>
            <span>Easy ( 55 )</span>
            <span>MEDIUM (23)</span>
            <span>HARD (2)</span>
        </body></html>"#;
        let stats = parse_profile(html, "dave").unwrap();
        assert_eq!(stats.school, 0);
        assert_eq!(stats.basic, 164);
        assert_eq!(stats.easy, 55);
        assert_eq!(stats.medium, 23);
        assert_eq!(stats.hard, 2);
    }

    #[test]
    fn missing_username_marker_is_profile_not_found() {
        let err = parse_profile("<html><body>SCHOOL (0)</body></html>", "dave").unwrap_err();
        assert!(matches!(err, ScrapeError::ProfileNotFound(_)));
    }

    #[test]
    fn unloaded_breakdown_returns_zeros_not_an_error() {
        let stats = parse_profile("<html><body>dave</body></html>", "dave").unwrap();
        assert_eq!(stats.school + stats.basic + stats.easy + stats.medium + stats.hard, 0);
    }
}
