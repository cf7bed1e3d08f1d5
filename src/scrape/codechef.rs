//! CodeChef profile scraper.
//!
//! The profile page is static HTML: the rating block carries semantic
//! classes, while problem/contest totals are plain text labels.

use scraper::{Html, Selector};
use tracing::{info, warn};

use super::transport::Transport;
use super::{capture_int, extract_username, page_text, require_input, CodechefStats, ScrapeError};

pub fn profile_url(input: &str) -> Result<(String, String), ScrapeError> {
    let input = require_input(input)?;
    if input.starts_with("http") {
        Ok((input.to_string(), extract_username(input)))
    } else {
        Ok((
            format!("https://www.codechef.com/users/{input}"),
            input.to_string(),
        ))
    }
}

pub async fn scrape(transport: &Transport, input: &str) -> Result<CodechefStats, ScrapeError> {
    let (url, username) = profile_url(input)?;
    info!("[scrape] fetching codechef profile: {url}");

    let html = transport.fetch_page(&url).await?;
    let stats = parse_profile(&html, &username)?;

    info!(
        "[scrape] codechef data for {}: problems={} contests={} rating={} stars={} badges={}",
        stats.username, stats.problems_solved, stats.contests, stats.rating, stats.stars,
        stats.badges
    );
    Ok(stats)
}

pub fn parse_profile(html: &str, username: &str) -> Result<CodechefStats, ScrapeError> {
    if !html.to_lowercase().contains(&username.to_lowercase()) {
        return Err(ScrapeError::ProfileNotFound(username.to_string()));
    }

    let document = Html::parse_document(html);

    let rating_selector = Selector::parse(".rating-number").expect("invalid selector");
    let rating = document
        .select(&rating_selector)
        .next()
        .map(|el| {
            let digits: String = el
                .text()
                .collect::<String>()
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            digits.parse().unwrap_or(0)
        })
        .unwrap_or(0);

    let star_selector = Selector::parse(".rating-star span").expect("invalid selector");
    let stars = document.select(&star_selector).count() as i32;

    let text = page_text(html);
    let problems_solved =
        capture_int(&text, r"(?i)Total Problems Solved\D{0,10}?(\d+)").unwrap_or(0) as i32;
    let contests = capture_int(&text, r"(?i)Contests?\s*\(\s*(\d+)\s*\)")
        .or_else(|| capture_int(&text, r"(?i)Contests Participated\D{0,10}?(\d+)"))
        .unwrap_or(0) as i32;
    let badges = capture_int(&text, r"(?i)Badges?\s*\(\s*(\d+)\s*\)").unwrap_or(0) as i32;

    let stats = CodechefStats {
        username: username.to_string(),
        problems_solved,
        contests,
        rating,
        stars,
        badges,
    };

    if stats.problems_solved == 0 && stats.rating == 0 {
        warn!(
            "[scrape] all codechef values are 0 for {username} - page structure may have changed"
        );
    }
    Ok(stats)
}
