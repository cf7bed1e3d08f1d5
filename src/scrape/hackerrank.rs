//! HackerRank profile scraper.
//!
//! Badges render as SVG hexagons; names and star counts hang off semantic
//! classes inside each hexagon rather than stable DOM paths.

use scraper::{Html, Selector};
use tracing::{info, warn};

use super::transport::Transport;
use super::{extract_username, require_input, HackerrankBadge, HackerrankStats, ScrapeError};

pub fn profile_url(input: &str) -> Result<(String, String), ScrapeError> {
    let input = require_input(input)?;
    if input.starts_with("http") {
        Ok((input.to_string(), extract_username(input)))
    } else {
        Ok((
            format!("https://www.hackerrank.com/profile/{input}"),
            input.to_string(),
        ))
    }
}

pub async fn scrape(transport: &Transport, input: &str) -> Result<HackerrankStats, ScrapeError> {
    let (url, username) = profile_url(input)?;
    info!("[scrape] fetching hackerrank profile: {url}");

    let html = transport.fetch_page(&url).await?;
    let stats = parse_profile(&html, &username);

    info!(
        "[scrape] hackerrank data for {}: {} badges, {} stars",
        stats.username,
        stats.total_badges(),
        stats.total_stars
    );
    Ok(stats)
}

/// A profile with no hexagons is a valid zero result: plenty of accounts
/// simply have no badges yet.
pub fn parse_profile(html: &str, username: &str) -> HackerrankStats {
    let document = Html::parse_document(html);

    let hexagon_selector = Selector::parse("svg.hexagon").expect("invalid selector");
    let title_selector = Selector::parse("text.badge-title").expect("invalid selector");
    let star_section_selector = Selector::parse("g.star-section").expect("invalid selector");
    let star_selector = Selector::parse("svg.badge-star").expect("invalid selector");

    let mut badges = Vec::new();
    let mut total_stars = 0;

    for hexagon in document.select(&hexagon_selector) {
        let name = hexagon
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Unknown Badge".to_string());

        let stars = hexagon
            .select(&star_section_selector)
            .next()
            .map(|section| section.select(&star_selector).count() as i32)
            .unwrap_or(0);

        total_stars += stars;
        badges.push(HackerrankBadge { name, stars });
    }

    if badges.is_empty() {
        warn!("[scrape] no hackerrank badges found for {username}");
    }

    HackerrankStats {
        username: username.to_string(),
        badges,
        total_stars,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"<html><body>
        <svg class="hexagon">
            <text class="badge-title">Problem Solving</text>
            <g class="star-section">
                <svg class="badge-star"></svg>
                <svg class="badge-star"></svg>
                <svg class="badge-star"></svg>
            </g>
        </svg>
        <svg class="hexagon">
            <text class="badge-title">Python</text>
            <g class="star-section">
                <svg class="badge-star"></svg>
            </g>
        </svg>
        <svg class="hexagon">
            <g class="star-section"></g>
        </svg>
    </body></html>"#;

    #[test]
    fn parses_badges_and_star_totals() {
        let stats = parse_profile(PROFILE, "carol");
        assert_eq!(stats.total_badges(), 3);
        assert_eq!(stats.total_stars, 4);
        assert_eq!(stats.badges[0].name, "Problem Solving");
        assert_eq!(stats.badges[0].stars, 3);
        assert_eq!(stats.badges[1].name, "Python");
        assert_eq!(stats.badges[2].name, "Unknown Badge");
        assert_eq!(stats.badges[2].stars, 0);
    }

    #[test]
    fn badgeless_page_is_a_valid_zero_result() {
        let stats = parse_profile("<html><body>carol</body></html>", "carol");
        assert_eq!(stats.total_badges(), 0);
        assert_eq!(stats.total_stars, 0);
    }
}
