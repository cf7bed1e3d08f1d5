//! Update-and-persist orchestration between the scrapers and storage.
//!
//! Each platform owns a fixed, disjoint set of `student_performance`
//! columns and every write is scoped to exactly that set, so concurrent
//! updates for different platforms on the same student can never clobber
//! each other. A failed scrape leaves the stored record untouched.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use sqlx::PgPool;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::scrape::transport::Transport;
use crate::scrape::{self, Platform, ScrapedStats};

// ============================================================================
// Platform-scoped column sets
// ============================================================================

pub(crate) fn platform_columns(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Leetcode => &[
            "easy_lc",
            "medium_lc",
            "hard_lc",
            "contests_lc",
            "rating_lc",
            "badges_lc",
        ],
        Platform::Codechef => &[
            "problems_cc",
            "contests_cc",
            "rating_cc",
            "stars_cc",
            "badges_cc",
        ],
        Platform::Hackerrank => &["badges_hr", "stars_hr", "badges_list_hr"],
        Platform::Geeksforgeeks => &[
            "school_gfg",
            "basic_gfg",
            "easy_gfg",
            "medium_gfg",
            "hard_gfg",
        ],
        Platform::Github => &["repos_gh", "contributions_gh"],
    }
}

fn upsert_sql(columns: &[&str]) -> String {
    let col_list = columns.join(", ");
    let placeholders = (0..columns.len())
        .map(|i| format!("${}", i + 2))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = columns
        .iter()
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO student_performance (student_id, {col_list}, last_updated) \
         VALUES ($1, {placeholders}, NOW()) \
         ON CONFLICT (student_id) DO UPDATE SET {updates}, last_updated = NOW()"
    )
}

// ============================================================================
// Single-platform update
// ============================================================================

/// Scrape one platform for one student and merge the result into the
/// performance record. Only the scraped platform's columns are written.
pub async fn update_performance(
    pool: &PgPool,
    transport: &Transport,
    student_id: &str,
    platform: Platform,
    username: &str,
) -> Result<()> {
    let stats = match scrape::scrape_platform(transport, platform, username).await {
        Ok(stats) => stats,
        Err(e) => {
            error!("[scrape] {platform} scrape failed for {student_id}: {e}");
            return Err(e.into());
        }
    };

    persist_stats(pool, student_id, &stats).await?;
    info!("[scrape] {platform} performance updated for {student_id}");
    Ok(())
}

async fn persist_stats(pool: &PgPool, student_id: &str, stats: &ScrapedStats) -> Result<()> {
    match stats {
        ScrapedStats::Leetcode(s) => {
            sqlx::query(&upsert_sql(platform_columns(Platform::Leetcode)))
                .bind(student_id)
                .bind(s.easy)
                .bind(s.medium)
                .bind(s.hard)
                .bind(s.contests)
                .bind(s.rating)
                .bind(s.badges)
                .execute(pool)
                .await
                .context("failed to persist leetcode stats")?;
        }
        ScrapedStats::Codechef(s) => {
            sqlx::query(&upsert_sql(platform_columns(Platform::Codechef)))
                .bind(student_id)
                .bind(s.problems_solved)
                .bind(s.contests)
                .bind(s.rating)
                .bind(s.stars)
                .bind(s.badges)
                .execute(pool)
                .await
                .context("failed to persist codechef stats")?;
        }
        ScrapedStats::Hackerrank(s) => {
            let badge_list =
                serde_json::to_value(&s.badges).context("failed to encode badge list")?;
            sqlx::query(&upsert_sql(platform_columns(Platform::Hackerrank)))
                .bind(student_id)
                .bind(s.total_badges())
                .bind(s.total_stars)
                .bind(badge_list)
                .execute(pool)
                .await
                .context("failed to persist hackerrank stats")?;
        }
        ScrapedStats::Geeksforgeeks(s) => {
            sqlx::query(&upsert_sql(platform_columns(Platform::Geeksforgeeks)))
                .bind(student_id)
                .bind(s.school)
                .bind(s.basic)
                .bind(s.easy)
                .bind(s.medium)
                .bind(s.hard)
                .execute(pool)
                .await
                .context("failed to persist geeksforgeeks stats")?;
        }
        ScrapedStats::Github(s) => {
            sqlx::query(&upsert_sql(platform_columns(Platform::Github)))
                .bind(student_id)
                .bind(s.repos)
                .bind(s.contributions)
                .execute(pool)
                .await
                .context("failed to persist github stats")?;
        }
    }
    Ok(())
}

// ============================================================================
// Whole-student refresh
// ============================================================================

#[derive(Serialize, Debug, Clone)]
pub struct PlatformOutcome {
    pub platform: Platform,
    pub username: String,
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct CodingProfiles {
    pub student_id: String,
    pub leetcode_id: Option<String>,
    pub codechef_id: Option<String>,
    pub geeksforgeeks_id: Option<String>,
    pub hackerrank_id: Option<String>,
    pub github_id: Option<String>,
    pub leetcode_status: Option<String>,
    pub codechef_status: Option<String>,
    pub geeksforgeeks_status: Option<String>,
    pub hackerrank_status: Option<String>,
    pub github_status: Option<String>,
}

impl CodingProfiles {
    pub fn username(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Leetcode => self.leetcode_id.as_deref(),
            Platform::Codechef => self.codechef_id.as_deref(),
            Platform::Geeksforgeeks => self.geeksforgeeks_id.as_deref(),
            Platform::Hackerrank => self.hackerrank_id.as_deref(),
            Platform::Github => self.github_id.as_deref(),
        }
    }

    pub fn status(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Leetcode => self.leetcode_status.as_deref(),
            Platform::Codechef => self.codechef_status.as_deref(),
            Platform::Geeksforgeeks => self.geeksforgeeks_status.as_deref(),
            Platform::Hackerrank => self.hackerrank_status.as_deref(),
            Platform::Github => self.github_status.as_deref(),
        }
    }

    pub fn is_accepted(&self, platform: Platform) -> bool {
        self.status(platform) == Some("accepted")
    }
}

/// Re-scrape every accepted platform for one student, in parallel. One
/// platform failing never blocks the others; the caller gets a
/// per-platform outcome either way.
pub async fn scrape_all_profiles(
    pool: &PgPool,
    transport: &Transport,
    student_id: &str,
) -> Result<Vec<PlatformOutcome>> {
    let profiles: Option<CodingProfiles> = sqlx::query_as(
        "SELECT student_id, leetcode_id, codechef_id, geeksforgeeks_id, hackerrank_id, \
         github_id, leetcode_status, codechef_status, geeksforgeeks_status, \
         hackerrank_status, github_status \
         FROM student_coding_profiles WHERE student_id = $1",
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await
    .context("failed to load coding profiles")?;

    let Some(profiles) = profiles else {
        anyhow::bail!("no coding profiles found for student {student_id}");
    };

    let mut targets = Vec::new();
    for platform in Platform::ALL {
        if !profiles.is_accepted(platform) {
            continue;
        }
        if let Some(username) = profiles.username(platform) {
            targets.push((platform, username.to_string()));
        }
    }

    if targets.is_empty() {
        warn!("no accepted profiles to scrape for {student_id}");
        return Ok(Vec::new());
    }

    let jobs = targets.into_iter().map(|(platform, username)| async move {
        let result = update_performance(pool, transport, student_id, platform, &username).await;
        PlatformOutcome {
            platform,
            username,
            ok: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
        }
    });
    let outcomes = join_all(jobs).await;

    let succeeded = outcomes.iter().filter(|o| o.ok).count();
    info!(
        "[scrape] {student_id}: {succeeded}/{} platforms updated",
        outcomes.len()
    );
    Ok(outcomes)
}

// ============================================================================
// Batch rating back-fill
// ============================================================================

#[derive(Serialize, Debug, Clone, Default)]
pub struct PopulateReport {
    pub processed: usize,
    pub leetcode_updated: usize,
    pub codechef_updated: usize,
    pub failures: usize,
    pub remaining: i64,
}

#[derive(sqlx::FromRow, Debug)]
struct PopulateCandidate {
    student_id: String,
    leetcode_id: Option<String>,
    codechef_id: Option<String>,
    leetcode_status: Option<String>,
    codechef_status: Option<String>,
    rating_lc: Option<i32>,
    rating_cc: Option<i32>,
}

impl PopulateCandidate {
    fn needs_leetcode(&self) -> bool {
        self.leetcode_status.as_deref() == Some("accepted")
            && self.leetcode_id.is_some()
            && self.rating_lc.unwrap_or(0) == 0
    }

    fn needs_codechef(&self) -> bool {
        self.codechef_status.as_deref() == Some("accepted")
            && self.codechef_id.is_some()
            && self.rating_cc.unwrap_or(0) == 0
    }
}

const MISSING_RATING_FILTER: &str = "(scp.leetcode_status = 'accepted' AND scp.leetcode_id IS NOT NULL \
     AND (sp.rating_lc IS NULL OR sp.rating_lc = 0)) \
     OR (scp.codechef_status = 'accepted' AND scp.codechef_id IS NOT NULL \
     AND (sp.rating_cc IS NULL OR sp.rating_cc = 0))";

/// Back-fill missing LeetCode/CodeChef ratings for up to `batch_size`
/// students, strictly serially with `delay` between requests.
///
/// Selection keys on "rating NULL or 0" so reruns pick up where the last
/// batch left off. `remaining` re-counts the backlog after the batch.
pub async fn populate_missing(
    pool: &PgPool,
    transport: &Transport,
    batch_size: i64,
    delay: Duration,
) -> Result<PopulateReport> {
    let candidates: Vec<PopulateCandidate> = sqlx::query_as(&format!(
        "SELECT DISTINCT scp.student_id, scp.leetcode_id, scp.codechef_id, \
         scp.leetcode_status, scp.codechef_status, sp.rating_lc, sp.rating_cc \
         FROM student_coding_profiles scp \
         LEFT JOIN student_performance sp ON scp.student_id = sp.student_id \
         WHERE {MISSING_RATING_FILTER} \
         ORDER BY scp.student_id \
         LIMIT $1"
    ))
    .bind(batch_size)
    .fetch_all(pool)
    .await
    .context("failed to select rating backlog")?;

    info!(
        "found {} students with missing ratings (processing up to {batch_size} at a time)",
        candidates.len()
    );

    let mut report = PopulateReport::default();
    for (i, candidate) in candidates.iter().enumerate() {
        report.processed += 1;
        info!(
            "[{}/{}] processing: {}",
            i + 1,
            candidates.len(),
            candidate.student_id
        );

        if candidate.needs_leetcode() {
            let leetcode_id = candidate.leetcode_id.as_deref().unwrap_or_default();
            match update_performance(
                pool,
                transport,
                &candidate.student_id,
                Platform::Leetcode,
                leetcode_id,
            )
            .await
            {
                Ok(()) => report.leetcode_updated += 1,
                Err(e) => {
                    report.failures += 1;
                    error!(
                        "failed to update leetcode for {}: {e}",
                        candidate.student_id
                    );
                }
            }
            sleep(delay).await;
        }

        if candidate.needs_codechef() {
            let codechef_id = candidate.codechef_id.as_deref().unwrap_or_default();
            match update_performance(
                pool,
                transport,
                &candidate.student_id,
                Platform::Codechef,
                codechef_id,
            )
            .await
            {
                Ok(()) => report.codechef_updated += 1,
                Err(e) => {
                    report.failures += 1;
                    error!(
                        "failed to update codechef for {}: {e}",
                        candidate.student_id
                    );
                }
            }
            sleep(delay).await;
        }
    }

    let (remaining,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(DISTINCT scp.student_id) \
         FROM student_coding_profiles scp \
         LEFT JOIN student_performance sp ON scp.student_id = sp.student_id \
         WHERE {MISSING_RATING_FILTER}"
    ))
    .fetch_one(pool)
    .await
    .context("failed to count remaining backlog")?;
    report.remaining = remaining;

    info!("===== rating population batch complete =====");
    info!("leetcode profiles updated: {}", report.leetcode_updated);
    info!("codechef profiles updated: {}", report.codechef_updated);
    info!("failures: {}", report.failures);
    info!("students still needing ratings: {}", report.remaining);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn platform_column_sets_are_disjoint() {
        let mut seen = HashSet::new();
        for platform in Platform::ALL {
            for col in platform_columns(platform) {
                assert!(seen.insert(*col), "column {col} claimed by two platforms");
            }
        }
    }

    #[test]
    fn scraped_columns_belong_to_their_platform() {
        for platform in Platform::ALL {
            for col in platform_columns(platform) {
                // The badge list is an aux JSON column, not a scoreable metric.
                if *col == "badges_list_hr" {
                    continue;
                }
                assert_eq!(
                    crate::ranking::metric_owner(col),
                    Some(platform),
                    "column {col} not owned by {platform}"
                );
            }
        }
    }

    #[test]
    fn upsert_touches_only_its_own_columns() {
        let sql = upsert_sql(platform_columns(Platform::Leetcode));
        assert!(sql.contains("ON CONFLICT (student_id) DO UPDATE SET"));
        assert!(sql.contains("easy_lc = EXCLUDED.easy_lc"));
        assert!(sql.contains("badges_lc = EXCLUDED.badges_lc"));
        assert!(sql.contains("last_updated = NOW()"));
        // 6 metric columns bind after $1 (student_id).
        assert!(sql.contains("$7"));
        assert!(!sql.contains("$8"));
        assert!(!sql.contains("problems_cc"));
        assert!(!sql.contains("school_gfg"));
    }

    #[test]
    fn populate_eligibility_keys_on_null_or_zero_rating() {
        let candidate = PopulateCandidate {
            student_id: "S001".to_string(),
            leetcode_id: Some("alice".to_string()),
            codechef_id: Some("alice_cc".to_string()),
            leetcode_status: Some("accepted".to_string()),
            codechef_status: Some("pending".to_string()),
            rating_lc: None,
            rating_cc: Some(1500),
        };
        assert!(candidate.needs_leetcode());
        // Not accepted, so never re-scraped even with a zero rating.
        assert!(!candidate.needs_codechef());

        let populated = PopulateCandidate {
            rating_lc: Some(1800),
            ..candidate
        };
        assert!(!populated.needs_leetcode());
    }
}
