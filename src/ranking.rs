//! Weighted scoring and leaderboard ranking.
//!
//! The score formula is data-driven: every metric in the admin-editable
//! `grading_system` table contributes `points * value`, gated on the
//! owning platform's acceptance status. Metric ownership is declared once
//! in [`METRIC_OWNERS`] and consulted uniformly, so gating never depends
//! on inspecting metric-name suffixes at scoring time.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, warn};

use crate::scrape::Platform;

// ============================================================================
// Weight Table & Metric Ownership
// ============================================================================

#[derive(Serialize, Deserialize, sqlx::FromRow, Debug, Clone)]
pub struct GradingWeight {
    pub metric: String,
    pub points: i64,
}

/// Which platform owns each performance metric. A platform's metrics only
/// count while that platform's profile status is exactly `accepted`.
pub const METRIC_OWNERS: &[(&str, Platform)] = &[
    ("easy_lc", Platform::Leetcode),
    ("medium_lc", Platform::Leetcode),
    ("hard_lc", Platform::Leetcode),
    ("contests_lc", Platform::Leetcode),
    ("rating_lc", Platform::Leetcode),
    ("badges_lc", Platform::Leetcode),
    ("problems_cc", Platform::Codechef),
    ("contests_cc", Platform::Codechef),
    ("rating_cc", Platform::Codechef),
    ("stars_cc", Platform::Codechef),
    ("badges_cc", Platform::Codechef),
    ("school_gfg", Platform::Geeksforgeeks),
    ("basic_gfg", Platform::Geeksforgeeks),
    ("easy_gfg", Platform::Geeksforgeeks),
    ("medium_gfg", Platform::Geeksforgeeks),
    ("hard_gfg", Platform::Geeksforgeeks),
    ("contests_gfg", Platform::Geeksforgeeks),
    ("badges_hr", Platform::Hackerrank),
    ("stars_hr", Platform::Hackerrank),
    ("repos_gh", Platform::Github),
    ("contributions_gh", Platform::Github),
];

pub fn metric_owner(metric: &str) -> Option<Platform> {
    METRIC_OWNERS
        .iter()
        .find(|(name, _)| *name == metric)
        .map(|(_, platform)| *platform)
}

/// Load the weight table, dropping entries whose metric does not map to any
/// performance column. A malformed admin entry must never break ranking.
pub async fn load_weights(pool: &PgPool) -> Result<Vec<GradingWeight>> {
    let rows: Vec<GradingWeight> = sqlx::query_as("SELECT metric, points FROM grading_system")
        .fetch_all(pool)
        .await
        .context("failed to load grading weights")?;

    let (known, unknown): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|w| metric_owner(&w.metric).is_some());
    for w in &unknown {
        warn!(
            "grading metric '{}' does not match any performance column, ignoring",
            w.metric
        );
    }
    Ok(known)
}

// ============================================================================
// Performance Records & Acceptance Statuses
// ============================================================================

#[derive(Serialize, Deserialize, sqlx::FromRow, Debug, Clone, Default)]
pub struct PerformanceRecord {
    pub student_id: String,
    pub easy_lc: i32,
    pub medium_lc: i32,
    pub hard_lc: i32,
    pub contests_lc: i32,
    pub rating_lc: i32,
    pub badges_lc: i32,
    pub problems_cc: i32,
    pub contests_cc: i32,
    pub rating_cc: i32,
    pub stars_cc: i32,
    pub badges_cc: i32,
    pub school_gfg: i32,
    pub basic_gfg: i32,
    pub easy_gfg: i32,
    pub medium_gfg: i32,
    pub hard_gfg: i32,
    pub contests_gfg: i32,
    pub badges_hr: i32,
    pub stars_hr: i32,
    pub badges_list_hr: Option<serde_json::Value>,
    pub repos_gh: i32,
    pub contributions_gh: i32,
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

impl PerformanceRecord {
    /// A record for a student who has never been scraped: all metrics zero.
    pub fn zeroed(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            ..Default::default()
        }
    }

    pub fn metric(&self, name: &str) -> Option<i64> {
        let value = match name {
            "easy_lc" => self.easy_lc,
            "medium_lc" => self.medium_lc,
            "hard_lc" => self.hard_lc,
            "contests_lc" => self.contests_lc,
            "rating_lc" => self.rating_lc,
            "badges_lc" => self.badges_lc,
            "problems_cc" => self.problems_cc,
            "contests_cc" => self.contests_cc,
            "rating_cc" => self.rating_cc,
            "stars_cc" => self.stars_cc,
            "badges_cc" => self.badges_cc,
            "school_gfg" => self.school_gfg,
            "basic_gfg" => self.basic_gfg,
            "easy_gfg" => self.easy_gfg,
            "medium_gfg" => self.medium_gfg,
            "hard_gfg" => self.hard_gfg,
            "contests_gfg" => self.contests_gfg,
            "badges_hr" => self.badges_hr,
            "stars_hr" => self.stars_hr,
            "repos_gh" => self.repos_gh,
            "contributions_gh" => self.contributions_gh,
            _ => return None,
        };
        Some(value as i64)
    }
}

pub(crate) const PERFORMANCE_COLUMNS: &str = "student_id, easy_lc, medium_lc, hard_lc, contests_lc, \
     rating_lc, badges_lc, problems_cc, contests_cc, rating_cc, stars_cc, badges_cc, \
     school_gfg, basic_gfg, easy_gfg, medium_gfg, hard_gfg, contests_gfg, \
     badges_hr, stars_hr, badges_list_hr, repos_gh, contributions_gh, last_updated";

#[derive(Serialize, Deserialize, sqlx::FromRow, Debug, Clone, Default)]
pub struct PlatformStatuses {
    pub student_id: String,
    pub leetcode_status: Option<String>,
    pub codechef_status: Option<String>,
    pub geeksforgeeks_status: Option<String>,
    pub hackerrank_status: Option<String>,
    pub github_status: Option<String>,
}

impl PlatformStatuses {
    pub fn is_accepted(&self, platform: Platform) -> bool {
        let status = match platform {
            Platform::Leetcode => &self.leetcode_status,
            Platform::Codechef => &self.codechef_status,
            Platform::Geeksforgeeks => &self.geeksforgeeks_status,
            Platform::Hackerrank => &self.hackerrank_status,
            Platform::Github => &self.github_status,
        };
        status.as_deref() == Some("accepted")
    }
}

// ============================================================================
// Scoring & Rank Assignment (pure)
// ============================================================================

/// Weighted score for one student: sum of `points * value` over metrics
/// whose owning platform is accepted. Unknown metrics contribute nothing.
pub fn weighted_score(
    weights: &[GradingWeight],
    record: &PerformanceRecord,
    statuses: &PlatformStatuses,
) -> i64 {
    let mut score = 0i64;
    for weight in weights {
        let Some(owner) = metric_owner(&weight.metric) else {
            continue;
        };
        if !statuses.is_accepted(owner) {
            continue;
        }
        let Some(value) = record.metric(&weight.metric) else {
            continue;
        };
        score += weight.points * value;
    }
    score
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RankedStudent {
    pub student_id: String,
    pub score: i64,
    pub rank: i64,
}

/// Order scored students and assign dense 1-based ranks.
///
/// Primary order is score descending with student id ascending as the
/// tie-break. When every score is zero the board re-sorts purely by
/// student id, so an empty leaderboard still has a stable order. Ties keep
/// distinct sequential ranks; they are never merged.
pub fn assign_ranks(mut scored: Vec<(String, i64)>) -> Vec<RankedStudent> {
    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    if scored.iter().all(|(_, score)| *score == 0) {
        scored.sort_by(|a, b| a.0.cmp(&b.0));
    }

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (student_id, score))| RankedStudent {
            student_id,
            score,
            rank: i as i64 + 1,
        })
        .collect()
}

// ============================================================================
// Leaderboard Computation (storage-backed)
// ============================================================================

#[derive(Deserialize, Debug, Clone, Default)]
pub struct RankScope {
    pub dept: Option<String>,
    pub year: Option<i32>,
    pub section: Option<String>,
}

/// Recompute the leaderboard for every active student in `scope` and
/// persist score/rank back onto the student profiles as a read cache.
///
/// Students without a performance row score zero; students without a
/// coding-profile row have nothing accepted. Storage failures are hard
/// errors - there is no partial leaderboard.
pub async fn compute_ranking(pool: &PgPool, scope: &RankScope) -> Result<Vec<RankedStudent>> {
    let weights = load_weights(pool).await?;
    let ids = students_in_scope(pool, scope).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let records: Vec<PerformanceRecord> = sqlx::query_as(&format!(
        "SELECT {PERFORMANCE_COLUMNS} FROM student_performance WHERE student_id = ANY($1)"
    ))
    .bind(&ids)
    .fetch_all(pool)
    .await
    .context("failed to load performance records")?;
    let record_map: HashMap<String, PerformanceRecord> = records
        .into_iter()
        .map(|r| (r.student_id.clone(), r))
        .collect();

    let statuses: Vec<PlatformStatuses> = sqlx::query_as(
        "SELECT student_id, leetcode_status, codechef_status, geeksforgeeks_status, \
         hackerrank_status, github_status \
         FROM student_coding_profiles WHERE student_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await
    .context("failed to load coding profile statuses")?;
    let status_map: HashMap<String, PlatformStatuses> = statuses
        .into_iter()
        .map(|s| (s.student_id.clone(), s))
        .collect();

    let nothing_accepted = PlatformStatuses::default();
    let scored: Vec<(String, i64)> = ids
        .iter()
        .map(|id| {
            let score = match record_map.get(id) {
                Some(record) => weighted_score(
                    &weights,
                    record,
                    status_map.get(id).unwrap_or(&nothing_accepted),
                ),
                None => 0,
            };
            (id.clone(), score)
        })
        .collect();

    let ranked = assign_ranks(scored);
    persist_ranks(pool, &ranked).await?;

    info!("computed ranking for {} students", ranked.len());
    Ok(ranked)
}

async fn students_in_scope(pool: &PgPool, scope: &RankScope) -> Result<Vec<String>> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT student_id FROM student_profiles WHERE status = 'active'",
    );
    if let Some(dept) = &scope.dept {
        query.push(" AND dept_code = ");
        query.push_bind(dept.clone());
    }
    if let Some(year) = scope.year {
        query.push(" AND year = ");
        query.push_bind(year);
    }
    if let Some(section) = &scope.section {
        query.push(" AND section = ");
        query.push_bind(section.clone());
    }
    query.push(" ORDER BY student_id");

    query
        .build_query_scalar::<String>()
        .fetch_all(pool)
        .await
        .context("failed to load students in scope")
}

async fn persist_ranks(pool: &PgPool, ranked: &[RankedStudent]) -> Result<()> {
    for student in ranked {
        sqlx::query("UPDATE student_profiles SET score = $1, overall_rank = $2 WHERE student_id = $3")
            .bind(student.score)
            .bind(student.rank as i32)
            .bind(&student.student_id)
            .execute(pool)
            .await
            .with_context(|| format!("failed to persist rank for {}", student.student_id))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(entries: &[(&str, i64)]) -> Vec<GradingWeight> {
        entries
            .iter()
            .map(|(metric, points)| GradingWeight {
                metric: metric.to_string(),
                points: *points,
            })
            .collect()
    }

    fn accepted_everywhere(student_id: &str) -> PlatformStatuses {
        PlatformStatuses {
            student_id: student_id.to_string(),
            leetcode_status: Some("accepted".to_string()),
            codechef_status: Some("accepted".to_string()),
            geeksforgeeks_status: Some("accepted".to_string()),
            hackerrank_status: Some("accepted".to_string()),
            github_status: Some("accepted".to_string()),
        }
    }

    #[test]
    fn score_is_weighted_sum_of_accepted_metrics() {
        let weights = weights(&[("easy_lc", 1), ("medium_lc", 3), ("hard_lc", 5)]);
        let record = PerformanceRecord {
            easy_lc: 10,
            medium_lc: 2,
            hard_lc: 1,
            ..PerformanceRecord::zeroed("S001")
        };
        let score = weighted_score(&weights, &record, &accepted_everywhere("S001"));
        assert_eq!(score, 10 * 1 + 2 * 3 + 1 * 5);
    }

    #[test]
    fn rejected_platform_contributes_nothing() {
        let weights = weights(&[("easy_lc", 1), ("medium_lc", 3), ("hard_lc", 5)]);
        let record = PerformanceRecord {
            easy_lc: 10,
            medium_lc: 2,
            hard_lc: 1,
            ..PerformanceRecord::zeroed("S001")
        };
        let statuses = PlatformStatuses {
            leetcode_status: Some("rejected".to_string()),
            ..accepted_everywhere("S001")
        };
        assert_eq!(weighted_score(&weights, &record, &statuses), 0);
    }

    #[test]
    fn pending_counts_as_not_accepted() {
        let weights = weights(&[("repos_gh", 2)]);
        let record = PerformanceRecord {
            repos_gh: 9,
            ..PerformanceRecord::zeroed("S001")
        };
        let statuses = PlatformStatuses {
            github_status: Some("pending".to_string()),
            ..PlatformStatuses::default()
        };
        assert_eq!(weighted_score(&weights, &record, &statuses), 0);
    }

    #[test]
    fn gating_is_per_platform() {
        let weights = weights(&[("easy_lc", 1), ("stars_cc", 10)]);
        let record = PerformanceRecord {
            easy_lc: 4,
            stars_cc: 3,
            ..PerformanceRecord::zeroed("S001")
        };
        let statuses = PlatformStatuses {
            leetcode_status: Some("rejected".to_string()),
            codechef_status: Some("accepted".to_string()),
            ..PlatformStatuses::default()
        };
        assert_eq!(weighted_score(&weights, &record, &statuses), 30);
    }

    #[test]
    fn unknown_metric_is_ignored_not_fatal() {
        let weights = weights(&[("easy_lc", 1), ("no_such_metric", 100)]);
        let record = PerformanceRecord {
            easy_lc: 2,
            ..PerformanceRecord::zeroed("S001")
        };
        assert_eq!(
            weighted_score(&weights, &record, &accepted_everywhere("S001")),
            2
        );
    }

    #[test]
    fn every_owned_metric_reads_from_the_record() {
        let record = PerformanceRecord::zeroed("S001");
        for (metric, _) in METRIC_OWNERS {
            assert_eq!(record.metric(metric), Some(0), "metric {metric} unreadable");
        }
        assert_eq!(record.metric("badges_list_hr"), None);
    }

    #[test]
    fn ranks_are_dense_and_ordered_by_score_then_id() {
        let ranked = assign_ranks(vec![
            ("S003".to_string(), 40),
            ("S001".to_string(), 55),
            ("S002".to_string(), 40),
        ]);
        assert_eq!(ranked[0].student_id, "S001");
        assert_eq!(ranked[0].rank, 1);
        // Tied scores keep distinct sequential ranks, id ascending.
        assert_eq!(ranked[1].student_id, "S002");
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[2].student_id, "S003");
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn all_zero_scores_fall_back_to_id_order() {
        let ranked = assign_ranks(vec![
            ("S009".to_string(), 0),
            ("S001".to_string(), 0),
            ("S005".to_string(), 0),
        ]);
        let ids: Vec<_> = ranked.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["S001", "S005", "S009"]);
        let ranks: Vec<_> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn empty_board_ranks_to_empty() {
        assert!(assign_ranks(Vec::new()).is_empty());
    }
}
