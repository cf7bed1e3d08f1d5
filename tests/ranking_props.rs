//! Scoring and ranking properties exercised through the public API.

use codetrack::ranking::{
    assign_ranks, metric_owner, weighted_score, GradingWeight, PerformanceRecord,
    PlatformStatuses,
};
use codetrack::scrape::Platform;

fn weights(entries: &[(&str, i64)]) -> Vec<GradingWeight> {
    entries
        .iter()
        .map(|(metric, points)| GradingWeight {
            metric: metric.to_string(),
            points: *points,
        })
        .collect()
}

#[test]
fn score_matches_the_gated_weighted_sum() {
    let weights = weights(&[
        ("easy_lc", 1),
        ("medium_lc", 3),
        ("hard_lc", 5),
        ("stars_cc", 10),
        ("repos_gh", 2),
    ]);
    let record = PerformanceRecord {
        easy_lc: 10,
        medium_lc: 2,
        hard_lc: 1,
        stars_cc: 4,
        repos_gh: 6,
        ..PerformanceRecord::zeroed("23A91A05I2")
    };
    // LeetCode and CodeChef accepted, GitHub still pending.
    let statuses = PlatformStatuses {
        student_id: "23A91A05I2".to_string(),
        leetcode_status: Some("accepted".to_string()),
        codechef_status: Some("accepted".to_string()),
        github_status: Some("pending".to_string()),
        ..PlatformStatuses::default()
    };

    let score = weighted_score(&weights, &record, &statuses);
    assert_eq!(score, 10 * 1 + 2 * 3 + 1 * 5 + 4 * 10);
}

#[test]
fn rejected_platform_zeroes_its_whole_contribution() {
    let weights = weights(&[("easy_lc", 1), ("medium_lc", 3), ("hard_lc", 5)]);
    let record = PerformanceRecord {
        easy_lc: 10,
        medium_lc: 2,
        hard_lc: 1,
        ..PerformanceRecord::zeroed("23A91A05I2")
    };
    let statuses = PlatformStatuses {
        student_id: "23A91A05I2".to_string(),
        leetcode_status: Some("rejected".to_string()),
        ..PlatformStatuses::default()
    };

    assert_eq!(weighted_score(&weights, &record, &statuses), 0);
}

#[test]
fn ranks_are_dense_and_strictly_increasing() {
    let scored = vec![
        ("22A91A0501".to_string(), 120),
        ("22A91A0502".to_string(), 120),
        ("22A91A0503".to_string(), 90),
        ("22A91A0504".to_string(), 120),
    ];
    let ranked = assign_ranks(scored);

    for (i, row) in ranked.iter().enumerate() {
        assert_eq!(row.rank, i as i64 + 1);
    }
    // Tied at 120: id ascending decides, no merged ranks.
    let ids: Vec<_> = ranked.iter().map(|r| r.student_id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["22A91A0501", "22A91A0502", "22A91A0504", "22A91A0503"]
    );
}

#[test]
fn all_zero_board_orders_purely_by_student_id() {
    let scored = vec![
        ("22A91A0509".to_string(), 0),
        ("22A91A0501".to_string(), 0),
        ("22A91A0503".to_string(), 0),
    ];
    let ranked = assign_ranks(scored);
    let ids: Vec<_> = ranked.iter().map(|r| r.student_id.as_str()).collect();
    assert_eq!(ids, vec!["22A91A0501", "22A91A0503", "22A91A0509"]);
}

#[test]
fn every_platform_owns_at_least_one_metric() {
    for platform in Platform::ALL {
        let owned = codetrack::ranking::METRIC_OWNERS
            .iter()
            .filter(|(_, owner)| *owner == platform)
            .count();
        assert!(owned > 0, "{platform} owns no metrics");
    }
    assert_eq!(metric_owner("no_such_metric"), None);
}
