use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub mod performance;
pub mod ranking;
pub mod scrape;

use performance::PlatformOutcome;
use ranking::{PerformanceRecord, PlatformStatuses, RankScope};
use scrape::transport::Transport;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct Message {
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

// ============================================================================
// Database Models
// ============================================================================

#[derive(Serialize, Deserialize, sqlx::FromRow, Debug, Clone)]
pub struct StudentProfile {
    pub student_id: String,
    pub name: String,
    pub dept_code: Option<String>,
    pub year: Option<i32>,
    pub section: Option<String>,
    pub status: Option<String>,
    pub score: Option<i64>,
    pub overall_rank: Option<i32>,
}

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Deserialize, Debug, Default)]
pub struct RankingParams {
    pub limit: Option<i64>,
    pub dept: Option<String>,
    pub year: Option<i32>,
    pub section: Option<String>,
}

impl RankingParams {
    fn scope(&self) -> RankScope {
        RankScope {
            dept: self.dept.clone(),
            year: self.year,
            section: self.section.clone(),
        }
    }
}

// ============================================================================
// Joined Response Types
// ============================================================================

#[derive(Serialize, Debug)]
pub struct RankingEntry {
    pub rank: i64,
    pub score: i64,
    pub student_id: String,
    pub name: Option<String>,
    pub dept_code: Option<String>,
    pub year: Option<i32>,
    pub section: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct StudentPerformance {
    pub student_id: String,
    pub performance: PerformanceRecord,
    pub statuses: PlatformStatuses,
}

#[derive(Serialize, Debug)]
pub struct UpdateAllResponse {
    pub message: String,
    pub students_updated: usize,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub students_count: i64,
    pub coding_profiles_count: i64,
    pub performance_records_count: i64,
}

// ============================================================================
// App State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub transport: Arc<Transport>,
}

// ============================================================================
// Router Setup
// ============================================================================

pub fn create_app(pool: Pool<Postgres>, transport: Arc<Transport>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState { pool, transport };

    Router::new()
        // Health & Stats
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .route("/api/stats", get(get_stats))
        // Rankings
        .route("/api/ranking/overall", get(get_overall_ranking))
        .route("/api/ranking/filter", get(get_filtered_ranking))
        .route("/api/ranking/update-all", post(update_all_rankings))
        // Students
        .route("/api/students/:id/performance", get(get_student_performance))
        .route("/api/students/:id/scrape", post(scrape_student))
        .layer(cors)
        .with_state(state)
}

fn internal_error<E: std::fmt::Display>(e: E) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers: Health & Stats
// ============================================================================

async fn root() -> &'static str {
    "CodeTrack API - v0.1.0"
}

async fn health_check() -> Json<Message> {
    Json(Message {
        message: "Backend is running!".to_string(),
    })
}

async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, (StatusCode, Json<ApiError>)> {
    let students_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM student_profiles WHERE status = 'active'")
            .fetch_one(&state.pool)
            .await
            .map_err(internal_error)?;

    let coding_profiles_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM student_coding_profiles")
            .fetch_one(&state.pool)
            .await
            .map_err(internal_error)?;

    let performance_records_count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM student_performance")
            .fetch_one(&state.pool)
            .await
            .map_err(internal_error)?;

    Ok(Json(StatsResponse {
        students_count: students_count.0,
        coding_profiles_count: coding_profiles_count.0,
        performance_records_count: performance_records_count.0,
    }))
}

// ============================================================================
// Handlers: Rankings
// ============================================================================

async fn get_overall_ranking(
    State(state): State<AppState>,
    Query(params): Query<RankingParams>,
) -> Result<Json<Vec<RankingEntry>>, (StatusCode, Json<ApiError>)> {
    rank_and_join(&state, &RankScope::default(), params.limit).await
}

async fn get_filtered_ranking(
    State(state): State<AppState>,
    Query(params): Query<RankingParams>,
) -> Result<Json<Vec<RankingEntry>>, (StatusCode, Json<ApiError>)> {
    rank_and_join(&state, &params.scope(), params.limit).await
}

/// Recompute the board for `scope`, then join profile identity fields onto
/// the ranked rows for display.
async fn rank_and_join(
    state: &AppState,
    scope: &RankScope,
    limit: Option<i64>,
) -> Result<Json<Vec<RankingEntry>>, (StatusCode, Json<ApiError>)> {
    let limit = limit.unwrap_or(2000).max(1) as usize;

    let ranked = ranking::compute_ranking(&state.pool, scope)
        .await
        .map_err(internal_error)?;

    let ids: Vec<String> = ranked.iter().map(|r| r.student_id.clone()).collect();
    let profiles: Vec<StudentProfile> = sqlx::query_as(
        "SELECT student_id, name, dept_code, year, section, status, score, overall_rank \
         FROM student_profiles WHERE student_id = ANY($1)",
    )
    .bind(&ids)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let profile_map: HashMap<String, StudentProfile> = profiles
        .into_iter()
        .map(|p| (p.student_id.clone(), p))
        .collect();

    let entries: Vec<RankingEntry> = ranked
        .into_iter()
        .take(limit)
        .map(|r| {
            let profile = profile_map.get(&r.student_id);
            RankingEntry {
                rank: r.rank,
                score: r.score,
                name: profile.map(|p| p.name.clone()),
                dept_code: profile.and_then(|p| p.dept_code.clone()),
                year: profile.and_then(|p| p.year),
                section: profile.and_then(|p| p.section.clone()),
                student_id: r.student_id,
            }
        })
        .collect();

    Ok(Json(entries))
}

async fn update_all_rankings(
    State(state): State<AppState>,
) -> Result<Json<UpdateAllResponse>, (StatusCode, Json<ApiError>)> {
    let ranked = ranking::compute_ranking(&state.pool, &RankScope::default())
        .await
        .map_err(internal_error)?;

    Ok(Json(UpdateAllResponse {
        message: "Rankings updated successfully".to_string(),
        students_updated: ranked.len(),
    }))
}

// ============================================================================
// Handlers: Students
// ============================================================================

async fn get_student_performance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StudentPerformance>, (StatusCode, Json<ApiError>)> {
    let exists: Option<(String,)> =
        sqlx::query_as("SELECT student_id FROM student_profiles WHERE student_id = $1")
            .bind(&id)
            .fetch_optional(&state.pool)
            .await
            .map_err(internal_error)?;

    if exists.is_none() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: "Student not found".to_string(),
            }),
        ));
    }

    let record: Option<PerformanceRecord> = sqlx::query_as(&format!(
        "SELECT {} FROM student_performance WHERE student_id = $1",
        ranking::PERFORMANCE_COLUMNS
    ))
    .bind(&id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;

    let statuses: Option<PlatformStatuses> = sqlx::query_as(
        "SELECT student_id, leetcode_status, codechef_status, geeksforgeeks_status, \
         hackerrank_status, github_status \
         FROM student_coding_profiles WHERE student_id = $1",
    )
    .bind(&id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(StudentPerformance {
        performance: record.unwrap_or_else(|| PerformanceRecord::zeroed(&id)),
        statuses: statuses.unwrap_or_default(),
        student_id: id,
    }))
}

async fn scrape_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PlatformOutcome>>, (StatusCode, Json<ApiError>)> {
    let outcomes = performance::scrape_all_profiles(&state.pool, &state.transport, &id)
        .await
        .map_err(internal_error)?;

    Ok(Json(outcomes))
}
