//! Check Ratings - Prints one student's stored platform numbers
//!
//! Quick inspection tool for verifying what a scrape actually wrote.

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print stored rating values for a student", long_about = None)]
struct Args {
    /// Student ID to inspect
    student_id: String,
}

#[derive(sqlx::FromRow, Debug)]
struct RatingRow {
    rating_lc: i32,
    rating_cc: i32,
    contests_lc: i32,
    contests_cc: i32,
    easy_lc: i32,
    medium_lc: i32,
    hard_lc: i32,
    problems_cc: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let database_url = env::var("POSTGRES_URI").context("POSTGRES_URI must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let row: Option<RatingRow> = sqlx::query_as(
        "SELECT rating_lc, rating_cc, contests_lc, contests_cc, \
         easy_lc, medium_lc, hard_lc, problems_cc \
         FROM student_performance WHERE student_id = $1",
    )
    .bind(&args.student_id)
    .fetch_optional(&pool)
    .await
    .context("Failed to query student_performance")?;

    match row {
        None => anyhow::bail!("No performance data found for {}", args.student_id),
        Some(data) => {
            info!("Database values for {}:", args.student_id);
            info!("  LeetCode Rating: {}", data.rating_lc);
            info!("  CodeChef Rating: {}", data.rating_cc);
            info!("  LeetCode Contests: {}", data.contests_lc);
            info!("  CodeChef Contests: {}", data.contests_cc);
            info!(
                "  LeetCode Problems: {}",
                data.easy_lc + data.medium_lc + data.hard_lc
            );
            info!("  CodeChef Problems: {}", data.problems_cc);
        }
    }
    Ok(())
}
