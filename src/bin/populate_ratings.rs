//! Populate Ratings - Batch back-fill of missing contest ratings
//!
//! Finds students whose accepted LeetCode/CodeChef profile still has a
//! NULL or zero rating and re-scrapes them serially with a delay between
//! requests. Safe to re-run until the backlog drains.

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use codetrack::performance::populate_missing;
use codetrack::scrape::transport::Transport;

#[derive(Parser, Debug)]
#[command(author, version, about = "Back-fill missing ratings for existing students", long_about = None)]
struct Args {
    /// Maximum number of students to process in this batch
    #[arg(short, long, default_value_t = 50)]
    batch_size: i64,

    /// Delay between requests in milliseconds
    #[arg(short, long, default_value_t = 3000)]
    delay_ms: u64,

    /// Verbose output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting rating population for existing students...");

    let database_url = env::var("POSTGRES_URI").context("POSTGRES_URI must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let transport = Transport::with_delay(Duration::from_millis(args.delay_ms))?;

    let report = populate_missing(
        &pool,
        &transport,
        args.batch_size,
        Duration::from_millis(args.delay_ms),
    )
    .await?;

    if report.processed == 0 {
        info!("All ratings are already populated!");
        return Ok(());
    }

    if report.remaining > 0 {
        info!(
            "{} students still need ratings. Run this again to process more.",
            report.remaining
        );
    } else {
        info!("All students have been processed!");
    }
    Ok(())
}
