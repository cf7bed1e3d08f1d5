//! Scrape Student - Re-scrapes one student's accepted coding profiles
//!
//! Runs every accepted platform for the student in parallel and reports a
//! per-platform outcome, mirroring the manual re-scrape endpoint.

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use codetrack::performance::scrape_all_profiles;
use codetrack::scrape::transport::Transport;

#[derive(Parser, Debug)]
#[command(author, version, about = "Re-scrape one student's accepted coding profiles", long_about = None)]
struct Args {
    /// Student ID, e.g. 23A91A05I2
    student_id: String,

    /// Delay between requests in milliseconds
    #[arg(short, long, default_value_t = 1000)]
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

    let database_url = env::var("POSTGRES_URI").context("POSTGRES_URI must be set")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    let transport = Transport::with_delay(Duration::from_millis(args.delay_ms))?;

    info!("Fetching profiles for student: {}", args.student_id);
    let outcomes = scrape_all_profiles(&pool, &transport, &args.student_id).await?;

    if outcomes.is_empty() {
        info!("No accepted profiles to scrape for {}", args.student_id);
        return Ok(());
    }

    for outcome in &outcomes {
        if outcome.ok {
            info!("{} updated ({})", outcome.platform, outcome.username);
        } else {
            error!(
                "{} failed ({}): {}",
                outcome.platform,
                outcome.username,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    let succeeded = outcomes.iter().filter(|o| o.ok).count();
    info!(
        "Scraping complete for {}: {}/{} platforms updated",
        args.student_id,
        succeeded,
        outcomes.len()
    );
    Ok(())
}
