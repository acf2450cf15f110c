use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod combine;
mod config;
mod copus;
mod db;
mod error;
mod import;
mod models;
mod ranking;
mod report;
mod tally;

use crate::error::ObservationError;

#[derive(Parser)]
#[command(name = "copus-observations")]
#[command(about = "COPUS classroom observation tallies, results and leaderboards", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed observations
    Seed,
    /// Import interval rows from a CSV file as observation sessions
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show per-session and combined tallies for a schedule
    Tally {
        #[arg(long)]
        schedule: Uuid,
    },
    /// Combine sessions and store the result used for ranking
    ComputeResults {
        /// Only this schedule; every schedule with sessions otherwise
        #[arg(long)]
        schedule: Option<Uuid>,
    },
    /// Rank faculty by combined student/teacher action score
    Rank {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        semester: Option<String>,
        #[arg(long)]
        year: Option<String>,
        /// Also write the leaderboard as markdown
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report for a schedule
    Report {
        #[arg(long)]
        schedule: Uuid,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config::DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let config = config::Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    tracing::debug!(max_connections = config.max_connections, "connected to Postgres");

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let (inserted, skipped) = db::import_sessions(&pool, &csv).await?;
            println!(
                "Inserted {inserted} sessions from {} ({skipped} already recorded).",
                csv.display()
            );
        }
        Commands::Tally { schedule } => {
            let sessions = db::fetch_sessions(&pool, schedule).await?;
            if sessions.is_empty() {
                println!("No sessions recorded for schedule {schedule}.");
                return Ok(());
            }

            for session in &sessions {
                let engagement = tally::derive_percentages(&session.tally);
                println!(
                    "Session {} ({}): {} occurrences, High {:.2}% Med {:.2}% Low {:.2}%",
                    session.session_number.get(),
                    session.observer,
                    session.tally.total_intervals,
                    engagement.high,
                    engagement.med,
                    engagement.low
                );
            }

            let result = combine::combine(schedule, &sessions);
            let engagement = tally::derive_percentages(&result.combined);
            println!(
                "Combined: {} occurrences, High {:.2}% Med {:.2}% Low {:.2}%",
                result.combined_total_intervals(),
                engagement.high,
                engagement.med,
                engagement.low
            );
        }
        Commands::ComputeResults { schedule } => {
            let schedules = match schedule {
                Some(id) => vec![id],
                None => db::fetch_schedule_ids(&pool).await?,
            };

            let mut stored = 0usize;
            for schedule_id in schedules {
                let sessions = db::fetch_sessions(&pool, schedule_id).await?;
                if sessions.is_empty() {
                    if schedule.is_some() {
                        return Err(ObservationError::NoSessions(schedule_id).into());
                    }
                    tracing::warn!(%schedule_id, "no sessions recorded, skipping");
                    continue;
                }
                let result = combine::combine(schedule_id, &sessions);
                let metrics = combine::result_metrics(&result);
                db::store_result(&pool, &result, &metrics).await?;
                stored += 1;
            }
            println!("Stored {stored} combined results.");
        }
        Commands::Rank {
            limit,
            semester,
            year,
            out,
        } => {
            let rows = db::fetch_score_rows(&pool, semester.as_deref(), year.as_deref()).await?;
            let scores = ranking::rank_top(&rows, limit);

            if scores.is_empty() {
                println!("No computed results found for this term.");
                return Ok(());
            }

            println!("Top faculty by combined COPUS score:");
            for score in &scores {
                println!(
                    "- {} ({}, {} {}) score {:.2} (student {:.2}, teacher {:.2}, overall {:.2}) across {} observations",
                    score.faculty_name,
                    score.subject,
                    score.latest_semester,
                    score.latest_year,
                    score.combined_score,
                    score.student_action_average,
                    score.teacher_action_average,
                    score.overall_average,
                    score.observation_count
                );
            }

            if let Some(out) = out {
                std::fs::write(&out, report::build_leaderboard(&rows, limit))
                    .with_context(|| format!("failed to write {}", out.display()))?;
                println!("Leaderboard written to {}.", out.display());
            }
        }
        Commands::Report { schedule, out } => {
            let sessions = db::fetch_sessions(&pool, schedule).await?;
            let label = db::fetch_schedule_label(&pool, schedule).await?;
            let result = combine::combine(schedule, &sessions);
            let report = report::build_report(label.as_deref(), &sessions, &result);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
