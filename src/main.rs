use std::path::PathBuf;

use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use risk_index::config::Config;
use risk_index::history::month_bounds;
use risk_index::models::IndexKind;
use risk_index::{db, report, Disclosure, Pipeline, SubScores};

/// Days of history searched for the newest publishable record.
const LATEST_LOOKBACK_DAYS: i64 = 45;

#[derive(Parser)]
#[command(name = "risk-index")]
#[command(about = "Composite geopolitical risk index scoring and publication", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample events
    Seed,
    /// Import events from a CSV file (region, occurred_at, text, source_key)
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Classify a single piece of event text
    Classify {
        text: String,
    },
    /// Score one region for one day and store the record
    Score {
        #[arg(long, value_enum)]
        index: Option<IndexKind>,
        #[arg(long)]
        region: String,
        #[arg(long)]
        date: NaiveDate,
        /// Regional escalation score, 0-100
        #[arg(long)]
        base: f64,
        /// Asset transmission score, 0-100
        #[arg(long)]
        asset: f64,
        /// Contagion score, 0-100
        #[arg(long)]
        contagion: f64,
    },
    /// Print the newest publishable reading as JSON
    Public {
        #[arg(long, value_enum)]
        index: Option<IndexKind>,
        #[arg(long)]
        region: String,
    },
    /// Print monthly statistics as JSON
    History {
        #[arg(long, value_enum)]
        index: Option<IndexKind>,
        #[arg(long)]
        region: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
    /// List months that have published data
    Months {
        #[arg(long, value_enum)]
        index: Option<IndexKind>,
        #[arg(long)]
        region: String,
        #[arg(long, default_value_t = 2)]
        years: u16,
    },
    /// Generate a markdown report for a month
    Report {
        #[arg(long, value_enum)]
        index: Option<IndexKind>,
        #[arg(long)]
        region: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(config.require_database_url()?)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pipeline = Pipeline::new(&config).context("invalid scoring configuration")?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            let inserted = db::seed(&pool).await?;
            println!("Inserted {inserted} sample events.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} events from {}.", csv.display());
        }
        Commands::Classify { text } => {
            let category = pipeline.classifier.classify(&text);
            println!("{} ({:.1})", category.name, category.weight);
        }
        Commands::Score {
            index,
            region,
            date,
            base,
            asset,
            contagion,
        } => {
            let index = index.unwrap_or(config.default_index);
            let pool = connect(&config).await?;
            let events = db::fetch_events(&pool, &region, date).await?;
            let previous_date = date.pred_opt().context("date has no predecessor")?;
            let previous = db::fetch_record(&pool, index, &region, previous_date).await?;

            let record = pipeline.score(
                index,
                &region,
                date,
                events,
                SubScores {
                    regional_base: base,
                    asset_transmission: asset,
                    contagion,
                },
                previous.as_ref(),
                Utc::now(),
            )?;

            if db::store_record(&pool, &record).await? {
                info!(region = %region, date = %date, band = %record.band, "scored");
                println!(
                    "Stored {} {} for {}: level {} ({}, {}).",
                    index.as_str().to_uppercase(),
                    region,
                    date,
                    record.level,
                    record.band,
                    record.trend
                );
            } else {
                warn!(region = %region, date = %date, "record already exists, keeping stored one");
                println!("A record for {region} on {date} already exists; nothing stored.");
            }
        }
        Commands::Public { index, region } => {
            let index = index.unwrap_or(config.default_index);
            let pool = connect(&config).await?;
            let now = Utc::now();
            let today = now.date_naive();
            let records = db::fetch_records(
                &pool,
                index,
                &region,
                today - Duration::days(LATEST_LOOKBACK_DAYS),
                today + Duration::days(1),
            )
            .await?;

            match pipeline.filter.latest(&records, index, &region, now) {
                Disclosure::Available(view) => {
                    println!("{}", serde_json::to_string_pretty(&view)?)
                }
                Disclosure::Unavailable => println!("No data for this period."),
            }
        }
        Commands::History {
            index,
            region,
            year,
            month,
        } => {
            let index = index.unwrap_or(config.default_index);
            let (start, end) = month_bounds(year, month)?;
            let pool = connect(&config).await?;
            let records = db::fetch_records(&pool, index, &region, start, end).await?;
            let stats = pipeline
                .history
                .monthly(&records, index, &region, year, month, Utc::now())?;

            if stats.is_empty() {
                println!("No data for this period.");
            } else {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
        }
        Commands::Months {
            index,
            region,
            years,
        } => {
            let index = index.unwrap_or(config.default_index);
            let pool = connect(&config).await?;
            let now = Utc::now();
            let today = now.date_naive();
            let from = NaiveDate::from_ymd_opt(today.year() - i32::from(years.max(1)), 1, 1)
                .context("lookback reaches past the supported calendar")?;
            let records =
                db::fetch_records(&pool, index, &region, from, today + Duration::days(1)).await?;
            let months = pipeline.history.available_months(&records, now);

            if months.is_empty() {
                println!("No published months.");
            }
            for (year, month) in months {
                println!("{year}-{month:02}");
            }
        }
        Commands::Report {
            index,
            region,
            year,
            month,
            out,
        } => {
            let index = index.unwrap_or(config.default_index);
            let (start, end) = month_bounds(year, month)?;
            let pool = connect(&config).await?;
            let now = Utc::now();

            let records = db::fetch_records(&pool, index, &region, start, end).await?;
            let stats = pipeline
                .history
                .monthly(&records, index, &region, year, month, now)?;
            let views = pipeline.filter.public_views(&records, now);

            let today = now.date_naive();
            let recent = db::fetch_records(
                &pool,
                index,
                &region,
                today - Duration::days(LATEST_LOOKBACK_DAYS),
                today + Duration::days(1),
            )
            .await?;
            let latest = pipeline.filter.latest(&recent, index, &region, now);

            let report = report::build_report(index, &region, &latest, &stats, &views);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
