use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use cohort_risk_analytics::histogram::DEFAULT_BINS;
use cohort_risk_analytics::{assemble, AnalysisRequest, AnalysisResult, Metric};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

mod db;
mod render;

#[derive(Parser)]
#[command(name = "cohort-risk-analytics")]
#[command(about = "Academic risk analytics over semester grades and risk factors", long_about = None)]
struct Cli {
    /// Maximum number of pooled Postgres connections
    #[arg(long, global = true, default_value_t = 5)]
    max_connections: u32,
    /// Maximum number of student records fetched concurrently
    #[arg(long, global = true, default_value_t = 8)]
    fetch_concurrency: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import grades and risk factors from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List semesters with recorded students
    Semesters,
    /// Descriptive statistics and histogram of one metric
    Histogram {
        #[arg(long)]
        semester: String,
        #[arg(long, default_value_t = Metric::GradeAverage)]
        metric: Metric,
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },
    /// Scatter points and Pearson correlation between two metrics
    Scatter {
        #[arg(long)]
        semester: String,
        #[arg(long, default_value_t = Metric::GradeAverage)]
        x: Metric,
        #[arg(long, default_value_t = Metric::RiskFactorCount)]
        y: Metric,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },
    /// Group risk factors into root-cause categories
    Ishikawa {
        #[arg(long)]
        semester: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
    },
    /// Generate a markdown report with all analyses
    Report {
        #[arg(long)]
        semester: String,
        #[arg(long, default_value_t = DEFAULT_BINS)]
        bins: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    let concurrency = cli.fetch_concurrency;

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
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} rows from {}.", csv.display());
        }
        Commands::Semesters => {
            let semesters = db::list_semesters(&pool).await?;
            if semesters.is_empty() {
                println!("No semesters recorded yet.");
                return Ok(());
            }
            for summary in semesters {
                println!("- {} ({} students)", summary.semester, summary.student_count);
            }
        }
        Commands::Histogram {
            semester,
            metric,
            bins,
            format,
        } => {
            let request = AnalysisRequest::histogram(metric, Some(bins))?;
            let result = run_analysis(&pool, &semester, concurrency, request).await?;
            print_result(&result, format)?;
        }
        Commands::Scatter {
            semester,
            x,
            y,
            format,
        } => {
            let request = AnalysisRequest::Scatter { x, y };
            let result = run_analysis(&pool, &semester, concurrency, request).await?;
            print_result(&result, format)?;
        }
        Commands::Ishikawa { semester, format } => {
            let result =
                run_analysis(&pool, &semester, concurrency, AnalysisRequest::Ishikawa).await?;
            print_result(&result, format)?;
        }
        Commands::Report {
            semester,
            bins,
            out,
        } => {
            // validates the bin count before touching the database
            AnalysisRequest::histogram(Metric::GradeAverage, Some(bins))?;
            let records = db::fetch_student_records(&pool, &semester, concurrency).await?;
            let today = chrono::Utc::now().date_naive();
            let report = render::build_report(&semester, today, &records, bins);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn run_analysis(
    pool: &PgPool,
    semester: &str,
    concurrency: usize,
    request: AnalysisRequest,
) -> anyhow::Result<AnalysisResult> {
    let records = db::fetch_student_records(pool, semester, concurrency).await?;
    tracing::debug!(?request, students = records.len(), "running analysis");
    Ok(assemble(semester, &records, request))
}

fn print_result(result: &AnalysisResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Markdown => print!("{}", render::render_result(result)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(result).context("failed to encode result")?;
            println!("{json}");
        }
    }
    Ok(())
}
